//! Run-length encoding of per-lane scan results into snapshot regions

use crate::memory::snapshot::{RegionView, SnapshotRegion};
use tracing::debug;

/// What one unit of cursor movement stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunUnit {
    /// Every encoded byte is a matching (or don't-care) byte of memory
    Bytes,
    /// Every `alignment` bytes of run stand for one element start; the
    /// element itself extends `element_size` bytes from there
    ElementSlots,
}

/// Turns an address-ordered stream of match results into regions.
///
/// The cursor is measured in bytes from `origin`, the buffer offset where
/// scanning began (which may precede the region start). Emitted regions are
/// snapped to the region's element grid: they start on an element start and
/// end on an element end. A run that would reach outside the scanned region
/// or its buffer is dropped.
#[derive(Debug)]
pub struct RunLengthEncoder {
    read_group: usize,
    origin: usize,
    region_start: usize,
    region_end: usize,
    buffer_len: usize,
    alignment: usize,
    element_size: usize,
    unit: RunUnit,
    cursor: usize,
    run_length: usize,
    is_encoding: bool,
    regions: Vec<SnapshotRegion>,
}

impl RunLengthEncoder {
    pub fn new(
        view: &RegionView<'_>,
        origin: usize,
        alignment: usize,
        element_size: usize,
        unit: RunUnit,
    ) -> Self {
        RunLengthEncoder {
            read_group: view.read_group_index(),
            origin,
            region_start: view.offset(),
            region_end: view.end_offset(),
            buffer_len: view.buffer_len(),
            alignment: alignment.max(1),
            element_size: element_size.max(1),
            unit,
            cursor: 0,
            run_length: 0,
            is_encoding: false,
            regions: Vec::new(),
        }
    }

    /// Extends the current run by `length`
    #[inline]
    pub fn encode_range(&mut self, length: usize) {
        self.run_length += length;
        self.cursor += length;
        self.is_encoding = true;
    }

    /// Closes any open run at the cursor, then skips `length` non-matching bytes
    #[inline]
    pub fn finalize(&mut self, length: usize) {
        if self.is_encoding {
            self.emit();
        }
        self.cursor += length;
    }

    /// Closes any open run at the cursor
    pub fn finalize_at_end(&mut self) {
        if self.is_encoding {
            self.emit();
        }
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Regions emitted so far
    pub fn regions(&self) -> &[SnapshotRegion] {
        &self.regions
    }

    pub fn into_regions(mut self) -> Vec<SnapshotRegion> {
        self.finalize_at_end();
        self.regions
    }

    fn emit(&mut self) {
        let start = self.origin + self.cursor - self.run_length;
        let mut end = self.origin + self.cursor;
        if self.unit == RunUnit::ElementSlots {
            end = (end + self.element_size).saturating_sub(self.alignment);
        }

        self.run_length = 0;
        self.is_encoding = false;

        if start < self.region_start {
            debug!(
                start,
                region_start = self.region_start,
                "dropping run that starts before its region"
            );
            return;
        }

        // First element start at or after the run start
        let skew = (start - self.region_start) % self.alignment;
        let first = if skew == 0 {
            start
        } else {
            start + self.alignment - skew
        };
        if end < first + self.element_size {
            return;
        }

        let last = first + (end - self.element_size - first) / self.alignment * self.alignment;
        let stop = last + self.element_size;
        if stop > self.region_end || stop > self.buffer_len {
            debug!(
                stop,
                region_end = self.region_end,
                buffer_len = self.buffer_len,
                "dropping run that overreads its region"
            );
            return;
        }

        self.regions
            .push(SnapshotRegion::new(self.read_group, first, stop - first));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Address;
    use crate::memory::snapshot::ReadGroup;

    fn encode_bits(encoder: &mut RunLengthEncoder, bits: &[bool], step: usize) {
        for &bit in bits {
            if bit {
                encoder.encode_range(step);
            } else {
                encoder.finalize(step);
            }
        }
    }

    #[test]
    fn test_runs_cover_true_bytes() {
        let group = ReadGroup::new(Address::new(0x1000), 16);
        let view = RegionView::whole(0, &group);
        let mut encoder = RunLengthEncoder::new(&view, 0, 1, 1, RunUnit::Bytes);

        let bits = [true, true, false, false, true, false, true, true, true];
        encode_bits(&mut encoder, &bits, 1);
        let regions = encoder.into_regions();

        assert_eq!(
            regions,
            vec![
                SnapshotRegion::new(0, 0, 2),
                SnapshotRegion::new(0, 4, 1),
                SnapshotRegion::new(0, 6, 3),
            ]
        );
    }

    #[test]
    fn test_finalize_without_run_only_advances() {
        let group = ReadGroup::new(Address::new(0x1000), 16);
        let view = RegionView::whole(0, &group);
        let mut encoder = RunLengthEncoder::new(&view, 0, 1, 1, RunUnit::Bytes);

        encoder.finalize(5);
        assert_eq!(encoder.cursor(), 5);
        assert!(encoder.regions().is_empty());
    }

    #[test]
    fn test_overread_run_is_dropped() {
        let group = ReadGroup::new(Address::new(0x1000), 32);
        let view = RegionView::new(0, &group, 4, 10).unwrap();
        let mut encoder = RunLengthEncoder::new(&view, 4, 1, 1, RunUnit::Bytes);

        encoder.encode_range(16);
        assert!(encoder.into_regions().is_empty());
    }

    #[test]
    fn test_run_before_region_is_dropped() {
        let group = ReadGroup::new(Address::new(0x1000), 32);
        let view = RegionView::new(0, &group, 8, 8).unwrap();
        let mut encoder = RunLengthEncoder::new(&view, 0, 1, 1, RunUnit::Bytes);

        encoder.encode_range(10);
        encoder.finalize(6);
        assert!(encoder.into_regions().is_empty());
    }

    #[test]
    fn test_sparse_runs_trim_dont_care_bytes() {
        // 2-byte elements every 4 bytes; lanes 2..4 of each slot are don't-care
        let group = ReadGroup::new(Address::new(0x1000), 16);
        let view = RegionView::whole(0, &group);
        let mut encoder = RunLengthEncoder::new(&view, 0, 4, 2, RunUnit::Bytes);

        encoder.finalize(2);
        encoder.encode_range(2);
        encoder.encode_range(8);
        encoder.finalize(4);
        let regions = encoder.into_regions();

        assert_eq!(regions, vec![SnapshotRegion::new(0, 4, 6)]);
    }

    #[test]
    fn test_element_slots_extend_to_element_end() {
        // 4-byte elements at every byte
        let group = ReadGroup::new(Address::new(0x1000), 12);
        let view = RegionView::whole(0, &group);
        let mut encoder = RunLengthEncoder::new(&view, 0, 1, 4, RunUnit::ElementSlots);

        encode_bits(&mut encoder, &[false, true, true, false, false, true], 1);
        let regions = encoder.into_regions();

        assert_eq!(
            regions,
            vec![SnapshotRegion::new(0, 1, 5), SnapshotRegion::new(0, 5, 4)]
        );
    }
}
