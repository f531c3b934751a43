//! Chunked scanning of regions
//!
//! A region is read in [`VECTOR_SIZE`]-byte chunks starting at a vector
//! boundary of its buffer. Lanes of the first chunk that precede the region
//! are masked off (misalignment mask), as are lanes of the last chunk past
//! the region's last element (overread mask). Uniform chunks take a constant
//! time fast path; mixed chunks are walked one element position at a time.
//!
//! Three variants cover the alignment/element size combinations:
//!
//! * dense, `alignment == size`: one compare per chunk
//! * sparse, `alignment > size`: one compare per chunk, with the bytes
//!   between sampled elements forced true so they never split a run
//! * staggered, `alignment < size`: `size / alignment` compares per chunk at
//!   successive alignment offsets, merged into a per-element bitmap

use super::encoder::{RunLengthEncoder, RunUnit};
use super::lanes::{load_chunk, LaneMask, VECTOR_SIZE};
use super::predicate::LanePredicate;
use crate::core::types::{MemoryError, MemoryResult};
use crate::memory::snapshot::{RegionView, SnapshotRegion};

/// Bit set in a staggered bitmap for the compare issued at offset index `j`
const BIT_POSITIONS: [u8; 8] = [1 << 0, 1 << 1, 1 << 2, 1 << 3, 1 << 4, 1 << 5, 1 << 6, 1 << 7];

/// Scan loop flavour for an alignment/element size pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanVariant {
    Dense,
    Sparse,
    Staggered,
}

impl ScanVariant {
    pub fn select(alignment: usize, element_size: usize) -> Self {
        if alignment == element_size {
            ScanVariant::Dense
        } else if alignment > element_size {
            ScanVariant::Sparse
        } else {
            ScanVariant::Staggered
        }
    }
}

/// Read window and masking parameters for one region scan.
///
/// Positions are byte offsets from `read_start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ScanPlan {
    alignment: usize,
    element_size: usize,
    read_start: usize,
    misalignment: usize,
    last_position: usize,
    scan_count: usize,
}

impl ScanPlan {
    fn new(view: &RegionView<'_>, alignment: usize, element_size: usize) -> Option<Self> {
        let elements = view.element_count(alignment, element_size);
        if elements == 0 {
            return None;
        }

        // Back the first read up to a vector boundary, staying on the element grid
        let misalignment = (view.offset() % VECTOR_SIZE) / alignment * alignment;
        let last_position = misalignment + (elements - 1) * alignment;

        Some(ScanPlan {
            alignment,
            element_size,
            read_start: view.offset() - misalignment,
            misalignment,
            last_position,
            scan_count: last_position / VECTOR_SIZE + 1,
        })
    }

    fn chunk_base(&self, chunk: usize) -> usize {
        chunk * VECTOR_SIZE
    }

    fn is_last(&self, chunk: usize) -> bool {
        chunk + 1 == self.scan_count
    }

    /// Byte-lane mask for chunk `chunk`, or `None` when every lane is valid
    fn lane_mask(&self, chunk: usize) -> Option<LaneMask> {
        let mut mask = None;
        if chunk == 0 && self.misalignment > 0 {
            mask = Some(LaneMask::leading_false(self.misalignment));
        }
        if self.is_last(chunk) {
            let valid = self.last_position + self.element_size - self.chunk_base(chunk);
            if valid < VECTOR_SIZE {
                let overread = LaneMask::leading_true(valid);
                mask = Some(mask.map_or(overread, |m| m & overread));
            }
        }
        mask
    }

    /// Whether the element starting at `position` within chunk `chunk` is
    /// part of the region
    fn slot_valid(&self, chunk: usize, position: usize) -> bool {
        let absolute = self.chunk_base(chunk) + position;
        absolute >= self.misalignment && absolute <= self.last_position
    }
}

/// Chunked scanner over one region
pub struct VectorScanner;

impl VectorScanner {
    /// Scans `view` for elements matching `predicate` at every `alignment`
    /// bytes from the region start, returning the matching sub-regions
    pub fn scan_region<P: LanePredicate + ?Sized>(
        view: &RegionView<'_>,
        predicate: &P,
        alignment: usize,
    ) -> MemoryResult<Vec<SnapshotRegion>> {
        if !matches!(alignment, 1 | 2 | 4 | 8) {
            return Err(MemoryError::InvalidAlignment(alignment));
        }

        let element_size = predicate.element_size();
        let Some(plan) = ScanPlan::new(view, alignment, element_size) else {
            return Ok(Vec::new());
        };

        let regions = match ScanVariant::select(alignment, element_size) {
            ScanVariant::Dense => scan_lanes(view, predicate, &plan, None),
            ScanVariant::Sparse => scan_lanes(
                view,
                predicate,
                &plan,
                Some(LaneMask::sparse(alignment, element_size)),
            ),
            ScanVariant::Staggered => scan_staggered(view, predicate, &plan),
        };
        Ok(regions)
    }
}

/// Compares the chunk `offset` bytes past the plan's read start
#[inline]
fn compare_at<P: LanePredicate + ?Sized>(
    view: &RegionView<'_>,
    predicate: &P,
    plan: &ScanPlan,
    offset: usize,
) -> LaneMask {
    let start = plan.read_start + offset;
    let current = load_chunk(view.buffer_current(), start);
    if predicate.requires_previous() {
        let previous = load_chunk(view.buffer_previous(), start);
        predicate.compare(&current, &previous)
    } else {
        predicate.compare(&current, &current)
    }
}

/// Dense and sparse scans: one compare per chunk, walked by byte lanes
fn scan_lanes<P: LanePredicate + ?Sized>(
    view: &RegionView<'_>,
    predicate: &P,
    plan: &ScanPlan,
    sparse: Option<LaneMask>,
) -> Vec<SnapshotRegion> {
    let step = plan.alignment;
    let mut encoder = RunLengthEncoder::new(
        view,
        plan.read_start,
        plan.alignment,
        plan.element_size,
        RunUnit::Bytes,
    );

    for chunk in 0..plan.scan_count {
        let mut mask = compare_at(view, predicate, plan, plan.chunk_base(chunk));
        if let Some(sparse) = sparse {
            mask = mask | sparse;
        }
        if let Some(valid) = plan.lane_mask(chunk) {
            mask = mask & valid;
        }

        if mask.is_all_true() {
            encoder.encode_range(VECTOR_SIZE);
        } else if mask.is_all_false() {
            encoder.finalize(VECTOR_SIZE);
        } else {
            for lane in (0..VECTOR_SIZE).step_by(step) {
                if mask.lane(lane) {
                    encoder.encode_range(step);
                } else {
                    encoder.finalize(step);
                }
            }
        }
    }

    encoder.into_regions()
}

/// Staggered scan: one compare per alignment offset inside an element,
/// folded into one bitmap per element-sized group of the chunk
fn scan_staggered<P: LanePredicate + ?Sized>(
    view: &RegionView<'_>,
    predicate: &P,
    plan: &ScanPlan,
) -> Vec<SnapshotRegion> {
    let size = plan.element_size;
    let step = plan.alignment;
    let offsets = size / step;
    let groups = VECTOR_SIZE / size;
    let full = ((1u16 << offsets) - 1) as u8;

    let mut encoder =
        RunLengthEncoder::new(view, plan.read_start, step, size, RunUnit::ElementSlots);
    let mut storage = [0u8; VECTOR_SIZE];

    for chunk in 0..plan.scan_count {
        let base = plan.chunk_base(chunk);
        let bitmap = &mut storage[..groups];
        bitmap.fill(0);

        for (j, bit) in BIT_POSITIONS.iter().enumerate().take(offsets) {
            let mask = compare_at(view, predicate, plan, base + j * step);
            for (g, bits) in bitmap.iter_mut().enumerate() {
                if mask.lane(g * size) {
                    *bits |= bit;
                }
            }
        }

        if chunk == 0 || plan.is_last(chunk) {
            for (g, bits) in bitmap.iter_mut().enumerate() {
                for (j, bit) in BIT_POSITIONS.iter().enumerate().take(offsets) {
                    if !plan.slot_valid(chunk, g * size + j * step) {
                        *bits &= !bit;
                    }
                }
            }
        }

        if bitmap.iter().all(|&bits| bits == full) {
            encoder.encode_range(VECTOR_SIZE);
        } else if bitmap.iter().all(|&bits| bits == 0) {
            encoder.finalize(VECTOR_SIZE);
        } else {
            for &bits in bitmap.iter() {
                for bit in BIT_POSITIONS.iter().take(offsets) {
                    if bits & bit != 0 {
                        encoder.encode_range(step);
                    } else {
                        encoder.finalize(step);
                    }
                }
            }
        }
    }

    encoder.into_regions()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{
        Address, Constraint, ConstraintKind, DataType, MemoryValue, ValueType,
    };
    use crate::memory::scanner::{ScalarComparer, ScanPredicate};
    use crate::memory::snapshot::ReadGroup;
    use pretty_assertions::assert_eq;

    fn predicate(constraint: Constraint, value_type: ValueType) -> ScanPredicate {
        ScanPredicate::compile(&constraint, DataType::new(value_type)).unwrap()
    }

    #[test]
    fn test_variant_selection() {
        assert_eq!(ScanVariant::select(4, 4), ScanVariant::Dense);
        assert_eq!(ScanVariant::select(2, 1), ScanVariant::Sparse);
        assert_eq!(ScanVariant::select(1, 4), ScanVariant::Staggered);
    }

    #[test]
    fn test_rejects_unsupported_alignment() {
        let group = ReadGroup::new(Address::new(0), 32);
        let view = RegionView::whole(0, &group);
        let p = predicate(Constraint::leaf(ConstraintKind::Changed), ValueType::U8);
        assert!(matches!(
            VectorScanner::scan_region(&view, &p, 3),
            Err(MemoryError::InvalidAlignment(3))
        ));
    }

    #[test]
    fn test_plan_masks() {
        let group = ReadGroup::new(Address::new(0), 64);
        let view = RegionView::new(0, &group, 5, 20).unwrap();
        let plan = ScanPlan::new(&view, 1, 1).unwrap();

        assert_eq!(plan.read_start, 0);
        assert_eq!(plan.misalignment, 5);
        assert_eq!(plan.last_position, 24);
        assert_eq!(plan.scan_count, 2);
        assert_eq!(plan.lane_mask(0), Some(LaneMask::leading_false(5)));
        assert_eq!(plan.lane_mask(1), Some(LaneMask::leading_true(9)));
    }

    #[test]
    fn test_dense_increased_scenario() {
        let group = ReadGroup::from_values(
            Address::new(0x1000),
            vec![5, 5, 5, 9, 9, 2, 2, 2],
            vec![5; 8],
        )
        .unwrap();
        let view = RegionView::whole(0, &group);
        let p = predicate(Constraint::leaf(ConstraintKind::Increased), ValueType::U8);

        let regions = VectorScanner::scan_region(&view, &p, 1).unwrap();
        assert_eq!(regions, vec![SnapshotRegion::new(0, 3, 2)]);
    }

    #[test]
    fn test_overread_bytes_never_match() {
        // Bytes past the region equal the scan value but must not be reported
        let group = ReadGroup::from_values(Address::new(0), vec![7; 40], vec![0; 40]).unwrap();
        let view = RegionView::new(0, &group, 3, 21).unwrap();
        let p = predicate(
            Constraint::with_value(ConstraintKind::Equal, MemoryValue::U8(7)),
            ValueType::U8,
        );

        let regions = VectorScanner::scan_region(&view, &p, 1).unwrap();
        assert_eq!(regions, vec![SnapshotRegion::new(0, 3, 21)]);
    }

    #[test]
    fn test_sparse_matches_scalar() {
        let current: Vec<u8> = (0..50u8).map(|i| if i % 3 == 0 { 1 } else { 0 }).collect();
        let group = ReadGroup::from_values(Address::new(0), current, vec![0; 50]).unwrap();
        let view = RegionView::new(0, &group, 2, 45).unwrap();
        let p = predicate(
            Constraint::with_value(ConstraintKind::Equal, MemoryValue::U8(1)),
            ValueType::U8,
        );

        assert_eq!(
            VectorScanner::scan_region(&view, &p, 2).unwrap(),
            ScalarComparer::scan_region(&view, &p, 2)
        );
    }

    #[test]
    fn test_staggered_matches_scalar() {
        let mut current = vec![0u8; 48];
        current[5..9].copy_from_slice(&100u32.to_le_bytes());
        current[21..25].copy_from_slice(&100u32.to_le_bytes());
        current[40..44].copy_from_slice(&100u32.to_le_bytes());
        let group = ReadGroup::from_values(Address::new(0), current, vec![0; 48]).unwrap();
        let view = RegionView::new(0, &group, 1, 45).unwrap();
        let p = predicate(
            Constraint::with_value(ConstraintKind::Equal, MemoryValue::U32(100)),
            ValueType::U32,
        );

        let regions = VectorScanner::scan_region(&view, &p, 1).unwrap();
        assert_eq!(
            regions,
            vec![
                SnapshotRegion::new(0, 5, 4),
                SnapshotRegion::new(0, 21, 4),
                SnapshotRegion::new(0, 40, 4),
            ]
        );
        assert_eq!(regions, ScalarComparer::scan_region(&view, &p, 1));
    }

    #[test]
    fn test_region_smaller_than_element() {
        let group = ReadGroup::new(Address::new(0), 3);
        let view = RegionView::whole(0, &group);
        let p = predicate(Constraint::leaf(ConstraintKind::Unchanged), ValueType::U32);
        assert!(VectorScanner::scan_region(&view, &p, 4).unwrap().is_empty());
    }
}
