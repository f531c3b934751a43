//! Element-at-a-time comparison
//!
//! Used for regions smaller than one vector chunk, and as the reference the
//! vector scanner is checked against.

use super::encoder::{RunLengthEncoder, RunUnit};
use super::predicate::LanePredicate;
use crate::core::types::Label;
use crate::memory::snapshot::{RegionView, SnapshotRegion};

/// Which cursors advance on [`ScalarComparer::increment`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerIncrementMode {
    AllPointers,
    ValuesOnly,
    /// Walks labels alone; scans always read current values, so
    /// [`for_scan`](Self::for_scan) never picks it
    LabelsOnly,
    CurrentOnly,
    NoPrevious,
}

impl PointerIncrementMode {
    /// Picks the cheapest mode that still tracks what a scan needs
    pub fn for_scan(requires_previous: bool, has_labels: bool) -> Self {
        match (requires_previous, has_labels) {
            (true, true) => PointerIncrementMode::AllPointers,
            (true, false) => PointerIncrementMode::ValuesOnly,
            (false, true) => PointerIncrementMode::NoPrevious,
            (false, false) => PointerIncrementMode::CurrentOnly,
        }
    }

    fn moves_current(self) -> bool {
        !matches!(self, PointerIncrementMode::LabelsOnly)
    }

    fn moves_previous(self) -> bool {
        matches!(
            self,
            PointerIncrementMode::AllPointers | PointerIncrementMode::ValuesOnly
        )
    }

    fn moves_labels(self) -> bool {
        matches!(
            self,
            PointerIncrementMode::AllPointers
                | PointerIncrementMode::LabelsOnly
                | PointerIncrementMode::NoPrevious
        )
    }
}

/// Cursors over the current, previous and label arrays of one buffer
#[derive(Debug, Clone)]
pub struct ScalarComparer<'a> {
    current: &'a [u8],
    previous: &'a [u8],
    labels: Option<&'a [Label]>,
    current_index: usize,
    previous_index: usize,
    label_index: usize,
    mode: PointerIncrementMode,
}

impl<'a> ScalarComparer<'a> {
    /// Positions all cursors at the start of `view`
    pub fn new(view: &RegionView<'a>, mode: PointerIncrementMode) -> Self {
        ScalarComparer {
            current: view.buffer_current(),
            previous: view.buffer_previous(),
            labels: view.buffer_labels(),
            current_index: view.offset(),
            previous_index: view.offset(),
            label_index: view.offset(),
            mode,
        }
    }

    pub fn mode(&self) -> PointerIncrementMode {
        self.mode
    }

    /// Advances the cursors selected by the increment mode
    #[inline]
    pub fn increment(&mut self, step: usize) {
        if self.mode.moves_current() {
            self.current_index += step;
        }
        if self.mode.moves_previous() {
            self.previous_index += step;
        }
        if self.mode.moves_labels() {
            self.label_index += step;
        }
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn previous_index(&self) -> usize {
        self.previous_index
    }

    pub fn current_value(&self, size: usize) -> Option<&'a [u8]> {
        self.current.get(self.current_index..self.current_index.checked_add(size)?)
    }

    pub fn previous_value(&self, size: usize) -> Option<&'a [u8]> {
        self.previous
            .get(self.previous_index..self.previous_index.checked_add(size)?)
    }

    pub fn label(&self) -> Option<Label> {
        self.labels?.get(self.label_index).copied()
    }

    /// Evaluates `predicate` on the element under the cursors. An element
    /// running past the end of the buffer never matches.
    #[inline]
    pub fn compare<P: LanePredicate + ?Sized>(&self, predicate: &P) -> bool {
        let size = predicate.element_size();
        let Some(current) = self.current_value(size) else {
            return false;
        };
        if predicate.requires_previous() {
            match self.previous_value(size) {
                Some(previous) => predicate.matches(current, previous),
                None => false,
            }
        } else {
            predicate.matches(current, current)
        }
    }

    /// Scans every element of `view`, returning the matching sub-regions
    pub fn scan_region<P: LanePredicate + ?Sized>(
        view: &RegionView<'a>,
        predicate: &P,
        alignment: usize,
    ) -> Vec<SnapshotRegion> {
        let alignment = alignment.max(1);
        let size = predicate.element_size();
        let mode = PointerIncrementMode::for_scan(
            predicate.requires_previous(),
            view.buffer_labels().is_some(),
        );

        let mut comparer = ScalarComparer::new(view, mode);
        let mut encoder =
            RunLengthEncoder::new(view, view.offset(), alignment, size, RunUnit::ElementSlots);

        for _ in 0..view.element_count(alignment, size) {
            if comparer.compare(predicate) {
                encoder.encode_range(alignment);
            } else {
                encoder.finalize(alignment);
            }
            comparer.increment(alignment);
        }

        encoder.into_regions()
    }
}
