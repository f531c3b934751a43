//! Shared helpers for integration tests

#![allow(dead_code)]

use memory_scan::memory::snapshot::{element_count, RegionView, SnapshotRegion};
use memory_scan::memory::scanner::LanePredicate;
use std::collections::BTreeSet;

/// Buffer offsets of every element start covered by `regions`
pub fn element_starts(
    regions: &[SnapshotRegion],
    alignment: usize,
    element_size: usize,
) -> BTreeSet<usize> {
    regions
        .iter()
        .flat_map(|region| {
            (0..element_count(region.length, alignment, element_size))
                .map(move |i| region.offset + i * alignment)
        })
        .collect()
}

/// Element starts of `view` matching `predicate`, evaluated one at a time
pub fn brute_force<P: LanePredicate + ?Sized>(
    view: &RegionView<'_>,
    predicate: &P,
    alignment: usize,
) -> BTreeSet<usize> {
    let size = predicate.element_size();
    let current = view.buffer_current();
    let previous = view.buffer_previous();
    (0..view.element_count(alignment, size))
        .map(|i| view.offset() + i * alignment)
        .filter(|&start| predicate.matches(&current[start..], &previous[start..]))
        .collect()
}

/// Current and previous buffers from `(value, changed)` pairs
pub fn buffers(bytes: &[(u8, bool)]) -> (Vec<u8>, Vec<u8>) {
    let current = bytes.iter().map(|&(value, _)| value).collect();
    let previous = bytes
        .iter()
        .map(|&(value, changed)| if changed { value ^ 1 } else { value })
        .collect();
    (current, previous)
}
