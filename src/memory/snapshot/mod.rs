//! Snapshots of target memory
//!
//! A [`Snapshot`] owns a set of [`ReadGroup`] buffers (shared by reference
//! count with the snapshots derived from it) and an unordered set of
//! [`SnapshotRegion`] windows into those buffers. Scans consume one snapshot
//! and produce a narrower one over the same buffers.

mod read_group;
mod region;

pub use read_group::ReadGroup;
pub use region::{element_count, RegionView, SnapshotRegion};

use crate::core::types::{Address, DataType, Label, MemoryError, MemoryResult, MemoryValue};
use crate::memory::scanner::{PointerIncrementMode, ScalarComparer};
use std::sync::Arc;

/// One element of a snapshot, resolved for display
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotElement {
    pub address: Address,
    pub current: Option<MemoryValue>,
    pub previous: Option<MemoryValue>,
    pub label: Option<Label>,
}

/// A named collection of regions over shared read groups
#[derive(Debug, Clone)]
pub struct Snapshot {
    name: String,
    read_groups: Vec<Arc<ReadGroup>>,
    regions: Vec<SnapshotRegion>,
    alignment: usize,
    element_size: usize,
    element_count: u64,
    byte_count: u64,
}

impl Snapshot {
    /// Creates a snapshot with one region spanning each read group
    pub fn new(name: impl Into<String>, read_groups: Vec<ReadGroup>) -> Self {
        let regions = read_groups
            .iter()
            .enumerate()
            .filter(|(_, group)| !group.is_empty())
            .map(|(index, group)| SnapshotRegion::new(index, 0, group.len()))
            .collect();

        let mut snapshot = Snapshot {
            name: name.into(),
            read_groups: read_groups.into_iter().map(Arc::new).collect(),
            regions,
            alignment: 1,
            element_size: 1,
            element_count: 0,
            byte_count: 0,
        };
        snapshot.compute_element_count(1, 1);
        snapshot
    }

    /// Creates a zero-filled snapshot from `{base_address, size}` pairs
    /// supplied by region discovery
    pub fn from_address_ranges<I>(name: impl Into<String>, ranges: I) -> Self
    where
        I: IntoIterator<Item = (Address, usize)>,
    {
        let groups = ranges
            .into_iter()
            .map(|(base, size)| ReadGroup::new(base, size))
            .collect();
        Snapshot::new(name, groups)
    }

    /// A snapshot over the same read groups with a different region set
    pub fn with_regions(&self, name: impl Into<String>, regions: Vec<SnapshotRegion>) -> Self {
        let mut snapshot = Snapshot {
            name: name.into(),
            read_groups: self.read_groups.clone(),
            regions,
            alignment: self.alignment,
            element_size: self.element_size,
            element_count: 0,
            byte_count: 0,
        };
        snapshot.compute_element_count(self.alignment, self.element_size);
        snapshot
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn read_groups(&self) -> &[Arc<ReadGroup>] {
        &self.read_groups
    }

    pub(crate) fn read_groups_mut(&mut self) -> &mut [Arc<ReadGroup>] {
        &mut self.read_groups
    }

    pub fn regions(&self) -> &[SnapshotRegion] {
        &self.regions
    }

    pub fn region_count(&self) -> usize {
        self.regions.len()
    }

    pub fn byte_count(&self) -> u64 {
        self.byte_count
    }

    pub fn element_count(&self) -> u64 {
        self.element_count
    }

    pub fn alignment(&self) -> usize {
        self.alignment
    }

    pub fn element_size(&self) -> usize {
        self.element_size
    }

    /// Resolves a region against its read group
    pub fn view(&self, region: &SnapshotRegion) -> MemoryResult<RegionView<'_>> {
        let group = self
            .read_groups
            .get(region.read_group)
            .ok_or_else(|| MemoryError::invalid_region(region.offset, region.length, 0))?;
        RegionView::new(region.read_group, group, region.offset, region.length)
    }

    /// Region indices ordered largest first
    pub fn regions_by_size_desc(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.regions.len()).collect();
        order.sort_by(|&a, &b| self.regions[b].length.cmp(&self.regions[a].length));
        order
    }

    /// Returns a snapshot whose regions start on `alignment` boundaries in
    /// absolute address space and can each hold at least one element
    pub fn aligned(&self, alignment: usize, element_size: usize) -> Snapshot {
        let alignment = alignment.max(1);
        let regions = self
            .regions
            .iter()
            .filter_map(|region| {
                let base = self.read_groups.get(region.read_group)?.base_address();
                let start = base.add(region.offset as u64);
                let skip = (start.align_up(alignment as u64).as_u64() - start.as_u64()) as usize;
                let length = region.length.checked_sub(skip)?;
                (length >= element_size)
                    .then(|| SnapshotRegion::new(region.read_group, region.offset + skip, length))
            })
            .collect();

        let mut snapshot = Snapshot {
            name: self.name.clone(),
            read_groups: self.read_groups.clone(),
            regions,
            alignment,
            element_size,
            element_count: 0,
            byte_count: 0,
        };
        snapshot.compute_element_count(alignment, element_size);
        snapshot
    }

    /// Recomputes byte and element counts and assigns each region the
    /// global index of its first element
    pub fn compute_element_count(&mut self, alignment: usize, element_size: usize) {
        self.alignment = alignment.max(1);
        self.element_size = element_size.max(1);

        let mut elements = 0u64;
        let mut bytes = 0u64;
        for region in &mut self.regions {
            region.base_element_index = elements;
            elements += element_count(region.length, self.alignment, self.element_size) as u64;
            bytes += region.length as u64;
        }

        self.element_count = elements;
        self.byte_count = bytes;
    }

    /// Orders regions by read group then offset
    pub fn sort_regions(&mut self) {
        self.regions.sort_by_key(|r| (r.read_group, r.offset));
        self.compute_element_count(self.alignment, self.element_size);
    }

    /// Keeps only regions matching `keep`, then recomputes counts
    pub fn retain_regions<F>(&mut self, keep: F)
    where
        F: FnMut(&SnapshotRegion) -> bool,
    {
        self.regions.retain(keep);
        self.compute_element_count(self.alignment, self.element_size);
    }

    /// Resolves the element at a global element index
    pub fn element_at(&self, index: u64, data_type: DataType) -> Option<SnapshotElement> {
        let position = self
            .regions
            .partition_point(|r| r.base_element_index <= index)
            .checked_sub(1)?;
        let region = &self.regions[position];

        let local = (index - region.base_element_index) as usize;
        if local >= element_count(region.length, self.alignment, self.element_size) {
            return None;
        }

        let view = self.view(region).ok()?;
        let size = data_type.size().ok()?;
        let mut cursor = ScalarComparer::new(&view, PointerIncrementMode::AllPointers);
        cursor.increment(local * self.alignment);

        let decode = |bytes: Option<&[u8]>| {
            bytes.and_then(|b| {
                MemoryValue::from_bytes(b, data_type.value_type, data_type.byte_order)
            })
        };

        Some(SnapshotElement {
            address: view
                .base_element_address()
                .add((local * self.alignment) as u64),
            current: decode(cursor.current_value(size)),
            previous: decode(cursor.previous_value(size)),
            label: cursor.label(),
        })
    }
}
