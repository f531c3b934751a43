//! Region descriptors and borrowed windows into read groups

use super::read_group::ReadGroup;
use crate::core::types::{Address, Label, MemoryError, MemoryResult};

/// Number of whole elements of `element_size` bytes, spaced `alignment`
/// bytes apart, that fit in `length` bytes
pub fn element_count(length: usize, alignment: usize, element_size: usize) -> usize {
    if alignment == 0 || element_size == 0 || length < element_size {
        return 0;
    }
    (length - element_size) / alignment + 1
}

/// An offset/length window into one of a snapshot's read groups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SnapshotRegion {
    /// Index of the owning read group within its snapshot
    pub read_group: usize,
    pub offset: usize,
    pub length: usize,
    /// Global index of the region's first element, assigned per scan pass
    pub base_element_index: u64,
}

impl SnapshotRegion {
    pub fn new(read_group: usize, offset: usize, length: usize) -> Self {
        SnapshotRegion {
            read_group,
            offset,
            length,
            base_element_index: 0,
        }
    }

    /// Buffer offset one past the region's last byte
    pub fn end_offset(&self) -> usize {
        self.offset + self.length
    }
}

/// A validated, borrowed view of a region and the buffer it lives in
#[derive(Debug, Clone, Copy)]
pub struct RegionView<'a> {
    read_group_index: usize,
    read_group: &'a ReadGroup,
    offset: usize,
    length: usize,
}

impl<'a> RegionView<'a> {
    /// Creates a view, checking `offset + length` stays inside the buffer
    pub fn new(
        read_group_index: usize,
        read_group: &'a ReadGroup,
        offset: usize,
        length: usize,
    ) -> MemoryResult<Self> {
        let end = offset
            .checked_add(length)
            .ok_or_else(|| MemoryError::invalid_region(offset, length, read_group.len()))?;
        if end > read_group.len() {
            return Err(MemoryError::invalid_region(offset, length, read_group.len()));
        }

        Ok(RegionView {
            read_group_index,
            read_group,
            offset,
            length,
        })
    }

    /// Views an entire read group
    pub fn whole(read_group_index: usize, read_group: &'a ReadGroup) -> Self {
        RegionView {
            read_group_index,
            read_group,
            offset: 0,
            length: read_group.len(),
        }
    }

    pub fn read_group_index(&self) -> usize {
        self.read_group_index
    }

    pub fn read_group(&self) -> &'a ReadGroup {
        self.read_group
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn length(&self) -> usize {
        self.length
    }

    pub fn end_offset(&self) -> usize {
        self.offset + self.length
    }

    pub fn buffer_len(&self) -> usize {
        self.read_group.len()
    }

    pub fn base_element_address(&self) -> Address {
        self.read_group.base_address().add(self.offset as u64)
    }

    pub fn end_address(&self) -> Address {
        self.base_element_address().add(self.length as u64)
    }

    /// Current values of the whole underlying buffer
    pub fn buffer_current(&self) -> &'a [u8] {
        self.read_group.current_values()
    }

    /// Previous values of the whole underlying buffer
    pub fn buffer_previous(&self) -> &'a [u8] {
        self.read_group.previous_values()
    }

    pub fn buffer_labels(&self) -> Option<&'a [Label]> {
        self.read_group.labels()
    }

    /// Current values covered by the region
    pub fn current_values(&self) -> &'a [u8] {
        &self.read_group.current_values()[self.offset..self.end_offset()]
    }

    /// Previous values covered by the region
    pub fn previous_values(&self) -> &'a [u8] {
        &self.read_group.previous_values()[self.offset..self.end_offset()]
    }

    pub fn element_count(&self, alignment: usize, element_size: usize) -> usize {
        element_count(self.length, alignment, element_size)
    }

    /// A descriptor for this view
    pub fn to_region(&self) -> SnapshotRegion {
        SnapshotRegion::new(self.read_group_index, self.offset, self.length)
    }
}
