//! Owned current/previous byte buffers for one contiguous memory range

use crate::core::types::{Address, Label, MemoryError, MemoryResult};
use crate::memory::reader::ProcessMemory;

/// A contiguous range of target memory with its current and previous values.
///
/// Both buffers always have the same length. Labels, when present, hold one
/// tag per byte offset.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadGroup {
    base_address: Address,
    current_values: Vec<u8>,
    previous_values: Vec<u8>,
    labels: Option<Vec<Label>>,
}

impl ReadGroup {
    /// Creates a zero-filled read group of `size` bytes
    pub fn new(base_address: Address, size: usize) -> Self {
        ReadGroup {
            base_address,
            current_values: vec![0; size],
            previous_values: vec![0; size],
            labels: None,
        }
    }

    /// Creates a read group from already captured values
    pub fn from_values(
        base_address: Address,
        current_values: Vec<u8>,
        previous_values: Vec<u8>,
    ) -> MemoryResult<Self> {
        if current_values.len() != previous_values.len() {
            return Err(MemoryError::invalid_region(
                0,
                previous_values.len(),
                current_values.len(),
            ));
        }

        Ok(ReadGroup {
            base_address,
            current_values,
            previous_values,
            labels: None,
        })
    }

    /// Attaches one label per byte
    pub fn with_labels(mut self, labels: Vec<Label>) -> MemoryResult<Self> {
        if labels.len() != self.len() {
            return Err(MemoryError::invalid_region(0, labels.len(), self.len()));
        }
        self.labels = Some(labels);
        Ok(self)
    }

    pub fn base_address(&self) -> Address {
        self.base_address
    }

    /// First address past the end of the buffer
    pub fn end_address(&self) -> Address {
        self.base_address.add(self.len() as u64)
    }

    pub fn len(&self) -> usize {
        self.current_values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.current_values.is_empty()
    }

    pub fn current_values(&self) -> &[u8] {
        &self.current_values
    }

    pub fn previous_values(&self) -> &[u8] {
        &self.previous_values
    }

    pub fn labels(&self) -> Option<&[Label]> {
        self.labels.as_deref()
    }

    /// Replaces the current values, keeping previous values untouched
    pub fn set_current_values(&mut self, values: Vec<u8>) -> MemoryResult<()> {
        if values.len() != self.len() {
            return Err(MemoryError::invalid_region(0, values.len(), self.len()));
        }
        self.current_values = values;
        Ok(())
    }

    /// Moves the current values into the previous buffer and reads fresh
    /// current values from `reader`.
    ///
    /// Values are read into a scratch buffer first, so a failed or short
    /// read leaves both buffers as they were.
    pub fn refresh<R: ProcessMemory + ?Sized>(&mut self, reader: &R) -> MemoryResult<()> {
        let mut fresh = vec![0u8; self.len()];
        let read = reader.read_memory(self.base_address, &mut fresh)?;
        if read != fresh.len() {
            return Err(MemoryError::read_failed(
                self.base_address,
                format!("partial read: {} of {} bytes", read, fresh.len()),
            ));
        }

        self.previous_values = std::mem::replace(&mut self.current_values, fresh);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::reader::StaticMemory;

    #[test]
    fn test_from_values_rejects_mismatched_lengths() {
        let result = ReadGroup::from_values(Address::new(0x1000), vec![1, 2, 3], vec![1, 2]);
        assert!(matches!(result, Err(MemoryError::InvalidRegion { .. })));
    }

    #[test]
    fn test_addresses() {
        let group = ReadGroup::new(Address::new(0x1000), 0x20);
        assert_eq!(group.end_address(), Address::new(0x1020));
        assert_eq!(group.len(), 0x20);
        assert!(group.labels().is_none());
    }

    #[test]
    fn test_refresh_moves_current_to_previous() {
        let mut memory = StaticMemory::new();
        memory.insert(Address::new(0x1000), vec![9, 8, 7, 6]);

        let mut group =
            ReadGroup::from_values(Address::new(0x1000), vec![1, 2, 3, 4], vec![0; 4]).unwrap();
        group.refresh(&memory).unwrap();

        assert_eq!(group.current_values(), &[9, 8, 7, 6]);
        assert_eq!(group.previous_values(), &[1, 2, 3, 4]);
    }

    #[test]
    fn test_failed_refresh_restores_buffers() {
        let memory = StaticMemory::new();
        let mut group =
            ReadGroup::from_values(Address::new(0x1000), vec![1, 2, 3, 4], vec![5, 6, 7, 8])
                .unwrap();

        assert!(group.refresh(&memory).is_err());
        assert_eq!(group.current_values(), &[1, 2, 3, 4]);
        assert_eq!(group.previous_values(), &[5, 6, 7, 8]);
    }

    #[test]
    fn test_short_read_is_a_failure() {
        let mut memory = StaticMemory::new();
        memory.insert(Address::new(0x1000), vec![0xAA, 0xBB]);

        let mut group =
            ReadGroup::from_values(Address::new(0x1000), vec![1, 2, 3, 4], vec![5, 6, 7, 8])
                .unwrap();
        let err = group.refresh(&memory).unwrap_err();
        assert!(err.to_string().contains("partial read"));
        assert_eq!(group.current_values(), &[1, 2, 3, 4]);
        assert_eq!(group.previous_values(), &[5, 6, 7, 8]);
    }

    #[test]
    fn test_labels_must_cover_buffer() {
        let group = ReadGroup::new(Address::new(0), 4);
        assert!(group.clone().with_labels(vec![1, 2, 3]).is_err());
        let labelled = group.with_labels(vec![1, 2, 3, 4]).unwrap();
        assert_eq!(labelled.labels(), Some(&[1u64, 2, 3, 4][..]));
    }
}
