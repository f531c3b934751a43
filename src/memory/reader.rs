//! Process memory reading boundary
//!
//! The scanning core never talks to the operating system directly. Anything
//! able to copy bytes out of a target address space implements
//! [`ProcessMemory`]; [`StaticMemory`] is an in-process implementation over a
//! fixed set of byte ranges, used for memory dumps and tests.

use crate::core::types::{Address, MemoryError, MemoryResult};
use std::collections::BTreeMap;

/// Reads bytes out of a target address space
pub trait ProcessMemory: Send + Sync {
    /// Fills `buffer` from `address`, returning the number of bytes copied.
    ///
    /// A short count means only a prefix of the range was readable.
    fn read_memory(&self, address: Address, buffer: &mut [u8]) -> MemoryResult<usize>;
}

impl<T: ProcessMemory + ?Sized> ProcessMemory for &T {
    fn read_memory(&self, address: Address, buffer: &mut [u8]) -> MemoryResult<usize> {
        (**self).read_memory(address, buffer)
    }
}

/// Address space made of non-overlapping byte ranges held in memory
#[derive(Debug, Clone, Default)]
pub struct StaticMemory {
    ranges: BTreeMap<u64, Vec<u8>>,
}

impl StaticMemory {
    pub fn new() -> Self {
        StaticMemory::default()
    }

    /// Maps `bytes` at `address`, replacing any range starting there
    pub fn insert(&mut self, address: Address, bytes: Vec<u8>) {
        self.ranges.insert(address.as_u64(), bytes);
    }

    /// Overwrites bytes inside an already mapped range
    pub fn write(&mut self, address: Address, bytes: &[u8]) -> MemoryResult<()> {
        let (start, range) = self
            .ranges
            .range_mut(..=address.as_u64())
            .next_back()
            .ok_or_else(|| MemoryError::InvalidAddress(address.to_string()))?;

        let offset = (address.as_u64() - start) as usize;
        let target = range
            .get_mut(offset..offset + bytes.len())
            .ok_or_else(|| MemoryError::InvalidAddress(address.to_string()))?;
        target.copy_from_slice(bytes);
        Ok(())
    }

    /// Mapped ranges as `{base_address, size}` pairs, for region discovery
    pub fn ranges(&self) -> impl Iterator<Item = (Address, usize)> + '_ {
        self.ranges
            .iter()
            .map(|(&base, bytes)| (Address::new(base), bytes.len()))
    }
}

impl ProcessMemory for StaticMemory {
    fn read_memory(&self, address: Address, buffer: &mut [u8]) -> MemoryResult<usize> {
        let (start, range) = self
            .ranges
            .range(..=address.as_u64())
            .next_back()
            .ok_or_else(|| MemoryError::read_failed(address, "address is not mapped"))?;

        let offset = (address.as_u64() - start) as usize;
        if offset >= range.len() {
            return Err(MemoryError::read_failed(address, "address is not mapped"));
        }

        let available = &range[offset..];
        let count = available.len().min(buffer.len());
        buffer[..count].copy_from_slice(&available[..count]);
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_inside_range() {
        let mut memory = StaticMemory::new();
        memory.insert(Address::new(0x1000), vec![1, 2, 3, 4, 5]);

        let mut buffer = [0u8; 3];
        assert_eq!(memory.read_memory(Address::new(0x1001), &mut buffer).unwrap(), 3);
        assert_eq!(buffer, [2, 3, 4]);
    }

    #[test]
    fn test_partial_read_at_range_end() {
        let mut memory = StaticMemory::new();
        memory.insert(Address::new(0x1000), vec![1, 2, 3, 4]);

        let mut buffer = [0u8; 4];
        assert_eq!(memory.read_memory(Address::new(0x1002), &mut buffer).unwrap(), 2);
        assert_eq!(&buffer[..2], &[3, 4]);
    }

    #[test]
    fn test_unmapped_read_fails() {
        let mut memory = StaticMemory::new();
        memory.insert(Address::new(0x1000), vec![0; 4]);

        let mut buffer = [0u8; 1];
        assert!(memory.read_memory(Address::new(0x0FFF), &mut buffer).is_err());
        assert!(memory.read_memory(Address::new(0x1004), &mut buffer).is_err());
    }

    #[test]
    fn test_write_and_ranges() {
        let mut memory = StaticMemory::new();
        memory.insert(Address::new(0x1000), vec![0; 4]);
        memory.write(Address::new(0x1002), &[7, 7]).unwrap();
        assert!(memory.write(Address::new(0x1003), &[1, 1]).is_err());

        let mut buffer = [0u8; 4];
        memory.read_memory(Address::new(0x1000), &mut buffer).unwrap();
        assert_eq!(buffer, [0, 0, 7, 7]);

        let ranges: Vec<_> = memory.ranges().collect();
        assert_eq!(ranges, vec![(Address::new(0x1000), 4)]);
    }
}
