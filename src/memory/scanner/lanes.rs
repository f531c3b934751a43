//! Fixed-width lane vectors used by the vector scanner
//!
//! A [`LaneMask`] holds one byte per lane of a [`VECTOR_SIZE`]-byte chunk,
//! `0xFF` for true and `0x00` for false, the same encoding a hardware vector
//! compare produces. The operations are written as straight loops over
//! fixed-size arrays so they lower to vector instructions.

use std::fmt;
use std::ops::{BitAnd, BitOr, BitXor, Not};

/// Width in bytes of one scanned chunk
pub const VECTOR_SIZE: usize = 16;

/// One chunk of raw memory
pub type Chunk = [u8; VECTOR_SIZE];

const TRUE_LANE: u8 = 0xFF;

/// Per-byte boolean results for one chunk
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct LaneMask([u8; VECTOR_SIZE]);

impl LaneMask {
    pub const ALL_TRUE: LaneMask = LaneMask([TRUE_LANE; VECTOR_SIZE]);
    pub const ALL_FALSE: LaneMask = LaneMask([0; VECTOR_SIZE]);

    /// Builds a mask from a per-lane predicate
    pub fn from_fn<F: FnMut(usize) -> bool>(mut f: F) -> Self {
        let mut lanes = [0u8; VECTOR_SIZE];
        for (i, lane) in lanes.iter_mut().enumerate() {
            *lane = if f(i) { TRUE_LANE } else { 0 };
        }
        LaneMask(lanes)
    }

    /// Wraps raw lane bytes; any non-zero byte reads as true
    pub fn from_bytes(lanes: [u8; VECTOR_SIZE]) -> Self {
        LaneMask(lanes)
    }

    pub fn as_bytes(&self) -> &[u8; VECTOR_SIZE] {
        &self.0
    }

    /// Mask with lanes `[0, count)` false and the rest true
    pub fn leading_false(count: usize) -> Self {
        LaneMask::from_fn(|i| i >= count)
    }

    /// Mask with lanes `[0, count)` true and the rest false
    pub fn leading_true(count: usize) -> Self {
        LaneMask::from_fn(|i| i < count)
    }

    /// Don't-care pattern for sparse scans: lanes that are not part of an
    /// element starting on an `alignment` boundary are true
    pub fn sparse(alignment: usize, element_size: usize) -> Self {
        LaneMask::from_fn(|i| i % alignment >= element_size)
    }

    pub fn lane(&self, index: usize) -> bool {
        self.0[index] != 0
    }

    pub fn is_all_true(&self) -> bool {
        self.0.iter().all(|&lane| lane != 0)
    }

    pub fn is_all_false(&self) -> bool {
        self.0.iter().all(|&lane| lane == 0)
    }

    pub fn count_true(&self) -> usize {
        self.0.iter().filter(|&&lane| lane != 0).count()
    }
}

impl Default for LaneMask {
    fn default() -> Self {
        LaneMask::ALL_FALSE
    }
}

impl BitAnd for LaneMask {
    type Output = LaneMask;

    fn bitand(self, rhs: LaneMask) -> LaneMask {
        let mut out = self.0;
        for (lane, other) in out.iter_mut().zip(rhs.0) {
            *lane &= other;
        }
        LaneMask(out)
    }
}

impl BitOr for LaneMask {
    type Output = LaneMask;

    fn bitor(self, rhs: LaneMask) -> LaneMask {
        let mut out = self.0;
        for (lane, other) in out.iter_mut().zip(rhs.0) {
            *lane |= other;
        }
        LaneMask(out)
    }
}

impl BitXor for LaneMask {
    type Output = LaneMask;

    fn bitxor(self, rhs: LaneMask) -> LaneMask {
        let mut out = self.0;
        for (lane, other) in out.iter_mut().zip(rhs.0) {
            *lane ^= other;
        }
        LaneMask(out)
    }
}

impl Not for LaneMask {
    type Output = LaneMask;

    fn not(self) -> LaneMask {
        let mut out = self.0;
        for lane in out.iter_mut() {
            *lane = !*lane;
        }
        LaneMask(out)
    }
}

impl fmt::Debug for LaneMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LaneMask<")?;
        for lane in &self.0 {
            f.write_str(if *lane != 0 { "1" } else { "0" })?;
        }
        write!(f, ">")
    }
}

/// Copies the chunk starting at `start`, zero-filling past the end of `bytes`
#[inline]
pub fn load_chunk(bytes: &[u8], start: usize) -> Chunk {
    let mut chunk = [0u8; VECTOR_SIZE];
    if let Some(available) = bytes.get(start..) {
        let count = available.len().min(VECTOR_SIZE);
        chunk[..count].copy_from_slice(&available[..count]);
    }
    chunk
}
