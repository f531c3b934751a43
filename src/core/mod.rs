//! Core module containing fundamental types for Memory-Scan
//!
//! This module provides the foundational building blocks used throughout
//! the scanner, including address handling, memory values, data types,
//! constraint trees and error types.

pub mod types;

// Re-export commonly used types for convenience
pub use types::{
    Address, ByteOrder, Constraint, ConstraintKind, DataType, MemoryAlignment, MemoryError,
    MemoryResult, MemoryValue, ValueType,
};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const AUTHORS: &str = env!("CARGO_PKG_AUTHORS");
