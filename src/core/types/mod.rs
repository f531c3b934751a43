//! Core type definitions for Memory-Scan
//!
//! This module contains the fundamental types shared by the scanning engine:
//! addresses, typed values, data types, constraint trees and errors.

mod address;
mod constraint;
mod data_type;
mod error;
mod value;

// Re-export all public types
pub use address::{parse_address, Address};
pub use constraint::{Constraint, ConstraintKind, LogicalOp, ScanConstraint};
pub(crate) use constraint::missing_child;
pub use data_type::{ByteOrder, DataType, MemoryAlignment};
pub use error::{MemoryError, MemoryResult};
pub use value::{MemoryValue, ValueType};

/// Per-byte tag carried alongside a read group
pub type Label = u64;
