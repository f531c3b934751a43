//! Memory-Scan: constraint scanning over snapshots of process memory
//!
//! A [`Snapshot`](memory::Snapshot) holds byte buffers read from a target
//! process. [`ManualScanner`](memory::ManualScanner) narrows it to the
//! regions whose values satisfy a [`Constraint`] tree, and
//! [`ValueCollector`](memory::ValueCollector) refreshes its buffers between
//! passes.

pub mod config;
pub mod core;
pub mod memory;

// Re-export main types from core module
pub use core::types::{
    Address, ByteOrder, Constraint, ConstraintKind, DataType, LogicalOp, MemoryAlignment,
    MemoryError, MemoryResult, MemoryValue, ScanConstraint, ValueType,
};

// Re-export the scanning surface
pub use memory::{
    CancellationToken, CollectOutcome, ManualScanner, ProcessMemory, ReadGroup, ScanOutcome,
    Snapshot, SnapshotRegion, StaticMemory, TaskState, ValueCollector,
};
