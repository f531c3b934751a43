//! Error types for the scanning core

use std::fmt;
use thiserror::Error;

/// Main error type for scanning and collection operations
#[derive(Error, Debug)]
pub enum MemoryError {
    #[error("Unsupported type: {0}")]
    UnsupportedType(String),

    #[error("Malformed constraint: {0}")]
    MalformedConstraint(String),

    #[error("Task already running: {0}")]
    TaskConflict(String),

    #[error("Region at {address} failed: {reason}")]
    RegionFailure { address: String, reason: String },

    #[error("Region [{offset}, +{length}) exceeds buffer of {buffer_len} bytes")]
    InvalidRegion {
        offset: usize,
        length: usize,
        buffer_len: usize,
    },

    #[error("Failed to read memory at {address}: {reason}")]
    ReadFailed { address: String, reason: String },

    #[error("Invalid memory address: {0}")]
    InvalidAddress(String),

    #[error("Invalid scan value: {0}")]
    InvalidValue(String),

    #[error("Invalid alignment: {0}")]
    InvalidAlignment(usize),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

/// Result type alias for scanning operations
pub type MemoryResult<T> = Result<T, MemoryError>;

impl MemoryError {
    /// Creates a read failed error
    pub fn read_failed(address: impl fmt::Display, reason: impl Into<String>) -> Self {
        MemoryError::ReadFailed {
            address: address.to_string(),
            reason: reason.into(),
        }
    }

    /// Creates a region failure error
    pub fn region_failure(address: impl fmt::Display, reason: impl Into<String>) -> Self {
        MemoryError::RegionFailure {
            address: address.to_string(),
            reason: reason.into(),
        }
    }

    /// Creates an out-of-bounds region error
    pub fn invalid_region(offset: usize, length: usize, buffer_len: usize) -> Self {
        MemoryError::InvalidRegion {
            offset,
            length,
            buffer_len,
        }
    }

    /// Whether this error is raised while compiling a scan, before any work starts
    pub fn is_compile_error(&self) -> bool {
        matches!(
            self,
            MemoryError::UnsupportedType(_) | MemoryError::MalformedConstraint(_)
        )
    }
}
