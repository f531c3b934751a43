//! Constraint scanning engine
//!
//! Bottom-up: [`element`] defines the numeric semantics of each leaf
//! predicate, [`predicate`] compiles constraint trees into scalar and
//! chunk-wide forms, [`encoder`] turns match streams into regions,
//! [`scalar`] and [`vector`] scan single regions, and [`manual`] runs a
//! full pass over a snapshot.

pub mod element;
pub mod encoder;
pub mod lanes;
pub mod manual;
pub mod predicate;
pub mod scalar;
pub mod task;
pub mod vector;

pub use element::{evaluate, ScanElement};
pub use encoder::{RunLengthEncoder, RunUnit};
pub use lanes::{load_chunk, Chunk, LaneMask, VECTOR_SIZE};
pub use manual::{scan_region, ManualScanner, ScanOutcome};
pub use predicate::{CompiledPredicate, LanePredicate, ScanPredicate};
pub use scalar::{PointerIncrementMode, ScalarComparer};
pub use task::{
    build_pool, CancellationToken, TaskGuard, TaskRegistry, TaskState, DEFAULT_TASK_HISTORY,
};
pub use vector::{ScanVariant, VectorScanner};
