//! Memory snapshots, scanning and value collection
//!
//! - [`snapshot`]: read groups, regions and snapshots
//! - [`scanner`]: predicate compilation and region scanning
//! - [`collector`]: refreshing snapshot buffers from live memory
//! - [`reader`]: the boundary to whatever supplies target memory

pub mod collector;
pub mod reader;
pub mod scanner;
pub mod snapshot;

pub use collector::{CollectOutcome, ValueCollector};
pub use reader::{ProcessMemory, StaticMemory};
pub use scanner::{
    CancellationToken, LanePredicate, ManualScanner, ScanOutcome, ScanPredicate, ScanVariant,
    TaskRegistry, TaskState,
};
pub use snapshot::{ReadGroup, RegionView, Snapshot, SnapshotElement, SnapshotRegion};
