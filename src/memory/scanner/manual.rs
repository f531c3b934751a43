//! One full scan pass over a snapshot
//!
//! [`ManualScanner`] compiles a constraint tree, aligns the snapshot for the
//! requested data type, scans every region (largest first, in parallel when
//! configured) and assembles the matching sub-regions into a new snapshot.
//! Each region is scanned in isolation: an error or panic in one region is
//! logged and counted without touching the others.

use super::lanes::VECTOR_SIZE;
use super::predicate::{LanePredicate, ScanPredicate};
use super::scalar::ScalarComparer;
use super::task::{build_pool, CancellationToken, TaskRegistry, TaskState};
use super::vector::VectorScanner;
use crate::config::ScannerConfig;
use crate::core::types::{Constraint, DataType, MemoryError, MemoryResult};
use crate::memory::snapshot::{Snapshot, SnapshotRegion};
use rayon::prelude::*;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Result of a scan pass
#[derive(Debug)]
pub struct ScanOutcome {
    pub task_id: String,
    pub state: TaskState,
    /// Matching regions; only present when the pass completed
    pub snapshot: Option<Snapshot>,
    /// Regions that could not be scanned and were left out of the result
    pub failed_regions: usize,
    pub elapsed: Duration,
}

enum RegionScan {
    Matched(Vec<SnapshotRegion>),
    Failed,
    Skipped,
}

/// Drives scan passes with an explicit configuration
pub struct ManualScanner {
    config: ScannerConfig,
    registry: TaskRegistry,
    pool: Option<rayon::ThreadPool>,
}

impl ManualScanner {
    pub fn new(config: ScannerConfig) -> MemoryResult<Self> {
        Self::with_registry(config, TaskRegistry::new())
    }

    /// Creates a scanner sharing task identifiers with other components
    pub fn with_registry(config: ScannerConfig, registry: TaskRegistry) -> MemoryResult<Self> {
        let pool = build_pool(&config)?;
        Ok(ManualScanner {
            config,
            registry,
            pool,
        })
    }

    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    pub fn registry(&self) -> &TaskRegistry {
        &self.registry
    }

    pub fn task_state(&self, task_id: &str) -> TaskState {
        self.registry.state(task_id)
    }

    /// Scans `snapshot` for elements of `data_type` satisfying `constraint`.
    ///
    /// `progress` receives a completion percentage from worker threads.
    /// Returns `TaskConflict` if `task_id` is already running, and
    /// `MalformedConstraint` or `UnsupportedType` before any region is read
    /// if the constraint cannot be compiled. Cancellation and region
    /// failures are reported through the outcome, never as errors.
    pub fn scan(
        &self,
        snapshot: &Snapshot,
        constraint: &Constraint,
        data_type: DataType,
        task_id: &str,
        cancel: &CancellationToken,
        progress: &(dyn Fn(f32) + Sync),
    ) -> MemoryResult<ScanOutcome> {
        let guard = self.registry.begin(task_id)?;
        let started = Instant::now();

        let predicate = match ScanPredicate::compile(constraint, data_type) {
            Ok(predicate) => predicate,
            Err(e) => {
                warn!(task_id, error = %e, "scan rejected");
                guard.complete(TaskState::Failed);
                return Err(e);
            }
        };

        let outcome = |state, snapshot, failed_regions| ScanOutcome {
            task_id: task_id.to_string(),
            state,
            snapshot,
            failed_regions,
            elapsed: started.elapsed(),
        };

        if cancel.is_cancelled() {
            info!(task_id, "scan canceled before start");
            guard.complete(TaskState::Canceled);
            return Ok(outcome(TaskState::Canceled, None, 0));
        }

        info!(
            task_id,
            constraint = %constraint,
            data_type = %data_type,
            regions = snapshot.region_count(),
            bytes = snapshot.byte_count(),
            "scan started"
        );

        let pass = catch_unwind(AssertUnwindSafe(|| {
            self.run_pass(snapshot, &predicate, cancel, progress)
        }));

        let (state, result, failed) = match pass {
            Ok((_, failed, skipped)) if skipped > 0 => (TaskState::Canceled, None, failed),
            Ok((result, failed, _)) => (TaskState::Completed, Some(result), failed),
            Err(_) => {
                error!(task_id, "scan pass panicked");
                (TaskState::Failed, None, 0)
            }
        };

        let outcome = outcome(state, result, failed);
        match &outcome.snapshot {
            Some(result) => info!(
                task_id,
                elapsed_ms = outcome.elapsed.as_millis() as u64,
                regions = result.region_count(),
                bytes = result.byte_count(),
                elements = result.element_count(),
                failed_regions = failed,
                "scan completed"
            ),
            None => info!(
                task_id,
                ?state,
                elapsed_ms = outcome.elapsed.as_millis() as u64,
                "scan ended without results"
            ),
        }

        guard.complete(state);
        Ok(outcome)
    }

    /// Scans every region, returning the result snapshot with the number of
    /// failed and skipped regions
    fn run_pass(
        &self,
        snapshot: &Snapshot,
        predicate: &ScanPredicate,
        cancel: &CancellationToken,
        progress: &(dyn Fn(f32) + Sync),
    ) -> (Snapshot, usize, usize) {
        let element_size = predicate.element_size();
        let alignment = self.config.alignment.resolve(element_size);
        let aligned = snapshot.aligned(alignment, element_size);
        let order = aligned.regions_by_size_desc();

        let total = order.len();
        let interval = self.config.progress_interval.max(1);
        let processed = AtomicUsize::new(0);

        let scan = |&index: &usize| -> RegionScan {
            if cancel.is_cancelled() {
                return RegionScan::Skipped;
            }

            let region = aligned.regions()[index];
            let result = catch_unwind(AssertUnwindSafe(|| {
                scan_region(&aligned, &region, predicate, alignment)
            }));
            let scanned = match result {
                Ok(Ok(regions)) => RegionScan::Matched(regions),
                Ok(Err(e)) => {
                    warn!(region = ?region, error = %e, "region scan failed");
                    RegionScan::Failed
                }
                Err(_) => {
                    warn!(region = ?region, "region scan panicked");
                    RegionScan::Failed
                }
            };

            let done = processed.fetch_add(1, Ordering::Relaxed) + 1;
            if done % interval == 0 || done == total {
                progress(done as f32 * 100.0 / total as f32);
            }
            scanned
        };

        let results: Vec<RegionScan> = match &self.pool {
            Some(pool) => pool.install(|| order.par_iter().map(&scan).collect()),
            None => {
                warn!("parallel scanning disabled, performance degraded");
                order.iter().map(&scan).collect()
            }
        };

        let mut regions = Vec::new();
        let (mut failed, mut skipped) = (0, 0);
        for result in results {
            match result {
                RegionScan::Matched(found) => regions.extend(found),
                RegionScan::Failed => failed += 1,
                RegionScan::Skipped => skipped += 1,
            }
        }

        let mut result = aligned.with_regions(snapshot.name(), regions);
        result.sort_regions();
        (result, failed, skipped)
    }
}

/// Scans one region with the vector scanner, or element by element when
/// the region is smaller than a vector chunk
pub fn scan_region(
    snapshot: &Snapshot,
    region: &SnapshotRegion,
    predicate: &ScanPredicate,
    alignment: usize,
) -> MemoryResult<Vec<SnapshotRegion>> {
    let view = snapshot.view(region)?;
    if view.element_count(alignment, predicate.element_size()) == 0 {
        debug!(region = ?region, "region too small for data type");
        return Ok(Vec::new());
    }

    if view.length() < VECTOR_SIZE {
        Ok(ScalarComparer::scan_region(&view, predicate, alignment))
    } else {
        VectorScanner::scan_region(&view, predicate, alignment).map_err(|e| {
            MemoryError::region_failure(view.base_element_address(), e.to_string())
        })
    }
}
