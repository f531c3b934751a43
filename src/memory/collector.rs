//! Refreshing snapshot buffers from live memory

use crate::config::ScannerConfig;
use crate::core::types::MemoryResult;
use crate::memory::reader::ProcessMemory;
use crate::memory::scanner::{build_pool, CancellationToken, TaskRegistry, TaskState};
use crate::memory::snapshot::{ReadGroup, Snapshot};
use rayon::prelude::*;
use std::collections::HashSet;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// Result of a collection pass
#[derive(Debug, Clone, PartialEq)]
pub struct CollectOutcome {
    pub task_id: String,
    pub state: TaskState,
    /// Read groups whose read failed; their regions were removed
    pub failed_groups: usize,
    pub elapsed: Duration,
}

enum GroupRead {
    Read,
    Failed(usize),
    Skipped,
}

/// Reads current values for every read group of a snapshot
pub struct ValueCollector {
    config: ScannerConfig,
    registry: TaskRegistry,
    pool: Option<rayon::ThreadPool>,
}

impl ValueCollector {
    pub fn new(config: ScannerConfig) -> MemoryResult<Self> {
        Self::with_registry(config, TaskRegistry::new())
    }

    pub fn with_registry(config: ScannerConfig, registry: TaskRegistry) -> MemoryResult<Self> {
        let pool = build_pool(&config)?;
        Ok(ValueCollector {
            config,
            registry,
            pool,
        })
    }

    pub fn registry(&self) -> &TaskRegistry {
        &self.registry
    }

    /// Moves each read group's current values to its previous buffer and
    /// reads new current values through `reader`.
    ///
    /// A failed read leaves that group's buffers untouched and drops the
    /// regions over it from the snapshot. Buffers shared with other
    /// snapshots are copied before being written.
    pub fn collect<R: ProcessMemory + ?Sized>(
        &self,
        snapshot: &mut Snapshot,
        reader: &R,
        task_id: &str,
        cancel: &CancellationToken,
        progress: &(dyn Fn(f32) + Sync),
    ) -> MemoryResult<CollectOutcome> {
        let guard = self.registry.begin(task_id)?;
        let started = Instant::now();
        info!(
            task_id,
            read_groups = snapshot.read_groups().len(),
            bytes = snapshot.byte_count(),
            "collection started"
        );

        let pass = catch_unwind(AssertUnwindSafe(|| {
            self.read_all(snapshot, reader, cancel, progress)
        }));

        let (state, failed) = match pass {
            Ok((failed, skipped)) => {
                if !failed.is_empty() {
                    snapshot.retain_regions(|region| !failed.contains(&region.read_group));
                } else {
                    snapshot.compute_element_count(snapshot.alignment(), snapshot.element_size());
                }
                let state = if skipped > 0 {
                    TaskState::Canceled
                } else {
                    TaskState::Completed
                };
                (state, failed.len())
            }
            Err(_) => {
                error!(task_id, "collection pass panicked");
                (TaskState::Failed, 0)
            }
        };

        let elapsed = started.elapsed();
        info!(
            task_id,
            ?state,
            elapsed_ms = elapsed.as_millis() as u64,
            failed_groups = failed,
            regions = snapshot.region_count(),
            "collection finished"
        );

        guard.complete(state);
        Ok(CollectOutcome {
            task_id: task_id.to_string(),
            state,
            failed_groups: failed,
            elapsed,
        })
    }

    /// Refreshes every group, returning the failed group indices and the
    /// number of groups skipped after cancellation
    fn read_all<R: ProcessMemory + ?Sized>(
        &self,
        snapshot: &mut Snapshot,
        reader: &R,
        cancel: &CancellationToken,
        progress: &(dyn Fn(f32) + Sync),
    ) -> (HashSet<usize>, usize) {
        let groups = snapshot.read_groups_mut();
        let total = groups.len();
        let interval = self.config.progress_interval.max(1);
        let processed = AtomicUsize::new(0);

        let read = |(index, group): (usize, &mut Arc<ReadGroup>)| -> GroupRead {
            if cancel.is_cancelled() {
                return GroupRead::Skipped;
            }

            let result = if group.is_empty() {
                Ok(Ok(()))
            } else {
                catch_unwind(AssertUnwindSafe(|| Arc::make_mut(group).refresh(reader)))
            };
            let outcome = match result {
                Ok(Ok(())) => GroupRead::Read,
                Ok(Err(e)) => {
                    warn!(base = %group.base_address(), error = %e, "read group refresh failed");
                    GroupRead::Failed(index)
                }
                Err(_) => {
                    warn!(base = %group.base_address(), "read group refresh panicked");
                    GroupRead::Failed(index)
                }
            };

            let done = processed.fetch_add(1, Ordering::Relaxed) + 1;
            if done % interval == 0 || done == total {
                progress(done as f32 * 100.0 / total as f32);
            }
            outcome
        };

        let results: Vec<GroupRead> = match &self.pool {
            Some(pool) => pool.install(|| groups.par_iter_mut().enumerate().map(&read).collect()),
            None => {
                warn!("parallel collection disabled, performance degraded");
                groups.iter_mut().enumerate().map(&read).collect()
            }
        };

        let mut failed = HashSet::new();
        let mut skipped = 0;
        for result in results {
            match result {
                GroupRead::Read => {}
                GroupRead::Failed(index) => {
                    failed.insert(index);
                }
                GroupRead::Skipped => skipped += 1,
            }
        }
        (failed, skipped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Address;
    use crate::memory::reader::StaticMemory;

    fn sequential() -> ScannerConfig {
        ScannerConfig {
            parallel: false,
            ..ScannerConfig::default()
        }
    }

    #[test]
    fn test_collect_shifts_values() {
        let mut memory = StaticMemory::new();
        memory.insert(Address::new(0x1000), vec![9; 8]);

        let mut snapshot = Snapshot::new("live", vec![ReadGroup::new(Address::new(0x1000), 8)]);
        let collector = ValueCollector::new(sequential()).unwrap();
        let outcome = collector
            .collect(&mut snapshot, &memory, "collect", &CancellationToken::new(), &|_: f32| {})
            .unwrap();

        assert_eq!(outcome.state, TaskState::Completed);
        assert_eq!(outcome.failed_groups, 0);
        let group = &snapshot.read_groups()[0];
        assert_eq!(group.current_values(), &[9; 8]);
        assert_eq!(group.previous_values(), &[0; 8]);
    }

    #[test]
    fn test_shared_buffers_are_copied_on_write() {
        let mut memory = StaticMemory::new();
        memory.insert(Address::new(0x1000), vec![1; 4]);

        let original = Snapshot::new("first", vec![ReadGroup::new(Address::new(0x1000), 4)]);
        let mut derived = original.with_regions("second", original.regions().to_vec());
        ValueCollector::new(sequential())
            .unwrap()
            .collect(&mut derived, &memory, "collect", &CancellationToken::new(), &|_: f32| {})
            .unwrap();

        assert_eq!(original.read_groups()[0].current_values(), &[0; 4]);
        assert_eq!(derived.read_groups()[0].current_values(), &[1; 4]);
    }
}
