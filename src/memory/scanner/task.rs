//! Task identity, cancellation and worker pools shared by scans and
//! value collection

use crate::config::ScannerConfig;
use crate::core::types::{MemoryError, MemoryResult};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, warn};

/// Lifecycle of a scan or collection task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    Idle,
    Running,
    Completed,
    Canceled,
    Failed,
}

impl TaskState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskState::Completed | TaskState::Canceled | TaskState::Failed
        )
    }
}

/// Cooperative cancellation flag, cheap to clone and share across threads
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        CancellationToken::default()
    }

    /// Requests cancellation; work already started on a region finishes
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Number of finished tasks whose final state stays queryable
pub const DEFAULT_TASK_HISTORY: usize = 1024;

#[derive(Debug, Default)]
struct Tasks {
    states: HashMap<String, TaskState>,
    /// Finished task ids, oldest first
    finished: VecDeque<String>,
}

/// Tracks the state of tasks by identifier and enforces at most one
/// running task per identifier.
///
/// Running tasks are always tracked. Only the most recent `history`
/// finished tasks are remembered; older ones read as `Idle` again.
#[derive(Debug, Clone)]
pub struct TaskRegistry {
    tasks: Arc<Mutex<Tasks>>,
    history: usize,
}

impl Default for TaskRegistry {
    fn default() -> Self {
        TaskRegistry::with_history(DEFAULT_TASK_HISTORY)
    }
}

impl TaskRegistry {
    pub fn new() -> Self {
        TaskRegistry::default()
    }

    pub fn with_history(history: usize) -> Self {
        TaskRegistry {
            tasks: Arc::new(Mutex::new(Tasks::default())),
            history,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Tasks> {
        // State stays consistent under poisoning; no update spans a panic point
        self.tasks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Marks `task_id` running, failing if it already is
    pub fn begin(&self, task_id: &str) -> MemoryResult<TaskGuard> {
        let mut tasks = self.lock();
        match tasks.states.get(task_id) {
            Some(TaskState::Running) => {
                return Err(MemoryError::TaskConflict(task_id.to_string()));
            }
            Some(_) => tasks.finished.retain(|id| id != task_id),
            None => {}
        }
        tasks
            .states
            .insert(task_id.to_string(), TaskState::Running);
        debug!(task_id, "task started");

        Ok(TaskGuard {
            registry: self.clone(),
            task_id: task_id.to_string(),
            finished: false,
        })
    }

    /// Current state, `Idle` for identifiers never seen or forgotten
    pub fn state(&self, task_id: &str) -> TaskState {
        self.lock()
            .states
            .get(task_id)
            .copied()
            .unwrap_or(TaskState::Idle)
    }

    /// Number of task ids currently remembered
    pub fn len(&self) -> usize {
        self.lock().states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn finish(&self, task_id: &str, state: TaskState) {
        let mut tasks = self.lock();
        tasks.states.insert(task_id.to_string(), state);
        tasks.finished.push_back(task_id.to_string());

        while tasks.finished.len() > self.history {
            if let Some(oldest) = tasks.finished.pop_front() {
                tasks.states.remove(&oldest);
            }
        }
    }
}

/// Holds a task in the running state. Dropping it without calling
/// [`TaskGuard::complete`] records the task as failed.
#[derive(Debug)]
pub struct TaskGuard {
    registry: TaskRegistry,
    task_id: String,
    finished: bool,
}

impl TaskGuard {
    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    pub fn complete(mut self, state: TaskState) {
        self.registry.finish(&self.task_id, state);
        self.finished = true;
        debug!(task_id = %self.task_id, ?state, "task finished");
    }
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        if !self.finished {
            warn!(task_id = %self.task_id, "task ended without completing");
            self.registry.finish(&self.task_id, TaskState::Failed);
        }
    }
}

/// Builds the worker pool for parallel passes, or `None` when the
/// configuration asks for sequential execution
pub fn build_pool(config: &ScannerConfig) -> MemoryResult<Option<rayon::ThreadPool>> {
    if !config.parallel {
        return Ok(None);
    }

    rayon::ThreadPoolBuilder::new()
        .num_threads(config.max_threads)
        .thread_name(|index| format!("memory-scan-{}", index))
        .build()
        .map(Some)
        .map_err(|e| MemoryError::Unknown(format!("failed to build worker pool: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancellation_is_shared() {
        let token = CancellationToken::new();
        let clone = token.clone();
        assert!(!token.is_cancelled());
        clone.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_duplicate_running_task_rejected() {
        let registry = TaskRegistry::new();
        let guard = registry.begin("scan").unwrap();
        assert!(matches!(registry.begin("scan"), Err(MemoryError::TaskConflict(_))));
        assert!(registry.begin("other").is_ok());

        guard.complete(TaskState::Completed);
        assert_eq!(registry.state("scan"), TaskState::Completed);
        assert!(registry.begin("scan").is_ok());
    }

    #[test]
    fn test_dropped_guard_marks_failed() {
        let registry = TaskRegistry::new();
        drop(registry.begin("scan").unwrap());
        assert_eq!(registry.state("scan"), TaskState::Failed);
        assert_eq!(registry.state("unknown"), TaskState::Idle);
    }

    #[test]
    fn test_finished_history_is_bounded() {
        let registry = TaskRegistry::with_history(2);
        for id in ["a", "b", "c"] {
            registry.begin(id).unwrap().complete(TaskState::Completed);
        }

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.state("a"), TaskState::Idle);
        assert_eq!(registry.state("c"), TaskState::Completed);

        // Restarting a remembered id moves it to the back of the history
        registry.begin("b").unwrap().complete(TaskState::Canceled);
        registry.begin("d").unwrap().complete(TaskState::Completed);
        assert_eq!(registry.state("c"), TaskState::Idle);
        assert_eq!(registry.state("b"), TaskState::Canceled);
    }

    #[test]
    fn test_running_tasks_are_never_evicted() {
        let registry = TaskRegistry::with_history(1);
        let running = registry.begin("long").unwrap();
        for id in 0..10 {
            registry
                .begin(&id.to_string())
                .unwrap()
                .complete(TaskState::Completed);
        }

        assert_eq!(registry.state("long"), TaskState::Running);
        assert!(matches!(registry.begin("long"), Err(MemoryError::TaskConflict(_))));
        assert_eq!(registry.len(), 2);
        running.complete(TaskState::Completed);
    }

    #[test]
    fn test_sequential_config_has_no_pool() {
        let config = ScannerConfig {
            parallel: false,
            ..ScannerConfig::default()
        };
        assert!(build_pool(&config).unwrap().is_none());
    }
}
