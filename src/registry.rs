//! The in-memory task registry.
//!
//! [`TaskRegistry`] owns the mapping from [`TaskId`] to [`TaskRecord`] and is
//! the only shared mutable state in the crate. The poller, the bootstrap
//! sync and the submission path all receive it explicitly (usually as an
//! `Arc<TaskRegistry>`) instead of reaching for ambient state.
//!
//! # Signals
//!
//! Presentation layers and the [`CompletionDispatcher`](crate::CompletionDispatcher)
//! implement [`TaskObserver`] and [`subscribe`](TaskRegistry::subscribe).
//! Observers are called synchronously after the registry lock has been
//! released, with a snapshot of the record, so an observer may call back into
//! the registry.
//!
//! # Progress application
//!
//! [`apply_progress`](TaskRegistry::apply_progress) overwrites the stored
//! progress with the supplied value and recomputes the status. Applying the
//! same value twice is harmless. The returned [`ProgressOutcome`] reports the
//! completion edge exactly once per task.
//!
//! # Concurrency
//!
//! Records live behind a `parking_lot::Mutex` that is never held across an
//! `.await`. Callers re-read the record after every suspension point rather
//! than holding on to a copy.
//!
//! # Examples
//!
//! ```
//! use clipper_tasks::{ProgressOutcome, TaskId, TaskRegistry, TaskStatus};
//!
//! let registry = TaskRegistry::new();
//! let id = registry.create("Cut a.mp4 from 00:00:10 to 00:01:40", Some(TaskId::new(7)));
//!
//! assert_eq!(registry.apply_progress(id, 40), ProgressOutcome::Updated);
//! assert_eq!(registry.apply_progress(id, 100), ProgressOutcome::Completed);
//! assert_eq!(registry.apply_progress(id, 100), ProgressOutcome::Updated);
//! assert_eq!(registry.find(id).unwrap().status, TaskStatus::Completed);
//! ```

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::constants::COMPLETE_PERCENT;
use crate::domain::{TaskId, TaskRecord};
use crate::time::current_timestamp;
use crate::types::task::TaskKind;

/// Receives registry signals. All methods default to no-ops.
pub trait TaskObserver: Send + Sync {
    /// A record was created.
    fn on_created(&self, _record: &TaskRecord) {}

    /// A progress value was applied (including the one that completes the task).
    fn on_progress(&self, _record: &TaskRecord) {}

    /// The task crossed from `processing` to `completed`. Fired once per task.
    fn on_completed(&self, _record: &TaskRecord) {}
}

/// What [`TaskRegistry::apply_progress`] did with a progress report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProgressOutcome {
    /// No record with that id; nothing changed.
    Unknown,
    /// Progress was stored; the status did not change to completed.
    Updated,
    /// Progress was stored and the task just completed.
    Completed,
    /// The task is already completed and the report was below 100.
    Ignored,
    /// A newer poll response has already been applied.
    Stale,
}

impl ProgressOutcome {
    /// Returns `true` for the completion edge.
    pub fn is_completion(&self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Returns `true` if the record was modified.
    pub fn was_applied(&self) -> bool {
        matches!(self, Self::Updated | Self::Completed)
    }
}

/// In-memory mapping from task id to task record.
///
/// Records are kept in creation order and are never removed.
pub struct TaskRegistry {
    records: Mutex<IndexMap<TaskId, TaskRecord>>,
    observers: RwLock<Vec<Arc<dyn TaskObserver>>>,
}

impl TaskRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            records: Mutex::new(IndexMap::new()),
            observers: RwLock::new(Vec::new()),
        }
    }

    /// Registers an observer for create/progress/complete signals.
    pub fn subscribe(&self, observer: Arc<dyn TaskObserver>) {
        self.observers.write().push(observer);
    }

    /// Creates a record with zero progress in the `processing` state.
    ///
    /// Without an `id` the current Unix timestamp is used. If the requested
    /// id is already taken the next free id is allocated instead, so the
    /// returned id is the one to use from here on.
    pub fn create(&self, title: impl Into<String>, id: Option<TaskId>) -> TaskId {
        let record = {
            let mut records = self.records.lock();
            let requested = id.unwrap_or_else(|| TaskId::new(current_timestamp()));
            let mut allocated = requested;
            while records.contains_key(&allocated) {
                allocated = allocated.successor();
            }
            if allocated != requested {
                if id.is_some() {
                    warn!(requested = %requested, allocated = %allocated, "task id already in use");
                } else {
                    debug!(requested = %requested, allocated = %allocated, "timestamp id taken, moved forward");
                }
            }

            let record = TaskRecord::new(allocated, title);
            records.insert(allocated, record.clone());
            record
        };

        debug!(task_id = %record.id, title = %record.title, "task created");
        self.notify(|observer| observer.on_created(&record));
        record.id
    }

    /// Attaches the task kind and output file once they are known.
    ///
    /// The kind is set only if none is recorded yet; the output reference is
    /// filled only while it is still empty. Returns `false` (and logs) for an
    /// unknown id.
    pub fn set_metadata(&self, id: TaskId, kind: Option<TaskKind>, output_ref: Option<&str>) -> bool {
        let mut records = self.records.lock();
        let Some(record) = records.get_mut(&id) else {
            warn!(task_id = %id, "metadata for unknown task ignored");
            return false;
        };

        match (record.kind, kind) {
            (None, Some(kind)) => record.kind = Some(kind),
            (Some(current), Some(kind)) if current != kind => {
                warn!(task_id = %id, current = %current, requested = %kind, "task kind is fixed, keeping current");
            }
            _ => {}
        }
        fill_output(record, output_ref);
        true
    }

    /// Fills the output reference from a status poll, if still empty.
    ///
    /// Returns `false` for an unknown id.
    pub fn record_output(&self, id: TaskId, output_ref: &str) -> bool {
        let mut records = self.records.lock();
        match records.get_mut(&id) {
            Some(record) => {
                fill_output(record, Some(output_ref));
                true
            }
            None => false,
        }
    }

    /// Overwrites the task's progress and recomputes its status.
    ///
    /// Values above 100 are treated as 100. Unknown ids are a normal race and
    /// leave the registry untouched. A completed task ignores later reports
    /// below 100.
    pub fn apply_progress(&self, id: TaskId, progress: u8) -> ProgressOutcome {
        self.apply(id, progress, None)
    }

    /// Like [`apply_progress`](Self::apply_progress), but drops the report if
    /// a response with an equal or higher `sequence` was already applied.
    pub fn apply_progress_sequenced(&self, id: TaskId, progress: u8, sequence: u64) -> ProgressOutcome {
        self.apply(id, progress, Some(sequence))
    }

    fn apply(&self, id: TaskId, progress: u8, sequence: Option<u64>) -> ProgressOutcome {
        let progress = progress.min(COMPLETE_PERCENT);

        let (outcome, snapshot) = {
            let mut records = self.records.lock();
            let Some(record) = records.get_mut(&id) else {
                debug!(task_id = %id, progress, "progress for unknown task ignored");
                return ProgressOutcome::Unknown;
            };

            if let (Some(sequence), Some(last)) = (sequence, record.last_sequence) {
                if sequence <= last {
                    debug!(task_id = %id, sequence, last, "stale poll response dropped");
                    return ProgressOutcome::Stale;
                }
            }

            if record.is_completed() && progress < COMPLETE_PERCENT {
                warn!(task_id = %id, progress, "progress regression after completion ignored");
                return ProgressOutcome::Ignored;
            }

            let was_completed = record.is_completed();
            record.set_progress(progress);
            if sequence.is_some() {
                record.last_sequence = sequence;
            }

            let outcome = if !was_completed && record.is_completed() {
                ProgressOutcome::Completed
            } else {
                ProgressOutcome::Updated
            };
            (outcome, record.clone())
        };

        self.notify(|observer| observer.on_progress(&snapshot));
        if outcome.is_completion() {
            info!(task_id = %id, title = %snapshot.title, "task completed");
            self.notify(|observer| observer.on_completed(&snapshot));
        }
        outcome
    }

    /// Looks up a record. Absence is an expected outcome.
    pub fn find(&self, id: TaskId) -> Option<TaskRecord> {
        self.records.lock().get(&id).cloned()
    }

    /// Returns `true` if a record with this id exists.
    pub fn contains(&self, id: TaskId) -> bool {
        self.records.lock().contains_key(&id)
    }

    /// All records in creation order.
    pub fn snapshot(&self) -> Vec<TaskRecord> {
        self.records.lock().values().cloned().collect()
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// Returns `true` if no record has been created.
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    fn notify(&self, signal: impl Fn(&dyn TaskObserver)) {
        let observers: Vec<Arc<dyn TaskObserver>> = self.observers.read().clone();
        for observer in &observers {
            signal(observer.as_ref());
        }
    }
}

fn fill_output(record: &mut TaskRecord, output_ref: Option<&str>) {
    if record.output_ref.is_some() {
        return;
    }
    if let Some(output) = output_ref.filter(|output| !output.is_empty()) {
        record.output_ref = Some(output.to_string());
    }
}

impl Default for TaskRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TaskRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskRegistry")
            .field("records", &self.len())
            .field("observers", &self.observers.read().len())
            .finish()
    }
}
