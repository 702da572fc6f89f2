//! Startup reconciliation.
//!
//! [`BootstrapSync`] rebuilds the registry from the server's task list after
//! a (re)start, so jobs submitted in an earlier session are tracked again
//! without being submitted twice. Each entry is handled on its own: a
//! malformed entry is logged and skipped, and the rest of the list is still
//! processed.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::client::TaskApi;
use crate::domain::TaskId;
use crate::error::ApiError;
use crate::poller::Poller;
use crate::registry::{ProgressOutcome, TaskRegistry};
use crate::types::task::ServerTaskState;
use crate::types::wire::ServerTask;

/// What a bootstrap run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BootstrapReport {
    /// Every task taken from the server's list, in list order.
    pub restored: Vec<TaskId>,
    /// Tasks whose poller was armed.
    pub armed: Vec<TaskId>,
    /// Tasks that completed while being restored.
    pub completed: Vec<TaskId>,
    /// Tasks the server reports as failed.
    pub failed: Vec<TaskId>,
    /// Entries that could not be decoded.
    pub skipped: usize,
}

/// Reconciles the registry with the server's task list.
#[derive(Clone)]
pub struct BootstrapSync {
    registry: Arc<TaskRegistry>,
    poller: Poller,
    api: Arc<dyn TaskApi>,
}

impl BootstrapSync {
    pub fn new(registry: Arc<TaskRegistry>, poller: Poller, api: Arc<dyn TaskApi>) -> Self {
        Self {
            registry,
            poller,
            api,
        }
    }

    /// Fetches the task list and restores every entry.
    ///
    /// Only a failure to fetch the list itself is returned as an error.
    pub async fn run(&self) -> Result<BootstrapReport, ApiError> {
        let entries = self.api.list_tasks().await.map_err(|e| {
            warn!(category = e.error_category(), error = %e, "failed to fetch task list");
            e
        })?;

        let mut report = BootstrapReport::default();
        for (index, entry) in entries.iter().enumerate() {
            match ServerTask::from_entry(entry) {
                Ok(task) => self.restore(&task, &mut report),
                Err(e) => {
                    warn!(index, error = %e, "skipping malformed task entry");
                    report.skipped += 1;
                }
            }
        }

        info!(
            restored = report.restored.len(),
            armed = report.armed.len(),
            completed = report.completed.len(),
            skipped = report.skipped,
            "task list restored"
        );
        Ok(report)
    }

    fn restore(&self, task: &ServerTask, report: &mut BootstrapReport) {
        let id = if self.registry.contains(task.task_id) {
            debug!(task_id = %task.task_id, "task already tracked, reconciling");
            task.task_id
        } else {
            self.registry.create(task.description.clone(), Some(task.task_id))
        };
        report.restored.push(id);

        self.registry.set_metadata(id, task.kind(), task.output_ref());
        if task.kind().is_none() && !task.task_type.is_empty() {
            debug!(task_id = %id, task_type = %task.task_type, "task type has no playback sink");
        }

        if self.registry.apply_progress(id, task.progress_percent()) == ProgressOutcome::Completed {
            report.completed.push(id);
        }

        match task.status {
            ServerTaskState::Running => {
                if self.poller.arm(id).is_active() {
                    report.armed.push(id);
                }
            }
            ServerTaskState::Failed => {
                warn!(task_id = %id, title = %task.description, "server reports task as failed");
                report.failed.push(id);
            }
            ServerTaskState::Completed | ServerTaskState::Unknown => {}
        }
    }
}

impl std::fmt::Debug for BootstrapSync {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BootstrapSync")
            .field("registry", &self.registry)
            .field("poller", &self.poller)
            .finish()
    }
}
