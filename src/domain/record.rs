//! Task record -- the registry's representation of one job.
//!
//! [`TaskRecord`] keeps the fields the job server reports (progress,
//! output file) together with the client-only ones (title, derived status,
//! last applied poll sequence).

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::task::{TaskKind, TaskStatus};

/// Identifier of a job, shared with the server.
///
/// The server keys jobs by a 64-bit integer. Locally created jobs use the
/// current Unix timestamp until the server confirms them.
///
/// # Examples
///
/// ```
/// use clipper_tasks::TaskId;
///
/// let id: TaskId = "1700000123".parse().unwrap();
/// assert_eq!(id, TaskId::new(1_700_000_123));
/// assert_eq!(id.to_string(), "1700000123");
/// assert_eq!(serde_json::to_value(id).unwrap(), 1_700_000_123_i64);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(i64);

impl TaskId {
    /// Wraps a raw server id.
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    /// The raw server id.
    pub const fn get(self) -> i64 {
        self.0
    }

    /// The id immediately after this one, wrapping at `i64::MAX`.
    pub(crate) fn successor(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TaskId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

impl From<i64> for TaskId {
    fn from(raw: i64) -> Self {
        Self(raw)
    }
}

/// The registry's record of one job.
///
/// Records are created in the `Processing` state with zero progress and are
/// never removed for the lifetime of the registry.
///
/// # Invariants
///
/// - `status == Completed` exactly when `progress >= 100`.
/// - `kind` is set at most once.
/// - `output_ref` is final once non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskRecord {
    /// Identifier of the job.
    pub id: TaskId,

    /// Human-readable description, immutable after creation.
    pub title: String,

    /// Edit kind; `None` until known, or for kinds that have no sink.
    pub kind: Option<TaskKind>,

    /// Progress percentage in `[0, 100]`.
    pub progress: u8,

    /// Derived from `progress`.
    pub status: TaskStatus,

    /// File name of the produced artifact, once known.
    pub output_ref: Option<String>,

    /// Sequence number of the last applied poll response, if any.
    pub last_sequence: Option<u64>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TaskRecord {
    /// Creates a record in the `Processing` state with zero progress.
    ///
    /// ```
    /// use clipper_tasks::{TaskId, TaskRecord, TaskStatus};
    ///
    /// let record = TaskRecord::new(TaskId::new(1), "Cut a.mp4");
    /// assert_eq!(record.progress, 0);
    /// assert_eq!(record.status, TaskStatus::Processing);
    /// assert!(record.kind.is_none());
    /// assert!(record.output_ref.is_none());
    /// ```
    pub fn new(id: TaskId, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            title: title.into(),
            kind: None,
            progress: 0,
            status: TaskStatus::Processing,
            output_ref: None,
            last_sequence: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns `true` once the job has reported 100%.
    pub fn is_completed(&self) -> bool {
        self.status.is_terminal()
    }

    /// Overwrites the progress and recomputes the status.
    pub(crate) fn set_progress(&mut self, progress: u8) {
        self.progress = progress;
        self.status = TaskStatus::from_progress(progress);
        self.updated_at = Utc::now();
    }
}
