//! Core task enums.
//!
//! [`TaskStatus`] is the client's derived view of a job; it is never set
//! directly, only recomputed from the job's progress. [`ServerTaskState`] is
//! what the server itself says about the job, which the client uses only to
//! decide whether a restored job still needs polling.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::COMPLETE_PERCENT;

/// Client-side task lifecycle status.
///
/// # State Machine
///
/// ```text
/// Processing -> Processing   (progress update below 100)
/// Processing -> Completed    (progress >= 100 observed)
/// Completed  -> (terminal, no transitions)
/// ```
///
/// # Examples
///
/// ```
/// use clipper_tasks::TaskStatus;
///
/// assert_eq!(TaskStatus::from_progress(40), TaskStatus::Processing);
/// assert_eq!(TaskStatus::from_progress(100), TaskStatus::Completed);
/// assert!(TaskStatus::Completed.is_terminal());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// The job is still running on the server.
    Processing,
    /// The job reported 100% (terminal).
    Completed,
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Processing => write!(f, "processing"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

impl TaskStatus {
    /// Derives the status from a progress percentage.
    pub fn from_progress(progress: u8) -> Self {
        if progress >= COMPLETE_PERCENT {
            Self::Completed
        } else {
            Self::Processing
        }
    }

    /// Returns `true` if no further transitions are allowed.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

/// The kind of edit a task performs. Determines its playback sink.
///
/// The server may report kinds this client does not play back (for example
/// `convert`); those parse to `None` through [`TaskKind::from_wire`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
    /// Clip extraction from a single video.
    Cut,
    /// Concatenation of several videos.
    Merge,
}

impl TaskKind {
    /// Parses the server's `TaskType` string.
    ///
    /// ```
    /// use clipper_tasks::TaskKind;
    ///
    /// assert_eq!(TaskKind::from_wire("cut"), Some(TaskKind::Cut));
    /// assert_eq!(TaskKind::from_wire("merge"), Some(TaskKind::Merge));
    /// assert_eq!(TaskKind::from_wire("convert"), None);
    /// ```
    pub fn from_wire(value: &str) -> Option<Self> {
        match value {
            "cut" => Some(Self::Cut),
            "merge" => Some(Self::Merge),
            _ => None,
        }
    }

    /// The wire name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cut => "cut",
            Self::Merge => "merge",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The server's own job state, as reported in the task list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerTaskState {
    /// ffmpeg is still working on the job.
    Running,
    /// ffmpeg exited successfully.
    Completed,
    /// ffmpeg failed; the job will not progress further.
    Failed,
    /// Any state this client does not know about.
    #[default]
    #[serde(other)]
    Unknown,
}

impl ServerTaskState {
    /// Returns `true` if the server is still working on the job.
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }
}

impl fmt::Display for ServerTaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}
