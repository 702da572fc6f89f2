//! Request and response payloads of the clipper job server.
//!
//! # Serialization
//!
//! The server's task objects use Go's default field names (`TaskID`,
//! `OutputFile`, `Progress`, ...), so task payloads are PascalCase. Request
//! bodies written by this client use camelCase (`taskId`, `videoDir`).
//! `OutputFile` is a server-native path; [`ServerTask::output_ref`] and
//! [`TaskSnapshot::output_ref`] reduce it to the file name the playback
//! endpoint expects.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::constants::COMPLETE_PERCENT;
use crate::domain::TaskId;
use crate::types::task::{ServerTaskState, TaskKind};

/// Returns the trailing path component, accepting `/` and `\` separators.
///
/// Returns `None` for an empty path or a path that ends in a separator.
///
/// ```
/// use clipper_tasks::file_name_of;
///
/// assert_eq!(file_name_of(r"D:\videos\cut_a.mp4"), Some("cut_a.mp4"));
/// assert_eq!(file_name_of("/srv/videos/merged.mkv"), Some("merged.mkv"));
/// assert_eq!(file_name_of("plain.mp4"), Some("plain.mp4"));
/// assert_eq!(file_name_of(""), None);
/// ```
pub fn file_name_of(path: &str) -> Option<&str> {
    path.rsplit(|c| c == '/' || c == '\\')
        .next()
        .filter(|name| !name.is_empty())
}

fn clamp_percent(progress: i64) -> u8 {
    progress.clamp(0, i64::from(COMPLETE_PERCENT)) as u8
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

/// One entry of `GET /api/tasks`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServerTask {
    #[serde(rename = "TaskID")]
    pub task_id: TaskId,

    /// Human-readable description written by the server.
    #[serde(default)]
    pub description: String,

    /// Raw task type (`cut`, `merge`, `convert`, ...).
    #[serde(default)]
    pub task_type: String,

    /// Server-native path of the produced file.
    #[serde(default)]
    pub output_file: String,

    /// Progress as reported; may fall outside `[0, 100]`.
    #[serde(default)]
    pub progress: i64,

    #[serde(default)]
    pub status: ServerTaskState,
}

impl ServerTask {
    /// Decodes a single task list entry.
    ///
    /// Entries are decoded one at a time so a malformed entry can be
    /// skipped without losing the rest of the list.
    pub fn from_entry(entry: &Value) -> Result<Self, serde_json::Error> {
        Self::deserialize(entry)
    }

    /// The task kind, or `None` for kinds this client does not play back.
    pub fn kind(&self) -> Option<TaskKind> {
        TaskKind::from_wire(&self.task_type)
    }

    /// The produced file's name, if the server reported one.
    pub fn output_ref(&self) -> Option<&str> {
        file_name_of(&self.output_file)
    }

    /// Progress clamped into `[0, 100]`.
    pub fn progress_percent(&self) -> u8 {
        clamp_percent(self.progress)
    }
}

/// The `task` object of `GET /api/tasks/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TaskSnapshot {
    #[serde(rename = "TaskID")]
    pub task_id: TaskId,

    #[serde(default)]
    pub output_file: String,

    #[serde(default)]
    pub progress: i64,
}

impl TaskSnapshot {
    /// The produced file's name, if the server reported one.
    pub fn output_ref(&self) -> Option<&str> {
        file_name_of(&self.output_file)
    }

    /// Progress clamped into `[0, 100]`.
    pub fn progress_percent(&self) -> u8 {
        clamp_percent(self.progress)
    }
}

/// Response of `GET /api/tasks/{id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskStatusResponse {
    #[serde(default)]
    pub task: Option<TaskSnapshot>,
}

/// Response of `GET /api/tasks`. Entries stay undecoded; see
/// [`ServerTask::from_entry`].
#[derive(Debug, Clone, Deserialize)]
pub struct TaskListResponse {
    #[serde(default)]
    pub tasks: Option<Vec<Value>>,
}

/// Response of `GET /api/videos`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoListing {
    /// Video file names in the current directory. The server sends `null`
    /// for an empty directory; that decodes as an empty list.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub videos: Vec<String>,

    /// The directory the server is reading videos from.
    #[serde(default)]
    pub video_dir: String,
}

/// Body of `POST /api/videos/cut`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CutJob {
    pub task_id: TaskId,
    pub input: String,
    pub output: String,
    /// `HH:MM:SS`
    pub start: String,
    /// `HH:MM:SS`
    pub end: String,
}

/// Body of `POST /api/videos/merge`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeJob {
    pub task_id: TaskId,
    pub videos: Vec<String>,
    pub output: String,
}

/// Body of `POST /api/videos/dir`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoDirRequest {
    pub video_dir: String,
}
