//! Endpoint paths and protocol constants for the clipper job server.

use std::time::Duration;

/// Interval between two status polls of the same task.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(3000);

/// Timeout applied to status and listing requests.
///
/// Submission requests are exempt: the server answers them only once the
/// edit has finished.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_millis(10_000);

/// Base URL used when nothing else is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";

/// Progress percentage at which a task counts as completed.
pub const COMPLETE_PERCENT: u8 = 100;

/// `GET` the video library, `GET /{name}` to stream one video.
pub const VIDEOS_PATH: &str = "/api/videos";

/// `POST` a cut job.
pub const CUT_PATH: &str = "/api/videos/cut";

/// `POST` a merge job.
pub const MERGE_PATH: &str = "/api/videos/merge";

/// `POST` a new video directory.
pub const VIDEO_DIR_PATH: &str = "/api/videos/dir";

/// `GET` all tasks, `GET /{id}` for one task's status.
pub const TASKS_PATH: &str = "/api/tasks";
