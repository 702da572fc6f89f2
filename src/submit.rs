//! Cut and merge submission.
//!
//! A submission validates the user's input, creates the local task record
//! before the server has seen anything, arms the task's poller and then
//! sends the request in the background. The server holds cut and merge
//! requests open until the job finishes, so progress is only ever learned
//! through polling; the request's own result only says whether the job
//! failed.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use crate::client::TaskApi;
use crate::domain::TaskId;
use crate::error::{ApiError, ValidationError};
use crate::poller::{PollHandle, Poller};
use crate::registry::TaskRegistry;
use crate::time::format_time;
use crate::types::task::TaskKind;
use crate::types::wire::{CutJob, MergeJob};

/// Input of a clip extraction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CutForm {
    /// Source video file name.
    pub input: String,
    /// `HH:MM:SS`
    pub start: String,
    /// `HH:MM:SS`
    pub end: String,
    /// Output file name; `cut_{input}` when not given.
    pub output: Option<String>,
}

impl CutForm {
    pub fn new(input: impl Into<String>, start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            start: start.into(),
            end: end.into(),
            output: None,
        }
    }

    /// Fills start and end from player positions in seconds.
    ///
    /// ```
    /// use clipper_tasks::CutForm;
    ///
    /// let form = CutForm::from_positions("a.mp4", 10.4, 3723.0);
    /// assert_eq!(form.start, "00:00:10");
    /// assert_eq!(form.end, "01:02:03");
    /// assert_eq!(form.output_name(), "cut_a.mp4");
    /// ```
    pub fn from_positions(input: impl Into<String>, start_secs: f64, end_secs: f64) -> Self {
        Self::new(input, format_time(start_secs), format_time(end_secs))
    }

    pub fn with_output(mut self, output: impl Into<String>) -> Self {
        self.output = Some(output.into());
        self
    }

    /// The output file name the job will produce.
    pub fn output_name(&self) -> String {
        match &self.output {
            Some(output) => output.trim().to_string(),
            None => format!("cut_{}", self.input.trim()),
        }
    }

    /// Title of the task record.
    pub fn title(&self) -> String {
        format!(
            "Cut {} from {} to {}",
            self.input.trim(),
            self.start.trim(),
            self.end.trim()
        )
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.input.trim().is_empty() {
            return Err(ValidationError::MissingSelection);
        }
        if self.start.trim().is_empty() || self.end.trim().is_empty() {
            return Err(ValidationError::MissingTimeRange);
        }
        if self.output_name().is_empty() {
            return Err(ValidationError::MissingOutputName);
        }
        Ok(())
    }

    fn to_job(&self, task_id: TaskId) -> CutJob {
        CutJob {
            task_id,
            input: self.input.trim().to_string(),
            output: self.output_name(),
            start: self.start.trim().to_string(),
            end: self.end.trim().to_string(),
        }
    }
}

/// Input of a concatenation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeForm {
    /// Source video file names, in playback order.
    pub videos: Vec<String>,
    pub output: String,
}

impl MergeForm {
    pub fn new(videos: Vec<String>, output: impl Into<String>) -> Self {
        Self {
            videos,
            output: output.into(),
        }
    }

    /// Title of the task record.
    pub fn title(&self) -> String {
        format!("Merge videos: {}", self.videos.join(","))
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.output.trim().is_empty() {
            return Err(ValidationError::MissingOutputName);
        }
        if self.videos.len() < 2 {
            return Err(ValidationError::TooFewVideos {
                count: self.videos.len(),
            });
        }
        if self.videos.iter().any(|video| video.trim().is_empty()) {
            return Err(ValidationError::MissingSelection);
        }
        Ok(())
    }

    fn to_job(&self, task_id: TaskId) -> MergeJob {
        MergeJob {
            task_id,
            videos: self.videos.iter().map(|v| v.trim().to_string()).collect(),
            output: self.output.trim().to_string(),
        }
    }
}

/// Checks a new video directory before it is sent to the server.
pub fn validate_video_dir(video_dir: &str) -> Result<&str, ValidationError> {
    let trimmed = video_dir.trim();
    if trimmed.is_empty() {
        Err(ValidationError::MissingDirectory)
    } else {
        Ok(trimmed)
    }
}

/// A job that has been registered locally and sent to the server.
#[derive(Debug)]
pub struct Submission {
    /// The id to use for the task from here on.
    pub task_id: TaskId,
    /// The task's poll timer.
    pub poll: PollHandle,
    /// The in-flight request. Resolves when the server answers, which for
    /// cut and merge is when the job has finished.
    pub request: JoinHandle<Result<(), ApiError>>,
}

/// Registers jobs locally and sends them to the server.
#[derive(Clone)]
pub struct Submitter {
    registry: Arc<TaskRegistry>,
    poller: Poller,
    api: Arc<dyn TaskApi>,
    tracker: TaskTracker,
}

impl Submitter {
    pub fn new(registry: Arc<TaskRegistry>, poller: Poller, api: Arc<dyn TaskApi>) -> Self {
        Self {
            registry,
            poller,
            api,
            tracker: TaskTracker::new(),
        }
    }

    /// Submits a cut. Must be called from within a tokio runtime.
    pub fn submit_cut(&self, form: &CutForm) -> Result<Submission, ValidationError> {
        form.validate()?;

        let (task_id, poll) = self.register(form.title(), TaskKind::Cut, &form.output_name());
        let job = form.to_job(task_id);
        let api = self.api.clone();
        let request = self.tracker.spawn(async move {
            let result = api.submit_cut(&job).await;
            log_request_result(task_id, TaskKind::Cut, &result);
            result
        });

        Ok(Submission {
            task_id,
            poll,
            request,
        })
    }

    /// Submits a merge. Must be called from within a tokio runtime.
    pub fn submit_merge(&self, form: &MergeForm) -> Result<Submission, ValidationError> {
        form.validate()?;

        let (task_id, poll) = self.register(form.title(), TaskKind::Merge, form.output.trim());
        let job = form.to_job(task_id);
        let api = self.api.clone();
        let request = self.tracker.spawn(async move {
            let result = api.submit_merge(&job).await;
            log_request_result(task_id, TaskKind::Merge, &result);
            result
        });

        Ok(Submission {
            task_id,
            poll,
            request,
        })
    }

    /// Number of requests still waiting for the server.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Waits for every in-flight request to finish.
    pub async fn wait(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }

    fn register(&self, title: String, kind: TaskKind, output: &str) -> (TaskId, PollHandle) {
        let task_id = self.registry.create(title, None);
        self.registry.set_metadata(task_id, Some(kind), Some(output));
        let poll = self.poller.arm(task_id);
        info!(task_id = %task_id, kind = %kind, output, "job submitted");
        (task_id, poll)
    }
}

fn log_request_result(task_id: TaskId, kind: TaskKind, result: &Result<(), ApiError>) {
    match result {
        Ok(()) => debug!(task_id = %task_id, kind = %kind, "server finished request"),
        Err(e) => warn!(
            task_id = %task_id,
            kind = %kind,
            category = e.error_category(),
            error = %e,
            "job request failed"
        ),
    }
}

impl std::fmt::Debug for Submitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Submitter")
            .field("in_flight", &self.in_flight())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cut_output_defaults_to_prefixed_input() {
        let form = CutForm::new("a.mp4", "00:00:01", "00:00:05");
        assert_eq!(form.output_name(), "cut_a.mp4");
        assert_eq!(form.clone().with_output("x.mp4").output_name(), "x.mp4");
        assert_eq!(form.title(), "Cut a.mp4 from 00:00:01 to 00:00:05");
    }

    #[test]
    fn cut_validation_order() {
        assert_eq!(
            CutForm::new("", "", "").validate(),
            Err(ValidationError::MissingSelection)
        );
        assert_eq!(
            CutForm::new("a.mp4", "00:00:01", " ").validate(),
            Err(ValidationError::MissingTimeRange)
        );
        assert_eq!(
            CutForm::new("a.mp4", "00:00:01", "00:00:02")
                .with_output("")
                .validate(),
            Err(ValidationError::MissingOutputName)
        );
        assert!(CutForm::new("a.mp4", "00:00:01", "00:00:02").validate().is_ok());
    }

    #[test]
    fn merge_validation() {
        let two = vec!["a.mp4".to_string(), "b.mp4".to_string()];
        assert_eq!(
            MergeForm::new(two.clone(), "").validate(),
            Err(ValidationError::MissingOutputName)
        );
        assert_eq!(
            MergeForm::new(vec!["a.mp4".to_string()], "m.mp4").validate(),
            Err(ValidationError::TooFewVideos { count: 1 })
        );
        assert_eq!(
            MergeForm::new(vec!["a.mp4".to_string(), String::new()], "m.mp4").validate(),
            Err(ValidationError::MissingSelection)
        );
        let form = MergeForm::new(two, "m.mp4");
        assert!(form.validate().is_ok());
        assert_eq!(form.title(), "Merge videos: a.mp4,b.mp4");
    }

    #[test]
    fn video_dir_is_trimmed() {
        assert_eq!(validate_video_dir("  /srv/videos "), Ok("/srv/videos"));
        assert_eq!(validate_video_dir(""), Err(ValidationError::MissingDirectory));
    }
}
