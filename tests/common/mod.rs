//! Shared fakes for the integration tests.
//!
//! [`ScriptedApi`] answers status polls from a per-task script so poll
//! timers can be driven under tokio's paused clock. [`RecordingSink`]
//! records what a playback sink was asked to play.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use clipper_tasks::{
    ApiError, CutJob, MergeJob, PlaybackSink, PlaybackSource, TaskApi, TaskId, TaskSnapshot,
    VideoListing,
};

pub fn snapshot(id: TaskId, progress: i64) -> TaskSnapshot {
    TaskSnapshot {
        task_id: id,
        output_file: String::new(),
        progress,
    }
}

pub fn snapshot_with_output(id: TaskId, progress: i64, output_file: &str) -> TaskSnapshot {
    TaskSnapshot {
        task_id: id,
        output_file: output_file.to_string(),
        progress,
    }
}

/// A [`TaskApi`] whose answers are set up front.
///
/// Status scripts are consumed one response per poll; the last response
/// repeats once the script is exhausted. Unscripted tasks answer 404.
#[derive(Default)]
pub struct ScriptedApi {
    statuses: Mutex<HashMap<TaskId, VecDeque<Result<TaskSnapshot, ApiError>>>>,
    polls: Mutex<HashMap<TaskId, usize>>,
    tasks: Mutex<Option<Result<Vec<Value>, ApiError>>>,
    videos: Mutex<VideoListing>,
    cuts: Mutex<Vec<CutJob>>,
    merges: Mutex<Vec<MergeJob>>,
    submit_error: Mutex<Option<ApiError>>,
}

impl ScriptedApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Scripts successive progress values for `id`.
    pub fn script_progress(&self, id: TaskId, progress: &[i64]) {
        let responses = progress.iter().map(|p| Ok(snapshot(id, *p))).collect();
        self.script(id, responses);
    }

    pub fn script(&self, id: TaskId, responses: Vec<Result<TaskSnapshot, ApiError>>) {
        self.statuses.lock().insert(id, responses.into());
    }

    pub fn set_task_list(&self, entries: Vec<Value>) {
        *self.tasks.lock() = Some(Ok(entries));
    }

    pub fn fail_task_list(&self, error: ApiError) {
        *self.tasks.lock() = Some(Err(error));
    }

    pub fn set_videos(&self, videos: &[&str], video_dir: &str) {
        *self.videos.lock() = VideoListing {
            videos: videos.iter().map(|v| v.to_string()).collect(),
            video_dir: video_dir.to_string(),
        };
    }

    pub fn fail_submissions(&self, error: ApiError) {
        *self.submit_error.lock() = Some(error);
    }

    /// Number of status polls received for `id`.
    pub fn polls(&self, id: TaskId) -> usize {
        self.polls.lock().get(&id).copied().unwrap_or(0)
    }

    pub fn cuts(&self) -> Vec<CutJob> {
        self.cuts.lock().clone()
    }

    pub fn merges(&self) -> Vec<MergeJob> {
        self.merges.lock().clone()
    }

    fn submit_result(&self) -> Result<(), ApiError> {
        match self.submit_error.lock().clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl TaskApi for ScriptedApi {
    async fn list_videos(&self) -> Result<VideoListing, ApiError> {
        Ok(self.videos.lock().clone())
    }

    async fn set_video_dir(&self, video_dir: &str) -> Result<String, ApiError> {
        self.videos.lock().video_dir = video_dir.to_string();
        Ok(video_dir.to_string())
    }

    async fn submit_cut(&self, job: &CutJob) -> Result<(), ApiError> {
        self.cuts.lock().push(job.clone());
        self.submit_result()
    }

    async fn submit_merge(&self, job: &MergeJob) -> Result<(), ApiError> {
        self.merges.lock().push(job.clone());
        self.submit_result()
    }

    async fn list_tasks(&self) -> Result<Vec<Value>, ApiError> {
        self.tasks.lock().clone().unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn get_task(&self, id: TaskId) -> Result<TaskSnapshot, ApiError> {
        *self.polls.lock().entry(id).or_insert(0) += 1;

        let mut statuses = self.statuses.lock();
        let Some(script) = statuses.get_mut(&id) else {
            return Err(ApiError::Http {
                status: 404,
                body: "task not found".to_string(),
            });
        };
        let response = if script.len() > 1 {
            script.pop_front()
        } else {
            script.front().cloned()
        };
        response.unwrap_or_else(|| {
            Err(ApiError::Http {
                status: 404,
                body: "task not found".to_string(),
            })
        })
    }
}

/// A [`PlaybackSink`] that records every source it is given.
#[derive(Default)]
pub struct RecordingSink {
    played: Mutex<Vec<PlaybackSource>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn played(&self) -> Vec<PlaybackSource> {
        self.played.lock().clone()
    }
}

impl PlaybackSink for RecordingSink {
    fn play(&self, source: &PlaybackSource) {
        self.played.lock().push(source.clone());
    }
}
