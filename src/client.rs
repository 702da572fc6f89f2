//! The job server's HTTP API.
//!
//! [`TaskApi`] is the seam between task tracking and the network: the
//! poller, bootstrap sync and submission path only ever talk to a
//! `dyn TaskApi`, so tests drive them with scripted fakes while
//! [`HttpTaskApi`] talks to a real server over `reqwest`.
//!
//! # Endpoints
//!
//! | Method | Path                  | Used by                |
//! |--------|-----------------------|------------------------|
//! | GET    | `/api/videos`         | [`TaskApi::list_videos`]   |
//! | POST   | `/api/videos/dir`     | [`TaskApi::set_video_dir`] |
//! | POST   | `/api/videos/cut`     | [`TaskApi::submit_cut`]    |
//! | POST   | `/api/videos/merge`   | [`TaskApi::submit_merge`]  |
//! | GET    | `/api/tasks`          | [`TaskApi::list_tasks`]    |
//! | GET    | `/api/tasks/{id}`     | [`TaskApi::get_task`]      |
//!
//! The cut and merge endpoints answer only once the job has finished, so
//! those requests carry no timeout. Everything else uses
//! [`ClientConfig::request_timeout`].

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::config::ClientConfig;
use crate::constants::{CUT_PATH, MERGE_PATH, TASKS_PATH, VIDEOS_PATH, VIDEO_DIR_PATH};
use crate::domain::TaskId;
use crate::error::ApiError;
use crate::types::wire::{
    CutJob, MergeJob, TaskListResponse, TaskSnapshot, TaskStatusResponse, VideoDirRequest,
    VideoListing,
};

/// Operations the task subsystem needs from the job server.
#[async_trait]
pub trait TaskApi: Send + Sync {
    /// Lists the videos in the server's current directory.
    async fn list_videos(&self) -> Result<VideoListing, ApiError>;

    /// Points the server at another video directory. Returns the directory
    /// the server now uses.
    async fn set_video_dir(&self, video_dir: &str) -> Result<String, ApiError>;

    /// Submits a cut job. Resolves when the server has finished it.
    async fn submit_cut(&self, job: &CutJob) -> Result<(), ApiError>;

    /// Submits a merge job. Resolves when the server has finished it.
    async fn submit_merge(&self, job: &MergeJob) -> Result<(), ApiError>;

    /// Returns the raw entries of the server's task list.
    async fn list_tasks(&self) -> Result<Vec<Value>, ApiError>;

    /// Fetches one task's current state.
    async fn get_task(&self, id: TaskId) -> Result<TaskSnapshot, ApiError>;
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoDirAck {
    #[serde(default)]
    video_dir: Option<String>,
}

/// [`TaskApi`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpTaskApi {
    root: String,
    client: Client,
    request_timeout: Duration,
}

impl HttpTaskApi {
    /// Creates a client for the server named in `config`.
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let client = Client::builder()
            .user_agent(concat!("clipper-tasks/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ApiError::Connection {
                message: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self::with_client(config, client))
    }

    /// Creates a client reusing an existing `reqwest` client.
    pub fn with_client(config: &ClientConfig, client: Client) -> Self {
        Self {
            root: config.api_root().to_string(),
            client,
            request_timeout: config.request_timeout(),
        }
    }

    /// The server root this client talks to.
    pub fn base_url(&self) -> &str {
        &self.root
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.root, path)
    }

    async fn send_checked(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        let body = serde_json::from_str::<ErrorBody>(&text)
            .map(|e| e.error)
            .unwrap_or(text);
        Err(ApiError::Http {
            status: status.as_u16(),
            body,
        })
    }

    /// Sends `request` and only looks at the status; the body is discarded.
    async fn send_empty(&self, request: RequestBuilder) -> Result<StatusCode, ApiError> {
        let response = self.send_checked(request).await?;
        Ok(response.status())
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let response = self.send_checked(request).await?;
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| ApiError::MalformedPayload {
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl TaskApi for HttpTaskApi {
    async fn list_videos(&self) -> Result<VideoListing, ApiError> {
        let request = self
            .client
            .get(self.url(VIDEOS_PATH))
            .timeout(self.request_timeout);
        self.send_json(request).await
    }

    async fn set_video_dir(&self, video_dir: &str) -> Result<String, ApiError> {
        let body = VideoDirRequest {
            video_dir: video_dir.to_string(),
        };
        let request = self
            .client
            .post(self.url(VIDEO_DIR_PATH))
            .timeout(self.request_timeout)
            .json(&body);
        let ack: VideoDirAck = self.send_json(request).await?;
        Ok(ack.video_dir.unwrap_or(body.video_dir))
    }

    async fn submit_cut(&self, job: &CutJob) -> Result<(), ApiError> {
        let request = self.client.post(self.url(CUT_PATH)).json(job);
        let status = self.send_empty(request).await?;
        debug!(task_id = %job.task_id, status = status.as_u16(), "cut request finished");
        Ok(())
    }

    async fn submit_merge(&self, job: &MergeJob) -> Result<(), ApiError> {
        let request = self.client.post(self.url(MERGE_PATH)).json(job);
        let status = self.send_empty(request).await?;
        debug!(task_id = %job.task_id, status = status.as_u16(), "merge request finished");
        Ok(())
    }

    async fn list_tasks(&self) -> Result<Vec<Value>, ApiError> {
        let request = self
            .client
            .get(self.url(TASKS_PATH))
            .timeout(self.request_timeout);
        let response: TaskListResponse = self.send_json(request).await?;
        Ok(response.tasks.unwrap_or_default())
    }

    async fn get_task(&self, id: TaskId) -> Result<TaskSnapshot, ApiError> {
        let request = self
            .client
            .get(self.url(&format!("{TASKS_PATH}/{id}")))
            .timeout(self.request_timeout);
        let response: TaskStatusResponse = self.send_json(request).await?;
        response.task.ok_or_else(|| ApiError::MalformedPayload {
            message: format!("status response for task {id} has no task object"),
        })
    }
}
