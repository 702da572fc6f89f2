//! One client session against one job server.
//!
//! [`TaskSession`] owns the registry and wires the poller, the completion
//! dispatcher, bootstrap sync and the submission path to it. It is what a
//! front-end holds on to; the individual components stay usable on their
//! own for tests and embedders that need different wiring.

use std::sync::Arc;

use tracing::info;

use crate::bootstrap::{BootstrapReport, BootstrapSync};
use crate::client::{HttpTaskApi, TaskApi};
use crate::config::ClientConfig;
use crate::dispatch::{CompletionDispatcher, PlaybackSink, PlaybackSource, SinkTarget, ViewOutcome};
use crate::domain::TaskId;
use crate::error::{ApiError, ClipperError, ValidationError};
use crate::poller::Poller;
use crate::registry::{TaskObserver, TaskRegistry};
use crate::submit::{validate_video_dir, CutForm, MergeForm, Submission, Submitter};
use crate::types::wire::VideoListing;

/// Registry, poller, dispatcher and API client for one server.
pub struct TaskSession {
    registry: Arc<TaskRegistry>,
    poller: Poller,
    dispatcher: Arc<CompletionDispatcher>,
    api: Arc<dyn TaskApi>,
    submitter: Submitter,
}

impl TaskSession {
    /// Connects to the server named in `config` over HTTP.
    pub fn connect(
        config: &ClientConfig,
        player: Arc<dyn PlaybackSink>,
        merge_preview: Arc<dyn PlaybackSink>,
    ) -> Result<Self, ApiError> {
        let api = HttpTaskApi::new(config)?;
        Ok(Self::with_api(config, Arc::new(api), player, merge_preview))
    }

    /// Builds a session on top of any [`TaskApi`].
    pub fn with_api(
        config: &ClientConfig,
        api: Arc<dyn TaskApi>,
        player: Arc<dyn PlaybackSink>,
        merge_preview: Arc<dyn PlaybackSink>,
    ) -> Self {
        let registry = Arc::new(TaskRegistry::new());
        let poller = Poller::new(registry.clone(), api.clone(), config.poll_interval());
        let dispatcher = Arc::new(CompletionDispatcher::new(
            config.api_root(),
            player,
            merge_preview,
        ));
        registry.subscribe(dispatcher.clone());
        let submitter = Submitter::new(registry.clone(), poller.clone(), api.clone());

        Self {
            registry,
            poller,
            dispatcher,
            api,
            submitter,
        }
    }

    pub fn registry(&self) -> &Arc<TaskRegistry> {
        &self.registry
    }

    pub fn poller(&self) -> &Poller {
        &self.poller
    }

    pub fn dispatcher(&self) -> &CompletionDispatcher {
        &self.dispatcher
    }

    /// Adds a presentation observer.
    pub fn subscribe(&self, observer: Arc<dyn TaskObserver>) {
        self.registry.subscribe(observer);
    }

    /// Restores the server's task list into the registry.
    pub async fn bootstrap(&self) -> Result<BootstrapReport, ApiError> {
        BootstrapSync::new(self.registry.clone(), self.poller.clone(), self.api.clone())
            .run()
            .await
    }

    pub fn submit_cut(&self, form: &CutForm) -> Result<Submission, ValidationError> {
        self.submitter.submit_cut(form)
    }

    pub fn submit_merge(&self, form: &MergeForm) -> Result<Submission, ValidationError> {
        self.submitter.submit_merge(form)
    }

    pub async fn list_videos(&self) -> Result<VideoListing, ApiError> {
        self.api.list_videos().await
    }

    /// Points the server at another video directory and returns the
    /// directory it now uses.
    pub async fn set_video_dir(&self, video_dir: &str) -> Result<String, ClipperError> {
        let video_dir = validate_video_dir(video_dir)?;
        let applied = self.api.set_video_dir(video_dir).await?;
        info!(video_dir = %applied, "video directory updated");
        Ok(applied)
    }

    /// Invokes task `id`'s "view result" affordance.
    pub fn view_result(&self, id: TaskId) -> ViewOutcome {
        self.dispatcher.view_result(&self.registry, id)
    }

    /// Plays a library video on the primary player.
    pub fn play_video(&self, name: &str) -> Result<PlaybackSource, ValidationError> {
        self.dispatcher.play_video(name, SinkTarget::Player)
    }

    /// Resolves once no task is being polled.
    pub async fn wait_idle(&self) {
        self.poller.wait_idle().await;
    }

    /// Stops all pollers and waits for in-flight submissions.
    pub async fn shutdown(&self) {
        self.poller.shutdown().await;
        self.submitter.wait().await;
    }
}

impl std::fmt::Debug for TaskSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskSession")
            .field("registry", &self.registry)
            .field("poller", &self.poller)
            .field("dispatcher", &self.dispatcher)
            .finish()
    }
}
