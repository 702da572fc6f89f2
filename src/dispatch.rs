//! Completion dispatch.
//!
//! [`CompletionDispatcher`] subscribes to the registry's completion signal.
//! When a task completes it reveals that task's "view result" affordance;
//! invoking the affordance ([`CompletionDispatcher::view_result`]) routes
//! the task's output to a playback sink chosen by task kind:
//!
//! | Kind    | Sink                           |
//! |---------|--------------------------------|
//! | `cut`   | [`SinkTarget::Player`]         |
//! | `merge` | [`SinkTarget::MergePreview`]   |
//! | unknown | none (no-op)                   |
//!
//! The completion edge fires once per task, so the affordance is revealed
//! once; viewing may be repeated.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::constants::VIDEOS_PATH;
use crate::domain::{TaskId, TaskRecord};
use crate::error::ValidationError;
use crate::registry::{TaskObserver, TaskRegistry};
use crate::types::task::TaskKind;

/// A media source handed to a playback sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackSource {
    /// Absolute URL of the video stream.
    pub url: String,
    /// MIME type derived from the file extension.
    pub mime_type: &'static str,
}

impl PlaybackSource {
    /// Builds the source for a video served by the job server.
    ///
    /// The name is percent-encoded as one path segment. `!'()*` are encoded
    /// too; the server unescapes both forms to the same file name.
    ///
    /// ```
    /// use clipper_tasks::PlaybackSource;
    ///
    /// let source = PlaybackSource::for_video("http://localhost:8080", "my clip.MKV");
    /// assert_eq!(source.url, "http://localhost:8080/api/videos/my%20clip.MKV");
    /// assert_eq!(source.mime_type, "video/x-matroska");
    /// ```
    pub fn for_video(base_url: &str, name: &str) -> Self {
        Self {
            url: format!(
                "{}{}/{}",
                base_url.trim_end_matches('/'),
                VIDEOS_PATH,
                urlencoding::encode(name)
            ),
            mime_type: mime_type_for(name),
        }
    }
}

/// MIME type for a video file name. Unrecognized extensions map to
/// `video/mp4`.
pub fn mime_type_for(name: &str) -> &'static str {
    let extension = name.rsplit('.').next().unwrap_or_default().to_ascii_lowercase();
    match extension.as_str() {
        "mkv" => "video/x-matroska",
        "avi" => "video/x-msvideo",
        "mov" => "video/quicktime",
        _ => "video/mp4",
    }
}

/// An opaque media player.
pub trait PlaybackSink: Send + Sync {
    fn play(&self, source: &PlaybackSource);
}

/// Which player a result is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SinkTarget {
    /// The primary player (cut results, library videos).
    Player,
    /// The merge preview player.
    MergePreview,
}

impl SinkTarget {
    pub fn for_kind(kind: TaskKind) -> Self {
        match kind {
            TaskKind::Cut => Self::Player,
            TaskKind::Merge => Self::MergePreview,
        }
    }
}

impl fmt::Display for SinkTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Player => write!(f, "player"),
            Self::MergePreview => write!(f, "merge-preview"),
        }
    }
}

/// Result of invoking a task's "view result" affordance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewOutcome {
    /// The output was handed to this sink.
    Played(SinkTarget),
    /// The task has not completed (or its completion was never observed).
    NotReady,
    /// The task has no known kind; nothing to route to.
    UnknownKind,
    /// The task completed but no output file is known.
    MissingOutput,
    /// No task with that id.
    UnknownTask,
}

/// Routes completed tasks' outputs to the matching playback sink.
pub struct CompletionDispatcher {
    base_url: String,
    player: Arc<dyn PlaybackSink>,
    merge_preview: Arc<dyn PlaybackSink>,
    viewable: Mutex<HashSet<TaskId>>,
}

impl CompletionDispatcher {
    /// Creates a dispatcher that builds URLs against `base_url`.
    pub fn new(
        base_url: impl Into<String>,
        player: Arc<dyn PlaybackSink>,
        merge_preview: Arc<dyn PlaybackSink>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            player,
            merge_preview,
            viewable: Mutex::new(HashSet::new()),
        }
    }

    fn sink(&self, target: SinkTarget) -> &dyn PlaybackSink {
        match target {
            SinkTarget::Player => self.player.as_ref(),
            SinkTarget::MergePreview => self.merge_preview.as_ref(),
        }
    }

    /// Returns `true` once the task's "view result" affordance is revealed.
    pub fn is_viewable(&self, id: TaskId) -> bool {
        self.viewable.lock().contains(&id)
    }

    /// Ids of all tasks whose result can be viewed.
    pub fn viewable(&self) -> Vec<TaskId> {
        let mut ids: Vec<TaskId> = self.viewable.lock().iter().copied().collect();
        ids.sort();
        ids
    }

    /// Plays the result of task `id`, reading its current record.
    pub fn view_result(&self, registry: &TaskRegistry, id: TaskId) -> ViewOutcome {
        let Some(record) = registry.find(id) else {
            return ViewOutcome::UnknownTask;
        };
        if !record.is_completed() || !self.is_viewable(id) {
            return ViewOutcome::NotReady;
        }
        let Some(kind) = record.kind else {
            debug!(task_id = %id, "task kind unknown, nothing to play");
            return ViewOutcome::UnknownKind;
        };
        let Some(output) = record.output_ref.as_deref() else {
            debug!(task_id = %id, "task has no output file");
            return ViewOutcome::MissingOutput;
        };

        let target = SinkTarget::for_kind(kind);
        self.play_video(output, target).map_or(ViewOutcome::MissingOutput, |_| {
            ViewOutcome::Played(target)
        })
    }

    /// Plays a library video directly on `target`.
    pub fn play_video(
        &self,
        name: &str,
        target: SinkTarget,
    ) -> Result<PlaybackSource, ValidationError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::MissingSelection);
        }
        let source = PlaybackSource::for_video(&self.base_url, name);
        debug!(url = %source.url, mime_type = source.mime_type, sink = %target, "playing");
        self.sink(target).play(&source);
        Ok(source)
    }
}

impl TaskObserver for CompletionDispatcher {
    fn on_completed(&self, record: &TaskRecord) {
        if self.viewable.lock().insert(record.id) {
            info!(task_id = %record.id, kind = ?record.kind, output = ?record.output_ref, "result ready to view");
        }
    }
}

impl fmt::Debug for CompletionDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionDispatcher")
            .field("base_url", &self.base_url)
            .field("viewable", &self.viewable.lock().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recording(Mutex<Vec<PlaybackSource>>);

    impl PlaybackSink for Recording {
        fn play(&self, source: &PlaybackSource) {
            self.0.lock().push(source.clone());
        }
    }

    fn setup() -> (Arc<TaskRegistry>, Arc<CompletionDispatcher>, Arc<Recording>, Arc<Recording>) {
        let registry = Arc::new(TaskRegistry::new());
        let player = Arc::new(Recording::default());
        let preview = Arc::new(Recording::default());
        let dispatcher = Arc::new(CompletionDispatcher::new(
            "http://localhost:8080",
            player.clone(),
            preview.clone(),
        ));
        registry.subscribe(dispatcher.clone());
        (registry, dispatcher, player, preview)
    }

    #[test]
    fn mime_types() {
        assert_eq!(mime_type_for("a.mp4"), "video/mp4");
        assert_eq!(mime_type_for("a.MOV"), "video/quicktime");
        assert_eq!(mime_type_for("a.b.avi"), "video/x-msvideo");
        assert_eq!(mime_type_for("noext"), "video/mp4");
        assert_eq!(mime_type_for("a.webm"), "video/mp4");
    }

    #[test]
    fn video_name_is_one_encoded_segment() {
        let source = PlaybackSource::for_video("http://localhost:8080/", "a/b (1)!.mp4");
        assert_eq!(
            source.url,
            "http://localhost:8080/api/videos/a%2Fb%20%281%29%21.mp4"
        );
    }

    #[test]
    fn cut_plays_on_player() {
        let (registry, dispatcher, player, preview) = setup();
        let id = registry.create("t", Some(TaskId::new(1)));
        registry.set_metadata(id, Some(TaskKind::Cut), Some("cut_a.mp4"));
        assert_eq!(dispatcher.view_result(&registry, id), ViewOutcome::NotReady);

        registry.apply_progress(id, 100);
        assert!(dispatcher.is_viewable(id));
        assert_eq!(
            dispatcher.view_result(&registry, id),
            ViewOutcome::Played(SinkTarget::Player)
        );
        assert_eq!(
            player.0.lock()[0].url,
            "http://localhost:8080/api/videos/cut_a.mp4"
        );
        assert!(preview.0.lock().is_empty());
    }

    #[test]
    fn merge_plays_on_preview() {
        let (registry, dispatcher, player, preview) = setup();
        let id = registry.create("t", Some(TaskId::new(1)));
        registry.set_metadata(id, Some(TaskKind::Merge), Some("merged.mkv"));
        registry.apply_progress(id, 100);

        assert_eq!(
            dispatcher.view_result(&registry, id),
            ViewOutcome::Played(SinkTarget::MergePreview)
        );
        assert_eq!(preview.0.lock()[0].mime_type, "video/x-matroska");
        assert!(player.0.lock().is_empty());
    }

    #[test]
    fn unknown_kind_is_noop() {
        let (registry, dispatcher, player, preview) = setup();
        let id = registry.create("t", Some(TaskId::new(1)));
        registry.apply_progress(id, 100);
        assert_eq!(dispatcher.view_result(&registry, id), ViewOutcome::UnknownKind);
        assert!(player.0.lock().is_empty());
        assert!(preview.0.lock().is_empty());
    }

    #[test]
    fn missing_output_and_unknown_task() {
        let (registry, dispatcher, _player, _preview) = setup();
        let id = registry.create("t", Some(TaskId::new(1)));
        registry.set_metadata(id, Some(TaskKind::Cut), None);
        registry.apply_progress(id, 100);
        assert_eq!(dispatcher.view_result(&registry, id), ViewOutcome::MissingOutput);
        assert_eq!(
            dispatcher.view_result(&registry, TaskId::new(2)),
            ViewOutcome::UnknownTask
        );
    }

    #[test]
    fn play_video_rejects_empty_name() {
        let (_registry, dispatcher, player, _preview) = setup();
        assert_eq!(
            dispatcher.play_video("  ", SinkTarget::Player),
            Err(ValidationError::MissingSelection)
        );
        assert!(player.0.lock().is_empty());
    }
}
