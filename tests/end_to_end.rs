//! Submit, poll, complete, view: the whole session flow.

mod common;

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;

use clipper_tasks::{
    ApiError, ClientConfig, ClipperError, CutForm, MergeForm, SinkTarget, TaskKind, TaskSession,
    TaskStatus, ValidationError, ViewOutcome,
};
use common::{snapshot, RecordingSink, ScriptedApi};

struct Harness {
    session: TaskSession,
    api: Arc<ScriptedApi>,
    player: Arc<RecordingSink>,
    preview: Arc<RecordingSink>,
}

fn harness() -> Harness {
    let api = ScriptedApi::new();
    let player = RecordingSink::new();
    let preview = RecordingSink::new();
    let session = TaskSession::with_api(
        &ClientConfig::default(),
        api.clone(),
        player.clone(),
        preview.clone(),
    );
    Harness {
        session,
        api,
        player,
        preview,
    }
}

async fn ticks(n: u32) {
    tokio::time::sleep(Duration::from_millis(3000) * n + Duration::from_millis(100)).await;
}

#[tokio::test(start_paused = true)]
async fn cut_task_plays_on_the_cut_sink() {
    let h = harness();
    let form = CutForm::from_positions("a.mp4", 10.0, 100.0);

    let submission = h.session.submit_cut(&form).unwrap();
    let id = submission.task_id;
    let record = h.session.registry().find(id).unwrap();
    assert_eq!(record.progress, 0);
    assert_eq!(record.status, TaskStatus::Processing);
    assert_eq!(record.kind, Some(TaskKind::Cut));
    assert_eq!(record.title, "Cut a.mp4 from 00:00:10 to 00:01:40");
    assert_eq!(h.session.view_result(id), ViewOutcome::NotReady);

    h.api.script_progress(id, &[35, 70, 100]);
    ticks(3).await;

    assert!(!submission.poll.is_active());
    assert!(h.session.dispatcher().is_viewable(id));
    assert_eq!(
        h.session.view_result(id),
        ViewOutcome::Played(SinkTarget::Player)
    );

    let played = h.player.played();
    assert_eq!(played.len(), 1);
    assert_eq!(played[0].url, "http://localhost:8080/api/videos/cut_a.mp4");
    assert_eq!(played[0].mime_type, "video/mp4");
    assert!(h.preview.played().is_empty());

    assert!(submission.request.await.unwrap().is_ok());
    let cuts = h.api.cuts();
    assert_eq!(cuts.len(), 1);
    assert_eq!(cuts[0].task_id, id);
    assert_eq!(cuts[0].output, "cut_a.mp4");
    assert_eq!(cuts[0].start, "00:00:10");
}

#[tokio::test(start_paused = true)]
async fn merge_task_plays_on_the_preview_sink() {
    let h = harness();
    let form = MergeForm::new(vec!["a.mp4".to_string(), "b.mov".to_string()], "joined.mov");

    let submission = h.session.submit_merge(&form).unwrap();
    h.api.script_progress(submission.task_id, &[100]);
    ticks(1).await;

    assert_eq!(
        h.session.view_result(submission.task_id),
        ViewOutcome::Played(SinkTarget::MergePreview)
    );
    assert_eq!(h.preview.played()[0].mime_type, "video/quicktime");
    assert!(h.player.played().is_empty());
    assert_eq!(h.api.merges()[0].videos, vec!["a.mp4", "b.mov"]);
}

#[tokio::test(start_paused = true)]
async fn invalid_forms_create_nothing() {
    let h = harness();

    let err = h
        .session
        .submit_cut(&CutForm::new("a.mp4", "00:00:01", ""))
        .unwrap_err();
    assert_eq!(err, ValidationError::MissingTimeRange);

    let err = h
        .session
        .submit_merge(&MergeForm::new(vec!["a.mp4".to_string()], "m.mp4"))
        .unwrap_err();
    assert_eq!(err, ValidationError::TooFewVideos { count: 1 });

    assert!(h.session.registry().is_empty());
    assert_eq!(h.session.poller().armed_count(), 0);
    assert!(h.api.cuts().is_empty());
}

#[tokio::test(start_paused = true)]
async fn failed_submission_keeps_polling() {
    let h = harness();
    h.api.fail_submissions(ApiError::Http {
        status: 500,
        body: "ffmpeg failed".to_string(),
    });

    let submission = h
        .session
        .submit_cut(&CutForm::new("a.mp4", "00:00:01", "00:00:02"))
        .unwrap();
    h.api.script_progress(submission.task_id, &[10]);

    let result = submission.request.await.unwrap();
    assert!(result.is_err());

    ticks(2).await;
    assert!(submission.poll.is_active());
    assert_eq!(h.api.polls(submission.task_id), 2);

    h.session.shutdown().await;
    assert!(!submission.poll.is_active());
}

#[tokio::test(start_paused = true)]
async fn two_quick_submissions_get_distinct_ids() {
    let h = harness();
    let first = h
        .session
        .submit_cut(&CutForm::new("a.mp4", "00:00:01", "00:00:02"))
        .unwrap();
    let second = h
        .session
        .submit_cut(&CutForm::new("b.mp4", "00:00:01", "00:00:02"))
        .unwrap();

    assert_ne!(first.task_id, second.task_id);
    assert_eq!(h.session.poller().armed_count(), 2);
    h.session.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn bootstrap_then_view() {
    let h = harness();
    h.api.set_task_list(vec![json!({
        "TaskID": 11,
        "Description": "Merge videos: a.mp4,b.mp4",
        "TaskType": "merge",
        "OutputFile": "/srv/videos/merged.mkv",
        "Progress": 100,
        "Status": "completed"
    })]);

    let report = h.session.bootstrap().await.unwrap();
    assert_eq!(report.completed.len(), 1);

    let id = report.completed[0];
    assert_eq!(
        h.session.view_result(id),
        ViewOutcome::Played(SinkTarget::MergePreview)
    );
    assert_eq!(
        h.preview.played()[0].url,
        "http://localhost:8080/api/videos/merged.mkv"
    );
}

#[tokio::test(start_paused = true)]
async fn wait_idle_after_all_tasks_finish() {
    let h = harness();
    let a = h
        .session
        .submit_cut(&CutForm::new("a.mp4", "00:00:01", "00:00:02"))
        .unwrap();
    let b = h
        .session
        .submit_merge(&MergeForm::new(
            vec!["a.mp4".to_string(), "b.mp4".to_string()],
            "m.mp4",
        ))
        .unwrap();
    h.api.script(a.task_id, vec![Ok(snapshot(a.task_id, 100))]);
    h.api.script_progress(b.task_id, &[50, 100]);

    let idle = tokio::time::timeout(Duration::from_secs(60), h.session.wait_idle()).await;
    assert!(idle.is_ok());
    assert_eq!(h.session.dispatcher().viewable(), {
        let mut ids = vec![a.task_id, b.task_id];
        ids.sort();
        ids
    });
}

#[tokio::test(start_paused = true)]
async fn video_library_operations() {
    let h = harness();
    h.api.set_videos(&["a.mp4", "b.mkv"], "/srv/videos");

    let listing = h.session.list_videos().await.unwrap();
    assert_eq!(listing.videos, vec!["a.mp4", "b.mkv"]);

    let err = h.session.set_video_dir("   ").await.unwrap_err();
    assert!(matches!(
        err,
        ClipperError::Validation(ValidationError::MissingDirectory)
    ));

    let dir = h.session.set_video_dir(" /mnt/clips ").await.unwrap();
    assert_eq!(dir, "/mnt/clips");

    let source = h.session.play_video("b.mkv").unwrap();
    assert_eq!(source.mime_type, "video/x-matroska");
    assert_eq!(h.player.played(), vec![source]);
}
