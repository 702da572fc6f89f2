//! Property tests for the registry's progress rules and the time formatter.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use proptest::prelude::*;

use clipper_tasks::{
    format_time, ProgressOutcome, TaskId, TaskObserver, TaskRecord, TaskRegistry, TaskStatus,
};

#[derive(Default)]
struct Completions(AtomicUsize);

impl TaskObserver for Completions {
    fn on_completed(&self, _record: &TaskRecord) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

proptest! {
    /// Status always agrees with progress, and completion fires at most once.
    #[test]
    fn status_tracks_progress(reports in prop::collection::vec(0u8..=100, 1..40)) {
        let registry = TaskRegistry::new();
        let completions = Arc::new(Completions::default());
        registry.subscribe(completions.clone());
        let id = registry.create("t", Some(TaskId::new(1)));

        let mut reached = false;
        for p in &reports {
            let outcome = registry.apply_progress(id, *p);
            let record = registry.find(id).unwrap();

            prop_assert_eq!(record.status == TaskStatus::Completed, record.progress >= 100);
            if reached {
                prop_assert!(record.is_completed());
                prop_assert_ne!(outcome, ProgressOutcome::Completed);
            } else {
                prop_assert_eq!(record.progress, *p);
            }
            reached |= *p >= 100;
        }

        let expected = usize::from(reports.iter().any(|p| *p >= 100));
        prop_assert_eq!(completions.0.load(Ordering::SeqCst), expected);
    }

    /// Before completion, the last applied value wins regardless of order.
    #[test]
    fn last_write_wins_below_completion(reports in prop::collection::vec(0u8..100, 1..40)) {
        let registry = TaskRegistry::new();
        let id = registry.create("t", None);
        for p in &reports {
            prop_assert_eq!(registry.apply_progress(id, *p), ProgressOutcome::Updated);
        }
        prop_assert_eq!(registry.find(id).unwrap().progress, *reports.last().unwrap());
    }

    /// Reports for unknown ids never change the registry.
    #[test]
    fn unknown_ids_are_inert(
        known in prop::collection::btree_set(0i64..1000, 1..10),
        stray in 1000i64..2000,
        progress in 0u8..=100,
    ) {
        let registry = TaskRegistry::new();
        for id in &known {
            registry.create(format!("task {id}"), Some(TaskId::new(*id)));
        }
        let before = registry.snapshot();

        prop_assert_eq!(
            registry.apply_progress(TaskId::new(stray), progress),
            ProgressOutcome::Unknown
        );
        prop_assert_eq!(registry.snapshot(), before);
    }

    /// Every create yields a distinct id, even when ids are requested twice.
    #[test]
    fn ids_stay_unique(requested in prop::collection::vec(prop::option::of(0i64..20), 1..30)) {
        let registry = TaskRegistry::new();
        let mut ids: Vec<TaskId> = requested
            .iter()
            .map(|id| registry.create("t", id.map(TaskId::new)))
            .collect();
        let total = ids.len();
        ids.sort();
        ids.dedup();
        prop_assert_eq!(ids.len(), total);
        prop_assert_eq!(registry.len(), total);
    }

    /// Sequenced application never lets an older response overwrite a newer one.
    #[test]
    fn sequenced_reports_never_regress(
        reports in prop::collection::vec((0u64..50, 0u8..100), 1..40),
    ) {
        let registry = TaskRegistry::new();
        let id = registry.create("t", Some(TaskId::new(1)));

        let mut newest: Option<(u64, u8)> = None;
        for (sequence, progress) in &reports {
            registry.apply_progress_sequenced(id, *progress, *sequence);
            if newest.map_or(true, |(s, _)| *sequence > s) {
                newest = Some((*sequence, *progress));
            }
        }

        let record = registry.find(id).unwrap();
        let (sequence, progress) = newest.unwrap();
        prop_assert_eq!(record.last_sequence, Some(sequence));
        prop_assert_eq!(record.progress, progress);
    }

    /// Formatting is fixed-width for anything under 100 hours and round-trips.
    #[test]
    fn format_time_round_trips(seconds in 0u32..360_000) {
        let text = format_time(f64::from(seconds));
        prop_assert_eq!(text.len(), 8);

        let parts: Vec<u32> = text.split(':').map(|p| p.parse().unwrap()).collect();
        prop_assert_eq!(parts[0] * 3600 + parts[1] * 60 + parts[2], seconds);
        prop_assert!(parts[1] < 60 && parts[2] < 60);
    }
}

#[test]
fn format_time_examples() {
    assert_eq!(format_time(3723.0), "01:02:03");
    assert_eq!(format_time(0.0), "00:00:00");
}
