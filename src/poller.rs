//! Per-task poll timers.
//!
//! The job server never pushes updates, so every task still in progress
//! owns one repeating timer that asks the server for the task's status and
//! feeds the answer into the [`TaskRegistry`].
//!
//! # Lifecycle
//!
//! ```text
//! arm(id) --> [wait interval] --> fetch --> apply --+--> progress < 100: wait again
//!                                   |               +--> progress >= 100: stop
//!                                   +--> error: log, wait again
//! ```
//!
//! - The first fetch happens one interval after [`Poller::arm`].
//! - Completion is the only way a timer ends by itself. There is no retry
//!   limit and no backoff: the next tick is the retry.
//! - [`Poller::arm`] is idempotent per task. A task has at most one timer.
//! - Every tick carries a sequence number, so a response older than one
//!   already applied is dropped. A timer awaits its fetch before taking the
//!   next tick, and cancelling it drops the fetch in flight, so one timer
//!   never yields a stale response on its own. The check guards the
//!   registry against other writers that apply sequenced progress, such as
//!   a caller polling the same task through
//!   [`TaskRegistry::apply_progress_sequenced`].
//!
//! Each timer is a tokio task owned by a [`TaskTracker`] and stopped through
//! a [`CancellationToken`]. Cancellation is visible through the
//! [`PollHandle`] returned by `arm`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, warn};

use crate::client::TaskApi;
use crate::domain::TaskId;
use crate::error::ApiError;
use crate::registry::{ProgressOutcome, TaskRegistry};
use crate::types::wire::TaskSnapshot;

/// Handle to one task's poll timer.
///
/// Cloning the handle does not start another timer. Dropping it does not
/// stop the timer.
#[derive(Debug, Clone)]
pub struct PollHandle {
    task_id: TaskId,
    token: CancellationToken,
}

impl PollHandle {
    fn inactive(task_id: TaskId) -> Self {
        let token = CancellationToken::new();
        token.cancel();
        Self { task_id, token }
    }

    /// The task this timer polls.
    pub fn task_id(&self) -> TaskId {
        self.task_id
    }

    /// Returns `true` while the timer is running.
    pub fn is_active(&self) -> bool {
        !self.token.is_cancelled()
    }

    /// Stops the timer. Calling this more than once has no further effect.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Resolves once the timer has stopped, for whatever reason.
    pub async fn stopped(&self) {
        self.token.cancelled().await;
    }
}

struct ArmedTimer {
    token: CancellationToken,
    generation: u64,
}

struct PollerInner {
    registry: Arc<TaskRegistry>,
    api: Arc<dyn TaskApi>,
    interval: Duration,
    active: Mutex<HashMap<TaskId, ArmedTimer>>,
    tracker: TaskTracker,
    root: CancellationToken,
    idle: Notify,
    generation: AtomicU64,
    sequence: AtomicU64,
}

/// Starts and stops the poll timers of processing tasks.
///
/// `Poller` is cheap to clone; clones share the same timers.
#[derive(Clone)]
pub struct Poller {
    inner: Arc<PollerInner>,
}

impl Poller {
    /// Creates a poller that fetches from `api` every `interval` and applies
    /// the results to `registry`.
    pub fn new(registry: Arc<TaskRegistry>, api: Arc<dyn TaskApi>, interval: Duration) -> Self {
        Self {
            inner: Arc::new(PollerInner {
                registry,
                api,
                interval,
                active: Mutex::new(HashMap::new()),
                tracker: TaskTracker::new(),
                root: CancellationToken::new(),
                idle: Notify::new(),
                generation: AtomicU64::new(0),
                sequence: AtomicU64::new(0),
            }),
        }
    }

    /// The delay between two polls of the same task.
    pub fn interval(&self) -> Duration {
        self.inner.interval
    }

    /// Starts polling `id`.
    ///
    /// If the task is already armed, returns a handle to the running timer.
    /// If the task is unknown, already completed, or the poller has been shut
    /// down, nothing is started and the returned handle is inactive.
    ///
    /// Must be called from within a tokio runtime.
    pub fn arm(&self, id: TaskId) -> PollHandle {
        match self.inner.registry.find(id) {
            Some(record) if !record.is_completed() => {}
            Some(_) => {
                debug!(task_id = %id, "task already completed, not arming");
                return PollHandle::inactive(id);
            }
            None => {
                debug!(task_id = %id, "unknown task, not arming");
                return PollHandle::inactive(id);
            }
        }
        if self.inner.root.is_cancelled() {
            warn!(task_id = %id, "poller is shut down, not arming");
            return PollHandle::inactive(id);
        }

        let (token, generation) = {
            let mut active = self.inner.active.lock();
            if let Some(timer) = active.get(&id) {
                if !timer.token.is_cancelled() {
                    return PollHandle {
                        task_id: id,
                        token: timer.token.clone(),
                    };
                }
            }

            let token = self.inner.root.child_token();
            let generation = self.inner.generation.fetch_add(1, Ordering::Relaxed);
            active.insert(
                id,
                ArmedTimer {
                    token: token.clone(),
                    generation,
                },
            );
            (token, generation)
        };

        debug!(task_id = %id, interval_ms = self.inner.interval.as_millis() as u64, "poller armed");
        self.inner
            .tracker
            .spawn(poll_loop(self.inner.clone(), id, token.clone(), generation));

        PollHandle { task_id: id, token }
    }

    /// Stops polling `id`. Returns `false` if it was not armed.
    pub fn disarm(&self, id: TaskId) -> bool {
        let removed = self.inner.active.lock().remove(&id);
        match removed {
            Some(timer) => {
                let was_running = !timer.token.is_cancelled();
                timer.token.cancel();
                self.inner.notify_if_idle();
                if was_running {
                    debug!(task_id = %id, "poller disarmed");
                }
                was_running
            }
            None => false,
        }
    }

    /// Returns `true` if a timer is running for `id`.
    pub fn is_armed(&self, id: TaskId) -> bool {
        self.inner
            .active
            .lock()
            .get(&id)
            .is_some_and(|timer| !timer.token.is_cancelled())
    }

    /// Number of running timers.
    pub fn armed_count(&self) -> usize {
        self.inner
            .active
            .lock()
            .values()
            .filter(|timer| !timer.token.is_cancelled())
            .count()
    }

    /// Resolves once no timer is running.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.inner.idle.notified();
            if self.armed_count() == 0 {
                return;
            }
            notified.await;
        }
    }

    /// Stops every timer and waits for all poll loops to exit.
    ///
    /// After shutdown, [`arm`](Self::arm) returns inactive handles.
    pub async fn shutdown(&self) {
        debug!(armed = self.armed_count(), "shutting down poller");
        self.inner.root.cancel();
        self.inner.tracker.close();
        self.inner.tracker.wait().await;
        self.inner.active.lock().clear();
        self.inner.idle.notify_waiters();
    }
}

impl std::fmt::Debug for Poller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Poller")
            .field("interval", &self.inner.interval)
            .field("armed", &self.armed_count())
            .finish()
    }
}

impl PollerInner {
    fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn release(&self, id: TaskId, generation: u64) {
        let mut active = self.active.lock();
        if active.get(&id).is_some_and(|timer| timer.generation == generation) {
            active.remove(&id);
        }
        drop(active);
        self.notify_if_idle();
    }

    fn notify_if_idle(&self) {
        let idle = self
            .active
            .lock()
            .values()
            .all(|timer| timer.token.is_cancelled());
        if idle {
            self.idle.notify_waiters();
        }
    }

    /// Applies one status response. Returns `false` once polling should stop.
    fn handle_response(
        &self,
        id: TaskId,
        sequence: u64,
        fetched: Result<TaskSnapshot, ApiError>,
    ) -> bool {
        let snapshot = match fetched {
            Ok(snapshot) if snapshot.task_id == id => snapshot,
            Ok(snapshot) => {
                warn!(task_id = %id, reported = %snapshot.task_id, "status response names another task, ignoring");
                return true;
            }
            Err(e) => {
                warn!(task_id = %id, category = e.error_category(), error = %e, "status poll failed");
                return true;
            }
        };

        if let Some(output) = snapshot.output_ref() {
            self.registry.record_output(id, output);
        }

        let progress = snapshot.progress_percent();
        match self.registry.apply_progress_sequenced(id, progress, sequence) {
            ProgressOutcome::Unknown => {
                debug!(task_id = %id, "task left the registry, stopping poller");
                false
            }
            ProgressOutcome::Stale => true,
            ProgressOutcome::Completed | ProgressOutcome::Ignored => false,
            ProgressOutcome::Updated => {
                debug!(task_id = %id, progress, "progress applied");
                self.registry
                    .find(id)
                    .is_some_and(|record| !record.is_completed())
            }
        }
    }
}

async fn poll_loop(inner: Arc<PollerInner>, id: TaskId, token: CancellationToken, generation: u64) {
    let mut ticker = interval_at(Instant::now() + inner.interval, inner.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;

            _ = token.cancelled() => break,

            _ = ticker.tick() => {
                if !inner.registry.find(id).is_some_and(|record| !record.is_completed()) {
                    break;
                }

                let sequence = inner.next_sequence();
                let fetched = tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    fetched = inner.api.get_task(id) => fetched,
                };

                if !inner.handle_response(id, sequence, fetched) {
                    break;
                }
            }
        }
    }

    token.cancel();
    inner.release(id, generation);
    debug!(task_id = %id, "poller stopped");
}
