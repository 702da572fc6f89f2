//! Task tracking and progress synchronization for the video clipper.
//!
//! The job server runs long video edits (clip extraction, multi-file
//! concatenation) and never pushes updates. This crate keeps a client-side
//! model of the jobs the user knows about and keeps it in step with what the
//! server reports by polling.
//!
//! # Overview
//!
//! A job progresses through a two-state machine
//! (`processing` -> `completed`) that is derived entirely from its progress
//! percentage. Each job still in progress owns exactly one repeating poll
//! timer; the first poll that observes 100% cancels the timer and hands the
//! job's output to the matching playback sink.
//!
//! # Module Organization
//!
//! - [`registry`] - The in-memory task registry and its observer signals
//! - [`poller`] - Per-task cancelable poll timers
//! - [`dispatch`] - Completion dispatch to playback sinks
//! - [`bootstrap`] - Startup reconciliation from the server's task list
//! - [`submit`] - Cut/merge form validation and submission
//! - [`session`] - A facade wiring all of the above to one server
//! - [`client`] - The typed HTTP client for the job server
//! - [`types`] - Wire types and task enums
//! - [`time`] - `HH:MM:SS` formatting and timestamp ids
//! - [`config`] - TOML/env client configuration
//! - [`error`] - Error types

pub mod bootstrap;
pub mod client;
pub mod config;
pub mod constants;
pub mod dispatch;
pub mod error;
pub mod poller;
pub mod registry;
pub mod session;
pub mod submit;
pub mod time;
pub mod types;

/// Domain types (TaskId, TaskRecord) for the client-side task model.
pub mod domain;

#[cfg(feature = "logging")]
pub mod logging;

// Re-exports for ergonomic access
pub use bootstrap::{BootstrapReport, BootstrapSync};
pub use client::{HttpTaskApi, TaskApi};
pub use config::ClientConfig;
pub use dispatch::{
    mime_type_for, CompletionDispatcher, PlaybackSink, PlaybackSource, SinkTarget, ViewOutcome,
};
pub use domain::{TaskId, TaskRecord};
pub use error::{ApiError, ClipperError, ConfigError, ValidationError};
pub use poller::{PollHandle, Poller};
pub use registry::{ProgressOutcome, TaskObserver, TaskRegistry};
pub use session::TaskSession;
pub use submit::{validate_video_dir, CutForm, MergeForm, Submission, Submitter};
pub use time::{current_timestamp, format_time};
pub use types::*;
