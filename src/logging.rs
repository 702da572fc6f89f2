//! `tracing` subscriber setup.
//!
//! The filter comes from `RUST_LOG` when set; otherwise the given default
//! directive applies. Events go to stderr so they do not interleave with
//! output meant for pipes.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::EnvFilter;

/// Installs the global subscriber with an `info` default.
///
/// Does nothing if a global subscriber is already installed.
pub fn init_logging() {
    let _ = init_logging_with("info");
}

/// Installs the global subscriber with `default_directive` as the fallback
/// filter (for example `"clipper_tasks=debug"`).
pub fn init_logging_with(default_directive: &str) -> Result<(), TryInitError> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_directive.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()
}
