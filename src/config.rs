//! Client configuration.
//!
//! [`ClientConfig`] is read from an optional TOML file and then overridden
//! from the environment. Every field has a default, so an empty file (or no
//! file at all) is a valid configuration.
//!
//! # Example TOML
//!
//! ```toml
//! base_url = "http://192.168.1.20:8080"
//! poll_interval_ms = 3000
//! request_timeout_ms = 10000
//! ```
//!
//! # Environment
//!
//! | Variable                     | Field                |
//! |------------------------------|----------------------|
//! | `CLIPPER_BASE_URL`           | `base_url`           |
//! | `CLIPPER_POLL_INTERVAL_MS`   | `poll_interval_ms`   |
//! | `CLIPPER_REQUEST_TIMEOUT_MS` | `request_timeout_ms` |

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use url::Url;

use crate::constants::{DEFAULT_BASE_URL, DEFAULT_POLL_INTERVAL, DEFAULT_REQUEST_TIMEOUT};
use crate::error::ConfigError;

pub const ENV_BASE_URL: &str = "CLIPPER_BASE_URL";
pub const ENV_POLL_INTERVAL_MS: &str = "CLIPPER_POLL_INTERVAL_MS";
pub const ENV_REQUEST_TIMEOUT_MS: &str = "CLIPPER_REQUEST_TIMEOUT_MS";

/// Where the job server lives and how often to ask it about running jobs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Root URL of the job server, without the `/api` prefix.
    pub base_url: String,

    /// Delay between two status polls of the same task (ms).
    pub poll_interval_ms: u64,

    /// Timeout for status and list requests (ms). Submissions have none.
    pub request_timeout_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL.as_millis() as u64,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT.as_millis() as u64,
        }
    }
}

impl ClientConfig {
    /// Parse a TOML string into a validated [`ClientConfig`].
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a [`ClientConfig`] from a file path.
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Parse`] if the TOML is malformed, or
    /// [`ConfigError::Validation`] if validation fails.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            source,
            path: path.display().to_string(),
        })?;
        Self::from_toml(&content)
    }

    /// Applies `CLIPPER_*` environment overrides and re-validates.
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Applies overrides from an arbitrary key lookup and re-validates.
    ///
    /// Empty values are treated as unset.
    pub fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(base_url) = get(ENV_BASE_URL) {
            self.base_url = base_url.trim().to_string();
        }
        if let Some(raw) = get(ENV_POLL_INTERVAL_MS) {
            self.poll_interval_ms = parse_millis(ENV_POLL_INTERVAL_MS, &raw)?;
        }
        if let Some(raw) = get(ENV_REQUEST_TIMEOUT_MS) {
            self.request_timeout_ms = parse_millis(ENV_REQUEST_TIMEOUT_MS, &raw)?;
        }

        self.validate()?;
        Ok(self)
    }

    /// Validate that the config is usable.
    ///
    /// Checks:
    /// - `base_url` parses and uses `http` or `https`
    /// - `poll_interval_ms` is greater than zero
    /// - `request_timeout_ms` is greater than zero
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = Url::parse(&self.base_url).map_err(|e| ConfigError::Validation {
            message: format!("base_url '{}' is not a valid URL: {e}", self.base_url),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::Validation {
                message: format!("base_url must use http or https, got '{}'", url.scheme()),
            });
        }

        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Validation {
                message: "poll_interval_ms must be greater than 0".to_string(),
            });
        }
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::Validation {
                message: "request_timeout_ms must be greater than 0".to_string(),
            });
        }

        Ok(())
    }

    /// `base_url` without a trailing slash, ready for path joining.
    pub fn api_root(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    /// Convert the `poll_interval_ms` field to a [`Duration`].
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Convert the `request_timeout_ms` field to a [`Duration`].
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

fn parse_millis(key: &str, raw: &str) -> Result<u64, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::Validation {
        message: format!("{key} must be a whole number of milliseconds, got '{raw}'"),
    })
}
