//! Error types for the clipper task client.
//!
//! Failures fall into three groups, each with its own enum:
//!
//! - [`ApiError`] - transient network/API failures. Logged, never fatal;
//!   the poller's next tick acts as the retry.
//! - [`ValidationError`] - user input rejected before any request is sent.
//! - [`ConfigError`] - configuration file or environment problems.
//!
//! [`ClipperError`] wraps all three for callers that do not care which.
//! Registry lookups are not errors: an unknown task id is an expected race
//! and is reported as a value (see [`ProgressOutcome`](crate::ProgressOutcome)).

/// Transport and protocol errors from the job server.
///
/// Each variant is a distinct failure category so logs can tell a dead
/// server from a bad payload.
///
/// # Examples
///
/// ```
/// use clipper_tasks::ApiError;
///
/// let err = ApiError::Http { status: 404, body: "task not found".to_string() };
/// assert_eq!(err.error_category(), "http");
/// assert!(err.to_string().contains("404"));
/// ```
#[derive(Debug, thiserror::Error, Clone)]
pub enum ApiError {
    /// The server answered with a non-success status code.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The request exceeded the configured timeout.
    #[error("Request timed out")]
    Timeout,

    /// Connection-level failure (DNS resolution, TCP connect, TLS handshake).
    #[error("Connection error: {message}")]
    Connection { message: String },

    /// The response body could not be decoded or lacked a required field.
    #[error("Malformed payload: {message}")]
    MalformedPayload { message: String },
}

impl ApiError {
    /// Returns the error category as a static string for log fields.
    ///
    /// Categories: `"http"`, `"timeout"`, `"connection"`, `"payload"`.
    pub fn error_category(&self) -> &'static str {
        match self {
            Self::Http { .. } => "http",
            Self::Timeout => "timeout",
            Self::Connection { .. } => "connection",
            Self::MalformedPayload { .. } => "payload",
        }
    }

    /// Returns `true` if the server reported the resource as missing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Http { status: 404, .. })
    }

    /// Classify a [`reqwest::Error`] into the appropriate [`ApiError`] variant.
    pub fn classify_reqwest(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_connect() {
            Self::Connection {
                message: err.to_string(),
            }
        } else if err.is_decode() {
            Self::MalformedPayload {
                message: err.to_string(),
            }
        } else if let Some(status) = err.status() {
            Self::Http {
                status: status.as_u16(),
                body: err.to_string(),
            }
        } else {
            Self::Connection {
                message: err.to_string(),
            }
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        Self::classify_reqwest(&err)
    }
}

/// User input rejected before a request is issued.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// No source video was selected.
    #[error("select a video first")]
    MissingSelection,

    /// The start or end time of a cut is empty.
    #[error("fill in both the start and the end time")]
    MissingTimeRange,

    /// The output file name is empty.
    #[error("enter an output file name")]
    MissingOutputName,

    /// A merge needs at least two source videos.
    #[error("select at least two videos to merge (got {count})")]
    TooFewVideos { count: usize },

    /// The new video directory is empty.
    #[error("enter a valid directory path")]
    MissingDirectory,
}

/// Errors while reading or validating [`ClientConfig`](crate::ClientConfig).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("Failed to parse config TOML: {source}")]
    Parse {
        #[from]
        source: toml::de::Error,
    },

    /// The config parsed but holds unusable values.
    #[error("Config validation error: {message}")]
    Validation { message: String },

    /// The config file could not be read.
    #[error("Failed to read config file '{path}': {source}")]
    Io {
        source: std::io::Error,
        path: String,
    },
}

/// Any error produced by this crate.
#[derive(Debug, thiserror::Error)]
pub enum ClipperError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_category() {
        assert_eq!(
            ApiError::Http {
                status: 500,
                body: "boom".to_string()
            }
            .error_category(),
            "http"
        );
        assert_eq!(ApiError::Timeout.error_category(), "timeout");
        assert_eq!(
            ApiError::Connection {
                message: "refused".to_string()
            }
            .error_category(),
            "connection"
        );
        assert_eq!(
            ApiError::MalformedPayload {
                message: "no task".to_string()
            }
            .error_category(),
            "payload"
        );
    }

    #[test]
    fn test_is_not_found() {
        let err = ApiError::Http {
            status: 404,
            body: String::new(),
        };
        assert!(err.is_not_found());
        assert!(!ApiError::Timeout.is_not_found());
    }

    #[test]
    fn test_validation_messages() {
        assert_eq!(
            ValidationError::TooFewVideos { count: 1 }.to_string(),
            "select at least two videos to merge (got 1)"
        );
        assert_eq!(
            ValidationError::MissingTimeRange.to_string(),
            "fill in both the start and the end time"
        );
    }

    #[test]
    fn test_umbrella_is_transparent() {
        let err: ClipperError = ValidationError::MissingSelection.into();
        assert_eq!(err.to_string(), "select a video first");

        let err: ClipperError = ApiError::Timeout.into();
        assert_eq!(err.to_string(), "Request timed out");
    }
}
