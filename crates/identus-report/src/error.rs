//! Error types for the report pipeline.

use std::path::Path;
use std::time::Duration;

/// Report pipeline errors.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    /// The environment blob could not be decoded.
    #[error("invalid environment: {message}")]
    Environment { message: String },

    /// Configuration error.
    #[error("configuration error: {message}")]
    Config { message: String },

    /// Filesystem operation failed.
    #[error("io error at {path}: {message}")]
    Io { path: String, message: String },

    /// A raw result record could not be parsed.
    #[error("malformed result {path}: {message}")]
    MalformedResult { path: String, message: String },

    /// No further report id can be assigned in a history window.
    #[error("report history exhausted at {path}: {message}")]
    HistoryExhausted { path: String, message: String },

    /// The release version cannot be used as a snapshot name.
    #[error("invalid release version '{version}': {reason}")]
    InvalidReleaseVersion { version: String, reason: String },

    /// The release manifest could not be read or written.
    #[error("manifest error: {message}")]
    Manifest { message: String },

    /// The external report renderer failed.
    #[error("renderer failed: {message}")]
    Renderer { message: String },

    /// The renderer did not finish in time.
    #[error("renderer timed out after {0:?}")]
    RendererTimeout(Duration),

    /// The notification transport failed to deliver a message.
    #[error("notification failed for component {component}: {message}")]
    Notification { component: String, message: String },
}

impl ReportError {
    pub(crate) fn io(path: impl AsRef<Path>, err: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().display().to_string(),
            message: err.to_string(),
        }
    }

    pub(crate) fn manifest(message: impl Into<String>) -> Self {
        Self::Manifest {
            message: message.into(),
        }
    }

    /// Whether this error came from the notification transport.
    pub fn is_notification(&self) -> bool {
        matches!(self, Self::Notification { .. })
    }
}

/// Result type for report operations.
pub type ReportResult<T> = Result<T, ReportError>;
