//! Domain error types
//!
//! Three layers of failure are distinguished:
//! - [`DomainError`] - validation failures and illegal state transitions
//! - [`UploadError`] - the outcome of a single failed task (retryable or not)
//! - [`PipelineError`] - batch-level failures (bad root path, unreachable remote,
//!   unreadable session, cancellation)

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid path format or content
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Task identifier could not be derived or parsed
    #[error("Invalid task id: {0}")]
    InvalidTaskId(String),

    /// Invalid state transition attempt
    #[error("Invalid state transition from {from} to {to}")]
    InvalidState {
        /// The current state
        from: String,
        /// The attempted target state
        to: String,
    },

    /// Torrent source is neither a magnet link nor an existing .torrent file
    #[error("Invalid torrent source: {0}")]
    InvalidTorrentSource(String),

    /// Generic validation failure
    #[error("Validation failed: {0}")]
    ValidationFailed(String),
}

/// Failure of a single upload task
///
/// `Transient` failures leave the task retryable in a future run;
/// `Permanent` failures exclude it from automatic retries.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UploadError {
    /// Retries were exhausted on a network timeout or 5xx-class error
    #[error("transient upload failure: {0}")]
    Transient(String),

    /// Quota exceeded, permission denied, or an invalid task
    #[error("permanent upload failure: {0}")]
    Permanent(String),
}

impl UploadError {
    /// Returns true if a later run may retry the task
    pub fn is_retryable(&self) -> bool {
        matches!(self, UploadError::Transient(_))
    }

    /// Returns the underlying message without the classification prefix
    pub fn message(&self) -> &str {
        match self {
            UploadError::Transient(msg) | UploadError::Permanent(msg) => msg,
        }
    }
}

/// Batch-level errors
///
/// `Io` and `RemoteUnavailable` are fatal preconditions for an invocation.
/// `SessionCorrupt` is reported by session stores and downgraded to a
/// warning by the orchestrator.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Local filesystem failure (missing or unreadable upload root)
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path that could not be accessed
        path: PathBuf,
        /// Underlying OS error
        #[source]
        source: std::io::Error,
    },

    /// Network or authentication failure talking to the cloud provider
    #[error("Remote unavailable: {0}")]
    RemoteUnavailable(String),

    /// Persisted session state could not be decoded
    #[error("Session state corrupt: {0}")]
    SessionCorrupt(String),

    /// The batch was cancelled before every task could be attempted
    #[error("Operation cancelled")]
    Cancelled,
}

impl PipelineError {
    /// Convenience constructor for [`PipelineError::Io`]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PipelineError::Io {
            path: path.into(),
            source,
        }
    }
}
