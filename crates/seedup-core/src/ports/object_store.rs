//! Cloud object store port (driven/secondary port)
//!
//! The remote API surface used by the remote index and the chunked uploader:
//! folder listing, folder creation, and the three calls of a resumable
//! upload (create session, send chunk, query session).
//!
//! ## Design Notes
//!
//! - Unlike the storage ports, this trait returns a typed
//!   [`ObjectStoreError`]: the uploader decides between retrying, failing
//!   transiently, and failing permanently from the classification alone.
//! - A [`ResumeToken`] is opaque to callers. Adapters encode whatever the
//!   provider needs to continue an interrupted session (for Google Drive,
//!   the session URI).

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{RemoteFileRecord, UploadError};

// ============================================================================
// ObjectStoreError
// ============================================================================

/// Errors reported by a cloud object store adapter
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ObjectStoreError {
    /// Credential rejected or missing (HTTP 401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Permission denied on the target (HTTP 403)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Storage quota exhausted
    #[error("Quota exceeded: {0}")]
    QuotaExceeded(String),

    /// Folder or object not found (HTTP 404 outside an upload session)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Resumable session no longer exists (HTTP 404/410 on a session URI)
    #[error("Upload session expired")]
    SessionExpired,

    /// Rate limited (HTTP 429)
    #[error("Too many requests")]
    TooManyRequests {
        /// Server-suggested wait before the next attempt
        retry_after: Option<Duration>,
    },

    /// Server-side error (HTTP 5xx)
    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// Connection failure before a response was received
    #[error("Network error: {0}")]
    Network(String),

    /// Request timed out
    #[error("Request timed out")]
    Timeout,

    /// Request rejected as malformed (HTTP 400 and other 4xx)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Response could not be interpreted
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl ObjectStoreError {
    /// Returns true for failures worth retrying with backoff
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ObjectStoreError::TooManyRequests { .. }
                | ObjectStoreError::Server { .. }
                | ObjectStoreError::Network(_)
                | ObjectStoreError::Timeout
                | ObjectStoreError::SessionExpired
        )
    }

    /// Server-suggested delay, if any
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            ObjectStoreError::TooManyRequests { retry_after } => *retry_after,
            _ => None,
        }
    }
}

impl From<ObjectStoreError> for UploadError {
    fn from(err: ObjectStoreError) -> Self {
        if err.is_transient() {
            UploadError::Transient(err.to_string())
        } else {
            UploadError::Permanent(err.to_string())
        }
    }
}

// ============================================================================
// DTOs
// ============================================================================

/// Metadata for a new resumable upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUpload {
    pub name: String,
    pub folder_id: String,
    pub size: u64,
    /// Content type; `None` lets the adapter derive one from `name`
    pub mime_type: Option<String>,
}

impl NewUpload {
    pub fn new(name: impl Into<String>, folder_id: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            folder_id: folder_id.into(),
            size,
            mime_type: None,
        }
    }
}

/// Opaque handle to a resumable upload session
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResumeToken(String);

impl ResumeToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Response to a single chunk
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkAck {
    /// More bytes are expected; `acknowledged` bytes are durably stored
    Incomplete { acknowledged: u64 },
    /// The object was committed
    Complete { remote_id: String, size: u64 },
}

/// State of a resumable session as reported by the remote
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// The session accepts more bytes starting at `acknowledged`
    Active { acknowledged: u64 },
    /// Every byte arrived and the object was committed
    Complete { remote_id: String, size: u64 },
    /// The session is gone; a new one is needed
    Expired,
}

// ============================================================================
// CloudObjectStore trait
// ============================================================================

/// Port for the cloud object storage API
#[async_trait]
pub trait CloudObjectStore: Send + Sync {
    /// Lists the files (not folders) directly inside `folder_id`
    async fn list_files(&self, folder_id: &str)
        -> Result<Vec<RemoteFileRecord>, ObjectStoreError>;

    /// Returns the id of the folder named `name` under `parent_id`,
    /// creating it when absent
    async fn ensure_folder(&self, name: &str, parent_id: &str)
        -> Result<String, ObjectStoreError>;

    /// Opens a resumable session for a new object
    async fn create_resumable_session(
        &self,
        upload: &NewUpload,
    ) -> Result<ResumeToken, ObjectStoreError>;

    /// Sends `data` starting at byte `offset` of a `total`-byte object
    ///
    /// Re-sending a range the remote already holds must be harmless.
    async fn upload_chunk(
        &self,
        token: &ResumeToken,
        offset: u64,
        data: &[u8],
        total: u64,
    ) -> Result<ChunkAck, ObjectStoreError>;

    /// Queries how many bytes of a session the remote holds
    async fn session_status(
        &self,
        token: &ResumeToken,
        total: u64,
    ) -> Result<SessionState, ObjectStoreError>;
}
