//! UploadTask domain entity
//!
//! An `UploadTask` tracks one local file on its way to a destination folder.
//!
//! ## State Machine
//!
//! ```text
//!   ┌─────────┐  skip check   ┌─────────┐
//!   │ Pending │ ────────────► │ Skipped │
//!   └─────────┘               └─────────┘
//!        │ start
//!        ▼
//!   ┌────────────┐  complete  ┌───────────┐
//!   │ InProgress │ ─────────► │ Completed │
//!   └────────────┘            └───────────┘
//!        │ fail
//!        ▼
//!   ┌────────────────────┐
//!   │ Failed{retryable}  │ ── start (retryable only) ──► InProgress
//!   └────────────────────┘
//! ```
//!
//! `InProgress` can also be restarted: a record left in that state means the
//! process died mid-upload, and the uploader resumes from the remote offset.

use std::fmt::{self, Display, Formatter};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::{DomainError, UploadError};

// ============================================================================
// TaskId
// ============================================================================

/// Identity of an upload task, derived from the absolute local path
///
/// Two runs over the same file produce the same `TaskId`, which is what
/// lets a restarted batch find its previous outcome in the session store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    /// Derives a task id from an absolute path
    ///
    /// # Errors
    /// Returns `DomainError::InvalidTaskId` for relative or non UTF-8 paths.
    pub fn from_path(path: &Path) -> Result<Self, DomainError> {
        if !path.is_absolute() {
            return Err(DomainError::InvalidTaskId(format!(
                "path must be absolute: {}",
                path.display()
            )));
        }
        path.to_str()
            .map(|s| Self(s.to_string()))
            .ok_or_else(|| {
                DomainError::InvalidTaskId(format!("path is not UTF-8: {}", path.display()))
            })
    }

    /// Returns the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for TaskId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for TaskId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_path(Path::new(s))
    }
}

// ============================================================================
// TaskStatus
// ============================================================================

/// Lifecycle state of an upload task
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Enumerated, not yet examined
    #[default]
    Pending,
    /// Chunks are being transmitted
    InProgress,
    /// The remote confirmed the full object
    Completed,
    /// Already present at the destination
    Skipped,
    /// Gave up; `retryable` decides whether the next run tries again
    Failed {
        /// Whether a later run should attempt the task again
        retryable: bool,
    },
}

impl TaskStatus {
    /// Returns true for states that end a task within a batch
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Skipped | TaskStatus::Failed { .. }
        )
    }

    /// Returns true if a run starting from this state should attempt an upload
    pub fn needs_upload(&self) -> bool {
        matches!(
            self,
            TaskStatus::Pending | TaskStatus::InProgress | TaskStatus::Failed { retryable: true }
        )
    }

    /// Stable storage name for the state
    pub fn name(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Skipped => "skipped",
            TaskStatus::Failed { retryable: true } => "failed_retryable",
            TaskStatus::Failed { retryable: false } => "failed_permanent",
        }
    }

    /// Parses a name produced by [`TaskStatus::name`]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "pending" => Some(TaskStatus::Pending),
            "in_progress" => Some(TaskStatus::InProgress),
            "completed" => Some(TaskStatus::Completed),
            "skipped" => Some(TaskStatus::Skipped),
            "failed_retryable" => Some(TaskStatus::Failed { retryable: true }),
            "failed_permanent" => Some(TaskStatus::Failed { retryable: false }),
            _ => None,
        }
    }
}

impl Display for TaskStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// UploadTask
// ============================================================================

/// A local file scheduled for upload to a destination folder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadTask {
    id: TaskId,
    local_path: PathBuf,
    name: String,
    size: u64,
    destination_folder_id: String,
    status: TaskStatus,
    attempts: u32,
    last_error: Option<String>,
    remote_id: Option<String>,
}

impl UploadTask {
    /// Creates a Pending task for an absolute local file path
    ///
    /// # Errors
    /// Returns an error if the path is relative, not UTF-8, or has no file name.
    pub fn new(
        local_path: PathBuf,
        size: u64,
        destination_folder_id: impl Into<String>,
    ) -> Result<Self, DomainError> {
        let id = TaskId::from_path(&local_path)?;
        let name = local_path
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .ok_or_else(|| {
                DomainError::InvalidPath(format!("no file name: {}", local_path.display()))
            })?;

        Ok(Self {
            id,
            local_path,
            name,
            size,
            destination_folder_id: destination_folder_id.into(),
            status: TaskStatus::Pending,
            attempts: 0,
            last_error: None,
            remote_id: None,
        })
    }

    /// Seeds status, attempt count and last error from a previous run
    pub fn restore(
        &mut self,
        status: TaskStatus,
        attempts: u32,
        last_error: Option<String>,
        remote_id: Option<String>,
    ) {
        self.status = status;
        self.attempts = attempts;
        self.last_error = last_error;
        self.remote_id = remote_id;
    }

    // --- accessors ---

    pub fn id(&self) -> &TaskId {
        &self.id
    }

    pub fn local_path(&self) -> &Path {
        &self.local_path
    }

    /// File name used at the destination
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn destination_folder_id(&self) -> &str {
        &self.destination_folder_id
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn remote_id(&self) -> Option<&str> {
        self.remote_id.as_deref()
    }

    // --- transitions ---

    /// Begins (or resumes) an upload attempt
    pub fn start(&mut self) -> Result<(), DomainError> {
        if !self.status.needs_upload() {
            return Err(self.invalid_transition(TaskStatus::InProgress));
        }
        self.status = TaskStatus::InProgress;
        self.attempts += 1;
        Ok(())
    }

    /// Marks the task as confirmed by the remote
    pub fn complete(&mut self, remote_id: impl Into<String>) -> Result<(), DomainError> {
        if self.status != TaskStatus::InProgress {
            return Err(self.invalid_transition(TaskStatus::Completed));
        }
        self.status = TaskStatus::Completed;
        self.remote_id = Some(remote_id.into());
        self.last_error = None;
        Ok(())
    }

    /// Resolves the task as already present at the destination
    pub fn skip(&mut self) -> Result<(), DomainError> {
        if !self.status.needs_upload() || self.status == TaskStatus::InProgress {
            return Err(self.invalid_transition(TaskStatus::Skipped));
        }
        self.status = TaskStatus::Skipped;
        Ok(())
    }

    /// Records a failed attempt
    pub fn fail(&mut self, error: &UploadError) -> Result<(), DomainError> {
        let next = TaskStatus::Failed {
            retryable: error.is_retryable(),
        };
        if self.status != TaskStatus::InProgress {
            return Err(self.invalid_transition(next));
        }
        self.status = next;
        self.last_error = Some(error.to_string());
        Ok(())
    }

    fn invalid_transition(&self, to: TaskStatus) -> DomainError {
        DomainError::InvalidState {
            from: self.status.name().to_string(),
            to: to.name().to_string(),
        }
    }
}
