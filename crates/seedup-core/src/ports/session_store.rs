//! Session persistence ports (driven/secondary ports)
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because storage errors are adapter-specific
//!   (SQLite, files) and the orchestrator only needs to know that a write
//!   failed, not why.
//! - `save` writes one record at a time and must be atomic per record so
//!   interleaved writes from concurrent workers never tear.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::object_store::ResumeToken;
use crate::domain::{TaskId, TaskStatus, UploadTask};

/// Durable snapshot of an upload task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub task_id: TaskId,
    pub status: TaskStatus,
    pub attempts: u32,
    pub last_error: Option<String>,
    pub remote_id: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl SessionRecord {
    /// Captures the current state of a task
    pub fn from_task(task: &UploadTask) -> Self {
        Self {
            task_id: task.id().clone(),
            status: task.status(),
            attempts: task.attempts(),
            last_error: task.last_error().map(str::to_string),
            remote_id: task.remote_id().map(str::to_string),
            updated_at: Utc::now(),
        }
    }
}

/// Port for orchestrator progress persistence
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Reads every record; an empty map when no prior session exists
    async fn load(&self) -> anyhow::Result<HashMap<TaskId, SessionRecord>>;

    /// Inserts or replaces the record for `record.task_id`
    async fn save(&self, record: &SessionRecord) -> anyhow::Result<()>;

    /// Discards all records
    async fn clear(&self) -> anyhow::Result<()>;
}

/// Port for remembering open resumable sessions across process restarts
///
/// Tokens are keyed by task and destination folder so a file re-targeted
/// to another folder never resumes into the wrong session.
#[async_trait]
pub trait ResumeTokenStore: Send + Sync {
    async fn load_token(
        &self,
        task_id: &TaskId,
        folder_id: &str,
    ) -> anyhow::Result<Option<ResumeToken>>;

    async fn save_token(
        &self,
        task_id: &TaskId,
        folder_id: &str,
        token: &ResumeToken,
    ) -> anyhow::Result<()>;

    async fn discard_token(&self, task_id: &TaskId, folder_id: &str) -> anyhow::Result<()>;
}
