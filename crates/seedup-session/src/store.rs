//! SQLite implementation of SessionStore and ResumeTokenStore
//!
//! ## Type Mapping
//!
//! | Domain Type     | SQL Type | Strategy                                  |
//! |-----------------|----------|-------------------------------------------|
//! | TaskId          | TEXT     | `.as_str()` / `FromStr`                   |
//! | TaskStatus      | TEXT     | `.name()` / `TaskStatus::from_name()`     |
//! | DateTime<Utc>   | TEXT     | `to_rfc3339()` / `parse_from_rfc3339()`   |
//! | ResumeToken     | TEXT     | `.as_str()` / `ResumeToken::new()`        |
//!
//! Every write is a single statement, so each record is replaced atomically
//! and a crash mid-write leaves the previous version intact.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use seedup_core::domain::{TaskId, TaskStatus};
use seedup_core::ports::{ResumeToken, ResumeTokenStore, SessionRecord, SessionStore};

use crate::pool::DatabasePool;
use crate::SessionDbError;

/// SQLite-backed session store
#[derive(Clone)]
pub struct SqliteSessionStore {
    pool: SqlitePool,
}

impl SqliteSessionStore {
    /// Wraps an existing pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Opens the database at `path`, moving an unreadable file aside
    ///
    /// A database that cannot be opened or migrated is renamed to
    /// `<name>.corrupt` and replaced by an empty one. The previous session
    /// is lost, which is logged as a warning and never treated as fatal.
    pub async fn open_or_reset(path: &Path) -> Result<Self, SessionDbError> {
        match DatabasePool::new(path).await {
            Ok(pool) => Ok(Self::new(pool.pool().clone())),
            Err(err) if path.exists() => {
                let aside = corrupt_path(path);
                tracing::warn!(
                    path = %path.display(),
                    moved_to = %aside.display(),
                    error = %err,
                    "Session database unreadable, starting an empty session"
                );
                std::fs::rename(path, &aside).map_err(|e| {
                    SessionDbError::ResetFailed(format!(
                        "Failed to move {} aside: {}",
                        path.display(),
                        e
                    ))
                })?;
                for suffix in ["-wal", "-shm"] {
                    let sidecar = sibling(path, suffix);
                    if sidecar.exists() {
                        let _ = std::fs::remove_file(&sidecar);
                    }
                }
                let pool = DatabasePool::new(path).await?;
                Ok(Self::new(pool.pool().clone()))
            }
            Err(err) => Err(err),
        }
    }

    /// Counts records per status name
    pub async fn count_by_status(&self) -> anyhow::Result<HashMap<String, u64>> {
        let rows = sqlx::query("SELECT status, COUNT(*) AS count FROM upload_tasks GROUP BY status")
            .fetch_all(&self.pool)
            .await?;

        let mut counts = HashMap::new();
        for row in &rows {
            let status: String = row.get("status");
            let count: i64 = row.get("count");
            counts.insert(status, count as u64);
        }
        Ok(counts)
    }
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

fn corrupt_path(path: &Path) -> PathBuf {
    sibling(path, ".corrupt")
}

fn record_from_row(row: &SqliteRow) -> anyhow::Result<SessionRecord> {
    let task_id: String = row.try_get("task_id")?;
    let status: String = row.try_get("status")?;
    let attempts: i64 = row.try_get("attempts")?;
    let updated_at: String = row.try_get("updated_at")?;

    let task_id: TaskId = task_id
        .parse()
        .with_context(|| format!("invalid task id '{task_id}'"))?;
    let status = TaskStatus::from_name(&status)
        .with_context(|| format!("unknown status '{status}'"))?;
    let updated_at = DateTime::parse_from_rfc3339(&updated_at)
        .with_context(|| format!("invalid timestamp '{updated_at}'"))?
        .with_timezone(&Utc);

    Ok(SessionRecord {
        task_id,
        status,
        attempts: u32::try_from(attempts).unwrap_or(0),
        last_error: row.try_get("last_error")?,
        remote_id: row.try_get("remote_id")?,
        updated_at,
    })
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn load(&self) -> anyhow::Result<HashMap<TaskId, SessionRecord>> {
        let rows = sqlx::query(
            "SELECT task_id, status, attempts, last_error, remote_id, updated_at \
             FROM upload_tasks",
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to read upload session")?;

        let mut records = HashMap::with_capacity(rows.len());
        for row in &rows {
            match record_from_row(row) {
                Ok(record) => {
                    records.insert(record.task_id.clone(), record);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping undecodable session record");
                }
            }
        }

        tracing::debug!(records = records.len(), "Loaded upload session");
        Ok(records)
    }

    async fn save(&self, record: &SessionRecord) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO upload_tasks \
             (task_id, status, attempts, last_error, remote_id, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?) \
             ON CONFLICT(task_id) DO UPDATE SET \
               status = excluded.status, \
               attempts = excluded.attempts, \
               last_error = excluded.last_error, \
               remote_id = excluded.remote_id, \
               updated_at = excluded.updated_at",
        )
        .bind(record.task_id.as_str())
        .bind(record.status.name())
        .bind(i64::from(record.attempts))
        .bind(&record.last_error)
        .bind(&record.remote_id)
        .bind(record.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to save session record for {}", record.task_id))?;

        tracing::trace!(task_id = %record.task_id, status = %record.status, "Saved session record");
        Ok(())
    }

    async fn clear(&self) -> anyhow::Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM upload_tasks")
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM resume_tokens")
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        tracing::info!("Cleared upload session");
        Ok(())
    }
}

#[async_trait]
impl ResumeTokenStore for SqliteSessionStore {
    async fn load_token(
        &self,
        task_id: &TaskId,
        folder_id: &str,
    ) -> anyhow::Result<Option<ResumeToken>> {
        let row = sqlx::query("SELECT token FROM resume_tokens WHERE task_id = ? AND folder_id = ?")
            .bind(task_id.as_str())
            .bind(folder_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| ResumeToken::new(r.get::<String, _>("token"))))
    }

    async fn save_token(
        &self,
        task_id: &TaskId,
        folder_id: &str,
        token: &ResumeToken,
    ) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT OR REPLACE INTO resume_tokens (task_id, folder_id, token, created_at) \
             VALUES (?, ?, ?, ?)",
        )
        .bind(task_id.as_str())
        .bind(folder_id)
        .bind(token.as_str())
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn discard_token(&self, task_id: &TaskId, folder_id: &str) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM resume_tokens WHERE task_id = ? AND folder_id = ?")
            .bind(task_id.as_str())
            .bind(folder_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
