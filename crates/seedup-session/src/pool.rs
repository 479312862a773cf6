//! Database connection pool management
//!
//! Wraps SQLx's `SqlitePool` with:
//! - Automatic directory creation for database files
//! - WAL journal mode
//! - Schema migration on first connection
//! - In-memory mode for testing

use std::path::Path;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};

use crate::SessionDbError;

/// Pool of SQLite connections for the session database
///
/// - WAL journal mode
/// - 5 max connections for file-based databases
/// - 1 connection for in-memory databases (required for data persistence)
/// - 5-second busy timeout to absorb concurrent worker writes
#[derive(Clone)]
pub struct DatabasePool {
    pool: SqlitePool,
}

impl DatabasePool {
    /// Opens (creating if needed) the database at `db_path` and migrates it
    ///
    /// # Errors
    ///
    /// `SessionDbError::ConnectionFailed` if the file cannot be opened as a
    /// SQLite database, `SessionDbError::MigrationFailed` if the schema
    /// cannot be applied.
    pub async fn new(db_path: &Path) -> Result<Self, SessionDbError> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                SessionDbError::ConnectionFailed(format!(
                    "Failed to create database directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| {
                SessionDbError::ConnectionFailed(format!(
                    "Failed to connect to database at {}: {}",
                    db_path.display(),
                    e
                ))
            })?;

        Self::run_migrations(&pool).await?;

        tracing::info!(path = %db_path.display(), "Session database initialized");

        Ok(Self { pool })
    }

    /// Creates an in-memory database for tests
    pub async fn in_memory() -> Result<Self, SessionDbError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| {
                SessionDbError::ConnectionFailed(format!(
                    "Failed to create in-memory database: {}",
                    e
                ))
            })?;

        Self::run_migrations(&pool).await?;

        tracing::debug!("In-memory session database initialized");

        Ok(Self { pool })
    }

    /// Returns a reference to the underlying SQLite connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn run_migrations(pool: &SqlitePool) -> Result<(), SessionDbError> {
        let migration_sql = include_str!("migrations/20260301_initial.sql");
        sqlx::raw_sql(migration_sql)
            .execute(pool)
            .await
            .map_err(|e| {
                SessionDbError::MigrationFailed(format!("Failed to run initial migration: {}", e))
            })?;

        tracing::debug!("Session database migrations completed");
        Ok(())
    }
}
