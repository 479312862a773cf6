//! SeedUp Session - Durable upload progress
//!
//! SQLite-based persistence for:
//! - Per-task upload outcomes (status, attempts, last error)
//! - Resume tokens of open resumable upload sessions
//!
//! ## Architecture
//!
//! This crate implements the `SessionStore` and `ResumeTokenStore` ports
//! from `seedup-core`. It is a driven (secondary) adapter.
//!
//! ## Usage
//!
//! ```no_run
//! use std::path::Path;
//! use seedup_session::SqliteSessionStore;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let store = SqliteSessionStore::open_or_reset(Path::new("/tmp/seedup/session.db")).await?;
//! // Use store as SessionStore / ResumeTokenStore...
//! # Ok(())
//! # }
//! ```

pub mod pool;
pub mod store;

pub use pool::DatabasePool;
pub use store::SqliteSessionStore;

/// Errors that can occur while opening or migrating the session database
#[derive(Debug, thiserror::Error)]
pub enum SessionDbError {
    /// Failed to establish a database connection
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Schema migration failed
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Moving an unreadable database aside failed
    #[error("Reset failed: {0}")]
    ResetFailed(String),
}
