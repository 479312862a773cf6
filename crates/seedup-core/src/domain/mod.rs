//! Domain entities and business rules
//!
//! - Upload tasks and their state machine
//! - Chunk transfer cursor
//! - Remote listing records and batch reports
//! - Torrent source parsing
//! - Domain-specific error types

pub mod chunk;
pub mod errors;
pub mod remote;
pub mod report;
pub mod task;
pub mod torrent;

pub use chunk::ChunkState;
pub use errors::{DomainError, PipelineError, UploadError};
pub use remote::RemoteFileRecord;
pub use report::{BatchReport, FailedTask};
pub use task::{TaskId, TaskStatus, UploadTask};
pub use torrent::TorrentSource;
