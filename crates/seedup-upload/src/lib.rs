//! SeedUp Upload - Resumable chunked upload pipeline
//!
//! Moves a set of local files into a cloud folder:
//! - [`LocalFileEnumerator`] - walks a local tree lazily
//! - [`RemoteIndex`] - per-folder snapshot for duplicate detection
//! - [`ChunkedUploader`] - uploads one file in ordered, resumable chunks
//! - [`UploadOrchestrator`] - runs a batch with per-file failure isolation
//!
//! ## Architecture
//!
//! Everything here talks to the outside world through the `seedup-core`
//! ports (`CloudObjectStore`, `SessionStore`, `ResumeTokenStore`), so the
//! whole pipeline runs against in-memory fakes in tests.

pub mod enumerator;
pub mod orchestrator;
pub mod progress;
pub mod remote_index;
pub mod retry;
pub mod uploader;

#[cfg(test)]
pub(crate) mod testing;

pub use enumerator::{LocalFile, LocalFileEnumerator};
pub use orchestrator::UploadOrchestrator;
pub use progress::{NoopProgress, ProgressObserver};
pub use remote_index::{FolderSnapshot, RemoteIndex};
pub use retry::RetryPolicy;
pub use uploader::{ChunkedUploader, UploadOutcome};
