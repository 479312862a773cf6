//! SeedUp Torrent - Download step of the pipeline
//!
//! BitTorrent is delegated to an external `aria2c` process:
//! - [`Aria2Engine`] - implements the `TorrentEngine` port
//! - [`TorrentSession`] - the paused-session file used for resume
//!
//! `aria2c` writes its own session file (`--save-session`); a file left
//! behind after an interrupted run is what makes a download resumable.

pub mod aria2;
pub mod session;

pub use aria2::Aria2Engine;
pub use session::TorrentSession;

/// Errors raised while running the torrent engine
#[derive(Debug, thiserror::Error)]
pub enum TorrentError {
    /// The engine binary could not be started
    #[error("Cannot start {binary}: {message}")]
    EngineUnavailable { binary: String, message: String },

    /// The engine exited with an error
    #[error("Download failed (aria2c exit code {code}): {reason}")]
    Failed { code: i32, reason: &'static str },

    /// The download was stopped before completion; the session is kept
    #[error("Download interrupted")]
    Interrupted,
}
