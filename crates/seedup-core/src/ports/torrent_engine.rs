//! Torrent engine port
//!
//! BitTorrent itself is delegated to an external engine with its own
//! resume and retry semantics. The pipeline sees a download as "source in,
//! completed files out".

use std::path::PathBuf;

use async_trait::async_trait;

use crate::domain::TorrentSource;

/// Parameters of a download
#[derive(Debug, Clone)]
pub struct DownloadRequest {
    pub source: TorrentSource,
    pub dest: PathBuf,
    /// Continue from a paused session when one exists
    pub resume: bool,
}

/// Port for the external torrent engine
#[async_trait]
pub trait TorrentEngine: Send + Sync {
    /// Downloads the torrent and returns the completed file paths
    async fn download(&self, request: &DownloadRequest) -> anyhow::Result<Vec<PathBuf>>;

    /// Returns true if a paused session is waiting to be resumed
    fn has_paused_session(&self) -> bool;

    /// Deletes the paused session, if any
    fn clear_session(&self) -> anyhow::Result<()>;
}
