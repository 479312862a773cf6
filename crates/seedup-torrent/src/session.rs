//! Paused torrent session file

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::{debug, info};

/// Location of the engine's saved session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TorrentSession {
    path: PathBuf,
}

impl TorrentSession {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns true if a non-empty session file is present
    ///
    /// `aria2c` writes an empty file when nothing was left unfinished.
    pub fn exists(&self) -> bool {
        std::fs::metadata(&self.path)
            .map(|meta| meta.is_file() && meta.len() > 0)
            .unwrap_or(false)
    }

    /// Deletes the session file; returns whether one was present
    pub fn clear(&self) -> anyhow::Result<bool> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                info!(path = %self.path.display(), "Torrent session cleared");
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No torrent session to clear");
                Ok(false)
            }
            Err(e) => Err(e).with_context(|| {
                format!("Failed to remove torrent session {}", self.path.display())
            }),
        }
    }

    /// Creates the directory that holds the session file
    pub fn prepare(&self) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create session directory {}", parent.display())
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_session() {
        let dir = tempfile::tempdir().unwrap();
        let session = TorrentSession::new(dir.path().join("session.txt"));
        assert!(!session.exists());
        assert!(!session.clear().unwrap());
    }

    #[test]
    fn test_empty_session_is_not_resumable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.txt");
        std::fs::write(&path, b"").unwrap();
        assert!(!TorrentSession::new(&path).exists());
    }

    #[test]
    fn test_clear_removes_session() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.txt");
        std::fs::write(&path, b"magnet:?xt=urn:btih:abc\n gid=1\n").unwrap();

        let session = TorrentSession::new(&path);
        assert!(session.exists());
        assert!(session.clear().unwrap());
        assert!(!path.exists());
    }

    #[test]
    fn test_prepare_creates_parent() {
        let dir = tempfile::tempdir().unwrap();
        let session = TorrentSession::new(dir.path().join("state/seedup/session.txt"));
        session.prepare().unwrap();
        assert!(dir.path().join("state/seedup").is_dir());
    }
}
