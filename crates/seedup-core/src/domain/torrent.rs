//! Torrent source parsing

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::errors::DomainError;

/// What the torrent engine should fetch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TorrentSource {
    /// A `magnet:?xt=urn:btih:...` link
    Magnet(String),
    /// A local `.torrent` metainfo file
    File(PathBuf),
}

impl TorrentSource {
    /// Classifies a user-supplied source string
    ///
    /// Anything starting with `magnet:` is a magnet link; otherwise the
    /// string must name an existing file.
    pub fn parse(source: &str) -> Result<Self, DomainError> {
        let trimmed = source.trim();
        if trimmed.is_empty() {
            return Err(DomainError::InvalidTorrentSource("empty source".into()));
        }
        if trimmed.starts_with("magnet:") {
            if !trimmed.contains("xt=urn:") {
                return Err(DomainError::InvalidTorrentSource(format!(
                    "magnet link has no exact topic: {trimmed}"
                )));
            }
            return Ok(TorrentSource::Magnet(trimmed.to_string()));
        }

        let path = Path::new(trimmed);
        if path.is_file() {
            Ok(TorrentSource::File(path.to_path_buf()))
        } else {
            Err(DomainError::InvalidTorrentSource(format!(
                "not a magnet link or existing file: {trimmed}"
            )))
        }
    }

    /// The argument handed to the engine on its command line
    pub fn as_arg(&self) -> String {
        match self {
            TorrentSource::Magnet(link) => link.clone(),
            TorrentSource::File(path) => path.display().to_string(),
        }
    }
}

impl fmt::Display for TorrentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TorrentSource::Magnet(_) => write!(f, "magnet link"),
            TorrentSource::File(path) => write!(f, "{}", path.display()),
        }
    }
}
