//! Download command - Fetch a torrent, optionally upload the result
//!
//! Provides the `seedup download` CLI command which:
//! 1. Runs `aria2c` for the magnet link or `.torrent` file
//! 2. Resumes a paused session unless `--no-resume` is given
//! 3. With `--upload`, hands the downloaded content to the upload pipeline

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use seedup_core::domain::TorrentSource;
use seedup_core::ports::{DownloadRequest, TorrentEngine};
use seedup_torrent::TorrentError;

use super::{upload, Outcome};
use crate::context::CliContext;
use crate::output::plural;

#[derive(Debug, Args)]
pub struct DownloadCommand {
    /// Torrent file path or magnet link
    #[arg(short, long)]
    pub torrent: String,

    /// Download destination (default: torrent.download_path)
    #[arg(short, long)]
    pub dest: Option<PathBuf>,

    /// Start fresh, discarding any paused session
    #[arg(long)]
    pub no_resume: bool,

    /// Upload to Google Drive after the download completes
    #[arg(long)]
    pub upload: bool,

    /// Destination Drive folder ID for --upload
    #[arg(short, long)]
    pub folder_id: Option<String>,

    /// Upload even if a file with the same name and size exists
    #[arg(long)]
    pub no_skip: bool,
}

impl DownloadCommand {
    pub async fn execute(&self, ctx: &CliContext) -> Result<Outcome> {
        let formatter = ctx.formatter();
        let source = TorrentSource::parse(&self.torrent)?;
        let dest = self
            .dest
            .clone()
            .unwrap_or_else(|| ctx.config.torrent.download_path.clone());

        ctx.watch_signals();
        let engine = ctx.torrent_engine();
        let request = DownloadRequest {
            source,
            dest: dest.clone(),
            resume: !self.no_resume,
        };

        formatter.info(&format!("Downloading {} to {}", request.source, dest.display()));
        let files = match engine.download(&request).await {
            Ok(files) => files,
            Err(e) => {
                if let Some(TorrentError::Interrupted) = e.downcast_ref::<TorrentError>() {
                    formatter.warn("Download paused. Run the same command again to resume.");
                    return Ok(Outcome::Interrupted);
                }
                return Err(e.context("Torrent download failed"));
            }
        };

        info!(files = files.len(), dest = %dest.display(), "Download finished");
        if ctx.format.is_json() && !self.upload {
            let json = serde_json::json!({
                "dest": dest.display().to_string(),
                "files": files.iter().map(|f| f.display().to_string()).collect::<Vec<_>>(),
            });
            formatter.print_json(&json);
        } else {
            formatter.success(&format!(
                "Downloaded {} file{} to {}",
                files.len(),
                plural(files.len()),
                dest.display()
            ));
        }

        if !self.upload {
            return Ok(Outcome::Success);
        }
        if files.is_empty() {
            formatter.warn("Nothing new was downloaded, skipping upload");
            return Ok(Outcome::Success);
        }
        let dest = std::fs::canonicalize(&dest)
            .with_context(|| format!("Cannot resolve {}", dest.display()))?;
        let root = content_root(&dest, &files);
        upload::run_upload(ctx, &root, self.folder_id.as_deref(), self.no_skip).await
    }
}

/// The torrent's top-level entry under `dest`
///
/// A single-file torrent yields that file and a multi-file torrent its
/// directory. Anything else falls back to `dest` itself.
pub fn content_root(dest: &Path, files: &[PathBuf]) -> PathBuf {
    let mut tops = files.iter().filter_map(|file| {
        let first = file.strip_prefix(dest).ok()?.components().next()?;
        Some(dest.join(first))
    });
    let first = match tops.next() {
        Some(first) => first,
        None => return dest.to_path_buf(),
    };
    if tops.all(|top| top == first) {
        first
    } else {
        dest.to_path_buf()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_root_of_multi_file_torrent() {
        let dest = Path::new("/dl");
        let files = vec![
            PathBuf::from("/dl/Show/e01.mkv"),
            PathBuf::from("/dl/Show/extras/x.srt"),
        ];
        assert_eq!(content_root(dest, &files), PathBuf::from("/dl/Show"));
    }

    #[test]
    fn test_content_root_of_single_file_torrent() {
        let files = vec![PathBuf::from("/dl/movie.mkv")];
        assert_eq!(
            content_root(Path::new("/dl"), &files),
            PathBuf::from("/dl/movie.mkv")
        );
    }

    #[test]
    fn test_content_root_falls_back_to_dest() {
        let dest = Path::new("/dl");
        let files = vec![PathBuf::from("/dl/a.mkv"), PathBuf::from("/dl/B/b.mkv")];
        assert_eq!(content_root(dest, &files), PathBuf::from("/dl"));
        assert_eq!(content_root(dest, &[]), PathBuf::from("/dl"));
    }
}
