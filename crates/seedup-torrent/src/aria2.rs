//! Aria2Engine - TorrentEngine backed by the `aria2c` command
//!
//! ## Resume
//!
//! Every run passes `--save-session`, so `aria2c` records unfinished
//! downloads when it stops. A later run with `resume` set feeds that file
//! back with `--input-file` instead of the original source. A run that
//! finishes cleanly deletes the session.
//!
//! ## Cancellation
//!
//! Ctrl-C reaches `aria2c` through the terminal's process group and it
//! saves its session on the way out. When the cancellation token fires,
//! the engine waits [`SHUTDOWN_GRACE`] for that to happen before killing
//! the process.
//!
//! ## Result
//!
//! The destination is usually shared between downloads. The engine records
//! the top-level entries of the destination before `aria2c` starts and
//! returns only files under entries that are new, were modified, or lost
//! their `.aria2` control file during the run.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, SystemTime};

use anyhow::Context;
use async_trait::async_trait;
use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use seedup_core::ports::{DownloadRequest, TorrentEngine};
use seedup_upload::LocalFileEnumerator;

use crate::session::TorrentSession;
use crate::TorrentError;

/// Time `aria2c` gets to save its session after cancellation
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// `aria2c` exit code for downloads left unfinished on shutdown
const EXIT_UNFINISHED: i32 = 7;

/// Human-readable meaning of an `aria2c` exit code
pub fn describe_exit_code(code: i32) -> &'static str {
    match code {
        1 => "unknown error",
        2 => "timed out",
        3 => "resource not found",
        6 => "network problem",
        EXIT_UNFINISHED => "unfinished downloads",
        9 => "not enough disk space",
        12 => "same download already in progress",
        13 => "file already exists",
        16 => "could not create file",
        19 => "name resolution failed",
        24 => "authorization failed",
        28 => "invalid option or unexpected input",
        _ => "aria2c error",
    }
}

/// Downloads torrents by running `aria2c`
#[derive(Debug, Clone)]
pub struct Aria2Engine {
    binary: String,
    session: TorrentSession,
    cancel: CancellationToken,
}

impl Aria2Engine {
    pub fn new(binary: impl Into<String>, session: TorrentSession) -> Self {
        Self {
            binary: binary.into(),
            session,
            cancel: CancellationToken::new(),
        }
    }

    /// Stops a running download when `cancel` fires
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn session(&self) -> &TorrentSession {
        &self.session
    }

    /// Command-line arguments for a download
    pub fn build_args(&self, request: &DownloadRequest, resuming: bool) -> Vec<String> {
        let mut args = vec![
            format!("--dir={}", request.dest.display()),
            "--seed-time=0".to_string(),
            "--continue=true".to_string(),
            "--bt-save-metadata=true".to_string(),
            "--bt-load-saved-metadata=true".to_string(),
            format!("--save-session={}", self.session.path().display()),
            "--save-session-interval=10".to_string(),
            "--console-log-level=warn".to_string(),
            "--summary-interval=0".to_string(),
        ];
        if resuming {
            args.push(format!("--input-file={}", self.session.path().display()));
        } else {
            args.push(request.source.as_arg());
        }
        args
    }

    fn spawn(&self, args: &[String]) -> Result<Child, TorrentError> {
        Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| TorrentError::EngineUnavailable {
                binary: self.binary.clone(),
                message: e.to_string(),
            })
    }

    async fn wait(&self, child: &mut Child) -> anyhow::Result<ExitStatus> {
        tokio::select! {
            status = child.wait() => Ok(status?),
            _ = self.cancel.cancelled() => {
                info!("Stopping download, waiting for aria2c to save its session");
                match tokio::time::timeout(SHUTDOWN_GRACE, child.wait()).await {
                    Ok(status) => {
                        debug!(status = ?status, "aria2c exited");
                    }
                    Err(_) => {
                        warn!("aria2c did not exit in time, killing it");
                        child.kill().await?;
                    }
                }
                Err(TorrentError::Interrupted.into())
            }
        }
    }
}

/// Newest modification time under each top-level entry of a directory
#[derive(Debug, Default)]
struct DestSnapshot {
    entries: HashMap<PathBuf, Option<SystemTime>>,
}

impl DestSnapshot {
    fn capture(dest: &Path) -> anyhow::Result<Self> {
        let mut entries = HashMap::new();
        let dir = std::fs::read_dir(dest)
            .with_context(|| format!("Failed to read {}", dest.display()))?;
        for entry in dir {
            let path = entry?.path();
            let modified = newest_modification(&path);
            entries.insert(path, modified);
        }
        Ok(Self { entries })
    }

    /// Content files under entries this run created or touched
    fn downloaded_files(&self, dest: &Path) -> anyhow::Result<Vec<PathBuf>> {
        let after = Self::capture(dest)?;
        let mut files = Vec::new();
        for (path, modified) in &after.entries {
            if is_control_file(path) {
                continue;
            }
            let control = control_file(path);
            let finished =
                self.entries.contains_key(&control) && !after.entries.contains_key(&control);
            let changed = self.entries.get(path) != Some(modified);
            if !finished && !changed {
                debug!(path = %path.display(), "Not part of this download");
                continue;
            }
            if let Ok(enumerator) = LocalFileEnumerator::new(path) {
                files.extend(
                    enumerator
                        .enumerate()
                        .map(|file| file.path)
                        .filter(|path| !is_control_file(path)),
                );
            }
        }
        files.sort();
        Ok(files)
    }
}

fn newest_modification(path: &Path) -> Option<SystemTime> {
    let modified = |path: &Path| std::fs::metadata(path).and_then(|m| m.modified()).ok();
    let mut newest = modified(path);
    if let Ok(enumerator) = LocalFileEnumerator::new(path) {
        for file in enumerator.enumerate() {
            newest = newest.max(modified(file.path.as_path()));
        }
    }
    newest
}

fn is_control_file(path: &Path) -> bool {
    path.extension().map_or(false, |ext| ext == "aria2")
}

/// `aria2c` keeps `<entry>.aria2` next to an unfinished download
fn control_file(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".aria2");
    PathBuf::from(name)
}

#[async_trait]
impl TorrentEngine for Aria2Engine {
    async fn download(&self, request: &DownloadRequest) -> anyhow::Result<Vec<PathBuf>> {
        if !request.resume {
            self.session.clear()?;
        }
        let resuming = request.resume && self.session.exists();

        tokio::fs::create_dir_all(&request.dest)
            .await
            .with_context(|| format!("Failed to create {}", request.dest.display()))?;
        self.session.prepare()?;
        let before = DestSnapshot::capture(&request.dest)?;

        if resuming {
            info!(session = %self.session.path().display(), "Resuming paused download");
        } else {
            info!(source = %request.source, dest = %request.dest.display(), "Starting download");
        }

        let args = self.build_args(request, resuming);
        debug!(binary = %self.binary, ?args, "Spawning aria2c");
        let mut child = self.spawn(&args)?;
        let status = self.wait(&mut child).await?;

        match status.code() {
            Some(0) => {
                self.session.clear()?;
                let files = before.downloaded_files(&request.dest)?;
                info!(files = files.len(), "Download complete");
                Ok(files)
            }
            Some(EXIT_UNFINISHED) => Err(TorrentError::Interrupted.into()),
            Some(code) => Err(TorrentError::Failed {
                code,
                reason: describe_exit_code(code),
            }
            .into()),
            None => Err(TorrentError::Interrupted.into()),
        }
    }

    fn has_paused_session(&self) -> bool {
        self.session.exists()
    }

    fn clear_session(&self) -> anyhow::Result<()> {
        self.session.clear().map(|_| ())
    }
}
