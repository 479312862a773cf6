//! Shared wiring for commands: configuration, logging, adapters, signals

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use seedup_core::config::Config;
use seedup_core::ports::CredentialProvider;
use seedup_drive::{CommandTokenProvider, DriveClient, DriveObjectStore, EnvTokenProvider};
use seedup_session::SqliteSessionStore;
use seedup_torrent::{Aria2Engine, TorrentSession};
use seedup_upload::{NoopProgress, ProgressObserver};

use crate::output::{get_formatter, OutputFormat, OutputFormatter};
use crate::progress::ConsoleProgress;

/// Loads the configuration file
///
/// An explicit `--config` path must exist; the default location falls back
/// to built-in defaults when absent or unreadable. Invalid values are
/// reported together.
pub fn load_config(path: Option<&str>, formatter: &dyn OutputFormatter) -> Result<Config> {
    let config = match path {
        Some(path) => Config::load(Path::new(path))
            .with_context(|| format!("Failed to load config file {path}"))?,
        None => load_default_config(&Config::default_path(), formatter),
    };

    let errors = config.validate();
    if !errors.is_empty() {
        let details: Vec<String> = errors
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect();
        bail!("Invalid configuration:\n  {}", details.join("\n  "));
    }
    Ok(config)
}

/// Runs before tracing is installed, so problems go through `formatter`
fn load_default_config(path: &Path, formatter: &dyn OutputFormatter) -> Config {
    if !path.exists() {
        return Config::default();
    }
    match Config::load(path) {
        Ok(config) => config,
        Err(e) => {
            formatter.warn(&format!(
                "Ignoring unreadable config file {}: {e:#}",
                path.display()
            ));
            Config::default()
        }
    }
}

/// Log filter directive for the given flags
pub fn log_level(verbose: u8, quiet: bool, configured: &str) -> &str {
    if quiet {
        return "warn";
    }
    match verbose {
        0 => configured,
        1 => "debug",
        _ => "trace",
    }
}

/// Installs the tracing subscriber; `RUST_LOG` overrides the flags
pub fn init_tracing(verbose: u8, quiet: bool, configured: &str) {
    let level = log_level(verbose, quiet, configured);
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// State shared by every command
pub struct CliContext {
    pub config: Config,
    pub format: OutputFormat,
    pub quiet: bool,
    cancel: CancellationToken,
}

impl CliContext {
    pub fn new(config: Config, format: OutputFormat, quiet: bool) -> Self {
        Self {
            config,
            format,
            quiet,
            cancel: CancellationToken::new(),
        }
    }

    pub fn formatter(&self) -> Box<dyn OutputFormatter> {
        get_formatter(self.format)
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Cancels the context token on Ctrl-C or SIGTERM
    pub fn watch_signals(&self) {
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            shutdown_signal().await;
            info!("Interrupt received, stopping");
            cancel.cancel();
        });
    }

    /// Token source for Drive requests
    ///
    /// `drive.token_command` wins; otherwise the access token is read from
    /// the environment.
    pub fn credentials(&self) -> Arc<dyn CredentialProvider> {
        match &self.config.drive.token_command {
            Some(command) => Arc::new(CommandTokenProvider::new(command.clone())),
            None => Arc::new(EnvTokenProvider::default()),
        }
    }

    pub fn drive_store(&self) -> Result<DriveObjectStore> {
        let client =
            DriveClient::with_base_url(self.credentials(), self.config.drive.api_base_url.clone())
                .context("Failed to create Drive client")?;
        Ok(DriveObjectStore::new(client))
    }

    /// Destination folder: `--folder-id` or the default folder in the Drive root
    pub async fn resolve_destination(
        &self,
        store: &DriveObjectStore,
        folder_id: Option<&str>,
    ) -> Result<String> {
        if let Some(id) = folder_id {
            return Ok(id.to_string());
        }
        let name = &self.config.drive.default_folder_name;
        let id = store
            .default_folder(name)
            .await
            .with_context(|| format!("Cannot resolve Drive folder '{name}'"))?;
        info!(folder = %name, folder_id = %id, "Using default Drive folder");
        Ok(id)
    }

    pub async fn open_sessions(&self) -> Result<SqliteSessionStore> {
        let path = &self.config.session.db_path;
        SqliteSessionStore::open_or_reset(path)
            .await
            .with_context(|| format!("Failed to open session database {}", path.display()))
    }

    pub fn torrent_engine(&self) -> Aria2Engine {
        let session = TorrentSession::new(self.config.torrent.session_file.clone());
        Aria2Engine::new(self.config.torrent.aria2c_path.clone(), session)
            .with_cancellation(self.cancel.clone())
    }

    pub fn progress_observer(&self) -> Arc<dyn ProgressObserver> {
        if self.format.is_json() || self.quiet {
            Arc::new(NoopProgress)
        } else {
            Arc::new(ConsoleProgress::new())
        }
    }
}

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Cannot listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut term) => {
            tokio::select! {
                _ = ctrl_c() => {}
                _ = term.recv() => {}
            }
        }
        Err(e) => {
            warn!(error = %e, "Cannot listen for SIGTERM");
            ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() {
    ctrl_c().await;
}
