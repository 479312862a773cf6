//! Configuration module for SeedUp.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, validation and defaults.
//! The upload pipeline never reads `Config` directly; callers derive an
//! [`UploadSettings`] and hand it to the constructors.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// One mebibyte.
const MIB: u64 = 1024 * 1024;

/// Upper bound for `upload.max_workers`.
pub const MAX_WORKERS_LIMIT: usize = 16;

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for SeedUp.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub upload: UploadConfig,
    pub drive: DriveConfig,
    pub torrent: TorrentConfig,
    pub session: SessionConfig,
    pub logging: LoggingConfig,
}

/// Chunked upload settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Size of each upload chunk (in MiB).
    pub chunk_size_mb: u64,
    /// Total tries per chunk before the task fails as transient.
    pub max_retries: u32,
    /// First backoff delay (in milliseconds); doubles on every retry.
    pub retry_base_delay_ms: u64,
    /// Ceiling for a single backoff delay (in milliseconds).
    pub max_retry_delay_ms: u64,
    /// Files uploaded concurrently. `1` uploads sequentially.
    pub max_workers: usize,
    /// Skip files already present at the destination (name and size match).
    pub skip_existing: bool,
}

/// Google Drive settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriveConfig {
    /// Base URL of the Drive REST API.
    pub api_base_url: String,
    /// Folder created in the Drive root when no folder id is given.
    pub default_folder_name: String,
    /// Shell command printing an access token, e.g. `gcloud auth print-access-token`.
    pub token_command: Option<String>,
}

/// Torrent engine settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TorrentConfig {
    /// Default destination for downloaded content.
    pub download_path: PathBuf,
    /// Path or name of the `aria2c` executable.
    pub aria2c_path: String,
    /// Where the engine saves its paused session.
    pub session_file: PathBuf,
}

/// Upload session persistence settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// SQLite database holding upload progress.
    pub db_path: PathBuf,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
}

// ---------------------------------------------------------------------------
// Config::load()
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/seedup/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("seedup")
            .join("config.yaml")
    }

    /// Settings consumed by the upload pipeline.
    pub fn upload_settings(&self) -> UploadSettings {
        UploadSettings {
            chunk_size: self.upload.chunk_size_mb.saturating_mul(MIB),
            max_retries: self.upload.max_retries,
            retry_base_delay: Duration::from_millis(self.upload.retry_base_delay_ms),
            max_retry_delay: Duration::from_millis(self.upload.max_retry_delay_ms),
            max_workers: self.upload.max_workers.clamp(1, MAX_WORKERS_LIMIT),
            skip_existing: self.upload.skip_existing,
        }
    }
}

fn data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("~/.local/share"))
        .join("seedup")
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            chunk_size_mb: 100,
            max_retries: 3,
            retry_base_delay_ms: 2000,
            max_retry_delay_ms: 60_000,
            max_workers: 1,
            skip_existing: true,
        }
    }
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://www.googleapis.com".to_string(),
            default_folder_name: "SeedUp Downloads".to_string(),
            token_command: None,
        }
    }
}

impl Default for TorrentConfig {
    fn default() -> Self {
        Self {
            download_path: dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("~"))
                .join("SeedUp Downloads"),
            aria2c_path: "aria2c".to_string(),
            session_file: data_dir().join("torrent_session.txt"),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            db_path: data_dir().join("session.db"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// UploadSettings
// ---------------------------------------------------------------------------

/// Explicit settings for the chunked uploader and the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadSettings {
    /// Chunk size in bytes.
    pub chunk_size: u64,
    /// Total tries per chunk.
    pub max_retries: u32,
    pub retry_base_delay: Duration,
    pub max_retry_delay: Duration,
    pub max_workers: usize,
    pub skip_existing: bool,
}

impl Default for UploadSettings {
    fn default() -> Self {
        Config::default().upload_settings()
    }
}

/// Per-invocation options for a batch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    pub skip_existing: bool,
    pub max_retries: u32,
}

impl From<&UploadSettings> for RunOptions {
    fn from(settings: &UploadSettings) -> Self {
        Self {
            skip_existing: settings.skip_existing,
            max_retries: settings.max_retries,
        }
    }
}

// ---------------------------------------------------------------------------
// Config::validate()
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"upload.chunk_size_mb"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        let mut push = |field: &str, message: String| {
            errors.push(ValidationError {
                field: field.into(),
                message,
            })
        };

        // --- upload ---
        if self.upload.chunk_size_mb == 0 {
            push("upload.chunk_size_mb", "must be greater than 0".into());
        }
        if self.upload.max_retries == 0 {
            push("upload.max_retries", "must be greater than 0".into());
        }
        if self.upload.retry_base_delay_ms > self.upload.max_retry_delay_ms {
            push(
                "upload.retry_base_delay_ms",
                "must not exceed upload.max_retry_delay_ms".into(),
            );
        }
        if self.upload.max_workers == 0 || self.upload.max_workers > MAX_WORKERS_LIMIT {
            push(
                "upload.max_workers",
                format!("must be between 1 and {MAX_WORKERS_LIMIT}"),
            );
        }

        // --- drive ---
        if !(self.drive.api_base_url.starts_with("http://")
            || self.drive.api_base_url.starts_with("https://"))
        {
            push(
                "drive.api_base_url",
                format!("not an http(s) URL: {}", self.drive.api_base_url),
            );
        }
        if self.drive.default_folder_name.trim().is_empty() {
            push("drive.default_folder_name", "must not be empty".into());
        }
        if let Some(cmd) = &self.drive.token_command {
            if cmd.trim().is_empty() {
                push("drive.token_command", "must not be empty when set".into());
            }
        }

        // --- torrent ---
        if self.torrent.aria2c_path.trim().is_empty() {
            push("torrent.aria2c_path", "must not be empty".into());
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            push(
                "logging.level",
                format!(
                    "invalid level '{}', expected one of: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            );
        }

        errors
    }
}
