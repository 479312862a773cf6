//! Bearer credential providers
//!
//! Authentication flows stay outside SeedUp. The user either exports an
//! access token or names a command that prints one (for example
//! `gcloud auth print-access-token`).
//!
//! ## Components
//!
//! - [`EnvTokenProvider`] - Reads the first non-empty variable of a list
//! - [`CommandTokenProvider`] - Runs a shell command and caches its output
//! - [`StaticTokenProvider`] - Fixed token

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::process::Command;
use tokio::sync::Mutex;
use tracing::{debug, info};

use seedup_core::ports::{Credential, CredentialProvider};

/// Environment variables consulted by [`EnvTokenProvider::default`], in order
pub const TOKEN_ENV_VARS: &[&str] = &["SEEDUP_ACCESS_TOKEN", "GOOGLE_OAUTH_ACCESS_TOKEN"];

/// Google access tokens live for an hour; refresh well before that
const COMMAND_TOKEN_TTL: Duration = Duration::from_secs(45 * 60);

// ============================================================================
// EnvTokenProvider
// ============================================================================

/// Reads an access token from environment variables
#[derive(Debug, Clone)]
pub struct EnvTokenProvider {
    vars: Vec<String>,
}

impl EnvTokenProvider {
    pub fn new(vars: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            vars: vars.into_iter().map(Into::into).collect(),
        }
    }

    fn lookup(&self) -> Option<String> {
        self.vars
            .iter()
            .filter_map(|name| std::env::var(name).ok())
            .map(|v| v.trim().to_string())
            .find(|v| !v.is_empty())
    }
}

impl Default for EnvTokenProvider {
    fn default() -> Self {
        Self::new(TOKEN_ENV_VARS.iter().copied())
    }
}

#[async_trait]
impl CredentialProvider for EnvTokenProvider {
    async fn get_credential(&self) -> Result<Credential> {
        self.lookup().map(Credential::new).with_context(|| {
            format!(
                "No access token found; set one of {} or configure drive.token_command",
                self.vars.join(", ")
            )
        })
    }
}

// ============================================================================
// CommandTokenProvider
// ============================================================================

/// Obtains an access token from the standard output of a shell command
///
/// The token is cached for [`COMMAND_TOKEN_TTL`] so a long upload does not
/// spawn a process per chunk.
pub struct CommandTokenProvider {
    command: String,
    ttl: Duration,
    cached: Mutex<Option<(Credential, Instant)>>,
}

impl CommandTokenProvider {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ttl: COMMAND_TOKEN_TTL,
            cached: Mutex::new(None),
        }
    }

    /// Overrides how long a fetched token is reused
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    async fn run(&self) -> Result<Credential> {
        debug!(command = %self.command, "Running token command");
        let output = Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .output()
            .await
            .with_context(|| format!("Failed to run token command '{}'", self.command))?;

        if !output.status.success() {
            anyhow::bail!(
                "Token command '{}' exited with {}: {}",
                self.command,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        let token = String::from_utf8(output.stdout)
            .context("Token command printed non UTF-8 output")?
            .trim()
            .to_string();
        if token.is_empty() {
            anyhow::bail!("Token command '{}' printed nothing", self.command);
        }

        info!("Obtained access token from command");
        Ok(Credential::new(token))
    }
}

#[async_trait]
impl CredentialProvider for CommandTokenProvider {
    async fn get_credential(&self) -> Result<Credential> {
        let mut cached = self.cached.lock().await;
        if let Some((cred, fetched_at)) = cached.as_ref() {
            if fetched_at.elapsed() < self.ttl {
                return Ok(cred.clone());
            }
        }

        let cred = self.run().await?;
        *cached = Some((cred.clone(), Instant::now()));
        Ok(cred)
    }
}

// ============================================================================
// StaticTokenProvider
// ============================================================================

/// Always returns the same token
#[derive(Debug, Clone)]
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl CredentialProvider for StaticTokenProvider {
    async fn get_credential(&self) -> Result<Credential> {
        Ok(Credential::new(self.token.clone()))
    }
}
