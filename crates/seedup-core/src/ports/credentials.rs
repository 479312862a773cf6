//! Credential provider port
//!
//! Authentication flows are out of scope; the pipeline only needs a bearer
//! token. Adapters decide where it comes from (environment, external command).

use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// A bearer credential for the cloud API
#[derive(Clone)]
pub struct Credential {
    pub access_token: String,
    /// Expiry when the source reports one
    pub expires_at: Option<DateTime<Utc>>,
}

impl Credential {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            expires_at: None,
        }
    }

    /// Returns true if the credential carries an expiry in the past
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Utc::now() >= at)
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Port for obtaining credentials
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Returns a usable credential; failures surface as `RemoteUnavailable`
    async fn get_credential(&self) -> anyhow::Result<Credential>;
}
