//! Google Drive API client
//!
//! Wraps `reqwest::Client` with the API base URL and a bearer token taken
//! from a [`CredentialProvider`] on every request.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use seedup_drive::{DriveClient, EnvTokenProvider};
//!
//! # fn example() -> anyhow::Result<()> {
//! let client = DriveClient::new(Arc::new(EnvTokenProvider::default()))?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{redirect, Client, Method, RequestBuilder};
use tracing::debug;

use seedup_core::ports::{CredentialProvider, ObjectStoreError};

/// Default Drive API host
pub const DRIVE_BASE_URL: &str = "https://www.googleapis.com";

/// Per-request timeout; a 100 MiB chunk on a slow link needs a generous one
const REQUEST_TIMEOUT: Duration = Duration::from_secs(600);

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client for Drive v3 calls
#[derive(Clone)]
pub struct DriveClient {
    client: Client,
    base_url: String,
    credentials: Arc<dyn CredentialProvider>,
}

impl DriveClient {
    /// Creates a client for the public Drive API
    pub fn new(credentials: Arc<dyn CredentialProvider>) -> Result<Self> {
        Self::with_base_url(credentials, DRIVE_BASE_URL)
    }

    /// Creates a client against a custom base URL (`drive.api_base_url`)
    pub fn with_base_url(
        credentials: Arc<dyn CredentialProvider>,
        base_url: impl Into<String>,
    ) -> Result<Self> {
        // Drive answers incomplete uploads with 308 and no Location;
        // the status must reach the caller instead of being followed.
        let client = Client::builder()
            .redirect(redirect::Policy::none())
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn bearer(&self) -> Result<String, ObjectStoreError> {
        let cred = self
            .credentials
            .get_credential()
            .await
            .map_err(|e| ObjectStoreError::Unauthorized(format!("{e:#}")))?;
        if cred.is_expired() {
            return Err(ObjectStoreError::Unauthorized(
                "access token has expired".into(),
            ));
        }
        Ok(cred.access_token)
    }

    /// Authenticated request to a path relative to the base URL
    pub async fn request(
        &self,
        method: Method,
        path: &str,
    ) -> Result<RequestBuilder, ObjectStoreError> {
        let url = format!("{}{}", self.base_url, path);
        self.request_url(method, &url).await
    }

    /// Authenticated request to an absolute URL (upload session URIs)
    pub async fn request_url(
        &self,
        method: Method,
        url: &str,
    ) -> Result<RequestBuilder, ObjectStoreError> {
        let token = self.bearer().await?;
        debug!(%method, url, "Drive request");
        Ok(self.client.request(method, url).bearer_auth(token))
    }
}
