//! SeedUp Drive - Google Drive v3 adapter
//!
//! Provides:
//! - Folder listing and folder creation
//! - The resumable upload protocol (session, chunk, status)
//! - Bearer credential providers (environment, external command)
//!
//! ## Modules
//!
//! - [`auth`] - Credential providers
//! - [`client`] - Authenticated HTTP client
//! - [`errors`] - HTTP status to `ObjectStoreError` mapping
//! - [`folders`] - `files.list` pagination and folder creation
//! - [`upload`] - Resumable upload calls
//! - [`provider`] - `CloudObjectStore` implementation

pub mod auth;
pub mod client;
pub mod errors;
pub mod folders;
pub mod mime;
pub mod provider;
pub mod upload;

pub use auth::{CommandTokenProvider, EnvTokenProvider, StaticTokenProvider};
pub use client::DriveClient;
pub use provider::DriveObjectStore;

/// Browser URL of a Drive folder
pub fn folder_url(folder_id: &str) -> String {
    format!("https://drive.google.com/drive/folders/{folder_id}")
}
