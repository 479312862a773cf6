//! Port definitions (hexagonal architecture interfaces)
//!
//! ## Ports Overview
//!
//! - [`CloudObjectStore`] - Folder listing and resumable uploads
//! - [`SessionStore`] / [`ResumeTokenStore`] - Durable batch progress
//! - [`CredentialProvider`] - Bearer credentials for the cloud API
//! - [`TorrentEngine`] - External BitTorrent engine

pub mod credentials;
pub mod object_store;
pub mod session_store;
pub mod torrent_engine;

pub use credentials::{Credential, CredentialProvider};
pub use object_store::{
    ChunkAck, CloudObjectStore, NewUpload, ObjectStoreError, ResumeToken, SessionState,
};
pub use session_store::{ResumeTokenStore, SessionRecord, SessionStore};
pub use torrent_engine::{DownloadRequest, TorrentEngine};
