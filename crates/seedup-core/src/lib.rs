//! SeedUp Core - Domain types and port definitions
//!
//! This crate contains the pieces of the upload pipeline that do no I/O:
//! - **Domain entities** - `UploadTask`, `ChunkState`, `RemoteFileRecord`, `BatchReport`
//! - **Error taxonomy** - `UploadError`, `PipelineError`, `DomainError`
//! - **Port definitions** - `CloudObjectStore`, `SessionStore`, `ResumeTokenStore`,
//!   `CredentialProvider`, `TorrentEngine`
//! - **Configuration** - YAML-backed `Config` and the derived `UploadSettings`
//!
//! # Architecture
//!
//! Adapter crates (`seedup-drive`, `seedup-session`, `seedup-torrent`) implement
//! the ports; `seedup-upload` drives them through the trait objects only.

pub mod config;
pub mod domain;
pub mod ports;
