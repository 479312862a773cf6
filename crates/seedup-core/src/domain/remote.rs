//! Snapshot of files already present at a destination folder

use serde::{Deserialize, Serialize};

/// A file listed in a destination folder
///
/// Produced by the cloud adapter and cached by the remote index for the
/// duration of a batch; callers never mutate it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RemoteFileRecord {
    pub name: String,
    pub size: u64,
    pub remote_id: String,
}

impl RemoteFileRecord {
    pub fn new(name: impl Into<String>, size: u64, remote_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            size,
            remote_id: remote_id.into(),
        }
    }
}
