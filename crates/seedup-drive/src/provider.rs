//! DriveObjectStore - CloudObjectStore implementation for Google Drive
//!
//! Delegates to the [`folders`] and [`upload`] modules.
//!
//! ## Design Notes
//!
//! - `list_files` drops sub-folders and Google-native documents (no byte
//!   size); neither can collide with an uploaded file under name+size
//!   duplicate detection.
//! - Folder resolution for the default destination (`SeedUp Downloads` in
//!   the Drive root) lives here because the CLI needs it before a batch.

use async_trait::async_trait;
use tracing::debug;

use seedup_core::domain::RemoteFileRecord;
use seedup_core::ports::{
    ChunkAck, CloudObjectStore, NewUpload, ObjectStoreError, ResumeToken, SessionState,
};

use crate::client::DriveClient;
use crate::{folders, upload};

/// Alias Drive accepts for the root folder of "My Drive"
pub const ROOT_FOLDER_ID: &str = "root";

/// Google Drive adapter
#[derive(Clone)]
pub struct DriveObjectStore {
    client: DriveClient,
}

impl DriveObjectStore {
    pub fn new(client: DriveClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &DriveClient {
        &self.client
    }

    /// Resolves the folder named `name` in the Drive root, creating it if needed
    pub async fn default_folder(&self, name: &str) -> Result<String, ObjectStoreError> {
        folders::find_or_create_folder(&self.client, name, ROOT_FOLDER_ID).await
    }
}

#[async_trait]
impl CloudObjectStore for DriveObjectStore {
    async fn list_files(
        &self,
        folder_id: &str,
    ) -> Result<Vec<RemoteFileRecord>, ObjectStoreError> {
        let entries = folders::list_folder(&self.client, folder_id).await?;
        let records: Vec<RemoteFileRecord> = entries
            .into_iter()
            .filter(|f| !f.is_folder())
            .filter_map(|f| {
                let size = f.size_bytes()?;
                Some(RemoteFileRecord::new(f.name, size, f.id))
            })
            .collect();
        debug!(folder_id, files = records.len(), "Remote listing ready");
        Ok(records)
    }

    async fn ensure_folder(
        &self,
        name: &str,
        parent_id: &str,
    ) -> Result<String, ObjectStoreError> {
        folders::find_or_create_folder(&self.client, name, parent_id).await
    }

    async fn create_resumable_session(
        &self,
        new_upload: &NewUpload,
    ) -> Result<ResumeToken, ObjectStoreError> {
        upload::create_resumable_session(&self.client, new_upload).await
    }

    async fn upload_chunk(
        &self,
        token: &ResumeToken,
        offset: u64,
        data: &[u8],
        total: u64,
    ) -> Result<ChunkAck, ObjectStoreError> {
        upload::upload_chunk(&self.client, token, offset, data, total).await
    }

    async fn session_status(
        &self,
        token: &ResumeToken,
        total: u64,
    ) -> Result<SessionState, ObjectStoreError> {
        upload::session_status(&self.client, token, total).await
    }
}
