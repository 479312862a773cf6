//! RemoteIndex - read-through cache of destination folder listings
//!
//! Each folder is listed at most once per index. The snapshot is frozen
//! once loaded: concurrent workers all see the same contents, and files
//! uploaded during the batch never appear in it.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use tokio::sync::OnceCell;
use tracing::{debug, info};

use seedup_core::domain::{PipelineError, RemoteFileRecord};
use seedup_core::ports::CloudObjectStore;

/// Immutable listing of one folder
#[derive(Debug, Default)]
pub struct FolderSnapshot {
    records: Vec<RemoteFileRecord>,
    keys: HashSet<(String, u64)>,
}

impl FolderSnapshot {
    pub fn new(records: Vec<RemoteFileRecord>) -> Self {
        let keys = records.iter().map(|r| (r.name.clone(), r.size)).collect();
        Self { records, keys }
    }

    /// True iff a file with exactly this name and size exists
    pub fn contains(&self, name: &str, size: u64) -> bool {
        self.keys.contains(&(name.to_string(), size))
    }

    /// First record with this name and size
    pub fn find(&self, name: &str, size: u64) -> Option<&RemoteFileRecord> {
        self.records
            .iter()
            .find(|r| r.name == name && r.size == size)
    }
}

type Slot = Arc<OnceCell<Arc<FolderSnapshot>>>;

/// Per-batch cache of folder listings keyed by folder id
pub struct RemoteIndex {
    store: Arc<dyn CloudObjectStore>,
    folders: Mutex<HashMap<String, Slot>>,
}

impl RemoteIndex {
    pub fn new(store: Arc<dyn CloudObjectStore>) -> Self {
        Self {
            store,
            folders: Mutex::new(HashMap::new()),
        }
    }

    fn slot(&self, folder_id: &str) -> Slot {
        let mut folders = match self.folders.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        folders
            .entry(folder_id.to_string())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone()
    }

    /// Returns the snapshot of `folder_id`, listing it on first use
    ///
    /// Concurrent callers for the same folder share one listing call.
    ///
    /// # Errors
    /// `PipelineError::RemoteUnavailable` if the listing fails.
    pub async fn lookup(&self, folder_id: &str) -> Result<Arc<FolderSnapshot>, PipelineError> {
        let slot = self.slot(folder_id);
        let snapshot = slot
            .get_or_try_init(|| async {
                debug!(folder_id, "Listing destination folder");
                let records = self.store.list_files(folder_id).await.map_err(|e| {
                    PipelineError::RemoteUnavailable(format!(
                        "cannot list folder {folder_id}: {e}"
                    ))
                })?;
                info!(folder_id, files = records.len(), "Remote index loaded");
                Ok::<_, PipelineError>(Arc::new(FolderSnapshot::new(records)))
            })
            .await?;
        Ok(Arc::clone(snapshot))
    }

    /// True iff `folder_id` holds a file with this exact name and size
    pub async fn contains(
        &self,
        folder_id: &str,
        name: &str,
        size: u64,
    ) -> Result<bool, PipelineError> {
        Ok(self.lookup(folder_id).await?.contains(name, size))
    }
}
