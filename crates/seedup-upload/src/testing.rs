//! In-memory port implementations for pipeline tests

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;

use anyhow::anyhow;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use seedup_core::domain::{RemoteFileRecord, TaskId};
use seedup_core::ports::{
    ChunkAck, CloudObjectStore, NewUpload, ObjectStoreError, ResumeToken, ResumeTokenStore,
    SessionRecord, SessionState, SessionStore,
};

#[derive(Debug)]
struct Session {
    upload: NewUpload,
    data: Vec<u8>,
    remote_id: Option<String>,
}

#[derive(Default)]
struct State {
    files: HashMap<String, Vec<RemoteFileRecord>>,
    folders: HashMap<(String, String), String>,
    sessions: HashMap<String, Session>,
    objects: HashMap<String, Vec<u8>>,
    next_id: u32,
    fail_next_chunks: u32,
    fail_names: HashMap<String, ObjectStoreError>,
    expire_after_chunks: Option<u32>,
    cancel_after_chunks: Option<(u32, CancellationToken)>,
    max_ack_per_chunk: Option<u64>,
}

/// Cloud store holding sessions and objects in memory
#[derive(Default)]
pub struct MemoryObjectStore {
    state: Mutex<State>,
    list_calls: AtomicU32,
    chunk_calls: AtomicU32,
    session_creates: AtomicU32,
    folder_calls: AtomicU32,
    fail_listing: AtomicBool,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    pub fn add_remote_file(&self, folder_id: &str, name: &str, size: u64) {
        let mut state = self.state();
        state.next_id += 1;
        let id = format!("existing-{}", state.next_id);
        state
            .files
            .entry(folder_id.to_string())
            .or_default()
            .push(RemoteFileRecord::new(name, size, id));
    }

    pub fn fail_listing(&self, fail: bool) {
        self.fail_listing.store(fail, Ordering::SeqCst);
    }

    /// The next `n` chunk calls fail with a 503
    pub fn fail_next_chunks(&self, n: u32) {
        self.state().fail_next_chunks = n;
    }

    /// Every chunk of a file named `name` fails with `err`
    pub fn fail_uploads_named(&self, name: &str, err: ObjectStoreError) {
        self.state().fail_names.insert(name.to_string(), err);
    }

    /// Drops every open session once `n` chunk calls have been accepted
    pub fn expire_sessions_after(&self, n: u32) {
        self.state().expire_after_chunks = Some(n);
    }

    /// Cancels `token` once `n` chunk calls have been accepted
    pub fn cancel_after_chunks(&self, n: u32, token: CancellationToken) {
        self.state().cancel_after_chunks = Some((n, token));
    }

    /// Stores at most `n` bytes of each chunk
    pub fn limit_ack(&self, n: u64) {
        self.state().max_ack_per_chunk = Some(n);
    }

    pub fn list_calls(&self) -> u32 {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn chunk_calls(&self) -> u32 {
        self.chunk_calls.load(Ordering::SeqCst)
    }

    pub fn session_creates(&self) -> u32 {
        self.session_creates.load(Ordering::SeqCst)
    }

    pub fn folder_calls(&self) -> u32 {
        self.folder_calls.load(Ordering::SeqCst)
    }

    /// Committed bytes of the object named `name` in `folder_id`
    pub fn object(&self, folder_id: &str, name: &str) -> Option<Vec<u8>> {
        let state = self.state();
        let record = state
            .files
            .get(folder_id)?
            .iter()
            .find(|r| r.name == name)?;
        state.objects.get(&record.remote_id).cloned()
    }

    /// Number of files listed in `folder_id`
    pub fn file_count(&self, folder_id: &str) -> usize {
        self.state().files.get(folder_id).map_or(0, Vec::len)
    }

    /// Id of the folder `name` created under `parent_id`
    pub fn folder_id(&self, parent_id: &str, name: &str) -> Option<String> {
        self.state()
            .folders
            .get(&(parent_id.to_string(), name.to_string()))
            .cloned()
    }
}

#[async_trait]
impl CloudObjectStore for MemoryObjectStore {
    async fn list_files(
        &self,
        folder_id: &str,
    ) -> Result<Vec<RemoteFileRecord>, ObjectStoreError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_listing.load(Ordering::SeqCst) {
            return Err(ObjectStoreError::Network("connection refused".into()));
        }
        Ok(self.state().files.get(folder_id).cloned().unwrap_or_default())
    }

    async fn ensure_folder(&self, name: &str, parent_id: &str) -> Result<String, ObjectStoreError> {
        self.folder_calls.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state();
        let key = (parent_id.to_string(), name.to_string());
        if let Some(id) = state.folders.get(&key) {
            return Ok(id.clone());
        }
        state.next_id += 1;
        let id = format!("folder-{}", state.next_id);
        state.folders.insert(key, id.clone());
        Ok(id)
    }

    async fn create_resumable_session(
        &self,
        upload: &NewUpload,
    ) -> Result<ResumeToken, ObjectStoreError> {
        self.session_creates.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state();
        state.next_id += 1;
        let token = format!("session-{}", state.next_id);
        state.sessions.insert(
            token.clone(),
            Session {
                upload: upload.clone(),
                data: Vec::new(),
                remote_id: None,
            },
        );
        Ok(ResumeToken::new(token))
    }

    async fn upload_chunk(
        &self,
        token: &ResumeToken,
        offset: u64,
        data: &[u8],
        total: u64,
    ) -> Result<ChunkAck, ObjectStoreError> {
        let call = self.chunk_calls.fetch_add(1, Ordering::SeqCst) + 1;
        let mut state = self.state();

        if state.fail_next_chunks > 0 {
            state.fail_next_chunks -= 1;
            return Err(ObjectStoreError::Server {
                status: 503,
                message: "backend unavailable".into(),
            });
        }
        if let Some(n) = state.expire_after_chunks {
            if call > n {
                state.expire_after_chunks = None;
                state.sessions.clear();
                return Err(ObjectStoreError::SessionExpired);
            }
        }
        let limit = state.max_ack_per_chunk;
        let name = match state.sessions.get(token.as_str()) {
            Some(session) => session.upload.name.clone(),
            None => return Err(ObjectStoreError::SessionExpired),
        };
        if let Some(err) = state.fail_names.get(&name) {
            return Err(err.clone());
        }

        let mut completed = None;
        {
            let session = state
                .sessions
                .get_mut(token.as_str())
                .ok_or(ObjectStoreError::SessionExpired)?;
            let held = session.data.len() as u64;
            if offset > held {
                return Err(ObjectStoreError::InvalidRequest(format!(
                    "offset {offset} beyond stored {held}"
                )));
            }
            let take = limit.map_or(data.len(), |l| data.len().min(l as usize));
            session.data.truncate(offset as usize);
            session.data.extend_from_slice(&data[..take]);
            if session.data.len() as u64 == total {
                completed = Some((session.upload.clone(), session.data.clone()));
            }
        }

        let ack = match completed {
            Some((upload, bytes)) => {
                state.next_id += 1;
                let remote_id = format!("object-{}", state.next_id);
                state.objects.insert(remote_id.clone(), bytes);
                state
                    .files
                    .entry(upload.folder_id.clone())
                    .or_default()
                    .push(RemoteFileRecord::new(
                        upload.name.clone(),
                        total,
                        remote_id.clone(),
                    ));
                if let Some(session) = state.sessions.get_mut(token.as_str()) {
                    session.remote_id = Some(remote_id.clone());
                }
                ChunkAck::Complete {
                    remote_id,
                    size: total,
                }
            }
            None => ChunkAck::Incomplete {
                acknowledged: state
                    .sessions
                    .get(token.as_str())
                    .map_or(0, |s| s.data.len() as u64),
            },
        };

        if let Some((n, cancel)) = &state.cancel_after_chunks {
            if call >= *n {
                cancel.cancel();
            }
        }
        Ok(ack)
    }

    async fn session_status(
        &self,
        token: &ResumeToken,
        total: u64,
    ) -> Result<SessionState, ObjectStoreError> {
        let state = self.state();
        Ok(match state.sessions.get(token.as_str()) {
            None => SessionState::Expired,
            Some(Session {
                remote_id: Some(id),
                ..
            }) => SessionState::Complete {
                remote_id: id.clone(),
                size: total,
            },
            Some(session) => SessionState::Active {
                acknowledged: session.data.len() as u64,
            },
        })
    }
}

/// Session and resume-token store backed by hash maps
#[derive(Default)]
pub struct MemorySessionStore {
    records: Mutex<HashMap<TaskId, SessionRecord>>,
    tokens: Mutex<HashMap<(TaskId, String), ResumeToken>>,
    fail_load: AtomicBool,
    failing_saves: Mutex<HashSet<TaskId>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_load(&self, fail: bool) {
        self.fail_load.store(fail, Ordering::SeqCst);
    }

    /// Saves for `task_id` fail
    pub fn fail_saves_for(&self, task_id: TaskId) {
        self.failing_saves.lock().unwrap().insert(task_id);
    }

    pub fn record(&self, task_id: &TaskId) -> Option<SessionRecord> {
        self.records.lock().unwrap().get(task_id).cloned()
    }

    pub fn insert(&self, record: SessionRecord) {
        self.records
            .lock()
            .unwrap()
            .insert(record.task_id.clone(), record);
    }

    pub fn token_count(&self) -> usize {
        self.tokens.lock().unwrap().len()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self) -> anyhow::Result<HashMap<TaskId, SessionRecord>> {
        if self.fail_load.load(Ordering::SeqCst) {
            return Err(anyhow!("malformed session database"));
        }
        Ok(self.records.lock().unwrap().clone())
    }

    async fn save(&self, record: &SessionRecord) -> anyhow::Result<()> {
        if self.failing_saves.lock().unwrap().contains(&record.task_id) {
            return Err(anyhow!("disk full"));
        }
        self.insert(record.clone());
        Ok(())
    }

    async fn clear(&self) -> anyhow::Result<()> {
        self.records.lock().unwrap().clear();
        self.tokens.lock().unwrap().clear();
        Ok(())
    }
}

#[async_trait]
impl ResumeTokenStore for MemorySessionStore {
    async fn load_token(
        &self,
        task_id: &TaskId,
        folder_id: &str,
    ) -> anyhow::Result<Option<ResumeToken>> {
        Ok(self
            .tokens
            .lock()
            .unwrap()
            .get(&(task_id.clone(), folder_id.to_string()))
            .cloned())
    }

    async fn save_token(
        &self,
        task_id: &TaskId,
        folder_id: &str,
        token: &ResumeToken,
    ) -> anyhow::Result<()> {
        self.tokens
            .lock()
            .unwrap()
            .insert((task_id.clone(), folder_id.to_string()), token.clone());
        Ok(())
    }

    async fn discard_token(&self, task_id: &TaskId, folder_id: &str) -> anyhow::Result<()> {
        self.tokens
            .lock()
            .unwrap()
            .remove(&(task_id.clone(), folder_id.to_string()));
        Ok(())
    }
}
