//! ChunkedUploader - moves one file through a resumable session
//!
//! ## Flow
//!
//! 1. Check that the file still has the size recorded in the task
//! 2. Reuse a stored resume token if the remote still knows it, starting at
//!    the offset the remote reports; otherwise open a new session
//! 3. Send chunks in order, each retried with backoff, advancing the cursor
//!    to whatever the remote acknowledged
//! 4. An expired session mid-transfer restarts once from offset 0
//!
//! Cancellation is observed between chunks and during backoff. An
//! interrupted upload keeps its resume token so the next run continues
//! where this one stopped.

use std::io::SeekFrom;
use std::ops::Range;
use std::path::Path;
use std::sync::Arc;

use sha2::{Digest, Sha256};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use seedup_core::config::UploadSettings;
use seedup_core::domain::{ChunkState, TaskId, UploadError, UploadTask};
use seedup_core::ports::{
    ChunkAck, CloudObjectStore, NewUpload, ObjectStoreError, ResumeToken, ResumeTokenStore,
    SessionState,
};

use crate::progress::ProgressObserver;
use crate::retry::{Retried, RetryPolicy};

/// How a single upload ended without error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    /// The remote committed the object
    Completed {
        remote_id: String,
        /// Bytes acknowledged during this call
        bytes_uploaded: u64,
    },
    /// Cancellation stopped the transfer; the session stays resumable
    Interrupted { bytes_uploaded: u64 },
}

enum Opened {
    Session {
        token: ResumeToken,
        acknowledged: u64,
    },
    /// A stored session had already committed the object
    Finished(String),
    Cancelled,
}

enum Transfer {
    Done(String),
    Interrupted,
    Expired,
}

/// Byte and progress accounting for one `upload` call
struct Tally<'a> {
    task_id: &'a TaskId,
    total: u64,
    uploaded: u64,
    reported: u64,
    progress: &'a dyn ProgressObserver,
}

impl Tally<'_> {
    fn acknowledged(&mut self, from: u64, to: u64) {
        self.uploaded += to.saturating_sub(from);
        if to > self.reported {
            self.reported = to;
            self.progress
                .chunk_acknowledged(self.task_id, to, self.total);
        }
    }
}

fn sha256_hex(data: &[u8]) -> String {
    format!("{:x}", Sha256::digest(data))
}

fn local_error(path: &Path, err: std::io::Error) -> UploadError {
    UploadError::Permanent(format!("cannot read {}: {err}", path.display()))
}

async fn read_range(file: &mut File, path: &Path, range: Range<u64>) -> Result<Vec<u8>, UploadError> {
    let mut buf = vec![0u8; (range.end - range.start) as usize];
    file.seek(SeekFrom::Start(range.start))
        .await
        .map_err(|e| local_error(path, e))?;
    file.read_exact(&mut buf)
        .await
        .map_err(|e| local_error(path, e))?;
    Ok(buf)
}

/// Uploads files in fixed-size chunks through a [`CloudObjectStore`]
#[derive(Clone)]
pub struct ChunkedUploader {
    store: Arc<dyn CloudObjectStore>,
    tokens: Arc<dyn ResumeTokenStore>,
    chunk_size: u64,
    retry: RetryPolicy,
}

impl ChunkedUploader {
    pub fn new(
        store: Arc<dyn CloudObjectStore>,
        tokens: Arc<dyn ResumeTokenStore>,
        settings: &UploadSettings,
    ) -> Self {
        Self {
            store,
            tokens,
            chunk_size: settings.chunk_size.max(1),
            retry: RetryPolicy::from(settings),
        }
    }

    /// Replaces the retry policy
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Uploads the file behind `task` to its destination folder
    ///
    /// # Errors
    /// `UploadError::Transient` when retries ran out on a transient failure,
    /// `UploadError::Permanent` for rejected requests, quota exhaustion and
    /// local files that changed or vanished.
    #[tracing::instrument(skip_all, fields(task_id = %task.id(), size = task.size()))]
    pub async fn upload(
        &self,
        task: &UploadTask,
        progress: &dyn ProgressObserver,
        cancel: &CancellationToken,
    ) -> Result<UploadOutcome, UploadError> {
        let path = task.local_path();
        let total = task.size();

        let meta = tokio::fs::metadata(path)
            .await
            .map_err(|e| local_error(path, e))?;
        if meta.len() != total {
            return Err(UploadError::Permanent(format!(
                "{} changed size: expected {total} bytes, found {}",
                path.display(),
                meta.len()
            )));
        }
        let mut file = File::open(path).await.map_err(|e| local_error(path, e))?;

        let mut tally = Tally {
            task_id: task.id(),
            total,
            uploaded: 0,
            reported: 0,
            progress,
        };
        let mut restarted = false;

        loop {
            let (token, acknowledged) = match self.open_session(task, cancel).await? {
                Opened::Session {
                    token,
                    acknowledged,
                } => (token, acknowledged),
                Opened::Finished(remote_id) => {
                    tally.acknowledged(total, total);
                    return Ok(UploadOutcome::Completed {
                        remote_id,
                        bytes_uploaded: tally.uploaded,
                    });
                }
                Opened::Cancelled => {
                    return Ok(UploadOutcome::Interrupted {
                        bytes_uploaded: tally.uploaded,
                    })
                }
            };

            let result = self
                .transfer(task, &mut file, &token, acknowledged, &mut tally, cancel)
                .await;
            match result {
                Ok(Transfer::Done(remote_id)) => {
                    self.discard_token(task).await;
                    return Ok(UploadOutcome::Completed {
                        remote_id,
                        bytes_uploaded: tally.uploaded,
                    });
                }
                Ok(Transfer::Interrupted) => {
                    info!(task_id = %task.id(), bytes_sent = tally.reported, "Upload interrupted");
                    return Ok(UploadOutcome::Interrupted {
                        bytes_uploaded: tally.uploaded,
                    });
                }
                Ok(Transfer::Expired) => {
                    self.discard_token(task).await;
                    if restarted {
                        return Err(UploadError::Transient(
                            "upload session expired twice".into(),
                        ));
                    }
                    warn!(task_id = %task.id(), "Upload session expired, starting over");
                    restarted = true;
                }
                Err(err) => {
                    if !err.is_retryable() {
                        self.discard_token(task).await;
                    }
                    return Err(err);
                }
            }
        }
    }

    async fn open_session(
        &self,
        task: &UploadTask,
        cancel: &CancellationToken,
    ) -> Result<Opened, UploadError> {
        let total = task.size();

        if let Some(token) = self.load_token(task).await {
            let status = self
                .retry
                .run("session_status", cancel, || {
                    self.store.session_status(&token, total)
                })
                .await
                .map_err(UploadError::from)?;
            match status {
                Retried::Cancelled => return Ok(Opened::Cancelled),
                Retried::Done(SessionState::Active { acknowledged }) if acknowledged <= total => {
                    info!(task_id = %task.id(), acknowledged, total, "Resuming upload session");
                    return Ok(Opened::Session {
                        token,
                        acknowledged,
                    });
                }
                Retried::Done(SessionState::Complete { remote_id, size }) if size == total => {
                    info!(task_id = %task.id(), remote_id = %remote_id, "Stored session already complete");
                    self.discard_token(task).await;
                    return Ok(Opened::Finished(remote_id));
                }
                Retried::Done(state) => {
                    debug!(task_id = %task.id(), ?state, "Stored session unusable");
                    self.discard_token(task).await;
                }
            }
        }

        let new_upload = NewUpload::new(task.name(), task.destination_folder_id(), total);
        let created = self
            .retry
            .run("create_session", cancel, || {
                self.store.create_resumable_session(&new_upload)
            })
            .await
            .map_err(UploadError::from)?;
        let token = match created {
            Retried::Done(token) => token,
            Retried::Cancelled => return Ok(Opened::Cancelled),
        };

        if let Err(e) = self
            .tokens
            .save_token(task.id(), task.destination_folder_id(), &token)
            .await
        {
            warn!(task_id = %task.id(), error = %e, "Failed to persist resume token");
        }
        debug!(task_id = %task.id(), "Opened upload session");
        Ok(Opened::Session {
            token,
            acknowledged: 0,
        })
    }

    async fn transfer(
        &self,
        task: &UploadTask,
        file: &mut File,
        token: &ResumeToken,
        acknowledged: u64,
        tally: &mut Tally<'_>,
        cancel: &CancellationToken,
    ) -> Result<Transfer, UploadError> {
        let total = task.size();
        let mut state = ChunkState::resume_at(task.id().clone(), self.chunk_size, acknowledged);
        tally.acknowledged(acknowledged, acknowledged);
        let mut stalled = 0u32;

        while let Some(range) = state.next_range(total) {
            if cancel.is_cancelled() {
                return Ok(Transfer::Interrupted);
            }

            let offset = range.start;
            let data = read_range(file, task.local_path(), range).await?;
            let checksum = sha256_hex(&data);

            let ack = match self
                .retry
                .run("upload_chunk", cancel, || {
                    self.store.upload_chunk(token, offset, &data, total)
                })
                .await
            {
                Ok(Retried::Done(ack)) => ack,
                Ok(Retried::Cancelled) => return Ok(Transfer::Interrupted),
                Err(ObjectStoreError::SessionExpired) => return Ok(Transfer::Expired),
                Err(err) => return Err(err.into()),
            };

            match ack {
                ChunkAck::Incomplete { acknowledged } => {
                    if acknowledged < offset {
                        return Err(UploadError::Transient(format!(
                            "remote acknowledged {acknowledged} bytes after {offset} were stored"
                        )));
                    }
                    if acknowledged > total {
                        return Err(UploadError::Permanent(format!(
                            "remote acknowledged {acknowledged} bytes of a {total} byte file"
                        )));
                    }
                    if acknowledged == offset {
                        stalled += 1;
                        if stalled >= self.retry.max_attempts {
                            return Err(UploadError::Transient(format!(
                                "remote stopped accepting bytes at offset {offset}"
                            )));
                        }
                    } else {
                        stalled = 0;
                    }
                    tally.acknowledged(state.bytes_sent(), acknowledged);
                    state.acknowledge(acknowledged, Some(checksum));
                    debug!(
                        task_id = %task.id(),
                        chunk = state.chunk_index(),
                        acknowledged,
                        total,
                        checksum = state.checksum().unwrap_or_default(),
                        "Chunk acknowledged"
                    );
                }
                ChunkAck::Complete { remote_id, size } => {
                    if size != total {
                        return Err(UploadError::Permanent(format!(
                            "remote object has {size} bytes, local file has {total}"
                        )));
                    }
                    tally.acknowledged(state.bytes_sent(), total);
                    state.acknowledge(total, Some(checksum));
                    info!(task_id = %task.id(), remote_id = %remote_id, size, "Upload committed");
                    return Ok(Transfer::Done(remote_id));
                }
            }
        }

        // Every byte acknowledged without a commit response
        let status = self
            .retry
            .run("session_status", cancel, || {
                self.store.session_status(token, total)
            })
            .await;
        match status {
            Ok(Retried::Done(SessionState::Complete { remote_id, size })) if size == total => {
                Ok(Transfer::Done(remote_id))
            }
            Ok(Retried::Done(SessionState::Expired)) | Err(ObjectStoreError::SessionExpired) => {
                Ok(Transfer::Expired)
            }
            Ok(Retried::Done(state)) => Err(UploadError::Transient(format!(
                "upload not committed after final chunk: {state:?}"
            ))),
            Ok(Retried::Cancelled) => Ok(Transfer::Interrupted),
            Err(err) => Err(err.into()),
        }
    }

    async fn load_token(&self, task: &UploadTask) -> Option<ResumeToken> {
        match self
            .tokens
            .load_token(task.id(), task.destination_folder_id())
            .await
        {
            Ok(token) => token,
            Err(e) => {
                warn!(task_id = %task.id(), error = %e, "Cannot read resume token");
                None
            }
        }
    }

    async fn discard_token(&self, task: &UploadTask) {
        if let Err(e) = self
            .tokens
            .discard_token(task.id(), task.destination_folder_id())
            .await
        {
            warn!(task_id = %task.id(), error = %e, "Failed to discard resume token");
        }
    }
}
