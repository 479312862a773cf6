//! UploadOrchestrator - runs a batch of uploads
//!
//! ## Flow
//!
//! 1. Load the previous session; tasks that already reached a final
//!    outcome are reported as-is without touching the network
//! 2. Mirror the local directory structure under the destination folder
//! 3. Snapshot every destination folder for duplicate detection
//! 4. Upload the remaining tasks with at most `max_workers` in flight
//!
//! Each state change is persisted before the next step starts, so a
//! process killed at any point resumes from the last recorded state. One
//! task failing never stops the others.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures_util::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use seedup_core::config::{RunOptions, UploadSettings};
use seedup_core::domain::{
    BatchReport, FailedTask, PipelineError, TaskId, TaskStatus, UploadError, UploadTask,
};
use seedup_core::ports::{CloudObjectStore, ResumeTokenStore, SessionRecord, SessionStore};

use crate::enumerator::LocalFile;
use crate::progress::{NoopProgress, ProgressObserver};
use crate::remote_index::RemoteIndex;
use crate::retry::{Retried, RetryPolicy};
use crate::uploader::{ChunkedUploader, UploadOutcome};

/// Per-task result collected from the workers
enum TaskResult {
    Completed { task_id: TaskId, bytes: u64 },
    Skipped(TaskId),
    Failed { failed: FailedTask, bytes: u64 },
    Interrupted { bytes: u64 },
    NotStarted,
}

/// Drives a batch of uploads to one destination folder
pub struct UploadOrchestrator {
    store: Arc<dyn CloudObjectStore>,
    sessions: Arc<dyn SessionStore>,
    uploader: ChunkedUploader,
    settings: UploadSettings,
    progress: Arc<dyn ProgressObserver>,
    cancel: CancellationToken,
}

impl UploadOrchestrator {
    pub fn new(
        store: Arc<dyn CloudObjectStore>,
        sessions: Arc<dyn SessionStore>,
        tokens: Arc<dyn ResumeTokenStore>,
        settings: UploadSettings,
    ) -> Self {
        let uploader = ChunkedUploader::new(Arc::clone(&store), tokens, &settings);
        Self {
            store,
            sessions,
            uploader,
            settings,
            progress: Arc::new(NoopProgress),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressObserver>) -> Self {
        self.progress = progress;
        self
    }

    /// Uses `cancel` to stop the batch
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Token that stops dispatch and interrupts in-flight uploads
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Uploads `files` below `destination_folder_id`
    ///
    /// Files in sub-directories land in same-named sub-folders.
    ///
    /// # Errors
    /// `PipelineError::RemoteUnavailable` when destination folders cannot
    /// be created or listed, `PipelineError::Cancelled` when cancellation
    /// arrives before any task was dispatched. Per-task failures are
    /// reported in the returned [`BatchReport`].
    pub async fn run(
        &self,
        files: Vec<LocalFile>,
        destination_folder_id: &str,
        options: RunOptions,
    ) -> Result<BatchReport, PipelineError> {
        let batch_id = Uuid::new_v4();
        let span = info_span!("upload_batch", %batch_id, destination = destination_folder_id);
        self.run_batch(files, destination_folder_id, options)
            .instrument(span)
            .await
    }

    async fn run_batch(
        &self,
        files: Vec<LocalFile>,
        destination_folder_id: &str,
        options: RunOptions,
    ) -> Result<BatchReport, PipelineError> {
        info!(files = files.len(), "Starting upload batch");
        let mut report = BatchReport::new();

        let prior = match self.sessions.load().await {
            Ok(records) => records,
            Err(e) => {
                let err = PipelineError::SessionCorrupt(e.to_string());
                warn!(error = %err, "Ignoring previous session state");
                HashMap::new()
            }
        };

        // Final outcomes from earlier runs
        let mut pending = Vec::new();
        for file in files {
            let task_id = match TaskId::from_path(&file.path) {
                Ok(id) => id,
                Err(e) => {
                    error!(path = %file.path.display(), error = %e, "Skipping file");
                    continue;
                }
            };
            match prior.get(&task_id) {
                Some(record) if !record.status.needs_upload() => {
                    debug!(task_id = %task_id, status = %record.status, "Already settled");
                    settle(&mut report, record);
                }
                _ => pending.push(file),
            }
        }

        let retry = RetryPolicy::new(
            options.max_retries,
            self.settings.retry_base_delay,
            self.settings.max_retry_delay,
        );
        let folders = self
            .resolve_folders(&pending, destination_folder_id, &retry)
            .await?;

        let mut tasks = Vec::with_capacity(pending.len());
        for file in pending {
            let folder_id = folders
                .get(&file.relative_dir)
                .map_or(destination_folder_id, String::as_str);
            let mut task = match UploadTask::new(file.path, file.size, folder_id) {
                Ok(task) => task,
                Err(e) => {
                    error!(error = %e, "Skipping file");
                    continue;
                }
            };
            if let Some(record) = prior.get(task.id()) {
                task.restore(
                    record.status,
                    record.attempts,
                    record.last_error.clone(),
                    record.remote_id.clone(),
                );
            }
            tasks.push(task);
        }

        let index = RemoteIndex::new(Arc::clone(&self.store));
        if options.skip_existing {
            let distinct: BTreeSet<&str> =
                tasks.iter().map(UploadTask::destination_folder_id).collect();
            for folder_id in distinct {
                index.lookup(folder_id).await?;
            }
        }

        let uploader = self.uploader.clone().with_retry(retry);
        let workers = self.settings.max_workers.max(1);
        let results: Vec<TaskResult> = stream::iter(tasks)
            .map(|task| self.process(task, &uploader, &index, options))
            .buffer_unordered(workers)
            .collect()
            .await;

        let mut unfinished = false;
        for result in results {
            match result {
                TaskResult::Completed { task_id, bytes } => {
                    report.completed.push(task_id);
                    report.bytes_uploaded += bytes;
                }
                TaskResult::Skipped(task_id) => report.skipped.push(task_id),
                TaskResult::Failed { failed, bytes } => {
                    report.failed.push(failed);
                    report.bytes_uploaded += bytes;
                }
                TaskResult::Interrupted { bytes } => {
                    report.bytes_uploaded += bytes;
                    unfinished = true;
                }
                TaskResult::NotStarted => unfinished = true,
            }
        }
        report.cancelled = unfinished;

        let report = report.finish();
        let (completed, skipped, failed) = report.counts();
        info!(
            completed,
            skipped,
            failed,
            bytes_uploaded = report.bytes_uploaded,
            cancelled = report.cancelled,
            "Upload batch finished"
        );
        Ok(report)
    }

    /// Maps each needed relative directory to a remote folder id
    async fn resolve_folders(
        &self,
        files: &[LocalFile],
        destination_folder_id: &str,
        retry: &RetryPolicy,
    ) -> Result<HashMap<PathBuf, String>, PipelineError> {
        let mut folders = HashMap::new();
        folders.insert(PathBuf::new(), destination_folder_id.to_string());

        let dirs: BTreeSet<&Path> = files.iter().map(|f| f.relative_dir.as_path()).collect();
        for dir in dirs {
            let mut current = PathBuf::new();
            for component in dir.components() {
                let parent_id = folders
                    .get(&current)
                    .cloned()
                    .unwrap_or_else(|| destination_folder_id.to_string());
                current.push(component);
                if folders.contains_key(&current) {
                    continue;
                }
                let name = component.as_os_str().to_string_lossy().into_owned();
                let created = retry
                    .run("ensure_folder", &self.cancel, || {
                        self.store.ensure_folder(&name, &parent_id)
                    })
                    .await
                    .map_err(|e| {
                        PipelineError::RemoteUnavailable(format!(
                            "cannot create folder {}: {e}",
                            current.display()
                        ))
                    })?;
                match created {
                    Retried::Done(id) => {
                        debug!(dir = %current.display(), folder_id = %id, "Folder resolved");
                        folders.insert(current.clone(), id);
                    }
                    Retried::Cancelled => return Err(PipelineError::Cancelled),
                }
            }
        }
        Ok(folders)
    }

    async fn process(
        &self,
        mut task: UploadTask,
        uploader: &ChunkedUploader,
        index: &RemoteIndex,
        options: RunOptions,
    ) -> TaskResult {
        if self.cancel.is_cancelled() {
            return TaskResult::NotStarted;
        }

        if options.skip_existing {
            if let Some(result) = self.check_existing(&mut task, index).await {
                return result;
            }
        }

        if let Err(e) = task.start() {
            error!(task_id = %task.id(), error = %e, "Cannot start task");
            return TaskResult::Failed {
                failed: failed_task(&task, &UploadError::Permanent(e.to_string())),
                bytes: 0,
            };
        }
        self.persist(&task).await;
        self.progress.task_started(&task);
        debug!(task_id = %task.id(), attempt = task.attempts(), "Uploading");

        let outcome = uploader
            .upload(&task, self.progress.as_ref(), &self.cancel)
            .await;
        let result = match outcome {
            Ok(UploadOutcome::Completed {
                remote_id,
                bytes_uploaded,
            }) => {
                if let Err(e) = task.complete(remote_id) {
                    error!(task_id = %task.id(), error = %e, "Cannot complete task");
                }
                info!(task_id = %task.id(), "Uploaded");
                TaskResult::Completed {
                    task_id: task.id().clone(),
                    bytes: bytes_uploaded,
                }
            }
            Ok(UploadOutcome::Interrupted { bytes_uploaded }) => {
                return TaskResult::Interrupted {
                    bytes: bytes_uploaded,
                };
            }
            Err(err) => {
                warn!(task_id = %task.id(), error = %err, "Upload failed");
                if let Err(e) = task.fail(&err) {
                    error!(task_id = %task.id(), error = %e, "Cannot record failure");
                }
                TaskResult::Failed {
                    failed: failed_task(&task, &err),
                    bytes: 0,
                }
            }
        };
        self.persist(&task).await;
        self.progress.task_finished(&task);
        result
    }

    /// Resolves a task against the destination listing
    ///
    /// A task interrupted by a crash after its object was committed finds
    /// that object here and completes without uploading again.
    async fn check_existing(&self, task: &mut UploadTask, index: &RemoteIndex) -> Option<TaskResult> {
        let snapshot = match index.lookup(task.destination_folder_id()).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(task_id = %task.id(), error = %e, "Duplicate check unavailable");
                return None;
            }
        };
        if !snapshot.contains(task.name(), task.size()) {
            return None;
        }

        if task.status() == TaskStatus::InProgress {
            let remote_id = snapshot.find(task.name(), task.size())?.remote_id.clone();
            if task.complete(remote_id).is_err() {
                return None;
            }
            info!(task_id = %task.id(), "Interrupted upload was already committed");
            self.persist(task).await;
            return Some(TaskResult::Completed {
                task_id: task.id().clone(),
                bytes: 0,
            });
        }

        if let Err(e) = task.skip() {
            error!(task_id = %task.id(), error = %e, "Cannot skip task");
            return None;
        }
        info!(task_id = %task.id(), name = task.name(), "Already present, skipping");
        self.persist(task).await;
        self.progress.task_finished(task);
        Some(TaskResult::Skipped(task.id().clone()))
    }

    async fn persist(&self, task: &UploadTask) {
        if let Err(e) = self.sessions.save(&SessionRecord::from_task(task)).await {
            error!(task_id = %task.id(), status = %task.status(), error = %e, "Failed to persist task state");
        }
    }
}

fn failed_task(task: &UploadTask, err: &UploadError) -> FailedTask {
    FailedTask {
        task_id: task.id().clone(),
        error: err.message().to_string(),
        retryable: err.is_retryable(),
    }
}

fn settle(report: &mut BatchReport, record: &SessionRecord) {
    let task_id = record.task_id.clone();
    match record.status {
        TaskStatus::Completed => report.completed.push(task_id),
        TaskStatus::Skipped => report.skipped.push(task_id),
        TaskStatus::Failed { retryable } => report.failed.push(FailedTask {
            task_id,
            error: record.last_error.clone().unwrap_or_default(),
            retryable,
        }),
        TaskStatus::Pending | TaskStatus::InProgress => {}
    }
}
