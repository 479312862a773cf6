//! Progress reporting hooks

use seedup_core::domain::{TaskId, UploadTask};

/// Receives upload progress from concurrent workers
///
/// `chunk_acknowledged` is called after every acknowledged chunk with a
/// `bytes_sent` that never decreases for a given task.
pub trait ProgressObserver: Send + Sync {
    fn task_started(&self, _task: &UploadTask) {}

    fn chunk_acknowledged(&self, task_id: &TaskId, bytes_sent: u64, total: u64);

    fn task_finished(&self, _task: &UploadTask) {}
}

/// Observer that ignores every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProgress;

impl ProgressObserver for NoopProgress {
    fn chunk_acknowledged(&self, _task_id: &TaskId, _bytes_sent: u64, _total: u64) {}
}
