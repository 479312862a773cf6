//! ChunkState - per-task transfer cursor
//!
//! Owned by the chunked uploader while a task is `InProgress`. The byte
//! offset is authoritative; the chunk index is derived from it so that a
//! chunk retried after a partial acknowledgement is re-addressed by the
//! offset the remote reported, never by a local counter.

use std::ops::Range;

use super::task::TaskId;

/// Transfer progress of one task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkState {
    task_id: TaskId,
    chunk_index: u64,
    chunk_size: u64,
    bytes_sent: u64,
    checksum: Option<String>,
}

impl ChunkState {
    /// Starts a fresh transfer at offset 0
    ///
    /// `chunk_size` must be non-zero; configuration validation enforces it.
    pub fn new(task_id: TaskId, chunk_size: u64) -> Self {
        Self::resume_at(task_id, chunk_size, 0)
    }

    /// Starts from an offset previously acknowledged by the remote
    pub fn resume_at(task_id: TaskId, chunk_size: u64, acknowledged: u64) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            task_id,
            chunk_index: acknowledged / chunk_size,
            chunk_size,
            bytes_sent: acknowledged,
            checksum: None,
        }
    }

    pub fn task_id(&self) -> &TaskId {
        &self.task_id
    }

    pub fn chunk_index(&self) -> u64 {
        self.chunk_index
    }

    pub fn chunk_size(&self) -> u64 {
        self.chunk_size
    }

    /// Bytes acknowledged by the remote so far
    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent
    }

    /// SHA-256 of the last acknowledged chunk, hex encoded
    pub fn checksum(&self) -> Option<&str> {
        self.checksum.as_deref()
    }

    /// Byte range of the next chunk to send, or `None` when done
    pub fn next_range(&self, total: u64) -> Option<Range<u64>> {
        if self.bytes_sent >= total {
            return None;
        }
        let end = (self.bytes_sent + self.chunk_size).min(total);
        Some(self.bytes_sent..end)
    }

    /// Records the offset acknowledged after sending a chunk
    ///
    /// The remote may acknowledge fewer bytes than were sent; the cursor
    /// follows the acknowledgement. It never moves backwards.
    pub fn acknowledge(&mut self, acknowledged: u64, checksum: Option<String>) {
        if acknowledged > self.bytes_sent {
            self.bytes_sent = acknowledged;
        }
        self.chunk_index = self.bytes_sent / self.chunk_size;
        self.checksum = checksum;
    }

    /// Returns true once every byte of a `total`-sized file is acknowledged
    pub fn is_complete(&self, total: u64) -> bool {
        self.bytes_sent >= total
    }
}
