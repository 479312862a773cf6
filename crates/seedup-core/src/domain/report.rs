//! Batch outcome summary

use serde::{Deserialize, Serialize};

use super::task::TaskId;

/// A task that ended the batch in the Failed state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedTask {
    pub task_id: TaskId,
    pub error: String,
    pub retryable: bool,
}

/// Result of one orchestrator run
///
/// Task ids are kept sorted so two runs over the same batch compare equal
/// regardless of worker scheduling.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    pub completed: Vec<TaskId>,
    pub skipped: Vec<TaskId>,
    pub failed: Vec<FailedTask>,
    /// Bytes acknowledged by the remote during this run
    pub bytes_uploaded: u64,
    /// True if cancellation stopped dispatch before every task was attempted
    pub cancelled: bool,
}

impl BatchReport {
    /// Creates an empty report
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `(completed, skipped, failed)` counts
    pub fn counts(&self) -> (usize, usize, usize) {
        (self.completed.len(), self.skipped.len(), self.failed.len())
    }

    /// Total number of tasks that reached a terminal state
    pub fn total(&self) -> usize {
        self.completed.len() + self.skipped.len() + self.failed.len()
    }

    /// True if nothing failed and the batch ran to the end
    pub fn is_success(&self) -> bool {
        self.failed.is_empty() && !self.cancelled
    }

    /// Sorts the id lists for a deterministic report
    pub fn finish(mut self) -> Self {
        self.completed.sort();
        self.skipped.sort();
        self.failed.sort_by(|a, b| a.task_id.cmp(&b.task_id));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_and_success() {
        let mut report = BatchReport::new();
        report.completed.push("/b".parse().unwrap());
        report.completed.push("/a".parse().unwrap());
        report.skipped.push("/c".parse().unwrap());
        assert!(report.is_success());

        report.failed.push(FailedTask {
            task_id: "/d".parse().unwrap(),
            error: "boom".into(),
            retryable: true,
        });
        assert!(!report.is_success());
        assert_eq!(report.counts(), (2, 1, 1));
        assert_eq!(report.total(), 4);

        let report = report.finish();
        assert_eq!(report.completed[0].as_str(), "/a");
    }

    #[test]
    fn test_cancelled_is_not_success() {
        let report = BatchReport {
            cancelled: true,
            ..BatchReport::default()
        };
        assert!(!report.is_success());
    }
}
