//! Upload progress on stderr

use std::path::Path;

use seedup_core::domain::{TaskId, TaskStatus, UploadTask};
use seedup_upload::ProgressObserver;

use crate::output::format_bytes;

fn display_name(task_id: &TaskId) -> String {
    Path::new(task_id.as_str())
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| task_id.to_string())
}

/// Percentage of `total` covered by `sent`, one decimal
pub fn percent(sent: u64, total: u64) -> f64 {
    if total == 0 {
        return 100.0;
    }
    (sent as f64 * 1000.0 / total as f64).round() / 10.0
}

/// Prints one line per acknowledged chunk
#[derive(Debug, Default)]
pub struct ConsoleProgress;

impl ConsoleProgress {
    pub fn new() -> Self {
        Self
    }
}

impl ProgressObserver for ConsoleProgress {
    fn task_started(&self, task: &UploadTask) {
        eprintln!("\u{2191} {} ({})", task.name(), format_bytes(task.size()));
    }

    fn chunk_acknowledged(&self, task_id: &TaskId, bytes_sent: u64, total: u64) {
        eprintln!(
            "    {} {:>5.1}% ({} / {})",
            display_name(task_id),
            percent(bytes_sent, total),
            format_bytes(bytes_sent),
            format_bytes(total)
        );
    }

    fn task_finished(&self, task: &UploadTask) {
        match task.status() {
            TaskStatus::Completed => eprintln!("\u{2713} {}", task.name()),
            TaskStatus::Skipped => eprintln!("- {} already in Drive, skipped", task.name()),
            TaskStatus::Failed { .. } => eprintln!(
                "\u{2717} {}: {}",
                task.name(),
                task.last_error().unwrap_or("unknown error")
            ),
            TaskStatus::Pending | TaskStatus::InProgress => {}
        }
    }
}
