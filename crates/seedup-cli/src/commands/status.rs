//! Status command - Show paused downloads and upload progress
//!
//! Provides the `seedup status` CLI command which:
//! 1. Reports whether a paused torrent session can be resumed
//! 2. Shows upload session counts by status
//! 3. Lists failed uploads with their last error

use std::collections::HashMap;

use anyhow::{Context, Result};
use clap::Args;

use seedup_core::domain::TaskStatus;
use seedup_core::ports::{SessionRecord, SessionStore, TorrentEngine};

use super::Outcome;
use crate::context::CliContext;

/// Order in which status counts are printed
const STATUS_ORDER: [TaskStatus; 6] = [
    TaskStatus::Completed,
    TaskStatus::Skipped,
    TaskStatus::InProgress,
    TaskStatus::Pending,
    TaskStatus::Failed { retryable: true },
    TaskStatus::Failed { retryable: false },
];

#[derive(Debug, Args)]
pub struct StatusCommand {}

impl StatusCommand {
    pub async fn execute(&self, ctx: &CliContext) -> Result<Outcome> {
        let formatter = ctx.formatter();
        let paused = ctx.torrent_engine().has_paused_session();

        let mut counts: HashMap<String, u64> = HashMap::new();
        let mut failed: Vec<SessionRecord> = Vec::new();
        if ctx.config.session.db_path.exists() {
            let store = ctx.open_sessions().await?;
            counts = store
                .count_by_status()
                .await
                .context("Failed to count upload records")?;
            failed = store
                .load()
                .await
                .context("Failed to read upload records")?
                .into_values()
                .filter(|r| matches!(r.status, TaskStatus::Failed { .. }))
                .collect();
            failed.sort_by(|a, b| a.task_id.cmp(&b.task_id));
        }

        if ctx.format.is_json() {
            let failed_json: Vec<serde_json::Value> = failed
                .iter()
                .map(|r| {
                    serde_json::json!({
                        "task_id": r.task_id,
                        "status": r.status.name(),
                        "attempts": r.attempts,
                        "last_error": r.last_error,
                    })
                })
                .collect();
            let json = serde_json::json!({
                "paused_download": paused,
                "uploads_by_status": counts,
                "failed": failed_json,
            });
            formatter.print_json(&json);
            return Ok(Outcome::Success);
        }

        if paused {
            formatter.success("Found paused download session");
            formatter.info("Run 'seedup download -t <torrent>' to resume");
        } else {
            formatter.info("No paused download session");
        }

        let total: u64 = counts.values().sum();
        formatter.info("");
        if total == 0 {
            formatter.info("No upload session recorded");
            return Ok(Outcome::Success);
        }
        formatter.info(&format!("Upload session: {total} files"));
        for status in STATUS_ORDER {
            if let Some(count) = counts.get(status.name()) {
                formatter.info(&format!("  {:<18} {count}", status.name()));
            }
        }
        if !failed.is_empty() {
            formatter.info("");
            formatter.info("Failed uploads:");
            for record in &failed {
                formatter.info(&format!(
                    "  {} ({} attempt{}): {}",
                    record.task_id,
                    record.attempts,
                    if record.attempts == 1 { "" } else { "s" },
                    record.last_error.as_deref().unwrap_or("unknown error")
                ));
            }
        }
        Ok(Outcome::Success)
    }
}
