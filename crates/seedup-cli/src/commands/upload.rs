//! Upload command - Copy local files to Google Drive
//!
//! Provides the `seedup upload` CLI command which:
//! 1. Enumerates the files under `--path` (a single file or a directory)
//! 2. Resolves the destination folder (`--folder-id` or `SeedUp Downloads`)
//! 3. Runs the upload orchestrator with the session database for resume
//! 4. Prints the batch summary and the Drive folder URL

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use seedup_core::config::RunOptions;
use seedup_core::domain::{BatchReport, PipelineError};
use seedup_core::ports::CloudObjectStore;
use seedup_drive::folder_url;
use seedup_upload::{LocalFile, LocalFileEnumerator, UploadOrchestrator};

use super::Outcome;
use crate::context::CliContext;
use crate::output::{format_bytes, plural, OutputFormat, OutputFormatter};

#[derive(Debug, Args)]
pub struct UploadCommand {
    /// Local file or folder to upload
    #[arg(short, long)]
    pub path: PathBuf,

    /// Destination Drive folder ID (default: "SeedUp Downloads" in My Drive)
    #[arg(short, long)]
    pub folder_id: Option<String>,

    /// Upload even if a file with the same name and size exists
    #[arg(long)]
    pub no_skip: bool,
}

impl UploadCommand {
    pub async fn execute(&self, ctx: &CliContext) -> Result<Outcome> {
        ctx.watch_signals();
        run_upload(ctx, &self.path, self.folder_id.as_deref(), self.no_skip).await
    }
}

/// Uploads `path` below the destination folder
///
/// A directory is mirrored as a Drive folder of the same name; a single
/// file goes straight into the destination.
pub async fn run_upload(
    ctx: &CliContext,
    path: &Path,
    folder_id: Option<&str>,
    no_skip: bool,
) -> Result<Outcome> {
    let formatter = ctx.formatter();

    let enumerator = LocalFileEnumerator::new(path)
        .with_context(|| format!("Cannot upload {}", path.display()))?;
    let files: Vec<LocalFile> = enumerator.enumerate().collect();
    if files.is_empty() {
        formatter.warn(&format!("No files to upload in {}", path.display()));
        return Ok(Outcome::Success);
    }
    let total_bytes: u64 = files.iter().map(|f| f.size).sum();

    let store = Arc::new(ctx.drive_store()?);
    let mut destination = ctx.resolve_destination(&store, folder_id).await?;
    if !enumerator.is_single_file() {
        let name = enumerator
            .root()
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .context("Upload folder has no name")?;
        destination = store
            .ensure_folder(&name, &destination)
            .await
            .with_context(|| format!("Cannot create Drive folder '{name}'"))?;
    }
    info!(files = files.len(), destination = %destination, "Uploading");

    let sessions = Arc::new(ctx.open_sessions().await?);
    let settings = ctx.config.upload_settings();
    let options = RunOptions {
        skip_existing: settings.skip_existing && !no_skip,
        max_retries: settings.max_retries,
    };

    formatter.info(&format!(
        "Uploading {} file{} ({})",
        files.len(),
        plural(files.len()),
        format_bytes(total_bytes)
    ));

    let orchestrator = UploadOrchestrator::new(
        store.clone(),
        sessions.clone(),
        sessions,
        settings,
    )
    .with_progress(ctx.progress_observer())
    .with_cancellation(ctx.cancellation_token());

    let report = match orchestrator.run(files, &destination, options).await {
        Ok(report) => report,
        Err(PipelineError::Cancelled) => {
            formatter.warn("Upload cancelled before any file was sent");
            return Ok(Outcome::Interrupted);
        }
        Err(e) => return Err(e.into()),
    };

    print_report(&*formatter, ctx.format, &report, &destination);
    Ok(outcome(&report))
}

pub fn outcome(report: &BatchReport) -> Outcome {
    if report.cancelled {
        Outcome::Interrupted
    } else if report.failed.is_empty() {
        Outcome::Success
    } else {
        Outcome::Failed
    }
}

fn print_report(
    formatter: &dyn OutputFormatter,
    format: OutputFormat,
    report: &BatchReport,
    folder_id: &str,
) {
    let (completed, skipped, failed) = report.counts();

    if format.is_json() {
        let json = serde_json::json!({
            "completed": completed,
            "skipped": skipped,
            "failed": report.failed,
            "bytes_uploaded": report.bytes_uploaded,
            "cancelled": report.cancelled,
            "folder_id": folder_id,
            "folder_url": folder_url(folder_id),
        });
        formatter.print_json(&json);
        return;
    }

    if report.cancelled {
        formatter.warn("Upload interrupted. Run the same command again to resume.");
    } else if failed == 0 {
        formatter.success("Upload complete");
    } else {
        formatter.error(&format!(
            "{failed} file{} failed to upload",
            plural(failed)
        ));
    }

    formatter.info(&format!("Uploaded: {completed} file{}", plural(completed)));
    formatter.info(&format!("Skipped:  {skipped} file{}", plural(skipped)));
    formatter.info(&format!("Failed:   {failed} file{}", plural(failed)));
    formatter.info(&format!("Sent:     {}", format_bytes(report.bytes_uploaded)));
    for task in &report.failed {
        let hint = if task.retryable {
            "will retry next run"
        } else {
            "will not retry"
        };
        formatter.info(&format!("  {}: {} ({hint})", task.task_id, task.error));
    }
    formatter.info("");
    formatter.info(&format!("Drive folder: {}", folder_url(folder_id)));
}
