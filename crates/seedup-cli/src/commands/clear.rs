//! Clear command - Discard the torrent session and upload records

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use seedup_core::ports::{SessionStore, TorrentEngine};

use super::Outcome;
use crate::context::CliContext;

#[derive(Debug, Args)]
pub struct ClearCommand {}

impl ClearCommand {
    pub async fn execute(&self, ctx: &CliContext) -> Result<Outcome> {
        let formatter = ctx.formatter();

        let engine = ctx.torrent_engine();
        let had_download = engine.has_paused_session();
        engine
            .clear_session()
            .context("Failed to clear the download session")?;

        let db_path = &ctx.config.session.db_path;
        let had_uploads = db_path.exists();
        if had_uploads {
            let store = ctx.open_sessions().await?;
            store
                .clear()
                .await
                .context("Failed to clear upload records")?;
        }
        info!(had_download, had_uploads, "Sessions cleared");

        if ctx.format.is_json() {
            formatter.print_json(&serde_json::json!({
                "download_session_cleared": had_download,
                "upload_session_cleared": had_uploads,
            }));
        } else {
            formatter.success("Download session cleared");
            formatter.success("Upload session cleared");
        }
        Ok(Outcome::Success)
    }
}
