//! SeedUp CLI - Torrent downloads delivered to Google Drive
//!
//! Provides commands for:
//! - Downloading a torrent with aria2c, with pause and resume
//! - Uploading files or folders to Google Drive in resumable chunks
//! - Inspecting and clearing saved sessions

use std::process::ExitCode;

use clap::{Parser, Subcommand};

mod commands;
mod context;
mod output;
mod progress;

use commands::{
    clear::ClearCommand, download::DownloadCommand, status::StatusCommand,
    upload::UploadCommand, Outcome,
};
use context::CliContext;
use output::{get_formatter, OutputFormat};

#[derive(Debug, Parser)]
#[command(
    name = "seedup",
    version,
    about = "Download torrents and upload them to Google Drive"
)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use alternate config file
    #[arg(long, global = true)]
    config: Option<String>,

    /// Minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Download a torrent
    Download(DownloadCommand),
    /// Upload files to Google Drive
    Upload(UploadCommand),
    /// Check for paused downloads and upload progress
    Status(StatusCommand),
    /// Clear download and upload sessions
    Clear(ClearCommand),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let format = OutputFormat::from_flag(cli.json);
    let formatter = get_formatter(format);

    let config = match context::load_config(cli.config.as_deref(), &*formatter) {
        Ok(config) => config,
        Err(e) => {
            formatter.error(&format!("{e:#}"));
            return Outcome::Failed.exit_code();
        }
    };
    context::init_tracing(cli.verbose, cli.quiet, &config.logging.level);

    let ctx = CliContext::new(config, format, cli.quiet);
    let result = match cli.command {
        Commands::Download(cmd) => cmd.execute(&ctx).await,
        Commands::Upload(cmd) => cmd.execute(&ctx).await,
        Commands::Status(cmd) => cmd.execute(&ctx).await,
        Commands::Clear(cmd) => cmd.execute(&ctx).await,
    };

    match result {
        Ok(outcome) => outcome.exit_code(),
        Err(e) => {
            formatter.error(&format!("{e:#}"));
            Outcome::Failed.exit_code()
        }
    }
}
