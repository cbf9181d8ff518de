//! pt-rss command line entry point

use clap::{ArgAction, Parser};
use pt_rss::{Config, Supervisor, run_with_shutdown};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Poll RSS/Atom feeds and download their links
#[derive(Debug, Parser)]
#[command(name = "pt-rss", version = env!("CARGO_PKG_VERSION"), about, long_about = None, disable_version_flag = true)]
struct Args {
    /// Path to the JSON configuration file
    #[arg(short = 'c', long = "config", default_value = "config.json")]
    config: PathBuf,

    /// Print version
    #[arg(short = 'v', long = "version", action = ArgAction::Version)]
    version: Option<bool>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match Config::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(path = %args.config.display(), error = %e, "Failed to load configuration");
            return ExitCode::FAILURE;
        }
    };

    let supervisor = match Supervisor::new(config).await {
        Ok(supervisor) => supervisor,
        Err(e) => {
            tracing::error!(error = %e, "Failed to start");
            return ExitCode::FAILURE;
        }
    };

    match run_with_shutdown(supervisor).await {
        Ok(report) => {
            if !report.failed.is_empty() {
                tracing::warn!(failed = report.failed.len(), "Some feeds stopped on errors");
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Stopped on counter store failure");
            ExitCode::FAILURE
        }
    }
}
