//! # pt-rss
//!
//! Polls RSS/Atom feeds on independent schedules and downloads the links they
//! advertise, trying each link a bounded number of times.
//!
//! Attempt counts live in a small SQLite database, so a link that has already
//! been downloaded, or has failed too often, is skipped after a restart too.
//!
//! ## Quick Start
//!
//! ```no_run
//! use pt_rss::{Config, Supervisor, run_with_shutdown};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_file("config.json".as_ref())?;
//!     let supervisor = Supervisor::new(config).await?;
//!
//!     // Runs until every feed poller has ended or a signal arrives
//!     run_with_shutdown(supervisor).await?;
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types
pub mod config;
/// Database persistence layer
pub mod db;
/// Per-link download attempts
pub mod download;
/// Error types
pub mod error;
/// Feed document parsing
pub mod feed;
/// Shared HTTP client
pub mod fetch;
/// Per-feed polling loop
pub mod poller;
/// Feed task supervision
pub mod supervisor;

// Re-export commonly used types
pub use config::{Config, FeedConfig, RETRY_LIMIT};
pub use db::{Database, LinkState};
pub use download::{AttemptOutcome, LinkDownloader};
pub use error::{DatabaseError, Error, Result};
pub use feed::parse_links;
pub use fetch::{FetchedResponse, Fetcher};
pub use poller::{CycleReport, FeedPoller, PollerExit};
pub use supervisor::{Supervisor, SupervisorReport};

/// Run the supervisor until its pollers end or a termination signal arrives.
///
/// On a signal every poller is cancelled and the call returns once they have
/// all stopped.
///
/// Ctrl+C (SIGINT) stops the pollers everywhere, SIGTERM as well on Unix.
///
/// # Errors
/// Returns the counter store failure that stopped the pollers, if any.
pub async fn run_with_shutdown(supervisor: Supervisor) -> Result<SupervisorReport> {
    let shutdown = supervisor.shutdown_token();
    let run = supervisor.run();
    tokio::pin!(run);

    tokio::select! {
        result = &mut run => result,
        _ = wait_for_signal() => {
            shutdown.cancel();
            run.await
        }
    }
}

/// Resolves on Ctrl+C, or on SIGTERM where the platform has it
async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Could not register SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, stopping feed pollers"),
        _ = terminate => tracing::info!("Received SIGTERM, stopping feed pollers"),
    }
}
