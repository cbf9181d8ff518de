//! Runs one feed poller per configured feed and waits for all of them.
//!
//! Pollers are independent tasks: a feed that stops on a local failure is not
//! restarted and does not affect the others. A counter store failure in any
//! poller cancels all of them and is returned from [`Supervisor::run`], since
//! continuing without reliable counts could re-download links forever.

use crate::config::{Config, FeedConfig};
use crate::db::Database;
use crate::error::{Error, Result};
use crate::fetch::Fetcher;
use crate::poller::{FeedPoller, PollerExit};
use std::sync::Arc;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// How the supervised pollers ended
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SupervisorReport {
    /// Feeds that stopped because shutdown was requested
    pub stopped: Vec<String>,
    /// Feeds that stopped on a local failure, with the error message
    pub failed: Vec<(String, String)>,
}

/// Owns the shared fetcher and counter store and the feed tasks using them
pub struct Supervisor {
    feeds: Vec<FeedConfig>,
    fetcher: Fetcher,
    db: Arc<Database>,
    retry_limit: u32,
    shutdown: CancellationToken,
}

impl Supervisor {
    /// Open the counter store under the settings directory and build the fetcher
    pub async fn new(config: Config) -> Result<Self> {
        tokio::fs::create_dir_all(&config.settings_dir)
            .await
            .map_err(|e| Error::Config {
                message: format!(
                    "cannot create settings directory {}: {}",
                    config.settings_dir.display(),
                    e
                ),
                key: Some("settings_dir".to_string()),
            })?;

        let db = Database::new(&config.database_path()).await?;
        let fetcher = Fetcher::from_config(&config)?;

        Ok(Self::with_parts(
            config.feeds,
            fetcher,
            Arc::new(db),
            config.retry_limit,
        ))
    }

    /// Assemble a supervisor from already constructed parts
    pub fn with_parts(
        feeds: Vec<FeedConfig>,
        fetcher: Fetcher,
        db: Arc<Database>,
        retry_limit: u32,
    ) -> Self {
        Self {
            feeds,
            fetcher,
            db,
            retry_limit,
            shutdown: CancellationToken::new(),
        }
    }

    /// Token that stops every poller when cancelled
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Shared counter store
    pub fn database(&self) -> Arc<Database> {
        self.db.clone()
    }

    /// Spawn all pollers and wait until every one has ended
    ///
    /// # Errors
    /// Returns the first counter store failure reported by any poller.
    pub async fn run(mut self) -> Result<SupervisorReport> {
        info!(
            feeds = self.feeds.len(),
            retry_limit = self.retry_limit,
            timeout = ?self.fetcher.timeout(),
            "Starting feed pollers"
        );

        let mut tasks = JoinSet::new();
        for feed in std::mem::take(&mut self.feeds) {
            let name = feed.name.clone();
            let poller = FeedPoller::new(
                feed,
                self.fetcher.clone(),
                self.db.clone(),
                self.retry_limit,
            );
            let shutdown = self.shutdown.child_token();
            // The inner task isolates a panicking poller so its name is kept
            tasks.spawn(async move { (name, tokio::spawn(poller.run(shutdown)).await) });
        }

        let mut report = SupervisorReport::default();
        let mut fatal = None;

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((name, exit)) => self.record_exit(&mut report, &mut fatal, name, exit),
                Err(e) => error!(error = %e, "Feed poller task ended unexpectedly"),
            }
        }

        info!("Exit because all feed pollers are down");

        match fatal {
            Some(e) => Err(e),
            None => Ok(report),
        }
    }

    fn record_exit(
        &self,
        report: &mut SupervisorReport,
        fatal: &mut Option<Error>,
        name: String,
        exit: std::result::Result<PollerExit, JoinError>,
    ) {
        match exit {
            Ok(PollerExit::Stopped) => report.stopped.push(name),
            Ok(PollerExit::LocalFailure(e)) => {
                warn!(feed = %name, error = %e, "Feed poller ended");
                report.failed.push((name, e.to_string()));
            }
            Ok(PollerExit::Fatal(e)) => {
                error!(feed = %name, error = %e, "Counter store failed, stopping all feeds");
                self.shutdown.cancel();
                if fatal.is_none() {
                    *fatal = Some(e);
                }
            }
            Err(e) => {
                error!(feed = %name, error = %e, "Feed poller panicked");
                report.failed.push((name, format!("poller panicked: {e}")));
            }
        }
    }
}
