//! Per-feed polling loop.
//!
//! Each configured feed gets one [`FeedPoller`] running on its own task. A
//! poller creates its download directory, then repeats poll cycles forever:
//! the first cycle runs immediately, every later one after sleeping the
//! feed's interval. Within a feed everything is sequential, so cycles never
//! overlap and at most one link is being downloaded at a time.
//!
//! # Failure handling
//!
//! - Feed fetch or parse failures end the current cycle; the next cycle runs as scheduled.
//! - Failing to create the download directory stops this feed only ([`PollerExit::LocalFailure`]).
//! - Counter store failures stop the poller with [`PollerExit::Fatal`].

use crate::config::FeedConfig;
use crate::db::Database;
use crate::download::LinkDownloader;
use crate::error::{Error, Result};
use crate::feed::parse_links;
use crate::fetch::Fetcher;
use std::sync::Arc;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span, warn};

/// Why a poller stopped
#[derive(Debug)]
pub enum PollerExit {
    /// Shutdown was requested
    Stopped,
    /// A local resource (the download directory) is unusable; only this feed stops
    LocalFailure(Error),
    /// The counter store failed; retry accounting can no longer be trusted
    Fatal(Error),
}

/// Summary of one poll cycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Links found in the feed document
    pub total: usize,
    /// Links below the retry limit
    pub eligible: usize,
    /// Links downloaded and saved this cycle
    pub succeeded: usize,
    /// Links whose attempt failed this cycle
    pub failed: usize,
    /// Why the feed itself could not be fetched or parsed, if it couldn't
    pub fetch_error: Option<String>,
}

/// Feed links split by the retry limit
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Partition {
    /// Links to attempt this cycle, in feed order
    pub eligible: Vec<String>,
    /// Links at or above the retry limit
    pub exhausted: Vec<String>,
}

/// Polls a single feed and downloads its links
pub struct FeedPoller {
    feed: FeedConfig,
    fetcher: Fetcher,
    db: Arc<Database>,
    retry_limit: u32,
}

impl FeedPoller {
    /// Create a poller for one feed
    pub fn new(feed: FeedConfig, fetcher: Fetcher, db: Arc<Database>, retry_limit: u32) -> Self {
        Self {
            feed,
            fetcher,
            db,
            retry_limit,
        }
    }

    /// Feed name
    pub fn name(&self) -> &str {
        &self.feed.name
    }

    /// Run the poll loop until shutdown or a fatal error
    ///
    /// All log output is emitted inside a `feed` span carrying the feed name.
    pub async fn run(self, shutdown: CancellationToken) -> PollerExit {
        let span = info_span!("feed", name = %self.feed.name);
        self.run_loop(shutdown).instrument(span).await
    }

    async fn run_loop(&self, shutdown: CancellationToken) -> PollerExit {
        info!(url = %self.feed.url, interval = ?self.feed.interval, "Starting feed poller");

        if let Err(e) = tokio::fs::create_dir_all(&self.feed.download_dir).await {
            error!(
                dir = %self.feed.download_dir.display(),
                error = %e,
                "Failed to create download directory"
            );
            return PollerExit::LocalFailure(e.into());
        }

        let mut first_cycle = true;
        loop {
            if !first_cycle {
                tokio::select! {
                    biased;
                    _ = shutdown.cancelled() => break,
                    _ = sleep(self.feed.interval) => {}
                }
            }
            first_cycle = false;

            let result = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                result = self.poll_once() => result,
            };

            match result {
                Ok(report) => {
                    debug!(?report, "Poll cycle finished");
                }
                Err(e) => {
                    error!(error = %e, "Counter store failure, stopping feed poller");
                    return PollerExit::Fatal(e);
                }
            }
        }

        info!("Feed poller stopped");
        PollerExit::Stopped
    }

    /// Run a single poll cycle
    ///
    /// # Errors
    /// Only counter store failures are returned. A feed that cannot be fetched
    /// or parsed produces a report with `fetch_error` set.
    pub async fn poll_once(&self) -> Result<CycleReport> {
        let links = match self.fetch_links().await {
            Ok(links) => links,
            Err(e) => {
                warn!(url = %self.feed.url, error = %e, "Failed to fetch feed");
                return Ok(CycleReport {
                    fetch_error: Some(e.to_string()),
                    ..Default::default()
                });
            }
        };

        let total = links.len();
        let partition = self.partition_links(links).await?;
        info!(
            total,
            eligible = partition.eligible.len(),
            "Got {} links including {} new links",
            total,
            partition.eligible.len()
        );

        let mut report = CycleReport {
            total,
            eligible: partition.eligible.len(),
            ..Default::default()
        };

        let downloader = LinkDownloader::new(
            &self.fetcher,
            &self.db,
            &self.feed.download_dir,
            self.retry_limit,
        );
        for link in &partition.eligible {
            if downloader.process(link).await?.is_saved() {
                report.succeeded += 1;
            } else {
                report.failed += 1;
            }
        }

        Ok(report)
    }

    /// Fetch the feed document and extract its links
    pub async fn fetch_links(&self) -> Result<Vec<String>> {
        let response = self.fetcher.fetch(&self.feed.url).await?;
        parse_links(&response.body)
    }

    /// Split links into those still below the retry limit and those at it
    pub async fn partition_links(&self, links: Vec<String>) -> Result<Partition> {
        let mut partition = Partition::default();

        for link in links {
            if self.db.get_count(&link).await? < self.retry_limit {
                partition.eligible.push(link);
            } else {
                partition.exhausted.push(link);
            }
        }

        Ok(partition)
    }
}
