//! Database layer for pt-rss
//!
//! The counter store: a SQLite table mapping each link to the number of
//! download attempts made for it. It is the only state shared between feed
//! pollers and the only thing that survives a restart.
//!
//! ## Submodules
//!
//! Methods on [`Database`] are organized by domain:
//! - [`migrations`]: Database lifecycle, schema migrations
//! - [`links`]: Attempt counters per link
//! - [`locks`]: Per-link mutation locks

use sqlx::{FromRow, sqlite::SqlitePool};

mod links;
mod locks;
mod migrations;

pub use locks::{KeyLockGuard, KeyLocks};

/// Link record from database
#[derive(Debug, Clone, FromRow)]
pub struct LinkRecord {
    /// Unique database ID
    pub id: i64,
    /// Download URL as it appeared in the feed
    pub link: String,
    /// Number of attempts made (pinned at the retry limit once terminal)
    pub attempt_count: i64,
    /// Whether the terminal state was reached by a successful download (0 = no, 1 = yes)
    pub succeeded: i32,
    /// Unix timestamp of the last mutation
    pub last_update: i64,
}

/// Where a link stands relative to the retry limit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// Still eligible for download
    Pending {
        /// Attempts made so far
        attempts: u32,
    },
    /// Downloaded and saved
    Succeeded,
    /// Retry limit reached without a successful download
    Exhausted,
}

impl LinkState {
    /// Returns true if the link should no longer be attempted
    pub fn is_terminal(&self) -> bool {
        !matches!(self, LinkState::Pending { .. })
    }
}

/// Database handle for pt-rss
pub struct Database {
    pool: SqlitePool,
    locks: KeyLocks,
}
