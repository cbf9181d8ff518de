//! Error types for pt-rss
//!
//! Errors fall into three classes that the feed pollers treat differently:
//! - transient remote failures (network, HTTP status, feed parsing) end a cycle or an attempt
//! - local failures (I/O, missing filename) fail an attempt or stop a single feed
//! - storage integrity failures ([`Error::Database`], [`Error::Sqlx`]) are fatal to the process

use thiserror::Error;

/// Result type alias for pt-rss operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for pt-rss
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "feeds[0].url")
        key: Option<String>,
    },

    /// Counter store operation failed
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    /// SQLx database error
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network error (connect, timeout, body read)
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Remote server answered with a non-success status
    #[error("HTTP {status} from {url}")]
    HttpStatus {
        /// Status code returned by the server
        status: u16,
        /// URL that was requested
        url: String,
    },

    /// Feed document could not be parsed as RSS or Atom
    #[error("feed parse error: {0}")]
    FeedParse(String),

    /// Neither the response headers nor the URL yielded a file name
    #[error("no filename for {0}")]
    NoFilename(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Creates a configuration error for a specific key
    pub fn config(message: impl Into<String>, key: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.into()),
        }
    }

    /// Returns true if the error means the counter store can no longer be trusted
    ///
    /// Retry accounting is the only guard against re-downloading forever, so
    /// callers abort instead of continuing with a broken store.
    pub fn is_storage_integrity(&self) -> bool {
        matches!(self, Error::Database(_) | Error::Sqlx(_))
    }
}

/// Database-related errors
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Failed to connect to database
    #[error("failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Failed to run migrations
    #[error("failed to run migrations: {0}")]
    MigrationFailed(String),

    /// Query failed
    #[error("query failed: {0}")]
    QueryFailed(String),
}
