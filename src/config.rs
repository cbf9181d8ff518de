//! Configuration types for pt-rss
//!
//! The configuration is a JSON document. Durations are written as whole seconds.
//!
//! ```json
//! {
//!   "settings_dir": "/var/lib/pt-rss",
//!   "timeout": 30,
//!   "feeds": [
//!     {
//!       "name": "tracker",
//!       "url": "https://tracker.example/rss?passkey=abc",
//!       "interval": 600,
//!       "download_dir": "/srv/watch"
//!     }
//!   ]
//! }
//! ```

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default number of attempts before a link is given up on
pub const RETRY_LIMIT: u32 = 3;

/// HTTP timeout used when the configured one is missing or out of range
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Largest accepted HTTP timeout
pub const MAX_TIMEOUT: Duration = Duration::from_secs(3600);

/// File name of the counter store inside the settings directory
pub const DATABASE_FILE: &str = ".downloaded.db";

/// Main configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding the counter store (default: "./.pt-rss")
    #[serde(default = "default_settings_dir")]
    pub settings_dir: PathBuf,

    /// HTTP timeout for feed and link fetches (default: 30 seconds)
    ///
    /// Values outside `1..=3600` seconds fall back to the default, see [`Config::http_timeout`].
    #[serde(default = "default_timeout", with = "duration_serde")]
    pub timeout: Duration,

    /// Attempts per link before it is skipped for good (default: 3)
    #[serde(default = "default_retry_limit")]
    pub retry_limit: u32,

    /// User-Agent sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Feeds to poll, each on its own task
    #[serde(default, alias = "sites")]
    pub feeds: Vec<FeedConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            settings_dir: default_settings_dir(),
            timeout: default_timeout(),
            retry_limit: default_retry_limit(),
            user_agent: default_user_agent(),
            feeds: vec![],
        }
    }
}

/// A single feed to poll
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Name used to tag log output for this feed
    pub name: String,

    /// Feed URL (RSS or Atom)
    #[serde(alias = "rss")]
    pub url: String,

    /// Time between two polls of this feed (default: 15 minutes)
    #[serde(default = "default_interval", with = "duration_serde")]
    pub interval: Duration,

    /// Directory downloaded files are written to
    #[serde(alias = "download_directory")]
    pub download_dir: PathBuf,
}

impl Config {
    /// Load and validate a configuration file
    pub fn from_file(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path).map_err(|e| Error::Config {
            message: format!("cannot read {}: {}", path.display(), e),
            key: None,
        })?;
        Self::from_json(&data)
    }

    /// Parse and validate a configuration document
    pub fn from_json(data: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(data)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the configuration for values the pollers cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.feeds.is_empty() {
            return Err(Error::config("at least one feed is required", "feeds"));
        }
        if self.retry_limit == 0 {
            return Err(Error::config(
                "retry_limit must be at least 1",
                "retry_limit",
            ));
        }

        let mut names = HashSet::new();
        for (i, feed) in self.feeds.iter().enumerate() {
            if feed.name.trim().is_empty() {
                return Err(Error::config(
                    "feed name must not be empty",
                    format!("feeds[{i}].name"),
                ));
            }
            if !names.insert(feed.name.as_str()) {
                return Err(Error::config(
                    format!("duplicate feed name '{}'", feed.name),
                    format!("feeds[{i}].name"),
                ));
            }
            if let Err(e) = url::Url::parse(&feed.url) {
                return Err(Error::config(
                    format!("invalid feed url '{}': {}", feed.url, e),
                    format!("feeds[{i}].url"),
                ));
            }
            if feed.interval.is_zero() {
                return Err(Error::config(
                    "interval must be at least one second",
                    format!("feeds[{i}].interval"),
                ));
            }
            if feed.download_dir.as_os_str().is_empty() {
                return Err(Error::config(
                    "download_dir must not be empty",
                    format!("feeds[{i}].download_dir"),
                ));
            }
        }

        Ok(())
    }

    /// Effective HTTP timeout
    ///
    /// Zero or anything above [`MAX_TIMEOUT`] is replaced with [`DEFAULT_TIMEOUT`].
    pub fn http_timeout(&self) -> Duration {
        if self.timeout.is_zero() || self.timeout > MAX_TIMEOUT {
            DEFAULT_TIMEOUT
        } else {
            self.timeout
        }
    }

    /// Path of the counter store file
    pub fn database_path(&self) -> PathBuf {
        self.settings_dir.join(DATABASE_FILE)
    }
}

// Default value functions
fn default_settings_dir() -> PathBuf {
    PathBuf::from(".pt-rss")
}

fn default_timeout() -> Duration {
    DEFAULT_TIMEOUT
}

fn default_retry_limit() -> u32 {
    RETRY_LIMIT
}

fn default_user_agent() -> String {
    format!("pt-rss/{}", env!("CARGO_PKG_VERSION"))
}

fn default_interval() -> Duration {
    Duration::from_secs(15 * 60)
}

mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
