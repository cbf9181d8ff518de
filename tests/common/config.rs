//! Test configuration helpers

use pt_rss::{Config, FeedConfig};
use std::path::Path;
use std::time::Duration;

/// Feed descriptor with a short interval for tests
pub fn test_feed(name: &str, url: String, download_dir: &Path) -> FeedConfig {
    FeedConfig {
        name: name.to_string(),
        url,
        interval: Duration::from_millis(100),
        download_dir: download_dir.to_path_buf(),
    }
}

/// Configuration rooted in a temporary settings directory
pub fn test_config(settings_dir: &Path, feeds: Vec<FeedConfig>) -> Config {
    Config {
        settings_dir: settings_dir.to_path_buf(),
        timeout: Duration::from_secs(5),
        feeds,
        ..Default::default()
    }
}
