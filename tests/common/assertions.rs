//! Polling assertions for integration tests

use super::MockTracker;
use pt_rss::Database;
use std::time::Duration;

/// Wait until the tracker has received at least `expected` requests for a path
///
/// Returns false on timeout.
pub async fn wait_for_requests(
    tracker: &MockTracker,
    request_path: &str,
    expected: usize,
    timeout: Duration,
) -> bool {
    tokio::time::timeout(timeout, async {
        while tracker.requests_to(request_path).await < expected {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .is_ok()
}

/// Wait until a link's stored attempt count reaches `expected`
///
/// Returns false on timeout or storage error.
pub async fn wait_for_count(db: &Database, link: &str, expected: u32, timeout: Duration) -> bool {
    tokio::time::timeout(timeout, async {
        loop {
            match db.get_count(link).await {
                Ok(count) if count >= expected => return true,
                Ok(_) => tokio::time::sleep(Duration::from_millis(20)).await,
                Err(_) => return false,
            }
        }
    })
    .await
    .unwrap_or(false)
}
