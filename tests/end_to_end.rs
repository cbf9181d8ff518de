//! End-to-end tests running the supervisor against a mock tracker
//!
//! These tests start real feed pollers with short intervals and observe the
//! files they write and the counts they persist.

mod common;

use common::{MockTracker, test_config, test_feed, wait_for_count, wait_for_requests};
use pt_rss::{LinkState, RETRY_LIMIT, Supervisor};
use std::time::Duration;
use tempfile::tempdir;

const WAIT: Duration = Duration::from_secs(10);

#[tokio::test]
async fn test_downloads_each_link_once() {
    let tracker = MockTracker::start().await;
    tracker.serve_feed("rss", &["a", "b"]).await;
    tracker.serve_file("a").await;
    tracker.serve_file("b").await;

    let dir = tempdir().unwrap();
    let watch = dir.path().join("watch");
    let config = test_config(
        &dir.path().join("settings"),
        vec![test_feed("tracker", tracker.feed_url("rss"), &watch)],
    );

    let supervisor = Supervisor::new(config).await.unwrap();
    let db = supervisor.database();
    let shutdown = supervisor.shutdown_token();
    let handle = tokio::spawn(supervisor.run());

    assert!(wait_for_requests(&tracker, "/rss", 4, WAIT).await);
    shutdown.cancel();
    let report = handle.await.unwrap().unwrap();

    assert_eq!(report.stopped, vec!["tracker".to_string()]);
    assert_eq!(
        std::fs::read_to_string(watch.join("a.torrent")).unwrap(),
        "torrent a"
    );
    assert!(watch.join("b.torrent").exists());
    assert_eq!(tracker.requests_to("/dl/a").await, 1);
    assert_eq!(tracker.requests_to("/dl/b").await, 1);
    assert_eq!(
        db.link_state(&tracker.link("a"), RETRY_LIMIT).await.unwrap(),
        LinkState::Succeeded
    );
}

#[tokio::test]
async fn test_failing_link_is_given_up_after_retry_limit() {
    let tracker = MockTracker::start().await;
    tracker.serve_feed("rss", &["broken"]).await;
    tracker.fail_file("broken").await;

    let dir = tempdir().unwrap();
    let config = test_config(
        &dir.path().join("settings"),
        vec![test_feed("tracker", tracker.feed_url("rss"), &dir.path().join("watch"))],
    );

    let supervisor = Supervisor::new(config).await.unwrap();
    let db = supervisor.database();
    let shutdown = supervisor.shutdown_token();
    let handle = tokio::spawn(supervisor.run());

    let link = tracker.link("broken");
    assert!(wait_for_count(&db, &link, RETRY_LIMIT, WAIT).await);
    let polls = tracker.requests_to("/rss").await;
    assert!(wait_for_requests(&tracker, "/rss", polls + 2, WAIT).await);

    shutdown.cancel();
    handle.await.unwrap().unwrap();

    assert_eq!(tracker.requests_to("/dl/broken").await, RETRY_LIMIT as usize);
    assert_eq!(db.get_count(&link).await.unwrap(), RETRY_LIMIT);
    assert_eq!(
        db.link_state(&link, RETRY_LIMIT).await.unwrap(),
        LinkState::Exhausted
    );
}

#[tokio::test]
async fn test_counts_survive_restart() {
    let tracker = MockTracker::start().await;
    tracker.serve_feed("rss", &["a"]).await;
    tracker.serve_file("a").await;

    let dir = tempdir().unwrap();
    let settings = dir.path().join("settings");
    let watch = dir.path().join("watch");
    let feeds = vec![test_feed("tracker", tracker.feed_url("rss"), &watch)];

    {
        let supervisor = Supervisor::new(test_config(&settings, feeds.clone()))
            .await
            .unwrap();
        let db = supervisor.database();
        let shutdown = supervisor.shutdown_token();
        let handle = tokio::spawn(supervisor.run());

        assert!(wait_for_count(&db, &tracker.link("a"), RETRY_LIMIT, WAIT).await);
        shutdown.cancel();
        handle.await.unwrap().unwrap();
    }

    std::fs::remove_file(watch.join("a.torrent")).unwrap();
    let polls_before = tracker.requests_to("/rss").await;

    let supervisor = Supervisor::new(test_config(&settings, feeds)).await.unwrap();
    let shutdown = supervisor.shutdown_token();
    let handle = tokio::spawn(supervisor.run());

    assert!(wait_for_requests(&tracker, "/rss", polls_before + 2, WAIT).await);
    shutdown.cancel();
    handle.await.unwrap().unwrap();

    assert_eq!(tracker.requests_to("/dl/a").await, 1);
    assert!(!watch.join("a.torrent").exists());
}

#[tokio::test]
async fn test_run_with_shutdown_returns_when_pollers_end() {
    let dir = tempdir().unwrap();
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, b"not a directory").unwrap();
    let config = test_config(
        &dir.path().join("settings"),
        vec![test_feed(
            "tracker",
            "http://127.0.0.1:9/rss".to_string(),
            &blocker.join("watch"),
        )],
    );

    let supervisor = Supervisor::new(config).await.unwrap();
    let report = tokio::time::timeout(WAIT, pt_rss::run_with_shutdown(supervisor))
        .await
        .unwrap()
        .unwrap();

    assert!(report.stopped.is_empty());
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, "tracker");
}
