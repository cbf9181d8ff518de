//! Mock tracker serving a feed and its download links

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Build an RSS 2.0 document whose items point at the given links
pub fn rss_feed(links: &[String]) -> String {
    let items: String = links
        .iter()
        .enumerate()
        .map(|(i, link)| format!("<item><title>Release {i}</title><link>{link}</link></item>"))
        .collect();

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0"><channel><title>Tracker</title><link>https://tracker.example</link><description>Latest</description>{items}</channel></rss>"#
    )
}

/// A wiremock server standing in for a private tracker
pub struct MockTracker {
    /// Underlying mock server
    pub server: MockServer,
}

impl MockTracker {
    /// Start a tracker with nothing mounted
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// Absolute URL of a feed path
    pub fn feed_url(&self, feed: &str) -> String {
        format!("{}/{}", self.server.uri(), feed)
    }

    /// Absolute URL of a download link
    pub fn link(&self, name: &str) -> String {
        format!("{}/dl/{}", self.server.uri(), name)
    }

    /// Serve an RSS document listing the named links at `/<feed>`
    pub async fn serve_feed(&self, feed: &str, names: &[&str]) {
        let links: Vec<String> = names.iter().map(|name| self.link(name)).collect();
        Mock::given(method("GET"))
            .and(path(format!("/{feed}")))
            .respond_with(ResponseTemplate::new(200).set_body_string(rss_feed(&links)))
            .mount(&self.server)
            .await;
    }

    /// Serve `<name>.torrent` for a link
    pub async fn serve_file(&self, name: &str) {
        Mock::given(method("GET"))
            .and(path(format!("/dl/{name}")))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header(
                        "Content-Disposition",
                        format!("attachment; filename=\"{name}.torrent\""),
                    )
                    .set_body_bytes(format!("torrent {name}").into_bytes()),
            )
            .mount(&self.server)
            .await;
    }

    /// Make a link fail with 503
    pub async fn fail_file(&self, name: &str) {
        Mock::given(method("GET"))
            .and(path(format!("/dl/{name}")))
            .respond_with(ResponseTemplate::new(503))
            .mount(&self.server)
            .await;
    }

    /// Number of requests received for a path
    pub async fn requests_to(&self, request_path: &str) -> usize {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|r| r.url.path() == request_path)
            .count()
    }
}
