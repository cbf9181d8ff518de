//! Timeout-bounded HTTP retrieval shared by all feed pollers.

use crate::config::Config;
use crate::error::{Error, Result};
use reqwest::StatusCode;
use reqwest::header::{CONTENT_DISPOSITION, HeaderMap};
use std::time::Duration;
use tracing::debug;

/// A fully read HTTP response
#[derive(Debug, Clone)]
pub struct FetchedResponse {
    /// Final status code (always a success status)
    pub status: StatusCode,
    /// Response headers
    pub headers: HeaderMap,
    /// Response body
    pub body: Vec<u8>,
}

impl FetchedResponse {
    /// Raw `Content-Disposition` header value, if present and valid UTF-8
    pub fn content_disposition(&self) -> Option<&str> {
        self.headers
            .get(CONTENT_DISPOSITION)
            .and_then(|value| value.to_str().ok())
    }
}

/// HTTP client used for both feed documents and item links
///
/// Cloning is cheap and shares the underlying connection pool.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: reqwest::Client,
    timeout: Duration,
}

impl Fetcher {
    /// Create a fetcher with the given timeout and user agent
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| Error::Other(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, timeout })
    }

    /// Create a fetcher from the effective settings of a [`Config`]
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(config.http_timeout(), &config.user_agent)
    }

    /// Timeout applied to every request
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// GET a URL and read the whole body
    ///
    /// # Errors
    /// - [`Error::Network`] on connect failures, timeouts, or body read failures
    /// - [`Error::HttpStatus`] if the server answers with a non-success status
    pub async fn fetch(&self, url: &str) -> Result<FetchedResponse> {
        debug!(url, "Fetching");

        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let headers = response.headers().clone();
        let body = response.bytes().await?.to_vec();

        debug!(url, bytes = body.len(), "Fetched");

        Ok(FetchedResponse {
            status,
            headers,
            body,
        })
    }
}
