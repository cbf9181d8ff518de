//! Single-link download attempts and their effect on the counter store.
//!
//! One attempt is `ATTEMPTING → SUCCESS` or `ATTEMPTING → FAILURE`:
//! fetch the link, pick a file name, write the body into the feed's download
//! directory. Any failure along the way (network, HTTP status, missing file
//! name, local write) counts as one failed attempt.

use crate::db::Database;
use crate::error::{Error, Result};
use crate::fetch::Fetcher;
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Result of one download attempt
#[derive(Debug)]
pub enum AttemptOutcome {
    /// File was fetched and written to this path
    Saved(PathBuf),
    /// Attempt failed; the link's counter was incremented
    Failed {
        /// Why the attempt failed
        error: Error,
        /// Attempt count after recording this failure
        attempts: u32,
    },
}

impl AttemptOutcome {
    /// Returns true if the file was saved
    pub fn is_saved(&self) -> bool {
        matches!(self, AttemptOutcome::Saved(_))
    }
}

/// Drives links through download attempts for one feed
pub struct LinkDownloader<'a> {
    fetcher: &'a Fetcher,
    db: &'a Database,
    download_dir: &'a Path,
    retry_limit: u32,
}

impl<'a> LinkDownloader<'a> {
    /// Create a downloader writing into `download_dir`
    pub fn new(
        fetcher: &'a Fetcher,
        db: &'a Database,
        download_dir: &'a Path,
        retry_limit: u32,
    ) -> Self {
        Self {
            fetcher,
            db,
            download_dir,
            retry_limit,
        }
    }

    /// Attempt a link once and record the outcome
    ///
    /// On success the link's count is pinned at the retry limit; on failure it
    /// is incremented by one.
    ///
    /// # Errors
    /// Only counter store failures are returned; download failures are
    /// reported through [`AttemptOutcome::Failed`].
    pub async fn process(&self, link: &str) -> Result<AttemptOutcome> {
        info!(link, "Handling link");

        match self.fetch_and_save(link).await {
            Ok(path) => {
                self.db.mark_succeeded(link, self.retry_limit).await?;
                info!(link, path = %path.display(), "Saved file");
                Ok(AttemptOutcome::Saved(path))
            }
            Err(error) => {
                let attempts = self.db.record_failure(link, self.retry_limit).await?;
                warn!(
                    link,
                    error = %error,
                    attempts,
                    retry_limit = self.retry_limit,
                    "Download attempt failed"
                );
                Ok(AttemptOutcome::Failed { error, attempts })
            }
        }
    }

    /// Fetch a link and write its body into the download directory
    pub async fn fetch_and_save(&self, link: &str) -> Result<PathBuf> {
        let response = self.fetcher.fetch(link).await?;
        debug!(
            link,
            status = %response.status,
            disposition = response.content_disposition(),
            "Link fetched"
        );

        let filename = response
            .content_disposition()
            .and_then(filename_from_disposition)
            .or_else(|| filename_from_url(link))
            .ok_or_else(|| Error::NoFilename(link.to_string()))?;

        let path = self.download_dir.join(&filename);
        tokio::fs::write(&path, &response.body).await?;

        Ok(path)
    }
}

/// Extract the file name from a `Content-Disposition` value
///
/// The whole value is form-decoded first (`%XX` escapes and `+` as space);
/// when that fails the raw value is used. An RFC 5987 `filename*=` directive
/// is read from the raw value and wins over a plain `filename=` one. Quotes
/// are stripped and only the last path component is kept.
pub fn filename_from_disposition(value: &str) -> Option<String> {
    let extended = value.split(';').find_map(|part| {
        let rest = part.trim().strip_prefix("filename*=")?;
        // Format is: charset'lang'encoded-filename
        let encoded = rest.rsplit('\'').next().unwrap_or(rest);
        let name = urlencoding::decode(encoded).unwrap_or(Cow::Borrowed(encoded));
        sanitize_filename(&name)
    });
    if extended.is_some() {
        return extended;
    }

    let decoded = form_decode(value).unwrap_or(Cow::Borrowed(value));
    decoded.split(';').find_map(|part| {
        let rest = part.trim().strip_prefix("filename=")?;
        sanitize_filename(rest.trim_matches('"'))
    })
}

/// Last non-empty path segment of a URL, percent-decoded
pub fn filename_from_url(link: &str) -> Option<String> {
    let url = url::Url::parse(link).ok()?;
    let segment = url.path_segments()?.next_back()?;
    let decoded = urlencoding::decode(segment).unwrap_or(Cow::Borrowed(segment));
    sanitize_filename(&decoded)
}

/// Reduce a name to a single safe path component
fn sanitize_filename(name: &str) -> Option<String> {
    let name = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(name)
        .trim()
        .trim_matches('"');

    match name {
        "" | "." | ".." => None,
        name => Some(name.to_string()),
    }
}

/// Decode `%XX` escapes and `+` the way HTML form values are encoded
///
/// Returns `None` if a `%` is not followed by two hex digits or the result is
/// not valid UTF-8.
fn form_decode(value: &str) -> Option<Cow<'_, str>> {
    if !value.contains(['%', '+']) {
        return Some(Cow::Borrowed(value));
    }

    let bytes = value.as_bytes();
    let escapes_valid = bytes.iter().enumerate().all(|(i, &b)| {
        b != b'%'
            || bytes
                .get(i + 1..i + 3)
                .is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit))
    });
    if !escapes_valid {
        return None;
    }

    let spaced = value.replace('+', " ");
    urlencoding::decode(&spaced)
        .ok()
        .map(|decoded| Cow::Owned(decoded.into_owned()))
}
