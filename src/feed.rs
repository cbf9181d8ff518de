//! Feed document parsing.
//!
//! Turns a raw RSS 2.0 or Atom document into the ordered list of download
//! links it advertises. RSS is tried first, Atom second.

use crate::error::{Error, Result};
use tracing::debug;

/// Extract download links from a feed document, in document order
///
/// For RSS items the enclosure URL is preferred over `<link>`; for Atom
/// entries the `rel="enclosure"` link is preferred over the first link.
/// Items without any link are skipped.
///
/// # Errors
/// Returns [`Error::FeedParse`] if the document is neither RSS nor Atom
pub fn parse_links(content: &[u8]) -> Result<Vec<String>> {
    match parse_rss_links(content) {
        Ok(links) => {
            debug!(count = links.len(), "Parsed feed as RSS");
            Ok(links)
        }
        Err(rss_err) => match parse_atom_links(content) {
            Ok(links) => {
                debug!(count = links.len(), "Parsed feed as Atom");
                Ok(links)
            }
            Err(atom_err) => Err(Error::FeedParse(format!(
                "neither RSS nor Atom. RSS error: {}. Atom error: {}",
                rss_err, atom_err
            ))),
        },
    }
}

fn parse_rss_links(content: &[u8]) -> std::result::Result<Vec<String>, rss::Error> {
    let channel = rss::Channel::read_from(content)?;

    let links = channel
        .items()
        .iter()
        .filter_map(|item| {
            item.enclosure()
                .map(|enc| enc.url())
                .or_else(|| item.link())
                .map(str::trim)
                .filter(|link| !link.is_empty())
                .map(str::to_string)
        })
        .collect();

    Ok(links)
}

fn parse_atom_links(content: &[u8]) -> std::result::Result<Vec<String>, atom_syndication::Error> {
    let feed = atom_syndication::Feed::read_from(content)?;

    let links = feed
        .entries()
        .iter()
        .filter_map(|entry| {
            entry
                .links()
                .iter()
                .find(|link| link.rel() == "enclosure")
                .or_else(|| entry.links().first())
                .map(|link| link.href().trim())
                .filter(|href| !href.is_empty())
                .map(str::to_string)
        })
        .collect();

    Ok(links)
}
