//! Feed fetcher.
//!
//! Fetches a URL over HTTP and normalizes the RSS/Atom document into a
//! [`FeedSnapshot`]. Every failure cause (bad URL, network, HTTP status,
//! size limit, parse error) collapses into a single [`FetchFailure`]; the
//! cause is logged here and otherwise only carried as a reason string.

use std::net::IpAddr;
use std::time::Duration;

use feed_rs::model::FeedType;
use feed_rs::parser;
use futures::future::BoxFuture;
use quick_xml::events::Event;
use quick_xml::Reader;
use reqwest::Client;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::RssConfig;
use crate::error::{ReaderError, Result};
use crate::rss::types::{FeedEntry, FeedSnapshot, UNTITLED_ENTRY, UNTITLED_FEED};

/// Opaque fetch failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}")]
pub struct FetchFailure {
    reason: String,
}

impl FetchFailure {
    /// Create a failure with a human-readable reason.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    /// The reason this fetch failed.
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl From<FetchFailure> for ReaderError {
    fn from(failure: FetchFailure) -> Self {
        ReaderError::InvalidFeed(failure.reason)
    }
}

/// Result of fetching a feed.
pub type FetchResult = std::result::Result<FeedSnapshot, FetchFailure>;

/// Source of feed documents.
///
/// The ingestion pipeline only talks to this trait, so tests can substitute
/// canned documents for the network.
pub trait FeedSource: Send + Sync {
    /// Fetch and normalize the feed at `url`.
    fn fetch<'a>(&'a self, url: &'a str) -> BoxFuture<'a, FetchResult>;
}

/// HTTP feed fetcher.
pub struct RssFetcher {
    client: Client,
    max_feed_size: u64,
    allow_private_hosts: bool,
}

impl RssFetcher {
    /// Create a fetcher from configuration.
    pub fn new(config: &RssConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .read_timeout(Duration::from_secs(config.read_timeout_secs))
            .timeout(Duration::from_secs(config.total_timeout_secs))
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| ReaderError::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            max_feed_size: config.max_feed_size_bytes,
            allow_private_hosts: config.allow_private_hosts,
        })
    }

    /// Fetch and parse a feed, logging the cause of any failure.
    pub async fn fetch_feed(&self, url: &str) -> FetchResult {
        match self.try_fetch(url).await {
            Ok(snapshot) => {
                debug!(
                    url,
                    entries = snapshot.entries.len(),
                    "Fetched feed \"{}\"",
                    snapshot.title
                );
                Ok(snapshot)
            }
            Err(failure) => {
                warn!(url, reason = %failure, "Feed fetch failed");
                Err(failure)
            }
        }
    }

    async fn try_fetch(&self, url: &str) -> FetchResult {
        validate_url(url, self.allow_private_hosts)?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchFailure::new(format!("failed to fetch feed: {}", e)))?;

        if !response.status().is_success() {
            return Err(FetchFailure::new(format!(
                "HTTP error: {}",
                response.status()
            )));
        }

        if let Some(content_length) = response.content_length() {
            if content_length > self.max_feed_size {
                return Err(FetchFailure::new(format!(
                    "feed too large: {} bytes (max {} bytes)",
                    content_length, self.max_feed_size
                )));
            }
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| FetchFailure::new(format!("failed to read response: {}", e)))?;

        if bytes.len() as u64 > self.max_feed_size {
            return Err(FetchFailure::new(format!(
                "feed too large: {} bytes (max {} bytes)",
                bytes.len(),
                self.max_feed_size
            )));
        }

        parse_feed(&bytes)
    }
}

impl FeedSource for RssFetcher {
    fn fetch<'a>(&'a self, url: &'a str) -> BoxFuture<'a, FetchResult> {
        Box::pin(self.fetch_feed(url))
    }
}

/// Validate a feed URL.
///
/// Only http and https are accepted. Unless `allow_private_hosts` is set,
/// loopback, private, link-local and internal-looking hosts are rejected.
pub fn validate_url(url: &str, allow_private_hosts: bool) -> std::result::Result<(), FetchFailure> {
    let parsed = url::Url::parse(url).map_err(|e| FetchFailure::new(format!("invalid URL: {}", e)))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(FetchFailure::new(format!(
                "unsupported URL scheme: {}",
                scheme
            )));
        }
    }

    let host = parsed
        .host()
        .ok_or_else(|| FetchFailure::new("URL has no host"))?;

    if allow_private_hosts {
        return Ok(());
    }

    match host {
        url::Host::Domain(domain) => {
            if is_forbidden_hostname(domain) {
                return Err(FetchFailure::new(format!("forbidden host: {}", domain)));
            }
        }
        url::Host::Ipv4(ipv4) => {
            let ip = IpAddr::V4(ipv4);
            if is_private_ip(&ip) {
                return Err(FetchFailure::new(format!(
                    "private IP address not allowed: {}",
                    ip
                )));
            }
        }
        url::Host::Ipv6(ipv6) => {
            let ip = IpAddr::V6(ipv6);
            if is_private_ip(&ip) {
                return Err(FetchFailure::new(format!(
                    "private IP address not allowed: {}",
                    ip
                )));
            }
        }
    }

    Ok(())
}

/// Check if a hostname is forbidden.
fn is_forbidden_hostname(host: &str) -> bool {
    let host_lower = host.to_lowercase();

    if host_lower == "localhost" {
        return true;
    }

    const FORBIDDEN_SUFFIXES: [&str; 7] = [
        ".local",
        ".localhost",
        ".internal",
        ".intranet",
        ".corp",
        ".home",
        ".lan",
    ];

    FORBIDDEN_SUFFIXES
        .iter()
        .any(|suffix| host_lower.ends_with(suffix))
}

/// Check if an IP address is loopback, private or otherwise reserved.
fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(ipv4) => {
            let octets = ipv4.octets();
            ipv4.is_loopback()
                || ipv4.is_private()
                || ipv4.is_link_local()
                || ipv4.is_broadcast()
                || ipv4.is_unspecified()
                // Documentation: 192.0.2.0/24, 198.51.100.0/24, 203.0.113.0/24
                || (octets[0] == 192 && octets[1] == 0 && octets[2] == 2)
                || (octets[0] == 198 && octets[1] == 51 && octets[2] == 100)
                || (octets[0] == 203 && octets[1] == 0 && octets[2] == 113)
        }
        IpAddr::V6(ipv6) => {
            let segments = ipv6.segments();
            ipv6.is_loopback()
                || ipv6.is_unspecified()
                // Unique local: fc00::/7
                || (segments[0] & 0xfe00) == 0xfc00
                // Link-local: fe80::/10
                || (segments[0] & 0xffc0) == 0xfe80
        }
    }
}

/// Parse feed bytes into a normalized snapshot.
///
/// Missing or blank titles fall back to [`UNTITLED_FEED`] and
/// [`UNTITLED_ENTRY`]. Published dates are the document's own text, see
/// [`raw_published_dates`].
pub fn parse_feed(bytes: &[u8]) -> FetchResult {
    let feed =
        parser::parse(bytes).map_err(|e| FetchFailure::new(format!("failed to parse feed: {}", e)))?;

    let mut dates = raw_published_dates(&feed.feed_type, bytes).into_iter();

    let title =
        non_blank(feed.title.map(|t| t.content)).unwrap_or_else(|| UNTITLED_FEED.to_string());

    let entries = feed
        .entries
        .into_iter()
        .map(|entry| {
            let title = non_blank(entry.title.map(|t| t.content))
                .unwrap_or_else(|| UNTITLED_ENTRY.to_string());
            let link = entry
                .links
                .first()
                .map(|l| l.href.clone())
                .unwrap_or_default();
            let content = entry
                .summary
                .map(|t| t.content)
                .or_else(|| entry.content.and_then(|c| c.body))
                .unwrap_or_default();

            FeedEntry {
                title,
                link,
                content,
                published: dates.next().unwrap_or_default(),
            }
        })
        .collect();

    Ok(FeedSnapshot { title, entries })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Published date text of each entry, in document order.
///
/// The value is kept exactly as written (trimmed), whether or not it parses
/// as a date: `pubDate` for RSS, `published` for Atom, `date_published` for
/// JSON Feed. Entries without one get an empty string.
fn raw_published_dates(feed_type: &FeedType, bytes: &[u8]) -> Vec<String> {
    match feed_type {
        FeedType::JSON => json_published_dates(bytes),
        _ => xml_published_dates(bytes),
    }
}

fn json_published_dates(bytes: &[u8]) -> Vec<String> {
    let Ok(document) = serde_json::from_slice::<serde_json::Value>(bytes) else {
        return Vec::new();
    };
    document["items"]
        .as_array()
        .map(|items| {
            items
                .iter()
                .map(|item| {
                    item["date_published"]
                        .as_str()
                        .map(|d| d.trim().to_string())
                        .unwrap_or_default()
                })
                .collect()
        })
        .unwrap_or_default()
}

fn xml_published_dates(bytes: &[u8]) -> Vec<String> {
    let mut reader = Reader::from_reader(bytes);
    reader.config_mut().trim_text(true);

    let mut dates: Vec<String> = Vec::new();
    let mut buf = Vec::new();
    // Depth below the current item/entry element, if inside one.
    let mut entry_depth: Option<usize> = None;
    let mut capturing = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match entry_depth {
                None if is_entry_element(e.local_name().as_ref()) => {
                    dates.push(String::new());
                    entry_depth = Some(0);
                }
                Some(depth) => {
                    capturing = depth == 0
                        && is_date_element(e.local_name().as_ref())
                        && dates.last().is_some_and(|d| d.is_empty());
                    entry_depth = Some(depth + 1);
                }
                None => {}
            },
            Ok(Event::Empty(e)) => {
                if entry_depth.is_none() && is_entry_element(e.local_name().as_ref()) {
                    dates.push(String::new());
                }
            }
            Ok(Event::Text(text)) if capturing => {
                if let (Some(date), Ok(value)) = (dates.last_mut(), text.unescape()) {
                    date.push_str(value.trim());
                }
            }
            Ok(Event::CData(data)) if capturing => {
                if let Some(date) = dates.last_mut() {
                    date.push_str(String::from_utf8_lossy(&data.into_inner()).trim());
                }
            }
            Ok(Event::End(_)) => {
                capturing = false;
                entry_depth = match entry_depth {
                    Some(0) | None => None,
                    Some(depth) => Some(depth - 1),
                };
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                debug!("Stopped reading entry dates: {}", e);
                break;
            }
            _ => {}
        }
        buf.clear();
    }

    dates
}

fn is_entry_element(name: &[u8]) -> bool {
    name == b"item" || name == b"entry"
}

fn is_date_element(name: &[u8]) -> bool {
    name == b"pubDate" || name == b"published"
}
