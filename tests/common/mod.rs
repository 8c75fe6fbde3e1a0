//! Test helpers for API and ingestion tests.
//!
//! Provides a stub feed source and a TestServer wired to the real router.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum_test::TestServer;
use futures::future::BoxFuture;

use feedreader::config::{RssConfig, WebConfig};
use feedreader::rss::{FeedEntry, FeedSnapshot, FeedSource, FetchFailure, FetchResult, Ingestor};
use feedreader::web::{create_health_router, create_router, AppState};
use feedreader::Database;

pub const EXAMPLE_URL: &str = "https://example.com/feed.xml";

/// Feed source serving canned snapshots keyed by URL.
///
/// Unknown URLs fail the way a non-feed page would.
#[derive(Default)]
pub struct StubFetcher {
    feeds: Mutex<HashMap<String, FetchResult>>,
    calls: AtomicUsize,
}

impl StubFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `snapshot` for `url`.
    pub fn serve(&self, url: &str, snapshot: FeedSnapshot) {
        self.feeds
            .lock()
            .unwrap()
            .insert(url.to_string(), Ok(snapshot));
    }

    /// Make `url` fail.
    pub fn fail(&self, url: &str, reason: &str) {
        self.feeds
            .lock()
            .unwrap()
            .insert(url.to_string(), Err(FetchFailure::new(reason)));
    }

    /// Number of fetches performed so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl FeedSource for StubFetcher {
    fn fetch<'a>(&'a self, url: &'a str) -> BoxFuture<'a, FetchResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let result = self
            .feeds
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .unwrap_or_else(|| Err(FetchFailure::new("failed to parse feed: not a feed")));
        Box::pin(async move { result })
    }
}

/// A feed titled `title` with one entry per link.
pub fn snapshot(title: &str, links: &[&str]) -> FeedSnapshot {
    FeedSnapshot {
        title: title.to_string(),
        entries: links
            .iter()
            .enumerate()
            .map(|(i, link)| {
                FeedEntry::new(format!("Post {}", i + 1), *link)
                    .with_content(format!("Body {}", i + 1))
                    .with_published(format!("2024-01-0{}T00:00:00+00:00", i + 1))
            })
            .collect(),
    }
}

/// The "Example Blog" feed with three entries.
pub fn example_blog() -> FeedSnapshot {
    snapshot(
        "Example Blog",
        &[
            "https://example.com/posts/1",
            "https://example.com/posts/2",
            "https://example.com/posts/3",
        ],
    )
}

/// A running test application.
pub struct TestApp {
    pub server: TestServer,
    pub fetcher: Arc<StubFetcher>,
    pub ingestor: Arc<Ingestor>,
}

impl TestApp {
    pub fn db(&self) -> &Database {
        self.ingestor.db()
    }
}

/// Create a test application over an in-memory database.
pub async fn create_test_app() -> TestApp {
    create_test_app_with(RssConfig::default(), WebConfig::default()).await
}

/// Create a test application with custom configuration.
pub async fn create_test_app_with(rss: RssConfig, web: WebConfig) -> TestApp {
    let db = Arc::new(
        Database::open_in_memory()
            .await
            .expect("Failed to create test database"),
    );
    let fetcher = Arc::new(StubFetcher::new());
    let ingestor = Arc::new(Ingestor::new(
        db,
        fetcher.clone(),
        rss.refresh_concurrency,
    ));

    let app_state = Arc::new(AppState::new(ingestor.clone(), &rss, &web));
    let router = create_router(app_state, &web.cors_origins).merge(create_health_router());

    let server = TestServer::new(router).expect("Failed to create test server");

    TestApp {
        server,
        fetcher,
        ingestor,
    }
}
