//! Ingestion orchestrator.
//!
//! Drives the fetch, dedup, store and timestamp cycle for one feed or for
//! every registered feed. Shared between the HTTP handlers and the periodic
//! updater.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, MutexGuard as StdMutexGuard};

use futures::stream::{self, StreamExt};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, warn};

use super::fetcher::{FeedSource, FetchResult};
use super::repository::{ArticleRepository, FeedRepository};
use super::types::{FeedEntry, RefreshOutcome, RefreshSummary};
use crate::db::Database;
use crate::Result;

/// Runs feed refreshes against a database with an injectable fetcher.
pub struct Ingestor {
    db: Arc<Database>,
    fetcher: Arc<dyn FeedSource>,
    concurrency: usize,
    locks: StdMutex<FeedLocks>,
}

type FeedLocks = HashMap<i64, Arc<Mutex<()>>>;

/// Held refresh lock for one feed.
///
/// Dropping the last holder of a feed's lock removes its map entry, so the
/// map only holds feeds with a refresh or delete in flight.
pub struct FeedLock<'a> {
    locks: &'a StdMutex<FeedLocks>,
    feed_id: i64,
    lock: Arc<Mutex<()>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for FeedLock<'_> {
    fn drop(&mut self) {
        self.guard.take();
        let mut locks = lock_map(self.locks);
        // One reference lives in the map, one here.
        if Arc::strong_count(&self.lock) <= 2 {
            locks.remove(&self.feed_id);
        }
    }
}

/// The map is never left inconsistent by a panic, so a poisoned lock is
/// still usable.
fn lock_map(locks: &StdMutex<FeedLocks>) -> StdMutexGuard<'_, FeedLocks> {
    locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Ingestor {
    /// Create an ingestor refreshing at most `concurrency` feeds at once.
    pub fn new(db: Arc<Database>, fetcher: Arc<dyn FeedSource>, concurrency: usize) -> Self {
        Self {
            db,
            fetcher,
            concurrency: concurrency.max(1),
            locks: StdMutex::new(HashMap::new()),
        }
    }

    /// The database this ingestor writes to.
    pub fn db(&self) -> &Database {
        &self.db
    }

    /// Fetch a feed without storing anything.
    pub async fn fetch(&self, url: &str) -> FetchResult {
        self.fetcher.fetch(url).await
    }

    /// Acquire the refresh lock for a feed.
    ///
    /// Held while a feed is refreshed or deleted so the two never interleave.
    pub async fn lock_feed(&self, feed_id: i64) -> FeedLock<'_> {
        let lock = lock_map(&self.locks).entry(feed_id).or_default().clone();
        let guard = lock.clone().lock_owned().await;
        FeedLock {
            locks: &self.locks,
            feed_id,
            lock,
            guard: Some(guard),
        }
    }

    /// Number of feeds with a lock currently held or awaited.
    pub fn locked_feeds(&self) -> usize {
        lock_map(&self.locks).len()
    }

    /// Store entries that are not yet known, in order.
    ///
    /// An entry whose link is already stored (for any feed) is skipped. A
    /// failed insert is logged and skipped. Returns the number inserted.
    pub async fn store_new(&self, feed_id: i64, entries: &[FeedEntry]) -> usize {
        let repo = ArticleRepository::new(self.db.pool());
        let mut inserted = 0;

        for entry in entries {
            match repo.insert_or_ignore(feed_id, entry).await {
                Ok(Some(_)) => inserted += 1,
                Ok(None) => {}
                Err(e) => {
                    warn!(feed_id, link = %entry.link, error = %e, "Failed to store article");
                }
            }
        }

        inserted
    }

    /// Store fetched entries and stamp the feed as refreshed.
    pub async fn ingest(&self, feed_id: i64, entries: &[FeedEntry]) -> Result<usize> {
        let inserted = self.store_new(feed_id, entries).await;
        FeedRepository::new(self.db.pool())
            .mark_refreshed(feed_id)
            .await?;
        Ok(inserted)
    }

    /// Refresh a single feed.
    pub async fn refresh_one(&self, feed_id: i64) -> Result<RefreshOutcome> {
        let _guard = self.lock_feed(feed_id).await;

        let Some(feed) = FeedRepository::new(self.db.pool())
            .get_by_id(feed_id)
            .await?
        else {
            debug!(feed_id, "Refresh requested for unknown feed");
            return Ok(RefreshOutcome::Missing);
        };

        let snapshot = match self.fetcher.fetch(&feed.url).await {
            Ok(snapshot) => snapshot,
            Err(_) => return Ok(RefreshOutcome::FetchFailed),
        };

        let inserted = self.ingest(feed.id, &snapshot.entries).await?;
        debug!(feed_id, inserted, "Refreshed feed \"{}\"", feed.title);

        Ok(RefreshOutcome::Refreshed { inserted })
    }

    /// Refresh every feed registered at the time of the call.
    pub async fn refresh_all(&self) -> Result<RefreshSummary> {
        let ids = FeedRepository::new(self.db.pool()).list_ids().await?;

        let mut summary = RefreshSummary {
            feeds: ids.len(),
            ..Default::default()
        };

        if ids.is_empty() {
            debug!("No feeds to refresh");
            return Ok(summary);
        }

        info!(
            "Refreshing {} feed(s) with concurrency {}",
            ids.len(),
            self.concurrency
        );

        let results: Vec<(i64, Result<RefreshOutcome>)> = stream::iter(ids)
            .map(|feed_id| async move { (feed_id, self.refresh_one(feed_id).await) })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        for (feed_id, result) in results {
            match result {
                Ok(RefreshOutcome::Refreshed { inserted }) => {
                    summary.refreshed += 1;
                    summary.inserted += inserted;
                }
                Ok(RefreshOutcome::FetchFailed) => summary.failed += 1,
                Ok(RefreshOutcome::Missing) => summary.skipped += 1,
                Err(e) => {
                    warn!(feed_id, error = %e, "Feed refresh failed");
                    summary.failed += 1;
                }
            }
        }

        info!(
            refreshed = summary.refreshed,
            failed = summary.failed,
            skipped = summary.skipped,
            inserted = summary.inserted,
            "Refresh pass complete"
        );

        Ok(summary)
    }
}

impl std::fmt::Debug for Ingestor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ingestor")
            .field("concurrency", &self.concurrency)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rss::fetcher::FetchFailure;
    use crate::rss::types::{FeedSnapshot, NewFeed};
    use futures::future::BoxFuture;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;

    /// Fetcher serving canned results and counting calls.
    #[derive(Default)]
    struct StubSource {
        feeds: StdMutex<HashMap<String, FetchResult>>,
        calls: AtomicUsize,
    }

    impl StubSource {
        fn set(&self, url: &str, result: FetchResult) {
            self.feeds.lock().unwrap().insert(url.to_string(), result);
        }
    }

    impl FeedSource for StubSource {
        fn fetch<'a>(&'a self, url: &'a str) -> BoxFuture<'a, FetchResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let result = self
                .feeds
                .lock()
                .unwrap()
                .get(url)
                .cloned()
                .unwrap_or_else(|| Err(FetchFailure::new("HTTP error: 404 Not Found")));
            Box::pin(async move { result })
        }
    }

    fn snapshot(title: &str, links: &[&str]) -> FetchResult {
        Ok(FeedSnapshot {
            title: title.to_string(),
            entries: links
                .iter()
                .map(|link| FeedEntry::new("Post", *link))
                .collect(),
        })
    }

    async fn setup(concurrency: usize) -> (Arc<StubSource>, Ingestor) {
        let db = Arc::new(Database::open_in_memory().await.unwrap());
        let source = Arc::new(StubSource::default());
        let ingestor = Ingestor::new(db, source.clone(), concurrency);
        (source, ingestor)
    }

    async fn add_feed(ingestor: &Ingestor, url: &str) -> i64 {
        FeedRepository::new(ingestor.db().pool())
            .create(&NewFeed::new(url, "Feed"))
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_refresh_one_missing_feed() {
        let (source, ingestor) = setup(1).await;
        let outcome = ingestor.refresh_one(42).await.unwrap();
        assert_eq!(outcome, RefreshOutcome::Missing);
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_lock_entries_are_released() {
        let (source, ingestor) = setup(1).await;
        for feed_id in 1000..1050 {
            assert_eq!(
                ingestor.refresh_one(feed_id).await.unwrap(),
                RefreshOutcome::Missing
            );
        }
        assert_eq!(ingestor.locked_feeds(), 0);

        let url = "https://a/feed";
        source.set(url, snapshot("A", &["https://a/1"]));
        let feed_id = add_feed(&ingestor, url).await;
        ingestor.refresh_one(feed_id).await.unwrap();
        ingestor.refresh_all().await.unwrap();
        assert_eq!(ingestor.locked_feeds(), 0);
    }

    #[tokio::test]
    async fn test_lock_entry_kept_while_contended() {
        let (_source, ingestor) = setup(1).await;
        let first = ingestor.lock_feed(7).await;
        assert_eq!(ingestor.locked_feeds(), 1);

        let waiter = ingestor.lock_feed(7);
        tokio::pin!(waiter);
        assert!(futures::poll!(waiter.as_mut()).is_pending());

        drop(first);
        assert_eq!(ingestor.locked_feeds(), 1);
        let second = waiter.await;
        assert_eq!(ingestor.locked_feeds(), 1);
        drop(second);
        assert_eq!(ingestor.locked_feeds(), 0);
    }

    #[tokio::test]
    async fn test_refresh_one_is_idempotent() {
        let (source, ingestor) = setup(1).await;
        let url = "https://example.com/feed.xml";
        source.set(url, snapshot("Example Blog", &["https://e/1", "https://e/2", "https://e/3"]));
        let feed_id = add_feed(&ingestor, url).await;

        let first = ingestor.refresh_one(feed_id).await.unwrap();
        assert_eq!(first, RefreshOutcome::Refreshed { inserted: 3 });
        let stamped = FeedRepository::new(ingestor.db().pool())
            .get_by_id(feed_id)
            .await
            .unwrap()
            .unwrap()
            .last_refreshed_at
            .unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;

        let second = ingestor.refresh_one(feed_id).await.unwrap();
        assert_eq!(second, RefreshOutcome::Refreshed { inserted: 0 });

        let articles = ArticleRepository::new(ingestor.db().pool());
        assert_eq!(articles.count_by_feed(feed_id).await.unwrap(), 3);

        let restamped = FeedRepository::new(ingestor.db().pool())
            .get_by_id(feed_id)
            .await
            .unwrap()
            .unwrap()
            .last_refreshed_at
            .unwrap();
        assert!(restamped > stamped);
    }

    #[tokio::test]
    async fn test_refresh_one_fetch_failure_leaves_feed_untouched() {
        let (source, ingestor) = setup(1).await;
        let url = "https://broken/feed";
        source.set(url, Err(FetchFailure::new("failed to parse feed")));
        let feed_id = add_feed(&ingestor, url).await;

        let outcome = ingestor.refresh_one(feed_id).await.unwrap();
        assert_eq!(outcome, RefreshOutcome::FetchFailed);

        let feed = FeedRepository::new(ingestor.db().pool())
            .get_by_id(feed_id)
            .await
            .unwrap()
            .unwrap();
        assert!(feed.last_refreshed_at.is_none());
        assert_eq!(
            ArticleRepository::new(ingestor.db().pool())
                .count()
                .await
                .unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn test_store_new_skips_links_owned_by_other_feeds() {
        let (_source, ingestor) = setup(1).await;
        let a = add_feed(&ingestor, "https://a/feed").await;
        let b = add_feed(&ingestor, "https://b/feed").await;

        let shared = vec![FeedEntry::new("Shared", "https://shared/post")];
        assert_eq!(ingestor.store_new(a, &shared).await, 1);
        assert_eq!(ingestor.store_new(b, &shared).await, 0);
    }

    #[tokio::test]
    async fn test_store_new_continues_after_failed_insert() {
        let (_source, ingestor) = setup(1).await;
        // No feed row: every insert violates the foreign key.
        let entries = vec![
            FeedEntry::new("One", "https://x/1"),
            FeedEntry::new("Two", "https://x/2"),
        ];
        assert_eq!(ingestor.store_new(777, &entries).await, 0);

        let feed_id = add_feed(&ingestor, "https://x/feed").await;
        assert_eq!(ingestor.store_new(feed_id, &entries).await, 2);
    }

    #[tokio::test]
    async fn test_refresh_all_isolates_failures() {
        let (source, ingestor) = setup(2).await;
        source.set("https://a/feed", snapshot("A", &["https://a/1", "https://a/2"]));
        source.set("https://c/feed", snapshot("C", &["https://c/1"]));
        add_feed(&ingestor, "https://a/feed").await;
        add_feed(&ingestor, "https://b/feed").await;
        add_feed(&ingestor, "https://c/feed").await;

        let summary = ingestor.refresh_all().await.unwrap();
        assert_eq!(summary.feeds, 3);
        assert_eq!(summary.refreshed, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.skipped, 0);
        assert_eq!(summary.inserted, 3);

        let again = ingestor.refresh_all().await.unwrap();
        assert_eq!(again.inserted, 0);
    }

    #[tokio::test]
    async fn test_refresh_all_without_feeds() {
        let (source, ingestor) = setup(4).await;
        let summary = ingestor.refresh_all().await.unwrap();
        assert_eq!(summary, RefreshSummary::default());
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_concurrent_refreshes_of_same_feed_insert_once() {
        let (source, ingestor) = setup(1).await;
        let url = "https://a/feed";
        source.set(url, snapshot("A", &["https://a/1", "https://a/2"]));
        let feed_id = add_feed(&ingestor, url).await;

        let (first, second) = tokio::join!(
            ingestor.refresh_one(feed_id),
            ingestor.refresh_one(feed_id)
        );

        let inserted: usize = [first.unwrap(), second.unwrap()]
            .iter()
            .map(|o| match o {
                RefreshOutcome::Refreshed { inserted } => *inserted,
                _ => 0,
            })
            .sum();
        assert_eq!(inserted, 2);
    }
}
