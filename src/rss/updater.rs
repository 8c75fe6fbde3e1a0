//! Periodic feed updater.
//!
//! Runs a full refresh pass each time its [`Ticker`] fires.

use std::sync::Arc;

use futures::future::BoxFuture;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Duration, Instant, Interval, MissedTickBehavior};
use tracing::{error, info};

use super::ingest::Ingestor;
use super::types::RefreshSummary;

/// Source of refresh triggers.
pub trait Ticker: Send {
    /// Wait for the next tick. Returns false when no more ticks will come.
    fn tick(&mut self) -> BoxFuture<'_, bool>;
}

/// Ticks every `period`, starting one period from now.
pub struct IntervalTicker {
    interval: Interval,
}

impl IntervalTicker {
    pub fn new(period: Duration) -> Self {
        let mut interval = interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { interval }
    }
}

impl Ticker for IntervalTicker {
    fn tick(&mut self) -> BoxFuture<'_, bool> {
        Box::pin(async move {
            self.interval.tick().await;
            true
        })
    }
}

/// Ticks whenever a message arrives; stops when every sender is dropped.
pub struct ChannelTicker {
    rx: mpsc::Receiver<()>,
}

impl ChannelTicker {
    /// Create a ticker and the sender that drives it.
    pub fn channel(buffer: usize) -> (mpsc::Sender<()>, Self) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (tx, Self { rx })
    }
}

impl Ticker for ChannelTicker {
    fn tick(&mut self) -> BoxFuture<'_, bool> {
        Box::pin(async move { self.rx.recv().await.is_some() })
    }
}

/// Background updater refreshing every feed on each tick.
pub struct RssUpdater {
    ingestor: Arc<Ingestor>,
}

impl RssUpdater {
    pub fn new(ingestor: Arc<Ingestor>) -> Self {
        Self { ingestor }
    }

    /// Run refresh passes until the ticker stops.
    ///
    /// A failed pass is logged and the loop keeps going.
    pub async fn run<T: Ticker>(&self, mut ticker: T) {
        info!("Feed updater started");

        while ticker.tick().await {
            self.run_once().await;
        }

        info!("Feed updater stopped");
    }

    /// Run a single refresh pass.
    pub async fn run_once(&self) -> Option<RefreshSummary> {
        match self.ingestor.refresh_all().await {
            Ok(summary) => Some(summary),
            Err(e) => {
                error!("Refresh pass failed: {}", e);
                None
            }
        }
    }

    /// Spawn the updater loop onto the runtime.
    pub fn spawn<T: Ticker + 'static>(self, ticker: T) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(ticker).await })
    }
}

/// Start the updater with an interval ticker of `interval_secs`.
pub fn start_rss_updater(ingestor: Arc<Ingestor>, interval_secs: u64) -> JoinHandle<()> {
    info!("Refreshing feeds every {} seconds", interval_secs);
    RssUpdater::new(ingestor).spawn(IntervalTicker::new(Duration::from_secs(interval_secs)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::rss::fetcher::{FeedSource, FetchResult};
    use crate::rss::repository::{ArticleRepository, FeedRepository};
    use crate::rss::types::{FeedEntry, FeedSnapshot, NewFeed};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        calls: AtomicUsize,
    }

    impl FeedSource for CountingSource {
        fn fetch<'a>(&'a self, url: &'a str) -> BoxFuture<'a, FetchResult> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            let link = format!("{}/post-{}", url, n);
            Box::pin(async move {
                Ok(FeedSnapshot {
                    title: "Feed".to_string(),
                    entries: vec![FeedEntry::new("Post", link)],
                })
            })
        }
    }

    async fn setup() -> (Arc<CountingSource>, Arc<Ingestor>) {
        let db = Arc::new(Database::open_in_memory().await.unwrap());
        FeedRepository::new(db.pool())
            .create(&NewFeed::new("https://a/feed", "A"))
            .await
            .unwrap();
        let source = Arc::new(CountingSource {
            calls: AtomicUsize::new(0),
        });
        let ingestor = Arc::new(Ingestor::new(db, source.clone(), 2));
        (source, ingestor)
    }

    #[tokio::test]
    async fn test_channel_ticker_drives_refresh_passes() {
        let (source, ingestor) = setup().await;
        let (tx, ticker) = ChannelTicker::channel(4);
        let handle = RssUpdater::new(ingestor.clone()).spawn(ticker);

        tx.send(()).await.unwrap();
        tx.send(()).await.unwrap();
        drop(tx);
        handle.await.unwrap();

        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
        let count = ArticleRepository::new(ingestor.db().pool())
            .count()
            .await
            .unwrap();
        assert_eq!(count, 2);
    }

    #[tokio::test]
    async fn test_updater_stops_without_ticks() {
        let (source, ingestor) = setup().await;
        let (tx, ticker) = ChannelTicker::channel(1);
        drop(tx);

        RssUpdater::new(ingestor).run(ticker).await;
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_run_once_returns_summary() {
        let (_source, ingestor) = setup().await;
        let summary = RssUpdater::new(ingestor).run_once().await.unwrap();
        assert_eq!(summary.feeds, 1);
        assert_eq!(summary.refreshed, 1);
        assert_eq!(summary.inserted, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_ticker_skips_immediate_tick() {
        let mut ticker = IntervalTicker::new(Duration::from_secs(1800));
        let start = Instant::now();
        assert!(ticker.tick().await);
        assert!(start.elapsed() >= Duration::from_secs(1800));
    }
}
