//! Feed subscription and ingestion.
//!
//! Fetching, article deduplication, refresh orchestration, the subscription
//! registry and import/export of subscription lists.

pub mod fetcher;
pub mod ingest;
pub mod repository;
pub mod service;
pub mod transfer;
pub mod types;
pub mod updater;

pub use fetcher::{parse_feed, validate_url, FeedSource, FetchFailure, FetchResult, RssFetcher};
pub use ingest::{FeedLock, Ingestor};
pub use repository::{ArticleRepository, FeedGroupRepository, FeedRepository};
pub use service::{AddFeedRequest, AddedFeed, SubscriptionService};
pub use transfer::TransferFormat;
pub use types::{
    Article, ArticleFilter, ArticleWithFeed, Feed, FeedEntry, FeedGroup, FeedRecord, FeedSnapshot,
    FeedWithGroup, ImportReport, ImportRow, ImportRowError, NewFeed, NewFeedGroup,
    RefreshOutcome, RefreshSummary, DEFAULT_GROUP_COLOR,
};
pub use updater::{start_rss_updater, ChannelTicker, IntervalTicker, RssUpdater, Ticker};
