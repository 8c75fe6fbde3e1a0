//! API handlers.

pub mod articles;
pub mod feeds;
pub mod groups;
pub mod transfer;

pub use articles::*;
pub use feeds::*;
pub use groups::*;
pub use transfer::*;

use std::sync::Arc;

use crate::config::{RssConfig, WebConfig};
use crate::rss::{Ingestor, SubscriptionService};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Ingestor shared with the periodic updater.
    pub ingestor: Arc<Ingestor>,
    /// Maximum articles returned by a listing.
    pub article_limit: u32,
    /// Maximum accepted import upload in bytes.
    pub max_import_size: usize,
}

impl AppState {
    /// Create a new application state.
    pub fn new(ingestor: Arc<Ingestor>, rss: &RssConfig, web: &WebConfig) -> Self {
        Self {
            ingestor,
            article_limit: rss.article_limit,
            max_import_size: web.max_import_size_bytes,
        }
    }

    /// Subscription service over the shared ingestor.
    pub fn service(&self) -> SubscriptionService<'_> {
        SubscriptionService::new(&self.ingestor)
    }
}
