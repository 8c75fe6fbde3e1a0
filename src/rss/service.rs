//! Subscription service.
//!
//! High-level operations over feeds, groups and articles used by the web
//! handlers. Feed creation goes through the ingestor so a new subscription
//! is fetched and stored before the call returns.

use std::collections::HashSet;

use tracing::{debug, info, warn};

use super::fetcher::validate_url;
use super::ingest::Ingestor;
use super::repository::{ArticleRepository, FeedGroupRepository, FeedRepository};
use super::types::{
    ArticleFilter, ArticleWithFeed, Feed, FeedGroup, FeedRecord, FeedWithGroup, ImportReport,
    ImportRow, ImportRowError, NewFeed, NewFeedGroup,
};
use crate::{ReaderError, Result};

/// Request to subscribe to a feed.
#[derive(Debug, Clone)]
pub struct AddFeedRequest {
    /// Feed URL.
    pub url: String,
    /// Group to place the feed in.
    pub group_id: Option<i64>,
}

impl AddFeedRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            group_id: None,
        }
    }

    pub fn with_group(mut self, group_id: Option<i64>) -> Self {
        self.group_id = group_id;
        self
    }
}

/// Result of a successful subscription.
#[derive(Debug, Clone)]
pub struct AddedFeed {
    pub feed: Feed,
    /// Articles stored by the initial fetch.
    pub inserted: usize,
}

/// Service for subscription operations.
pub struct SubscriptionService<'a> {
    ingestor: &'a Ingestor,
}

impl<'a> SubscriptionService<'a> {
    /// Create a new service backed by the given ingestor.
    pub fn new(ingestor: &'a Ingestor) -> Self {
        Self { ingestor }
    }

    fn feeds(&self) -> FeedRepository<'_> {
        FeedRepository::new(self.ingestor.db().pool())
    }

    fn groups(&self) -> FeedGroupRepository<'_> {
        FeedGroupRepository::new(self.ingestor.db().pool())
    }

    fn articles(&self) -> ArticleRepository<'_> {
        ArticleRepository::new(self.ingestor.db().pool())
    }

    async fn require_group(&self, group_id: i64) -> Result<FeedGroup> {
        self.groups()
            .get_by_id(group_id)
            .await?
            .ok_or_else(|| ReaderError::NotFound("group".to_string()))
    }

    /// Subscribe to a feed.
    ///
    /// The URL is fetched first; nothing is written unless it yields a
    /// parseable feed. Entries of the initial fetch are stored and the feed
    /// is stamped as refreshed. If storing fails the feed row and its
    /// articles are removed again.
    ///
    /// # Errors
    ///
    /// - `Validation` if the URL is blank
    /// - `NotFound("group")` if `group_id` names no group
    /// - `Duplicate("feed")` if the URL is already subscribed
    /// - `InvalidFeed` if the fetch fails
    pub async fn add_feed(&self, request: &AddFeedRequest) -> Result<AddedFeed> {
        let url = request.url.trim();
        if url.is_empty() {
            return Err(ReaderError::Validation("url is required".to_string()));
        }

        if let Some(group_id) = request.group_id {
            self.require_group(group_id).await?;
        }

        let feeds = self.feeds();
        if feeds.get_by_url(url).await?.is_some() {
            return Err(ReaderError::Duplicate("feed".to_string()));
        }

        let snapshot = self.ingestor.fetch(url).await?;

        let feed = feeds
            .create(&NewFeed::new(url, &snapshot.title).with_group(request.group_id))
            .await?;

        let inserted = {
            let _guard = self.ingestor.lock_feed(feed.id).await;
            match self.ingestor.ingest(feed.id, &snapshot.entries).await {
                Ok(inserted) => inserted,
                Err(e) => {
                    // Undo the subscription so the URL can be added again.
                    if let Err(cleanup) = feeds.delete_with_articles(feed.id).await {
                        warn!(feed_id = feed.id, error = %cleanup, "Failed to remove half-added feed");
                    }
                    return Err(e);
                }
            }
        };

        info!(feed_id = feed.id, inserted, "Subscribed to \"{}\"", feed.title);

        let feed = feeds
            .get_by_id(feed.id)
            .await?
            .ok_or_else(|| ReaderError::NotFound("feed".to_string()))?;

        Ok(AddedFeed { feed, inserted })
    }

    /// Delete a feed and all of its articles.
    ///
    /// Returns false if the feed did not exist.
    pub async fn delete_feed(&self, feed_id: i64) -> Result<bool> {
        let removed = {
            let _guard = self.ingestor.lock_feed(feed_id).await;
            self.feeds().delete_with_articles(feed_id).await?
        };

        match removed {
            Some(articles) => {
                info!(feed_id, articles, "Deleted feed");
                Ok(true)
            }
            None => {
                debug!(feed_id, "Delete requested for unknown feed");
                Ok(false)
            }
        }
    }

    /// Move a feed into a group, or ungroup it with `None`.
    pub async fn assign_group(&self, feed_id: i64, group_id: Option<i64>) -> Result<()> {
        if let Some(group_id) = group_id {
            self.require_group(group_id).await?;
        }

        if !self.feeds().set_group(feed_id, group_id).await? {
            return Err(ReaderError::NotFound("feed".to_string()));
        }
        Ok(())
    }

    /// List feeds, optionally restricted to one group.
    pub async fn list_feeds(&self, group_id: Option<i64>) -> Result<Vec<FeedWithGroup>> {
        self.feeds().list_with_groups(group_id).await
    }

    /// List all groups.
    pub async fn list_groups(&self) -> Result<Vec<FeedGroup>> {
        self.groups().list().await
    }

    /// Create a group.
    pub async fn create_group(&self, group: &NewFeedGroup) -> Result<FeedGroup> {
        let group = normalize_group(group)?;
        let created = self.groups().create(&group).await?;
        info!(group_id = created.id, "Created group \"{}\"", created.name);
        Ok(created)
    }

    /// Replace a group's attributes.
    pub async fn update_group(&self, group_id: i64, group: &NewFeedGroup) -> Result<FeedGroup> {
        let group = normalize_group(group)?;
        if !self.groups().update(group_id, &group).await? {
            return Err(ReaderError::NotFound("group".to_string()));
        }
        self.require_group(group_id).await
    }

    /// Delete a group, leaving its member feeds ungrouped.
    ///
    /// Returns false if the group did not exist.
    pub async fn delete_group(&self, group_id: i64) -> Result<bool> {
        match self.groups().delete_and_ungroup(group_id).await? {
            Some(ungrouped) => {
                info!(group_id, ungrouped, "Deleted group");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// List articles, newest published first.
    pub async fn list_articles(
        &self,
        filter: &ArticleFilter,
        limit: u32,
    ) -> Result<Vec<ArticleWithFeed>> {
        self.articles().list(filter, limit).await
    }

    /// Mark an article as read. Returns false if it does not exist.
    pub async fn mark_read(&self, article_id: i64) -> Result<bool> {
        self.articles().mark_read(article_id).await
    }

    /// All subscriptions as title/url pairs.
    pub async fn export_feeds(&self) -> Result<Vec<FeedRecord>> {
        let feeds = self.feeds().list_all().await?;
        Ok(feeds
            .into_iter()
            .map(|feed| FeedRecord {
                title: Some(feed.title),
                url: Some(feed.url),
            })
            .collect())
    }

    /// Register subscriptions from an import without fetching them.
    ///
    /// Rows are processed independently; a rejected or unreadable row is
    /// reported and the rest of the batch continues.
    pub async fn import_feeds(&self, rows: &[ImportRow]) -> Result<ImportReport> {
        let feeds = self.feeds();
        let mut report = ImportReport::default();
        let mut seen = HashSet::new();

        for (index, decoded) in rows.iter().enumerate() {
            let row = index + 1;
            let record = match decoded {
                Ok(record) => record,
                Err(error) => {
                    report.errors.push(ImportRowError {
                        row,
                        url: None,
                        error: error.clone(),
                    });
                    continue;
                }
            };
            let reject = |error: String| ImportRowError {
                row,
                url: record.url.clone(),
                error,
            };

            let Some(url) = record.url.as_deref() else {
                report.errors.push(reject("url is required".to_string()));
                continue;
            };

            if let Err(failure) = validate_url(url, true) {
                report.errors.push(reject(failure.reason().to_string()));
                continue;
            }

            if !seen.insert(url.to_string()) {
                report
                    .errors
                    .push(reject("duplicate url in import".to_string()));
                continue;
            }

            let title = record.title.as_deref().unwrap_or(url);
            match feeds.create(&NewFeed::new(url, title)).await {
                Ok(_) => report.imported_count += 1,
                Err(e) => report.errors.push(reject(e.to_string())),
            }
        }

        info!(
            imported = report.imported_count,
            rejected = report.errors.len(),
            "Imported feeds"
        );

        Ok(report)
    }
}

fn normalize_group(group: &NewFeedGroup) -> Result<NewFeedGroup> {
    let name = group.name.trim();
    if name.is_empty() {
        return Err(ReaderError::Validation("name is required".to_string()));
    }
    Ok(NewFeedGroup {
        name: name.to_string(),
        description: group.description.clone(),
        color: group.color.clone(),
    })
}
