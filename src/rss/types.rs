//! Feed, group and article types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Color assigned to a group created without one.
pub const DEFAULT_GROUP_COLOR: &str = "#3b82f6";

/// Feed title used when the source does not provide one.
pub const UNTITLED_FEED: &str = "Untitled Feed";

/// Entry title used when the source does not provide one.
pub const UNTITLED_ENTRY: &str = "Untitled";

/// A subscribed feed.
#[derive(Debug, Clone, Serialize)]
pub struct Feed {
    /// Feed ID.
    pub id: i64,
    /// Feed URL (unique).
    pub url: String,
    /// Display title.
    pub title: String,
    /// Group the feed belongs to, if any.
    pub group_id: Option<i64>,
    /// Last successful refresh. `None` until the first successful fetch.
    pub last_refreshed_at: Option<DateTime<Utc>>,
    /// When the feed was created.
    pub created_at: DateTime<Utc>,
}

/// A feed joined with its group's display attributes.
#[derive(Debug, Clone, Serialize)]
pub struct FeedWithGroup {
    #[serde(flatten)]
    pub feed: Feed,
    pub group_name: Option<String>,
    pub group_color: Option<String>,
}

/// Data for inserting a feed row.
#[derive(Debug, Clone)]
pub struct NewFeed {
    pub url: String,
    pub title: String,
    pub group_id: Option<i64>,
}

impl NewFeed {
    /// Create a new ungrouped feed.
    pub fn new(url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            group_id: None,
        }
    }

    /// Place the feed in a group.
    pub fn with_group(mut self, group_id: Option<i64>) -> Self {
        self.group_id = group_id;
        self
    }
}

/// A user-defined feed group.
#[derive(Debug, Clone, Serialize)]
pub struct FeedGroup {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub color: String,
    pub created_at: DateTime<Utc>,
}

/// Data for creating or replacing a group.
#[derive(Debug, Clone)]
pub struct NewFeedGroup {
    pub name: String,
    pub description: Option<String>,
    pub color: String,
}

impl NewFeedGroup {
    /// Create a group with the default color and no description.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            color: DEFAULT_GROUP_COLOR.to_string(),
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the color. `None` keeps the default.
    pub fn with_color(mut self, color: Option<String>) -> Self {
        if let Some(color) = color {
            self.color = color;
        }
        self
    }
}

/// A stored article.
#[derive(Debug, Clone, Serialize)]
pub struct Article {
    pub id: i64,
    pub feed_id: i64,
    pub title: String,
    pub link: String,
    pub content: String,
    /// Published date exactly as the feed supplied it.
    pub published_date: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// An article joined with the title of its feed.
#[derive(Debug, Clone, Serialize)]
pub struct ArticleWithFeed {
    #[serde(flatten)]
    pub article: Article,
    pub feed_title: String,
}

/// Filter for article listings.
#[derive(Debug, Clone, Default)]
pub struct ArticleFilter {
    /// Only articles of this feed.
    pub feed_id: Option<i64>,
    /// Only articles of feeds in this group.
    pub group_id: Option<i64>,
    /// Skip articles already marked read.
    pub unread_only: bool,
}

impl ArticleFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(mut self, feed_id: i64) -> Self {
        self.feed_id = Some(feed_id);
        self
    }

    pub fn group(mut self, group_id: i64) -> Self {
        self.group_id = Some(group_id);
        self
    }

    pub fn unread_only(mut self) -> Self {
        self.unread_only = true;
        self
    }
}

/// A normalized feed document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedSnapshot {
    /// Feed title, or [`UNTITLED_FEED`].
    pub title: String,
    /// Entries in document order.
    pub entries: Vec<FeedEntry>,
}

/// One normalized entry of a feed document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEntry {
    /// Entry title, or [`UNTITLED_ENTRY`].
    pub title: String,
    /// First link of the entry, or empty.
    pub link: String,
    /// Summary or content body, or empty.
    pub content: String,
    /// Published (or updated) date as a string, or empty.
    pub published: String,
}

impl FeedEntry {
    /// Create an entry with empty content and date.
    pub fn new(title: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            link: link.into(),
            content: String::new(),
            published: String::new(),
        }
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    pub fn with_published(mut self, published: impl Into<String>) -> Self {
        self.published = published.into();
        self
    }
}

/// Outcome of refreshing a single feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The feed id is not registered. Nothing happened.
    Missing,
    /// The fetch failed. Nothing was stored and the timestamp is unchanged.
    FetchFailed,
    /// The feed was fetched and `inserted` new articles were stored.
    Refreshed { inserted: usize },
}

/// Aggregate result of a full refresh pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RefreshSummary {
    /// Feeds in the snapshot taken at the start of the pass.
    pub feeds: usize,
    /// Feeds fetched and stored successfully.
    pub refreshed: usize,
    /// Feeds whose fetch or storage failed.
    pub failed: usize,
    /// Feeds deleted between the snapshot and their turn.
    pub skipped: usize,
    /// New articles stored across all feeds.
    pub inserted: usize,
}

/// A subscription as exchanged by import and export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedRecord {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

/// One row of an uploaded subscription list, or why it could not be read.
pub type ImportRow = std::result::Result<FeedRecord, String>;

/// A row rejected during import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportRowError {
    /// 1-based position of the row in the payload.
    pub row: usize,
    pub url: Option<String>,
    pub error: String,
}

/// Result of an import.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub imported_count: usize,
    pub errors: Vec<ImportRowError>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_feed_group_defaults() {
        let group = NewFeedGroup::new("Tech");
        assert_eq!(group.name, "Tech");
        assert!(group.description.is_none());
        assert_eq!(group.color, DEFAULT_GROUP_COLOR);
    }

    #[test]
    fn test_new_feed_group_keeps_default_color_for_none() {
        let group = NewFeedGroup::new("Tech")
            .with_description("Blogs")
            .with_color(None);
        assert_eq!(group.description.as_deref(), Some("Blogs"));
        assert_eq!(group.color, DEFAULT_GROUP_COLOR);

        let group = NewFeedGroup::new("Tech").with_color(Some("#ff0000".into()));
        assert_eq!(group.color, "#ff0000");
    }

    #[test]
    fn test_article_filter_builder() {
        let filter = ArticleFilter::new().feed(3).unread_only();
        assert_eq!(filter.feed_id, Some(3));
        assert_eq!(filter.group_id, None);
        assert!(filter.unread_only);
    }

    #[test]
    fn test_feed_with_group_serializes_flat() {
        let feed = FeedWithGroup {
            feed: Feed {
                id: 1,
                url: "https://example.com/feed.xml".into(),
                title: "Example".into(),
                group_id: Some(2),
                last_refreshed_at: None,
                created_at: Utc::now(),
            },
            group_name: Some("Tech".into()),
            group_color: Some(DEFAULT_GROUP_COLOR.into()),
        };
        let value = serde_json::to_value(&feed).unwrap();
        assert_eq!(value["id"], 1);
        assert_eq!(value["group_name"], "Tech");
        assert!(value["last_refreshed_at"].is_null());
    }
}
