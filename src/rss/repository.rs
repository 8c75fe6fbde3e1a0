//! Feed, group and article repositories.

use chrono::Utc;
use sqlx::QueryBuilder;

use super::types::{
    Article, ArticleFilter, ArticleWithFeed, Feed, FeedEntry, FeedGroup, FeedWithGroup, NewFeed,
    NewFeedGroup,
};
use crate::db::{parse_datetime, DbPool};
use crate::{ReaderError, Result};

/// Map an insert/update error, turning a UNIQUE violation into `Duplicate(what)`.
fn map_unique(e: sqlx::Error, what: &str) -> ReaderError {
    match e.as_database_error() {
        Some(db_err) if db_err.is_unique_violation() => ReaderError::Duplicate(what.to_string()),
        _ => ReaderError::Database(e.to_string()),
    }
}

/// Row type for a feed joined with its group.
#[derive(Debug, Clone, sqlx::FromRow)]
struct FeedRow {
    id: i64,
    url: String,
    title: String,
    group_id: Option<i64>,
    last_refreshed_at: Option<String>,
    created_at: String,
    group_name: Option<String>,
    group_color: Option<String>,
}

impl From<FeedRow> for FeedWithGroup {
    fn from(row: FeedRow) -> Self {
        FeedWithGroup {
            feed: Feed {
                id: row.id,
                url: row.url,
                title: row.title,
                group_id: row.group_id,
                last_refreshed_at: row.last_refreshed_at.and_then(|s| parse_datetime(&s)),
                created_at: parse_datetime(&row.created_at).unwrap_or_else(Utc::now),
            },
            group_name: row.group_name,
            group_color: row.group_color,
        }
    }
}

/// Row type for a feed group.
#[derive(Debug, Clone, sqlx::FromRow)]
struct FeedGroupRow {
    id: i64,
    name: String,
    description: Option<String>,
    color: String,
    created_at: String,
}

impl From<FeedGroupRow> for FeedGroup {
    fn from(row: FeedGroupRow) -> Self {
        FeedGroup {
            id: row.id,
            name: row.name,
            description: row.description,
            color: row.color,
            created_at: parse_datetime(&row.created_at).unwrap_or_else(Utc::now),
        }
    }
}

/// Row type for an article joined with its feed title.
#[derive(Debug, Clone, sqlx::FromRow)]
struct ArticleRow {
    id: i64,
    feed_id: i64,
    title: String,
    link: String,
    content: String,
    published_date: String,
    is_read: bool,
    created_at: String,
    feed_title: String,
}

impl From<ArticleRow> for ArticleWithFeed {
    fn from(row: ArticleRow) -> Self {
        ArticleWithFeed {
            article: Article {
                id: row.id,
                feed_id: row.feed_id,
                title: row.title,
                link: row.link,
                content: row.content,
                published_date: row.published_date,
                is_read: row.is_read,
                created_at: parse_datetime(&row.created_at).unwrap_or_else(Utc::now),
            },
            feed_title: row.feed_title,
        }
    }
}

const FEED_SELECT: &str = r#"
    SELECT f.id, f.url, f.title, f.group_id, f.last_refreshed_at, f.created_at,
           g.name AS group_name, g.color AS group_color
    FROM feeds f
    LEFT JOIN feed_groups g ON g.id = f.group_id
"#;

/// Repository for feed operations.
pub struct FeedRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> FeedRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Insert a feed. A URL already present yields `Duplicate("feed")`.
    pub async fn create(&self, feed: &NewFeed) -> Result<Feed> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO feeds (url, title, group_id)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(&feed.url)
        .bind(&feed.title)
        .bind(feed.group_id)
        .fetch_one(self.pool)
        .await
        .map_err(|e| map_unique(e, "feed"))?;

        self.get_by_id(id)
            .await?
            .ok_or_else(|| ReaderError::NotFound("feed".into()))
    }

    /// Get a feed by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<Feed>> {
        let row = sqlx::query_as::<_, FeedRow>(&format!("{FEED_SELECT} WHERE f.id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        Ok(row.map(|r| FeedWithGroup::from(r).feed))
    }

    /// Get a feed by URL.
    pub async fn get_by_url(&self, url: &str) -> Result<Option<Feed>> {
        let row = sqlx::query_as::<_, FeedRow>(&format!("{FEED_SELECT} WHERE f.url = $1"))
            .bind(url)
            .fetch_optional(self.pool)
            .await?;

        Ok(row.map(|r| FeedWithGroup::from(r).feed))
    }

    /// List feeds with their group attributes, newest first.
    pub async fn list_with_groups(&self, group_id: Option<i64>) -> Result<Vec<FeedWithGroup>> {
        let mut query: QueryBuilder<sqlx::Sqlite> = QueryBuilder::new(FEED_SELECT);
        if let Some(group_id) = group_id {
            query.push(" WHERE f.group_id = ");
            query.push_bind(group_id);
        }
        query.push(" ORDER BY f.created_at DESC, f.id DESC");

        let rows = query
            .build_query_as::<FeedRow>()
            .fetch_all(self.pool)
            .await?;

        Ok(rows.into_iter().map(FeedWithGroup::from).collect())
    }

    /// List all feeds in export order (oldest first).
    pub async fn list_all(&self) -> Result<Vec<Feed>> {
        let rows = sqlx::query_as::<_, FeedRow>(&format!("{FEED_SELECT} ORDER BY f.id ASC"))
            .fetch_all(self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|r| FeedWithGroup::from(r).feed)
            .collect())
    }

    /// List the IDs of all feeds.
    pub async fn list_ids(&self) -> Result<Vec<i64>> {
        let ids: Vec<i64> = sqlx::query_scalar("SELECT id FROM feeds ORDER BY id")
            .fetch_all(self.pool)
            .await?;
        Ok(ids)
    }

    /// Set or clear a feed's group. Returns false if the feed does not exist.
    pub async fn set_group(&self, feed_id: i64, group_id: Option<i64>) -> Result<bool> {
        let result = sqlx::query("UPDATE feeds SET group_id = $1 WHERE id = $2")
            .bind(group_id)
            .bind(feed_id)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Record a successful refresh at the current time.
    pub async fn mark_refreshed(&self, feed_id: i64) -> Result<bool> {
        let result = sqlx::query("UPDATE feeds SET last_refreshed_at = $1 WHERE id = $2")
            .bind(Utc::now().to_rfc3339())
            .bind(feed_id)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete a feed and its articles in one transaction.
    ///
    /// Returns the number of articles removed, or `None` if the feed did not exist.
    pub async fn delete_with_articles(&self, feed_id: i64) -> Result<Option<u64>> {
        let mut tx = self.pool.begin().await?;

        let articles = sqlx::query("DELETE FROM articles WHERE feed_id = $1")
            .bind(feed_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let feeds = sqlx::query("DELETE FROM feeds WHERE id = $1")
            .bind(feed_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;

        Ok((feeds > 0).then_some(articles))
    }

    /// Count all feeds.
    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM feeds")
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }
}

/// Repository for feed group operations.
pub struct FeedGroupRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> FeedGroupRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Create a group. A taken name yields `Duplicate("group")`.
    pub async fn create(&self, group: &NewFeedGroup) -> Result<FeedGroup> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO feed_groups (name, description, color)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(&group.name)
        .bind(&group.description)
        .bind(&group.color)
        .fetch_one(self.pool)
        .await
        .map_err(|e| map_unique(e, "group"))?;

        self.get_by_id(id)
            .await?
            .ok_or_else(|| ReaderError::NotFound("group".into()))
    }

    /// Get a group by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<FeedGroup>> {
        let row = sqlx::query_as::<_, FeedGroupRow>(
            "SELECT id, name, description, color, created_at FROM feed_groups WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(FeedGroup::from))
    }

    /// List all groups by name.
    pub async fn list(&self) -> Result<Vec<FeedGroup>> {
        let rows = sqlx::query_as::<_, FeedGroupRow>(
            "SELECT id, name, description, color, created_at FROM feed_groups ORDER BY name",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(FeedGroup::from).collect())
    }

    /// Replace a group's name, description and color.
    ///
    /// Returns false if the group does not exist.
    pub async fn update(&self, id: i64, group: &NewFeedGroup) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE feed_groups SET name = $1, description = $2, color = $3 WHERE id = $4",
        )
        .bind(&group.name)
        .bind(&group.description)
        .bind(&group.color)
        .bind(id)
        .execute(self.pool)
        .await
        .map_err(|e| map_unique(e, "group"))?;

        Ok(result.rows_affected() > 0)
    }

    /// Ungroup all member feeds and delete the group in one transaction.
    ///
    /// Returns the number of feeds that were ungrouped, or `None` if the
    /// group did not exist.
    pub async fn delete_and_ungroup(&self, id: i64) -> Result<Option<u64>> {
        let mut tx = self.pool.begin().await?;

        let ungrouped = sqlx::query("UPDATE feeds SET group_id = NULL WHERE group_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let deleted = sqlx::query("DELETE FROM feed_groups WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;

        Ok((deleted > 0).then_some(ungrouped))
    }
}

/// Repository for article operations.
pub struct ArticleRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> ArticleRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Insert an entry unless its link is already stored for any feed.
    ///
    /// Returns the new row id, or `None` if the link already existed.
    pub async fn insert_or_ignore(&self, feed_id: i64, entry: &FeedEntry) -> Result<Option<i64>> {
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO articles (feed_id, title, link, content, published_date)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(feed_id)
        .bind(&entry.title)
        .bind(&entry.link)
        .bind(&entry.content)
        .bind(&entry.published)
        .execute(self.pool)
        .await?;

        if result.rows_affected() > 0 {
            Ok(Some(result.last_insert_rowid()))
        } else {
            Ok(None)
        }
    }

    /// List articles matching a filter, newest published first.
    pub async fn list(&self, filter: &ArticleFilter, limit: u32) -> Result<Vec<ArticleWithFeed>> {
        let mut query: QueryBuilder<sqlx::Sqlite> = QueryBuilder::new(
            r#"
            SELECT a.id, a.feed_id, a.title, a.link, a.content, a.published_date,
                   a.is_read, a.created_at, f.title AS feed_title
            FROM articles a
            JOIN feeds f ON f.id = a.feed_id
            WHERE 1 = 1
            "#,
        );

        if let Some(feed_id) = filter.feed_id {
            query.push(" AND a.feed_id = ");
            query.push_bind(feed_id);
        }
        if let Some(group_id) = filter.group_id {
            query.push(" AND f.group_id = ");
            query.push_bind(group_id);
        }
        if filter.unread_only {
            query.push(" AND a.is_read = 0");
        }

        query.push(" ORDER BY a.published_date DESC, a.id DESC LIMIT ");
        query.push_bind(i64::from(limit));

        let rows = query
            .build_query_as::<ArticleRow>()
            .fetch_all(self.pool)
            .await?;

        Ok(rows.into_iter().map(ArticleWithFeed::from).collect())
    }

    /// Mark an article as read. Returns false if it does not exist.
    pub async fn mark_read(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("UPDATE articles SET is_read = 1 WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Count articles for a feed.
    pub async fn count_by_feed(&self, feed_id: i64) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM articles WHERE feed_id = $1")
            .bind(feed_id)
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }

    /// Count all articles.
    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM articles")
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }
}
