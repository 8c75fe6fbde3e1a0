//! Database schema and migrations for feedreader.
//!
//! Migrations are applied in order when the database is opened; the
//! `schema_version` table records which ones have run.

/// Database migrations.
///
/// Each entry is a SQL script executed inside its own transaction. Never edit
/// a released entry; append a new one instead.
pub const MIGRATIONS: &[&str] = &[
    // v1: Feeds and articles
    r#"
CREATE TABLE feeds (
    id                  INTEGER PRIMARY KEY AUTOINCREMENT,
    url                 TEXT NOT NULL UNIQUE,
    title               TEXT NOT NULL,
    last_refreshed_at   TEXT,                     -- NULL until the first successful fetch
    created_at          TEXT NOT NULL DEFAULT (datetime('now'))
);

-- No ON DELETE CASCADE: the registry deletes a feed's articles first.
CREATE TABLE articles (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    feed_id         INTEGER NOT NULL REFERENCES feeds(id),
    title           TEXT NOT NULL,
    link            TEXT NOT NULL UNIQUE,         -- global dedup key
    content         TEXT NOT NULL DEFAULT '',
    published_date  TEXT NOT NULL DEFAULT '',     -- raw feed-supplied value
    is_read         INTEGER NOT NULL DEFAULT 0,
    created_at      TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX idx_articles_feed_id ON articles(feed_id);
CREATE INDEX idx_articles_published_date ON articles(published_date);
"#,
    // v2: Feed groups
    r#"
CREATE TABLE feed_groups (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT NOT NULL UNIQUE,
    description TEXT,
    color       TEXT NOT NULL DEFAULT '#3b82f6',
    created_at  TEXT NOT NULL DEFAULT (datetime('now'))
);

ALTER TABLE feeds ADD COLUMN group_id INTEGER REFERENCES feed_groups(id);

CREATE INDEX idx_feeds_group_id ON feeds(group_id);
"#,
    // v3: Unread filtering
    r#"
CREATE INDEX idx_articles_is_read ON articles(is_read);
"#,
];
