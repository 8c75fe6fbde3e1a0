//! Request DTOs for Web API.

use serde::Deserialize;
use validator::Validate;

use super::validation::{hex_color, not_empty_trimmed};
use crate::rss::{ArticleFilter, NewFeedGroup};

/// Subscribe request.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateFeedRequest {
    /// Feed URL.
    #[serde(default)]
    #[validate(custom(function = not_empty_trimmed))]
    pub url: String,
    /// Group to place the feed in.
    #[serde(default)]
    pub group_id: Option<i64>,
}

/// Group assignment request. `null` or a missing `group_id` ungroups.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct AssignGroupRequest {
    #[serde(default)]
    pub group_id: Option<i64>,
}

/// Create or update group request.
#[derive(Debug, Deserialize, Validate)]
pub struct GroupRequest {
    /// Group name (unique).
    #[serde(default)]
    #[validate(custom(function = not_empty_trimmed), length(max = 100))]
    pub name: String,
    #[serde(default)]
    #[validate(length(max = 500))]
    pub description: Option<String>,
    /// `#rrggbb` color; the default color when omitted.
    #[serde(default)]
    #[validate(custom(function = hex_color))]
    pub color: Option<String>,
}

impl GroupRequest {
    /// Convert into the registry's group data.
    pub fn into_group(self) -> NewFeedGroup {
        let mut group = NewFeedGroup::new(self.name).with_color(self.color);
        group.description = self.description;
        group
    }
}

/// Query parameters for listing feeds.
#[derive(Debug, Default, Deserialize)]
pub struct ListFeedsQuery {
    pub group_id: Option<i64>,
}

/// Query parameters for listing articles.
#[derive(Debug, Default, Deserialize)]
pub struct ListArticlesQuery {
    pub feed_id: Option<i64>,
    pub group_id: Option<i64>,
    #[serde(default)]
    pub unread_only: bool,
}

impl ListArticlesQuery {
    /// Convert into a repository filter.
    pub fn to_filter(&self) -> ArticleFilter {
        ArticleFilter {
            feed_id: self.feed_id,
            group_id: self.group_id,
            unread_only: self.unread_only,
        }
    }
}

/// Query parameters for import and export.
#[derive(Debug, Default, Deserialize)]
pub struct TransferQuery {
    /// `json` (default) or `csv`.
    pub format: Option<String>,
}
