//! Feed handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::rss::{AddFeedRequest, FeedWithGroup, RefreshOutcome, RefreshSummary};
use crate::web::dto::{
    ApiResponse, AssignGroupRequest, CreateFeedRequest, CreatedFeedResponse, ListFeedsQuery,
    MessageResponse, RefreshFeedResponse, ValidatedJson,
};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;

/// GET /api/feeds - List feeds, optionally by group.
pub async fn list_feeds(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListFeedsQuery>,
) -> Result<Json<ApiResponse<Vec<FeedWithGroup>>>, ApiError> {
    let feeds = state.service().list_feeds(query.group_id).await?;
    Ok(Json(ApiResponse::new(feeds)))
}

/// POST /api/feeds - Subscribe to a feed.
///
/// The feed is fetched before anything is stored.
pub async fn create_feed(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<CreateFeedRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CreatedFeedResponse>>), ApiError> {
    let request = AddFeedRequest::new(req.url).with_group(req.group_id);
    let added = state.service().add_feed(&request).await?;

    let response = CreatedFeedResponse {
        feed_id: added.feed.id,
        title: added.feed.title,
        inserted: added.inserted,
    };

    Ok((StatusCode::CREATED, Json(ApiResponse::new(response))))
}

/// DELETE /api/feeds/:id - Delete a feed and its articles.
pub async fn delete_feed(
    State(state): State<Arc<AppState>>,
    Path(feed_id): Path<i64>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    state.service().delete_feed(feed_id).await?;
    Ok(Json(ApiResponse::new(MessageResponse::new("Feed deleted"))))
}

/// POST /api/feeds/:id/refresh - Refresh one feed.
pub async fn refresh_feed(
    State(state): State<Arc<AppState>>,
    Path(feed_id): Path<i64>,
) -> Result<Json<ApiResponse<RefreshFeedResponse>>, ApiError> {
    let outcome = state.ingestor.refresh_one(feed_id).await?;

    let response = match outcome {
        RefreshOutcome::Refreshed { inserted } => RefreshFeedResponse {
            message: "Feed refreshed".to_string(),
            inserted,
        },
        RefreshOutcome::FetchFailed => RefreshFeedResponse {
            message: "Feed could not be fetched".to_string(),
            inserted: 0,
        },
        RefreshOutcome::Missing => RefreshFeedResponse {
            message: "Feed not found".to_string(),
            inserted: 0,
        },
    };

    Ok(Json(ApiResponse::new(response)))
}

/// POST /api/feeds/refresh - Refresh every feed.
pub async fn refresh_all_feeds(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<RefreshSummary>>, ApiError> {
    let summary = state.ingestor.refresh_all().await?;
    Ok(Json(ApiResponse::new(summary)))
}

/// PUT /api/feeds/:id/group - Move a feed into a group or ungroup it.
pub async fn assign_feed_group(
    State(state): State<Arc<AppState>>,
    Path(feed_id): Path<i64>,
    ValidatedJson(req): ValidatedJson<AssignGroupRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    state.service().assign_group(feed_id, req.group_id).await?;

    let message = match req.group_id {
        Some(_) => "Feed group updated",
        None => "Feed ungrouped",
    };
    Ok(Json(ApiResponse::new(MessageResponse::new(message))))
}
