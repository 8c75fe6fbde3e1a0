//! Group handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::rss::FeedGroup;
use crate::web::dto::{
    ApiResponse, CreatedGroupResponse, GroupRequest, MessageResponse, ValidatedJson,
};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;

/// GET /api/groups - List groups.
pub async fn list_groups(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<FeedGroup>>>, ApiError> {
    let groups = state.service().list_groups().await?;
    Ok(Json(ApiResponse::new(groups)))
}

/// POST /api/groups - Create a group.
pub async fn create_group(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<GroupRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CreatedGroupResponse>>), ApiError> {
    let group = state.service().create_group(&req.into_group()).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(CreatedGroupResponse { group_id: group.id })),
    ))
}

/// PUT /api/groups/:id - Replace a group's attributes.
pub async fn update_group(
    State(state): State<Arc<AppState>>,
    Path(group_id): Path<i64>,
    ValidatedJson(req): ValidatedJson<GroupRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    state
        .service()
        .update_group(group_id, &req.into_group())
        .await?;
    Ok(Json(ApiResponse::new(MessageResponse::new("Group updated"))))
}

/// DELETE /api/groups/:id - Delete a group; its feeds become ungrouped.
pub async fn delete_group(
    State(state): State<Arc<AppState>>,
    Path(group_id): Path<i64>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    state.service().delete_group(group_id).await?;
    Ok(Json(ApiResponse::new(MessageResponse::new("Group deleted"))))
}
