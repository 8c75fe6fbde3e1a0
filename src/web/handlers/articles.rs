//! Article handlers.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use std::sync::Arc;

use crate::rss::ArticleWithFeed;
use crate::web::dto::{ApiResponse, ListArticlesQuery, MessageResponse};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;

/// GET /api/articles - List articles, newest published first.
pub async fn list_articles(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListArticlesQuery>,
) -> Result<Json<ApiResponse<Vec<ArticleWithFeed>>>, ApiError> {
    let articles = state
        .service()
        .list_articles(&query.to_filter(), state.article_limit)
        .await?;
    Ok(Json(ApiResponse::new(articles)))
}

/// POST /api/articles/:id/read - Mark an article as read.
pub async fn mark_article_read(
    State(state): State<Arc<AppState>>,
    Path(article_id): Path<i64>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    state.service().mark_read(article_id).await?;
    Ok(Json(ApiResponse::new(MessageResponse::new(
        "Article marked as read",
    ))))
}
