//! Router configuration for Web API.

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use super::handlers::{
    assign_feed_group, create_feed, create_group, delete_feed, delete_group, export_feeds,
    import_feeds, list_articles, list_feeds, list_groups, mark_article_read, refresh_all_feeds,
    refresh_feed, update_group, AppState,
};
use super::middleware::create_cors_layer;

/// Create the main API router.
pub fn create_router(app_state: Arc<AppState>, cors_origins: &[String]) -> Router {
    let feed_routes = Router::new()
        .route("/", get(list_feeds).post(create_feed))
        .route("/refresh", post(refresh_all_feeds))
        .route("/export", get(export_feeds))
        .route("/import", post(import_feeds))
        .route("/:id", delete(delete_feed))
        .route("/:id/refresh", post(refresh_feed))
        .route("/:id/group", put(assign_feed_group));

    let group_routes = Router::new()
        .route("/", get(list_groups).post(create_group))
        .route("/:id", put(update_group).delete(delete_group));

    let article_routes = Router::new()
        .route("/", get(list_articles))
        .route("/:id/read", post(mark_article_read));

    let api_routes = Router::new()
        .nest("/feeds", feed_routes)
        .nest("/groups", group_routes)
        .nest("/articles", article_routes);

    Router::new()
        .nest("/api", api_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(create_cors_layer(cors_origins)),
        )
        .with_state(app_state)
}

/// Create a health check router.
pub fn create_health_router() -> Router {
    Router::new().route("/health", get(health_check))
}

/// Health check handler.
async fn health_check() -> &'static str {
    "OK"
}
