//! Import and export handlers.

use axum::{
    extract::{Multipart, Query, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;

use crate::rss::{transfer, ImportReport, TransferFormat};
use crate::web::dto::{ApiResponse, TransferQuery};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;

fn parse_format(query: &TransferQuery) -> Result<TransferFormat, ApiError> {
    match query.format.as_deref() {
        None => Ok(TransferFormat::default()),
        Some(format) => Ok(format.parse::<TransferFormat>()?),
    }
}

/// GET /api/feeds/export - Download all subscriptions.
pub async fn export_feeds(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TransferQuery>,
) -> Result<Response, ApiError> {
    let format = parse_format(&query)?;
    let records = state.service().export_feeds().await?;
    let body = transfer::encode(format, &records).map_err(|e| {
        tracing::error!("Failed to encode export: {}", e);
        ApiError::internal("Failed to encode export")
    })?;

    let disposition = format!("attachment; filename=\"{}\"", format.file_name());
    Ok((
        [
            (header::CONTENT_TYPE, format.content_type().to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}

/// POST /api/feeds/import - Register subscriptions from an uploaded file.
///
/// Expects a multipart field named `file`. Rows are inserted without being
/// fetched; rejected or malformed rows are reported alongside the imported
/// count. Only an unreadable document is a 400.
pub async fn import_feeds(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TransferQuery>,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<ImportReport>>, ApiError> {
    let format = parse_format(&query)?;

    let mut content: Option<Vec<u8>> = None;
    while let Some(field) = multipart.next_field().await.map_err(|e| {
        tracing::warn!("Failed to read multipart field: {}", e);
        ApiError::bad_request("Invalid multipart data")
    })? {
        if field.name() == Some("file") {
            content = Some(
                field
                    .bytes()
                    .await
                    .map_err(|e| {
                        tracing::warn!("Failed to read uploaded file: {}", e);
                        ApiError::bad_request("Failed to read file")
                    })?
                    .to_vec(),
            );
        }
    }

    let content = content.ok_or_else(|| ApiError::bad_request("No file provided"))?;

    if content.len() > state.max_import_size {
        return Err(ApiError::bad_request(format!(
            "File too large (max {} bytes)",
            state.max_import_size
        )));
    }

    let rows = transfer::decode(format, &content)?;
    let report = state.service().import_feeds(&rows).await?;

    Ok(Json(ApiResponse::new(report)))
}
