//! API errors.
//!
//! Every failure leaves the API as
//! `{"error": {"code": "...", "message": "...", "details": {...}?}}`.

use std::collections::BTreeMap;
use std::fmt;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::ReaderError;

/// Field name to messages, for request validation failures.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Machine-readable error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    BadRequest,
    /// A request body failed field validation.
    ValidationError,
    /// The submitted URL could not be fetched or parsed as a feed.
    InvalidFeed,
    NotFound,
    Conflict,
    InternalError,
}

impl ErrorCode {
    pub fn status_code(self) -> StatusCode {
        match self {
            ErrorCode::BadRequest | ErrorCode::ValidationError | ErrorCode::InvalidFeed => {
                StatusCode::BAD_REQUEST
            }
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::Conflict => StatusCode::CONFLICT,
            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorEnvelope<'a> {
    error: ErrorPayload<'a>,
}

#[derive(Serialize)]
struct ErrorPayload<'a> {
    code: ErrorCode,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<&'a FieldErrors>,
}

/// Error returned by API handlers.
#[derive(Debug)]
pub struct ApiError {
    code: ErrorCode,
    message: String,
    details: Option<FieldErrors>,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadRequest, message)
    }

    pub fn invalid_feed(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidFeed, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Conflict, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// A validation failure carrying per-field messages.
    pub fn validation(details: FieldErrors) -> Self {
        Self {
            code: ErrorCode::ValidationError,
            message: "Validation failed".to_string(),
            details: Some(details),
        }
    }

    pub fn from_validation_errors(errors: validator::ValidationErrors) -> Self {
        let details = errors
            .field_errors()
            .into_iter()
            .map(|(field, errors)| {
                let messages = errors
                    .iter()
                    .map(|e| match &e.message {
                        Some(message) => message.to_string(),
                        None => format!("Invalid value for {}", field),
                    })
                    .collect();
                (field.to_string(), messages)
            })
            .collect();

        Self::validation(details)
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn details(&self) -> Option<&FieldErrors> {
        self.details.as_ref()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let envelope = ErrorEnvelope {
            error: ErrorPayload {
                code: self.code,
                message: &self.message,
                details: self.details.as_ref(),
            },
        };
        (self.code.status_code(), Json(envelope)).into_response()
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:?})", self.message, self.code)
    }
}

impl std::error::Error for ApiError {}

impl From<ReaderError> for ApiError {
    fn from(err: ReaderError) -> Self {
        match err {
            ReaderError::NotFound(_) => ApiError::not_found(err.to_string()),
            ReaderError::Duplicate(_) => ApiError::conflict(err.to_string()),
            ReaderError::InvalidFeed(reason) => ApiError::invalid_feed(reason),
            ReaderError::Validation(message) => ApiError::bad_request(message),
            other => {
                tracing::error!("Internal error: {}", other);
                ApiError::internal("An internal error occurred")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[test]
    fn test_status_codes() {
        assert_eq!(ErrorCode::ValidationError.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::InvalidFeed.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::NotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorCode::Conflict.status_code(), StatusCode::CONFLICT);
        assert_eq!(
            ErrorCode::InternalError.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_from_reader_error() {
        let err: ApiError = ReaderError::NotFound("group".into()).into();
        assert_eq!(err.code(), ErrorCode::NotFound);
        assert_eq!(err.message(), "group not found");

        let err: ApiError = ReaderError::Duplicate("feed".into()).into();
        assert_eq!(err.code(), ErrorCode::Conflict);
        assert_eq!(err.message(), "feed already exists");

        let err: ApiError = ReaderError::InvalidFeed("HTTP error: 500".into()).into();
        assert_eq!(err.code(), ErrorCode::InvalidFeed);
        assert_eq!(err.message(), "HTTP error: 500");

        let err: ApiError = ReaderError::Validation("url is required".into()).into();
        assert_eq!(err.code(), ErrorCode::BadRequest);
        assert_eq!(err.message(), "url is required");
    }

    #[test]
    fn test_internal_errors_are_masked() {
        let err: ApiError = ReaderError::Database("disk I/O error".into()).into();
        assert_eq!(err.code(), ErrorCode::InternalError);
        assert_eq!(err.message(), "An internal error occurred");
    }

    #[tokio::test]
    async fn test_validation_error_body() {
        let mut details = FieldErrors::new();
        details.insert("name".to_string(), vec!["Must not be empty".to_string()]);

        let response = ApiError::validation(details).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(body["error"]["message"], "Validation failed");
        assert_eq!(body["error"]["details"]["name"][0], "Must not be empty");
    }

    #[tokio::test]
    async fn test_plain_error_has_no_details() {
        let response = ApiError::conflict("feed already exists").into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert!(body["error"].get("details").is_none());
    }
}
