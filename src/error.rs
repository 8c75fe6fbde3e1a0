//! Error types for feedreader.

use thiserror::Error;

/// Common error type for feedreader.
#[derive(Error, Debug)]
pub enum ReaderError {
    /// Database error.
    ///
    /// Errors from sqlx are converted into this variant, except unique
    /// constraint violations which the repositories map to [`ReaderError::Duplicate`].
    #[error("database error: {0}")]
    Database(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Validation error for user input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Resource not found.
    #[error("{0} not found")]
    NotFound(String),

    /// A record with the same unique key already exists.
    #[error("{0} already exists")]
    Duplicate(String),

    /// The URL could not be fetched or did not contain a feed.
    #[error("invalid feed: {0}")]
    InvalidFeed(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<sqlx::Error> for ReaderError {
    fn from(e: sqlx::Error) -> Self {
        ReaderError::Database(e.to_string())
    }
}

/// Result type alias for feedreader operations.
pub type Result<T> = std::result::Result<T, ReaderError>;
