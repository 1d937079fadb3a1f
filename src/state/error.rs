//! Error types for backing store operations

use crate::error::AppError;
use crate::models::RecordError;

/// Result type for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Errors raised by the backing document store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Store could not be opened
    #[error("Store initialization failed: {0}")]
    InitFailed(String),

    /// Embedded database failure
    #[error("Database error: {0}")]
    Database(String),

    /// Collection has no text index
    #[error("Text index not found for collection '{0}'")]
    IndexNotFound(String),

    /// Text index failure
    #[error("Text index error: {0}")]
    Index(String),

    /// Document (de)serialization failure
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Malformed predicate or pipeline
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Whether this error reports a missing text index
    pub fn is_missing_index(&self) -> bool {
        matches!(self, StoreError::IndexNotFound(_))
    }
}

impl From<sled::Error> for StoreError {
    fn from(err: sled::Error) -> Self {
        StoreError::Database(err.to_string())
    }
}

impl From<tantivy::TantivyError> for StoreError {
    fn from(err: tantivy::TantivyError) -> Self {
        StoreError::Index(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

impl From<RecordError> for StoreError {
    fn from(err: RecordError) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::InitFailed(msg) => AppError::Configuration(msg),
            StoreError::Io(err) => AppError::Io(err),
            StoreError::InvalidQuery(msg) => AppError::Validation(msg),
            _ => AppError::Database(err.to_string()),
        }
    }
}
