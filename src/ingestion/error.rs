//! Error types for document ingestion

use crate::models::RecordError;
use crate::state::StoreError;

/// Result type for ingestion operations
pub type IngestionResult<T> = std::result::Result<T, IngestionError>;

#[derive(Debug, thiserror::Error)]
pub enum IngestionError {
    /// Request failed validation
    #[error("Invalid ingestion request: {0}")]
    Validation(String),

    /// Source could not be fetched
    #[error("Failed to fetch {url}: {message}")]
    Fetch { url: String, message: String },

    /// Source body is not a JSON document
    #[error("Failed to decode document: {0}")]
    Decode(String),

    /// Record could not be stored
    #[error("Failed to store record: {0}")]
    Store(#[from] StoreError),
}

impl From<validator::ValidationErrors> for IngestionError {
    fn from(err: validator::ValidationErrors) -> Self {
        IngestionError::Validation(err.to_string())
    }
}

impl From<RecordError> for IngestionError {
    fn from(err: RecordError) -> Self {
        IngestionError::Decode(err.to_string())
    }
}
