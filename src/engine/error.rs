//! Error types for query and retrieval operations

use crate::state::StoreError;

/// Result type for engine operations
pub type QueryResult<T> = std::result::Result<T, QueryError>;

/// Guidance returned when the text index is missing
pub const INDEX_GUIDANCE: &str = "Full-text search requires a text index over technology, \
content.title and content.description. Create it (set storage.create_text_index = true \
and restart the server) and retry.";

/// Errors surfaced by the query & retrieval engine
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    /// Caller-supplied field or group key outside `[A-Za-z0-9_.]+`
    #[error("Invalid field name '{0}': only letters, digits, underscore and dot are allowed")]
    InvalidFieldName(String),

    /// Identifier is not well-formed for the store
    #[error("Invalid identifier '{0}': expected 24 hexadecimal characters")]
    InvalidIdentifier(String),

    /// No record for the requested identifier
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Backing text index is absent
    #[error("{}", INDEX_GUIDANCE)]
    IndexUnavailable,

    /// Any other store failure
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Malformed caller argument (empty query text, zero limit, bad predicate)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Address matches no known resource
    #[error("Unknown resource: {0}")]
    UnknownResource(String),
}

impl QueryError {
    /// Whether the error was raised before any store call
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            QueryError::InvalidFieldName(_)
                | QueryError::InvalidIdentifier(_)
                | QueryError::InvalidArgument(_)
                | QueryError::UnknownResource(_)
        )
    }
}

impl From<StoreError> for QueryError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::IndexNotFound(collection) => {
                tracing::warn!(collection = %collection, "Text index missing");
                QueryError::IndexUnavailable
            }
            StoreError::InvalidQuery(msg) => QueryError::InvalidArgument(msg),
            other => QueryError::QueryFailed(other.to_string()),
        }
    }
}
