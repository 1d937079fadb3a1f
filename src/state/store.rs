use crate::models::RecordId;
use crate::state::document::{Document, FieldPath};
use crate::state::error::StoreResult;
use crate::state::query::{Filter, Pipeline, TextQuery, TextSearchOutcome};
use async_trait::async_trait;

/// Collection name prefixes reserved for store bookkeeping
pub const RESERVED_COLLECTION_PREFIXES: &[&str] = &["system.", "__"];

/// Whether a collection name is reserved for internal use
pub fn is_reserved_collection(name: &str) -> bool {
    RESERVED_COLLECTION_PREFIXES
        .iter()
        .any(|prefix| name.starts_with(prefix))
}

/// Trait for the backing document store.
///
/// One long-lived handle is shared by every component; implementations must be
/// safe to call concurrently.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Store a new document under the given identifier
    async fn insert_one(&self, collection: &str, id: &RecordId, document: &Document)
        -> StoreResult<()>;

    /// Fetch a document by identifier
    async fn find_by_id(&self, collection: &str, id: &RecordId) -> StoreResult<Option<Document>>;

    /// Documents matching a filter, in storage order
    async fn find(
        &self,
        collection: &str,
        filter: &Filter,
        limit: Option<usize>,
    ) -> StoreResult<Vec<Document>>;

    /// Relevance-ranked full-text search, restricted by the query's filter
    async fn text_search(&self, collection: &str, query: &TextQuery)
        -> StoreResult<TextSearchOutcome>;

    /// Run an aggregation pipeline over a collection
    async fn aggregate(&self, collection: &str, pipeline: &Pipeline) -> StoreResult<Vec<Document>>;

    /// Create (or rebuild) the text index of a collection over the given fields
    async fn create_text_index(&self, collection: &str, fields: &[FieldPath]) -> StoreResult<()>;

    /// Names of all collections, reserved ones included
    async fn list_collections(&self) -> StoreResult<Vec<String>>;

    /// One arbitrary document of a collection
    async fn sample_one(&self, collection: &str) -> StoreResult<Option<Document>>;

    /// Flush pending writes and release resources
    async fn close(&self) -> StoreResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserved_collections() {
        assert!(is_reserved_collection("system.indexes"));
        assert!(is_reserved_collection("__indexes"));
        assert!(is_reserved_collection("__sled__default"));
        assert!(!is_reserved_collection("documentation"));
    }
}
