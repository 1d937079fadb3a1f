//! Sampling-based schema report: one document per collection

use crate::engine::error::QueryResult;
use crate::models::ID_FIELD;
use crate::state::{is_reserved_collection, top_level_fields, DocumentStore};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Collection name to observed top-level field names
pub type SchemaReport = BTreeMap<String, Vec<String>>;

pub struct SchemaIntrospector {
    store: Arc<dyn DocumentStore>,
}

impl SchemaIntrospector {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Fields of one sampled document per non-reserved collection.
    ///
    /// Heterogeneous collections are reported from whichever document was
    /// sampled; an empty collection reports only the id field.
    pub async fn introspect(&self) -> QueryResult<SchemaReport> {
        let mut report = SchemaReport::new();

        for collection in self.store.list_collections().await? {
            if is_reserved_collection(&collection) {
                continue;
            }

            let fields = match self.store.sample_one(&collection).await? {
                Some(document) => top_level_fields(&document),
                None => vec![ID_FIELD.to_string()],
            };
            report.insert(collection, fields);
        }

        tracing::debug!(collections = report.len(), "Schema introspected");
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Record, RecordId};
    use crate::state::create_in_memory_store;
    use serde_json::json;

    #[tokio::test]
    async fn test_reports_sampled_fields() {
        let store = create_in_memory_store(50_000_000).unwrap();
        let record = Record::new("rust", None, json!({"title": "Book"}));
        store
            .insert_one("documentation", &record.id, &record.to_document().unwrap())
            .await
            .unwrap();
        store
            .insert_one("notes", &RecordId::new(), json!({"body": "x"}).as_object().unwrap())
            .await
            .unwrap();

        let report = SchemaIntrospector::new(store).introspect().await.unwrap();

        assert_eq!(
            report["documentation"],
            vec!["_id", "content", "lastUpdated", "tags", "technology", "version"]
        );
        assert_eq!(report["notes"], vec!["_id", "body"]);
        assert!(report.keys().all(|name| !name.starts_with("__")));
    }

    #[tokio::test]
    async fn test_empty_collection_reports_id_only() {
        let store = create_in_memory_store(50_000_000).unwrap();
        store
            .create_text_index("documentation", &["technology".into()])
            .await
            .unwrap();

        let report = SchemaIntrospector::new(store).introspect().await.unwrap();
        assert_eq!(report["documentation"], vec!["_id"]);
    }
}
