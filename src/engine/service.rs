//! `KnowledgeBase`: the engine components over one shared document store

use crate::config::SearchConfig;
use crate::engine::aggregation::{AggregationEngine, GroupCount};
use crate::engine::error::QueryResult;
use crate::engine::fuzzy::FuzzyMatcher;
use crate::engine::resources::{Resource, ResourceContent, ResourceRouter};
use crate::engine::schema::{SchemaIntrospector, SchemaReport};
use crate::engine::search::{SearchOutcome, TextSearchEngine};
use crate::models::Record;
use crate::state::DocumentStore;
use serde_json::Value;
use std::sync::Arc;

/// Outcome of reading a resource URI
#[derive(Debug, Clone)]
pub enum ResourceReadout {
    Schema(SchemaReport),
    Content(ResourceContent),
}

/// Query & retrieval facade over the shared document store
pub struct KnowledgeBase {
    store: Arc<dyn DocumentStore>,
    search: TextSearchEngine,
    aggregation: AggregationEngine,
    fuzzy: FuzzyMatcher,
    resources: ResourceRouter,
    schema: SchemaIntrospector,
}

impl KnowledgeBase {
    pub fn new(store: Arc<dyn DocumentStore>, collection: &str, limits: SearchConfig) -> Self {
        Self {
            search: TextSearchEngine::new(store.clone(), collection, limits.clone()),
            aggregation: AggregationEngine::new(store.clone(), collection),
            fuzzy: FuzzyMatcher::new(store.clone(), collection, limits.default_limit),
            resources: ResourceRouter::new(store.clone(), collection, limits.resource_list_limit),
            schema: SchemaIntrospector::new(store.clone()),
            store,
        }
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    pub async fn search(
        &self,
        technology: Option<&str>,
        query: &str,
        limit: Option<usize>,
    ) -> QueryResult<SearchOutcome> {
        self.search.search(technology, query, limit).await
    }

    pub async fn aggregate(
        &self,
        group_by: &str,
        filter: Option<&Value>,
    ) -> QueryResult<Vec<GroupCount>> {
        self.aggregation.aggregate(group_by, filter).await
    }

    pub async fn fuzzy_search(
        &self,
        term: &str,
        field: &str,
        limit: Option<usize>,
    ) -> QueryResult<Vec<Record>> {
        self.fuzzy.fuzzy_match(term, field, limit).await
    }

    pub async fn schema(&self) -> QueryResult<SchemaReport> {
        self.schema.introspect().await
    }

    /// Read `database.schema` or a `documentation.content` address
    pub async fn read_resource(&self, uri: &str) -> QueryResult<ResourceReadout> {
        match Resource::parse(uri)? {
            Resource::Schema => Ok(ResourceReadout::Schema(self.schema().await?)),
            Resource::Content(address) => {
                Ok(ResourceReadout::Content(self.resources.resolve(&address).await?))
            }
        }
    }
}
