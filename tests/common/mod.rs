//! Common test utilities: a call-counting store and seeded knowledge bases

#![allow(dead_code)]

use async_trait::async_trait;
use docs_knowledge_server::{
    config::{IngestionConfig, SearchConfig},
    engine::KnowledgeBase,
    ingestion::IngestionService,
    mcp::McpHandler,
    models::{Record, RecordId},
    state::{
        create_in_memory_store, Document, DocumentStore, FieldPath, Filter, Pipeline, StoreError,
        StoreResult, TextQuery, TextSearchOutcome,
    },
};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub const COLLECTION: &str = "documentation";
pub const HEAP: usize = 50_000_000;

/// Store wrapper counting every call that reaches the backend
pub struct RecordingStore {
    inner: Arc<dyn DocumentStore>,
    calls: AtomicUsize,
}

impl RecordingStore {
    pub fn new(inner: Arc<dyn DocumentStore>) -> Self {
        Self {
            inner,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.calls.store(0, Ordering::SeqCst);
    }

    fn record(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl DocumentStore for RecordingStore {
    async fn insert_one(&self, collection: &str, id: &RecordId, document: &Document) -> StoreResult<()> {
        self.record();
        self.inner.insert_one(collection, id, document).await
    }

    async fn find_by_id(&self, collection: &str, id: &RecordId) -> StoreResult<Option<Document>> {
        self.record();
        self.inner.find_by_id(collection, id).await
    }

    async fn find(&self, collection: &str, filter: &Filter, limit: Option<usize>) -> StoreResult<Vec<Document>> {
        self.record();
        self.inner.find(collection, filter, limit).await
    }

    async fn text_search(&self, collection: &str, query: &TextQuery) -> StoreResult<TextSearchOutcome> {
        self.record();
        self.inner.text_search(collection, query).await
    }

    async fn aggregate(&self, collection: &str, pipeline: &Pipeline) -> StoreResult<Vec<Document>> {
        self.record();
        self.inner.aggregate(collection, pipeline).await
    }

    async fn create_text_index(&self, collection: &str, fields: &[FieldPath]) -> StoreResult<()> {
        self.record();
        self.inner.create_text_index(collection, fields).await
    }

    async fn list_collections(&self) -> StoreResult<Vec<String>> {
        self.record();
        self.inner.list_collections().await
    }

    async fn sample_one(&self, collection: &str) -> StoreResult<Option<Document>> {
        self.record();
        self.inner.sample_one(collection).await
    }

    async fn close(&self) -> StoreResult<()> {
        self.record();
        self.inner.close().await
    }
}

/// Store whose every call fails, as after the database went away
pub struct UnavailableStore;

fn unavailable<T>() -> StoreResult<T> {
    Err(StoreError::Database("database closed".to_string()))
}

#[async_trait]
impl DocumentStore for UnavailableStore {
    async fn insert_one(&self, _: &str, _: &RecordId, _: &Document) -> StoreResult<()> {
        unavailable()
    }

    async fn find_by_id(&self, _: &str, _: &RecordId) -> StoreResult<Option<Document>> {
        unavailable()
    }

    async fn find(&self, _: &str, _: &Filter, _: Option<usize>) -> StoreResult<Vec<Document>> {
        unavailable()
    }

    async fn text_search(&self, _: &str, _: &TextQuery) -> StoreResult<TextSearchOutcome> {
        unavailable()
    }

    async fn aggregate(&self, _: &str, _: &Pipeline) -> StoreResult<Vec<Document>> {
        unavailable()
    }

    async fn create_text_index(&self, _: &str, _: &[FieldPath]) -> StoreResult<()> {
        unavailable()
    }

    async fn list_collections(&self) -> StoreResult<Vec<String>> {
        unavailable()
    }

    async fn sample_one(&self, _: &str) -> StoreResult<Option<Document>> {
        unavailable()
    }

    async fn close(&self) -> StoreResult<()> {
        unavailable()
    }
}

pub fn text_index_fields() -> Vec<FieldPath> {
    vec![
        FieldPath::from("technology"),
        FieldPath::from("content.title"),
        FieldPath::from("content.description"),
    ]
}

/// In-memory store with the text index in place, wrapped for call counting
pub async fn recording_store() -> Arc<RecordingStore> {
    let inner = create_in_memory_store(HEAP).unwrap();
    inner.create_text_index(COLLECTION, &text_index_fields()).await.unwrap();
    Arc::new(RecordingStore::new(inner))
}

pub async fn insert_record(store: &dyn DocumentStore, record: &Record) {
    store
        .insert_one(COLLECTION, &record.id, &record.to_document().unwrap())
        .await
        .unwrap();
}

pub fn record(technology: &str, version: Option<&str>, content: Value) -> Record {
    Record::new(technology, version.map(str::to_string), content)
}

/// A handful of records across three technologies
pub fn sample_records() -> Vec<Record> {
    vec![
        record("tokio", None, json!({"title": "Tokio runtime", "description": "Scheduling tokio tasks on the tokio runtime"})),
        record("tokio", Some("1.35"), json!({"title": "Tokio sync primitives", "description": "Mutex, RwLock and channels"})),
        record("axum", None, json!({"title": "Routing", "description": "Axum handlers run on tokio"})),
        record("serde", None, json!({"title": "Derive macros", "description": "Serialize and Deserialize"})),
        record("serde", Some("1.0"), json!({"title": "Data formats", "category": "reference"})),
    ]
}

pub fn knowledge_base(store: Arc<dyn DocumentStore>) -> KnowledgeBase {
    KnowledgeBase::new(store, COLLECTION, SearchConfig::default())
}

pub fn handler(store: Arc<dyn DocumentStore>) -> McpHandler {
    let knowledge_base = Arc::new(knowledge_base(store.clone()));
    let ingestion =
        Arc::new(IngestionService::new(store, COLLECTION, &IngestionConfig::default()).unwrap());
    McpHandler::new(knowledge_base, ingestion, "docs-knowledge-server")
}

/// Handler over an in-memory store seeded with [`sample_records`]
pub async fn seeded_handler() -> (McpHandler, Vec<Record>) {
    let store = recording_store().await;
    let records = sample_records();
    for record in &records {
        insert_record(store.as_ref(), record).await;
    }
    (handler(store), records)
}
