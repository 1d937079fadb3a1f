use crate::models::{RecordId, ID_FIELD};
use crate::state::document::{Document, FieldPath};
use crate::state::error::{StoreError, StoreResult};
use crate::state::query::{Filter, Pipeline, ScoredDocument, TextQuery, TextSearchOutcome};
use crate::state::store::DocumentStore;
use crate::state::text_index::{IndexLocation, TextIndex};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use sled::Db;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Reserved tree holding text index definitions (collection -> field paths)
const INDEX_CATALOG_TREE: &str = "__indexes";

/// Document store on the Sled embedded database.
///
/// Each collection is a tree keyed by the 12-byte record id, values are JSON
/// documents. Text indexes are Tantivy indexes, one per collection, kept on
/// disk under `index_root` or in memory for temporary stores.
#[derive(Clone)]
pub struct SledStore {
    db: Arc<Db>,
    index_catalog: sled::Tree,
    index_root: Option<PathBuf>,
    writer_heap_size: usize,
    text_indexes: Arc<RwLock<HashMap<String, Arc<TextIndex>>>>,
}

impl SledStore {
    /// Open (or create) a persistent store at `path`, with text indexes under `index_root`
    pub fn new<P: AsRef<Path>>(
        path: P,
        index_root: impl Into<PathBuf>,
        writer_heap_size: usize,
    ) -> StoreResult<Self> {
        let db = sled::open(path.as_ref()).map_err(|e| {
            StoreError::InitFailed(format!("Failed to open Sled database: {}", e))
        })?;

        tracing::info!(path = ?path.as_ref(), "Initialized Sled document store");
        Self::with_db(db, Some(index_root.into()), writer_heap_size)
    }

    /// Store that lives only as long as the process (temporary Sled, in-RAM indexes)
    pub fn temporary(writer_heap_size: usize) -> StoreResult<Self> {
        let db = sled::Config::new().temporary(true).open().map_err(|e| {
            StoreError::InitFailed(format!("Failed to open temporary Sled database: {}", e))
        })?;

        Self::with_db(db, None, writer_heap_size)
    }

    fn with_db(db: Db, index_root: Option<PathBuf>, writer_heap_size: usize) -> StoreResult<Self> {
        let index_catalog = db.open_tree(INDEX_CATALOG_TREE).map_err(|e| {
            StoreError::InitFailed(format!("Failed to open index catalog: {}", e))
        })?;

        let store = Self {
            db: Arc::new(db),
            index_catalog,
            index_root,
            writer_heap_size,
            text_indexes: Arc::new(RwLock::new(HashMap::new())),
        };

        store.load_text_indexes()?;
        Ok(store)
    }

    fn collection(&self, name: &str) -> StoreResult<sled::Tree> {
        self.db
            .open_tree(name)
            .map_err(|e| StoreError::Database(format!("Failed to open collection '{}': {}", name, e)))
    }

    fn index_location(&self, collection: &str) -> IndexLocation {
        match &self.index_root {
            Some(root) => IndexLocation::Directory(root.join(collection)),
            None => IndexLocation::Ram,
        }
    }

    fn text_index(&self, collection: &str) -> Option<Arc<TextIndex>> {
        self.text_indexes.read().get(collection).cloned()
    }

    /// Reopen text indexes recorded in the catalog.
    ///
    /// An index whose files are gone stays missing until `create_text_index`
    /// rebuilds it from the collection.
    fn load_text_indexes(&self) -> StoreResult<()> {
        for entry in self.index_catalog.iter() {
            let (key, value) = entry?;
            let collection = String::from_utf8_lossy(&key).to_string();
            let paths: Vec<FieldPath> = serde_json::from_slice(&value)?;

            let location = self.index_location(&collection);
            let on_disk = match &location {
                IndexLocation::Directory(dir) => TextIndex::index_exists(dir),
                IndexLocation::Ram => false,
            };

            if !on_disk {
                tracing::warn!(collection = %collection, "Text index files missing, index must be recreated");
                continue;
            }

            let index = TextIndex::open_or_create(&location, &paths, self.writer_heap_size)?;
            self.text_indexes
                .write()
                .insert(collection.clone(), Arc::new(index));
            tracing::info!(collection = %collection, "Opened text index");
        }

        Ok(())
    }

    fn decode(bytes: &[u8]) -> StoreResult<Document> {
        match serde_json::from_slice::<Value>(bytes)? {
            Value::Object(document) => Ok(document),
            other => Err(StoreError::Serialization(format!(
                "stored value is not a document: {}",
                other
            ))),
        }
    }

    /// All documents of a collection in key order
    fn scan(&self, collection: &str) -> StoreResult<Vec<(RecordId, Document)>> {
        let tree = self.collection(collection)?;
        let mut documents = Vec::new();

        for entry in tree.iter() {
            let (key, value) = entry?;
            documents.push((RecordId::from_bytes(&key)?, Self::decode(&value)?));
        }

        Ok(documents)
    }

    /// Flush pending writes to disk
    pub async fn flush(&self) -> StoreResult<()> {
        self.db.flush_async().await?;
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for SledStore {
    async fn insert_one(
        &self,
        collection: &str,
        id: &RecordId,
        document: &Document,
    ) -> StoreResult<()> {
        let mut stored = document.clone();
        stored.insert(ID_FIELD.to_string(), Value::String(id.to_string()));

        let tree = self.collection(collection)?;
        tree.insert(id.as_bytes(), serde_json::to_vec(&stored)?)?;
        tree.flush_async().await?;

        if let Some(index) = self.text_index(collection) {
            index.index_documents(&[(*id, stored)]).await?;
        }

        tracing::debug!(collection = %collection, id = %id, "Document inserted");
        Ok(())
    }

    async fn find_by_id(&self, collection: &str, id: &RecordId) -> StoreResult<Option<Document>> {
        let tree = self.collection(collection)?;
        match tree.get(id.as_bytes())? {
            Some(bytes) => Ok(Some(Self::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn find(
        &self,
        collection: &str,
        filter: &Filter,
        limit: Option<usize>,
    ) -> StoreResult<Vec<Document>> {
        let tree = self.collection(collection)?;
        let limit = limit.unwrap_or(usize::MAX);
        let mut matched = Vec::new();

        for entry in tree.iter() {
            if matched.len() >= limit {
                break;
            }
            let (_, value) = entry?;
            let document = Self::decode(&value)?;
            if filter.matches(&document) {
                matched.push(document);
            }
        }

        Ok(matched)
    }

    async fn text_search(
        &self,
        collection: &str,
        query: &TextQuery,
    ) -> StoreResult<TextSearchOutcome> {
        let index = self
            .text_index(collection)
            .ok_or_else(|| StoreError::IndexNotFound(collection.to_string()))?;

        let tree = self.collection(collection)?;
        let mut outcome = TextSearchOutcome::default();

        // Ranked best-first, so the first `limit` survivors are the top hits
        for (id, score) in index.search(&query.text)? {
            let Some(bytes) = tree.get(id.as_bytes())? else {
                continue;
            };
            let document = Self::decode(&bytes)?;
            if !query.filter.matches(&document) {
                continue;
            }

            outcome.total += 1;
            if outcome.hits.len() < query.limit {
                outcome.hits.push(ScoredDocument { document, score });
            }
        }

        Ok(outcome)
    }

    async fn aggregate(&self, collection: &str, pipeline: &Pipeline) -> StoreResult<Vec<Document>> {
        let documents = self
            .scan(collection)?
            .into_iter()
            .map(|(_, document)| document)
            .collect();

        Ok(pipeline.execute(documents))
    }

    async fn create_text_index(&self, collection: &str, fields: &[FieldPath]) -> StoreResult<()> {
        // A loaded index holds the directory's writer lock
        let loaded = self.text_indexes.write().remove(collection);
        let index = match loaded {
            Some(index) if index.paths() == fields => index,
            stale => {
                drop(stale);
                let location = self.index_location(collection);
                if let IndexLocation::Directory(dir) = &location {
                    if TextIndex::index_exists(dir) && !TextIndex::has_fields(dir, fields) {
                        tracing::warn!(collection = %collection, "Text index fields changed, rebuilding");
                        std::fs::remove_dir_all(dir)?;
                    }
                }
                Arc::new(TextIndex::open_or_create(
                    &location,
                    fields,
                    self.writer_heap_size,
                )?)
            }
        };

        index.clear().await?;
        let indexed = index.index_documents(&self.scan(collection)?).await?;

        self.index_catalog
            .insert(collection.as_bytes(), serde_json::to_vec(fields)?)?;
        self.index_catalog.flush_async().await?;

        self.text_indexes
            .write()
            .insert(collection.to_string(), index);

        tracing::info!(collection = %collection, indexed, "Text index created");
        Ok(())
    }

    async fn list_collections(&self) -> StoreResult<Vec<String>> {
        let mut names: Vec<String> = self
            .db
            .tree_names()
            .into_iter()
            .map(|name| String::from_utf8_lossy(&name).to_string())
            .collect();
        names.sort();
        Ok(names)
    }

    async fn sample_one(&self, collection: &str) -> StoreResult<Option<Document>> {
        let tree = self.collection(collection)?;
        match tree.first()? {
            Some((_, value)) => Ok(Some(Self::decode(&value)?)),
            None => Ok(None),
        }
    }

    async fn close(&self) -> StoreResult<()> {
        let indexes: Vec<Arc<TextIndex>> = self.text_indexes.read().values().cloned().collect();
        for index in indexes {
            index.commit().await?;
        }

        self.flush().await?;
        tracing::info!("Document store closed");
        Ok(())
    }
}
