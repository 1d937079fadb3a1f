//! Full-text relevance index powered by Tantivy
//!
//! Each indexed collection owns one index. Documents are indexed by their
//! `_id` plus one TEXT field per configured source path (`technology`,
//! `content.title`, ...). Searches return document ids with BM25 scores.

use crate::models::{RecordId, ID_FIELD};
use crate::state::document::{Document, FieldPath};
use crate::state::error::{StoreError, StoreResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tantivy::collector::{Count, TopDocs};
use tantivy::query::QueryParser;
use tantivy::schema::{Field, Schema, Value, STORED, STRING, TEXT};
use tantivy::{Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, Term};
use tokio::sync::Mutex;

/// Index statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextIndexStats {
    /// Number of indexed documents
    pub total_documents: u64,

    /// Number of segments
    pub num_segments: usize,
}

/// Where the index lives
#[derive(Debug, Clone)]
pub enum IndexLocation {
    /// On disk, under the given directory
    Directory(PathBuf),
    /// In memory, lost on drop
    Ram,
}

/// Text index of a single collection
pub struct TextIndex {
    index: Index,
    reader: IndexReader,
    writer: Mutex<IndexWriter>,
    id_field: Field,
    fields: Vec<(FieldPath, Field)>,
}

/// Build the index schema for a set of source paths
fn build_schema(paths: &[FieldPath]) -> Schema {
    let mut schema_builder = Schema::builder();

    // Record id - stored, indexed as a single token for deletes
    schema_builder.add_text_field(ID_FIELD, STRING | STORED);

    for path in paths {
        schema_builder.add_text_field(&path.flat_name(), TEXT);
    }

    schema_builder.build()
}

impl TextIndex {
    /// Open the index at `location`, creating it when absent
    pub fn open_or_create(
        location: &IndexLocation,
        paths: &[FieldPath],
        writer_heap_size: usize,
    ) -> StoreResult<Self> {
        let schema = build_schema(paths);

        let index = match location {
            IndexLocation::Ram => Index::create_in_ram(schema),
            IndexLocation::Directory(dir) => {
                std::fs::create_dir_all(dir).map_err(|e| {
                    StoreError::InitFailed(format!("Failed to create index directory: {}", e))
                })?;

                if Self::index_exists(dir) {
                    Index::open_in_dir(dir).map_err(|e| {
                        StoreError::InitFailed(format!("Failed to open existing index: {}", e))
                    })?
                } else {
                    Index::create_in_dir(dir, schema).map_err(|e| {
                        StoreError::InitFailed(format!("Failed to create new index: {}", e))
                    })?
                }
            }
        };

        Self::from_index(index, paths, writer_heap_size)
    }

    /// Whether an index exists at the given path
    pub fn index_exists(path: &Path) -> bool {
        path.join("meta.json").exists()
    }

    /// Whether the index at `path` covers exactly the given source paths
    pub fn has_fields(path: &Path, paths: &[FieldPath]) -> bool {
        let Ok(index) = Index::open_in_dir(path) else {
            return false;
        };
        let schema = index.schema();

        schema.fields().count() == paths.len() + 1
            && schema.get_field(ID_FIELD).is_ok()
            && paths.iter().all(|p| schema.get_field(&p.flat_name()).is_ok())
    }

    fn from_index(index: Index, paths: &[FieldPath], writer_heap_size: usize) -> StoreResult<Self> {
        let schema = index.schema();

        let id_field = schema
            .get_field(ID_FIELD)
            .map_err(|e| StoreError::InitFailed(format!("Index has no id field: {}", e)))?;

        let fields = paths
            .iter()
            .map(|path| {
                schema
                    .get_field(&path.flat_name())
                    .map(|field| (path.clone(), field))
                    .map_err(|e| {
                        StoreError::InitFailed(format!("Index is missing field '{}': {}", path, e))
                    })
            })
            .collect::<StoreResult<Vec<_>>>()?;

        let writer = index
            .writer(writer_heap_size)
            .map_err(|e| StoreError::InitFailed(format!("Failed to create writer: {}", e)))?;

        // Reloaded explicitly after every commit so writes are visible at once
        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()
            .map_err(|e| StoreError::InitFailed(format!("Failed to create reader: {}", e)))?;

        Ok(Self {
            index,
            reader,
            writer: Mutex::new(writer),
            id_field,
            fields,
        })
    }

    /// Source paths covered by this index
    pub fn paths(&self) -> Vec<FieldPath> {
        self.fields.iter().map(|(path, _)| path.clone()).collect()
    }

    fn to_tantivy_doc(&self, id: &RecordId, document: &Document) -> TantivyDocument {
        let mut doc = TantivyDocument::new();
        doc.add_text(self.id_field, id.to_string());

        for (path, field) in &self.fields {
            for value in path.lookup(document) {
                if let Some(text) = value.as_str() {
                    doc.add_text(*field, text);
                }
            }
        }

        doc
    }

    /// Index documents, replacing any earlier version with the same id
    pub async fn index_documents(&self, documents: &[(RecordId, Document)]) -> StoreResult<usize> {
        let mut writer = self.writer.lock().await;
        let mut indexed = 0;

        for (id, document) in documents {
            writer.delete_term(Term::from_field_text(self.id_field, &id.to_string()));
            writer
                .add_document(self.to_tantivy_doc(id, document))
                .map_err(|e| StoreError::Index(format!("Failed to add document {}: {}", id, e)))?;
            indexed += 1;
        }

        writer
            .commit()
            .map_err(|e| StoreError::Index(format!("Failed to commit: {}", e)))?;
        self.reader.reload()?;

        Ok(indexed)
    }

    /// Drop every indexed document
    pub async fn clear(&self) -> StoreResult<()> {
        let mut writer = self.writer.lock().await;
        writer
            .delete_all_documents()
            .map_err(|e| StoreError::Index(format!("Failed to clear index: {}", e)))?;
        writer
            .commit()
            .map_err(|e| StoreError::Index(format!("Failed to commit clear: {}", e)))?;
        self.reader.reload()?;
        Ok(())
    }

    /// Commit pending changes
    pub async fn commit(&self) -> StoreResult<()> {
        let mut writer = self.writer.lock().await;
        writer
            .commit()
            .map_err(|e| StoreError::Index(format!("Failed to commit: {}", e)))?;
        self.reader.reload()?;
        Ok(())
    }

    /// Every document matching `text`, best score first.
    ///
    /// Query syntax errors are tolerated: whatever parses is searched.
    pub fn search(&self, text: &str) -> StoreResult<Vec<(RecordId, f32)>> {
        let searcher = self.reader.searcher();
        let num_docs = searcher.num_docs() as usize;
        if num_docs == 0 {
            return Ok(Vec::new());
        }

        let default_fields = self.fields.iter().map(|(_, field)| *field).collect();
        let parser = QueryParser::for_index(&self.index, default_fields);
        let (query, errors) = parser.parse_query_lenient(text);
        if !errors.is_empty() {
            tracing::debug!(query = %text, errors = errors.len(), "Text query parsed leniently");
        }

        let top_docs = searcher
            .search(&*query, &TopDocs::with_limit(num_docs))
            .map_err(|e| StoreError::Index(format!("Search execution failed: {}", e)))?;

        let mut hits = Vec::with_capacity(top_docs.len());
        for (score, address) in top_docs {
            let doc: TantivyDocument = searcher
                .doc(address)
                .map_err(|e| StoreError::Index(format!("Failed to retrieve doc: {}", e)))?;

            let id = doc
                .get_first(self.id_field)
                .and_then(|v| v.as_str())
                .ok_or_else(|| StoreError::Index("Indexed document has no id".to_string()))?;

            hits.push((id.parse::<RecordId>()?, score));
        }

        Ok(hits)
    }

    /// Get index statistics
    pub fn stats(&self) -> StoreResult<TextIndexStats> {
        let searcher = self.reader.searcher();
        let total_documents = searcher
            .search(&tantivy::query::AllQuery, &Count)
            .map_err(|e| StoreError::Index(format!("Failed to count documents: {}", e)))?
            as u64;

        Ok(TextIndexStats {
            total_documents,
            num_segments: searcher.segment_readers().len(),
        })
    }
}
