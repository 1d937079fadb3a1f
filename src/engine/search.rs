//! Relevance-ranked full-text search with an optional technology scope

use crate::config::SearchConfig;
use crate::engine::error::{QueryError, QueryResult};
use crate::engine::filter::technology_scope;
use crate::models::Record;
use crate::state::{DocumentStore, TextQuery};
use serde::Serialize;
use std::sync::Arc;

/// One ranked search hit
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub record: Record,
    pub score: f32,
}

/// Ranked hits, capped at the requested limit, plus the overall match count
#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchOutcome {
    pub hits: Vec<SearchHit>,
    pub total: usize,
}

/// Text search engine over one collection
pub struct TextSearchEngine {
    store: Arc<dyn DocumentStore>,
    collection: String,
    limits: SearchConfig,
}

impl TextSearchEngine {
    pub fn new(store: Arc<dyn DocumentStore>, collection: impl Into<String>, limits: SearchConfig) -> Self {
        Self {
            store,
            collection: collection.into(),
            limits,
        }
    }

    /// Resolve the effective result cap
    fn effective_limit(&self, limit: Option<usize>) -> QueryResult<usize> {
        match limit {
            None => Ok(self.limits.default_limit),
            Some(0) => Err(QueryError::InvalidArgument(
                "limit must be a positive integer".to_string(),
            )),
            Some(n) => Ok(n.min(self.limits.max_results)),
        }
    }

    /// Search records matching `query_text`, best score first.
    ///
    /// An empty `technology` is the same as no scope.
    pub async fn search(
        &self,
        technology: Option<&str>,
        query_text: &str,
        limit: Option<usize>,
    ) -> QueryResult<SearchOutcome> {
        let text = query_text.trim();
        if text.is_empty() {
            return Err(QueryError::InvalidArgument(
                "query text must not be empty".to_string(),
            ));
        }
        let limit = self.effective_limit(limit)?;

        let query = TextQuery {
            text: text.to_string(),
            filter: technology_scope(technology),
            limit,
        };

        tracing::debug!(
            collection = %self.collection,
            query = %text,
            technology = ?technology,
            limit,
            "Executing text search"
        );

        let outcome = self.store.text_search(&self.collection, &query).await?;

        let mut hits = outcome
            .hits
            .into_iter()
            .map(|hit| {
                Record::from_document(hit.document)
                    .map(|record| SearchHit {
                        record,
                        score: hit.score,
                    })
                    .map_err(|e| QueryError::QueryFailed(e.to_string()))
            })
            .collect::<QueryResult<Vec<_>>>()?;

        // Non-increasing score whatever the backend returned
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(limit);

        Ok(SearchOutcome {
            hits,
            total: outcome.total,
        })
    }
}
