//! Approximate matching: the term's characters, in order, anywhere in a field

use crate::engine::error::{QueryError, QueryResult};
use crate::engine::validation::validate_field_name;
use crate::models::Record;
use crate::state::{DocumentStore, Filter, FieldPath};
use regex::{Regex, RegexBuilder};
use std::sync::Arc;

/// Case-insensitive subsequence pattern for `term`.
///
/// Every character is escaped literally, then joined with `.*`.
pub fn fuzzy_pattern(term: &str) -> String {
    let body = term
        .chars()
        .map(|c| regex::escape(c.encode_utf8(&mut [0u8; 4])))
        .collect::<Vec<_>>()
        .join(".*");

    format!("(?is){}", body)
}

/// Compiled form of [`fuzzy_pattern`]
pub fn fuzzy_regex(term: &str) -> QueryResult<Regex> {
    if term.is_empty() {
        return Err(QueryError::InvalidArgument(
            "fuzzy term must not be empty".to_string(),
        ));
    }

    RegexBuilder::new(&fuzzy_pattern(term))
        .build()
        .map_err(|e| QueryError::InvalidArgument(format!("fuzzy term cannot be compiled: {}", e)))
}

/// Fuzzy matcher over one collection
pub struct FuzzyMatcher {
    store: Arc<dyn DocumentStore>,
    collection: String,
    default_limit: usize,
}

impl FuzzyMatcher {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        collection: impl Into<String>,
        default_limit: usize,
    ) -> Self {
        Self {
            store,
            collection: collection.into(),
            default_limit,
        }
    }

    /// Records whose `field` contains the characters of `term` in order.
    ///
    /// Matches are not ranked; the first `limit` in storage order are returned.
    pub async fn fuzzy_match(
        &self,
        term: &str,
        field: &str,
        limit: Option<usize>,
    ) -> QueryResult<Vec<Record>> {
        let path = FieldPath::new(validate_field_name(field)?);
        let limit = match limit {
            Some(0) => {
                return Err(QueryError::InvalidArgument(
                    "limit must be a positive integer".to_string(),
                ))
            }
            Some(n) => n,
            None => self.default_limit,
        };
        let regex = fuzzy_regex(term)?;

        tracing::debug!(collection = %self.collection, field = %path, term = %term, limit, "Executing fuzzy match");

        let documents = self
            .store
            .find(&self.collection, &Filter::Regex(path, regex), Some(limit))
            .await?;

        documents
            .into_iter()
            .map(|doc| Record::from_document(doc).map_err(|e| QueryError::QueryFailed(e.to_string())))
            .collect()
    }
}
