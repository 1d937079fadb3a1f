//! Templated resource addressing: `documentation.content/{id?}/{technology?}/{version?}`

use crate::engine::error::{QueryError, QueryResult};
use crate::engine::filter::scope;
use crate::models::{Record, RecordId};
use crate::state::DocumentStore;
use serde::Serialize;
use std::sync::Arc;

/// Address of the schema resource
pub const SCHEMA_RESOURCE: &str = "database.schema";

/// Root of the content resource template
pub const CONTENT_RESOURCE: &str = "documentation.content";

/// URI template advertised for content reads
pub const CONTENT_TEMPLATE: &str = "documentation.content/{id?}/{technology?}/{version?}";

/// Message returned for a content read with nothing to look up
pub const INSUFFICIENT_PARAMETERS: &str =
    "Insufficient parameters: provide an id, or a technology and/or version";

/// Parsed content address
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceAddress {
    /// Single record by identifier (not yet validated)
    ById(String),
    /// Records matching technology and/or version
    ByScope {
        technology: Option<String>,
        version: Option<String>,
    },
    /// Nothing to look up
    Unscoped,
}

/// Any readable resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resource {
    Schema,
    Content(ResourceAddress),
}

impl Resource {
    /// Parse a resource URI. Empty segments count as absent.
    pub fn parse(uri: &str) -> QueryResult<Self> {
        if uri == SCHEMA_RESOURCE {
            return Ok(Resource::Schema);
        }

        let rest = match uri.strip_prefix(CONTENT_RESOURCE) {
            Some("") => return Ok(Resource::Content(ResourceAddress::Unscoped)),
            Some(rest) => rest
                .strip_prefix('/')
                .ok_or_else(|| QueryError::UnknownResource(uri.to_string()))?,
            None => return Err(QueryError::UnknownResource(uri.to_string())),
        };

        let segments: Vec<&str> = rest.split('/').collect();
        if segments.len() > 3 {
            return Err(QueryError::UnknownResource(uri.to_string()));
        }

        let segment = |i: usize| {
            segments
                .get(i)
                .filter(|s| !s.is_empty())
                .map(|s| s.to_string())
        };

        let address = match (segment(0), segment(1), segment(2)) {
            (Some(id), _, _) => ResourceAddress::ById(id),
            (None, None, None) => ResourceAddress::Unscoped,
            (None, technology, version) => ResourceAddress::ByScope { technology, version },
        };

        Ok(Resource::Content(address))
    }
}

/// Result of a content read
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ResourceContent {
    Record(Record),
    Records(Vec<Record>),
    Guidance { message: String },
}

/// Dispatches content addresses to an id lookup or a scope lookup
pub struct ResourceRouter {
    store: Arc<dyn DocumentStore>,
    collection: String,
    list_limit: usize,
}

impl ResourceRouter {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        collection: impl Into<String>,
        list_limit: usize,
    ) -> Self {
        Self {
            store,
            collection: collection.into(),
            list_limit,
        }
    }

    pub async fn resolve(&self, address: &ResourceAddress) -> QueryResult<ResourceContent> {
        match address {
            ResourceAddress::ById(raw) => {
                let id: RecordId = raw
                    .parse()
                    .map_err(|_| QueryError::InvalidIdentifier(raw.clone()))?;

                tracing::debug!(collection = %self.collection, id = %id, "Resolving record by id");

                let document = self
                    .store
                    .find_by_id(&self.collection, &id)
                    .await?
                    .ok_or_else(|| QueryError::NotFound(id.to_string()))?;

                let record = Record::from_document(document)
                    .map_err(|e| QueryError::QueryFailed(e.to_string()))?;
                Ok(ResourceContent::Record(record))
            }

            ResourceAddress::ByScope { technology, version } => {
                let filter = scope(technology.as_deref(), version.as_deref());

                tracing::debug!(
                    collection = %self.collection,
                    technology = ?technology,
                    version = ?version,
                    "Resolving records by scope"
                );

                let documents = self
                    .store
                    .find(&self.collection, &filter, Some(self.list_limit))
                    .await?;

                let records = documents
                    .into_iter()
                    .map(Record::from_document)
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|e| QueryError::QueryFailed(e.to_string()))?;
                Ok(ResourceContent::Records(records))
            }

            ResourceAddress::Unscoped => Ok(ResourceContent::Guidance {
                message: INSUFFICIENT_PARAMETERS.to_string(),
            }),
        }
    }
}
