//! Query & retrieval engine
//!
//! Turns caller parameters into validated store queries:
//!
//! - **Text search**: relevance-ranked, optionally scoped to a technology
//! - **Aggregation**: match -> group-count -> sort-descending over a validated key
//! - **Fuzzy matching**: case-insensitive character subsequence on one field
//! - **Resource routing**: `documentation.content/{id?}/{technology?}/{version?}`
//! - **Schema introspection**: sampled top-level fields per collection
//!
//! Caller-supplied keys go through [`validate_field_name`] before any store call.

pub mod aggregation;
pub mod error;
pub mod filter;
pub mod fuzzy;
pub mod resources;
pub mod schema;
pub mod search;
pub mod service;
pub mod validation;

pub use aggregation::{group_count_pipeline, AggregationEngine, GroupCount};
pub use error::{QueryError, QueryResult, INDEX_GUIDANCE};
pub use filter::{scope, technology_scope};
pub use fuzzy::{fuzzy_pattern, fuzzy_regex, FuzzyMatcher};
pub use resources::{
    Resource, ResourceAddress, ResourceContent, ResourceRouter, CONTENT_RESOURCE,
    CONTENT_TEMPLATE, INSUFFICIENT_PARAMETERS, SCHEMA_RESOURCE,
};
pub use schema::{SchemaIntrospector, SchemaReport};
pub use search::{SearchHit, SearchOutcome, TextSearchEngine};
pub use service::{KnowledgeBase, ResourceReadout};
pub use validation::validate_field_name;
