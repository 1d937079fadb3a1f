//! Documentation knowledge base served over JSON-RPC
//!
//! Records describing technology documentation are ingested from URLs, stored
//! in an embedded document store with a full-text index, and queried through
//! tools (search, aggregate, fuzzy search, ingest) and resources (schema and
//! templated content reads).

pub mod config;
pub mod engine;
pub mod error;
pub mod ingestion;
pub mod mcp;
pub mod models;
pub mod state;

pub use error::{AppError, Result};
