//! Ingestion: fetch a JSON document and store it as a documentation record

pub mod error;
pub mod service;

pub use error::{IngestionError, IngestionResult};
pub use service::{IngestRequest, IngestionService};
