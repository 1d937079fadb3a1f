//! Backing document store: schema-less documents in sled collections, with a
//! tantivy text index per collection

pub mod document;
pub mod error;
pub mod factory;
pub mod query;
pub mod sled_store;
pub mod store;
pub mod text_index;

pub use document::{top_level_fields, Document, FieldPath};
pub use error::{StoreError, StoreResult};
pub use factory::{create_in_memory_store, create_store};
pub use query::*;
pub use sled_store::SledStore;
pub use store::*;
pub use text_index::{IndexLocation, TextIndex, TextIndexStats};
