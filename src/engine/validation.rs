//! Guard for caller-supplied strings used as query keys

use crate::engine::error::{QueryError, QueryResult};
use once_cell::sync::Lazy;
use regex::Regex;

static FIELD_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9_.]+$").unwrap_or_else(|e| unreachable!("field name pattern: {}", e))
});

/// Return `name` unchanged when it is safe to embed as a field or group key.
///
/// Must be called before any caller-supplied string is used as a key (never a
/// value) in a filter or pipeline.
pub fn validate_field_name(name: &str) -> QueryResult<&str> {
    if FIELD_NAME.is_match(name) {
        Ok(name)
    } else {
        tracing::debug!(field = %name, "Rejected field name");
        Err(QueryError::InvalidFieldName(name.to_string()))
    }
}
