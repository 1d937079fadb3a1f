//! Scope filters over `technology` and `version`

use crate::state::Filter;

/// Restrict to one technology; absent or empty scope matches everything
pub fn technology_scope(technology: Option<&str>) -> Filter {
    scope(technology, None)
}

/// Equality on whichever of `technology` and `version` is given
pub fn scope(technology: Option<&str>, version: Option<&str>) -> Filter {
    let clauses = [("technology", technology), ("version", version)]
        .into_iter()
        .filter_map(|(field, value)| match value {
            Some(v) if !v.is_empty() => Some(Filter::eq(field, v)),
            _ => None,
        });

    Filter::and(clauses)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: serde_json::Value) -> crate::state::Document {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_absent_scope_matches_all() {
        assert!(technology_scope(None).is_all());
        assert!(technology_scope(Some("")).is_all());
        assert!(scope(None, None).is_all());
    }

    #[test]
    fn test_technology_scope() {
        let filter = technology_scope(Some("rust"));

        assert!(filter.matches(&doc(json!({"technology": "rust"}))));
        assert!(!filter.matches(&doc(json!({"technology": "go"}))));
    }

    #[test]
    fn test_combined_scope() {
        let filter = scope(Some("rust"), Some("1.75"));

        assert!(filter.matches(&doc(json!({"technology": "rust", "version": "1.75"}))));
        assert!(!filter.matches(&doc(json!({"technology": "rust", "version": "latest"}))));

        let version_only = scope(None, Some("latest"));
        assert!(version_only.matches(&doc(json!({"technology": "go", "version": "latest"}))));
    }
}
