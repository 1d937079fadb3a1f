//! Schema-less document representation and dotted field-path traversal

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// A stored document: a JSON object whose `_id` holds the record identifier
pub type Document = Map<String, Value>;

/// Dotted path into a document, e.g. `content.title`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldPath(String);

impl FieldPath {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('.')
    }

    /// Name usable as a flat index field (`content.title` -> `content_title`)
    pub fn flat_name(&self) -> String {
        self.0.replace('.', "_")
    }

    /// Every value reachable at this path.
    ///
    /// Arrays met along the way fan out over their elements; an array found at
    /// the end of the path yields both the array and each of its elements.
    pub fn lookup<'a>(&self, document: &'a Document) -> Vec<&'a Value> {
        let segments: Vec<&str> = self.segments().collect();
        let mut out = Vec::new();

        if let Some((head, rest)) = segments.split_first() {
            if let Some(child) = document.get(*head) {
                collect(child, rest, &mut out);
            }
        }

        out
    }

    /// Single value at this path, `Null` when absent. Used as a grouping key.
    pub fn project(&self, document: &Document) -> Value {
        let segments: Vec<&str> = self.segments().collect();

        match segments.split_first() {
            Some((head, rest)) => document
                .get(*head)
                .and_then(|child| project(child, rest))
                .unwrap_or(Value::Null),
            None => Value::Null,
        }
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FieldPath {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

impl From<String> for FieldPath {
    fn from(path: String) -> Self {
        Self::new(path)
    }
}

fn collect<'a>(value: &'a Value, segments: &[&str], out: &mut Vec<&'a Value>) {
    match segments.split_first() {
        None => {
            out.push(value);
            if let Value::Array(items) = value {
                out.extend(items.iter());
            }
        }
        Some((head, rest)) => match value {
            Value::Object(map) => {
                if let Some(child) = map.get(*head) {
                    collect(child, rest, out);
                }
            }
            Value::Array(items) => {
                for item in items {
                    collect(item, segments, out);
                }
            }
            _ => {}
        },
    }
}

fn project(value: &Value, segments: &[&str]) -> Option<Value> {
    match segments.split_first() {
        None => Some(value.clone()),
        Some((head, rest)) => match value {
            Value::Object(map) => map.get(*head).and_then(|child| project(child, rest)),
            Value::Array(items) => Some(Value::Array(
                items.iter().filter_map(|item| project(item, segments)).collect(),
            )),
            _ => None,
        },
    }
}

/// Top-level field names of a document, sorted
pub fn top_level_fields(document: &Document) -> Vec<String> {
    let mut fields: Vec<String> = document.keys().cloned().collect();
    fields.sort();
    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => panic!("test document must be an object"),
        }
    }

    #[test]
    fn test_lookup_nested_field() {
        let document = doc(json!({"content": {"title": "Ownership"}}));
        let path = FieldPath::from("content.title");

        assert_eq!(path.lookup(&document), vec![&json!("Ownership")]);
    }

    #[test]
    fn test_lookup_fans_out_over_arrays() {
        let document = doc(json!({
            "tags": ["rust", "async"],
            "content": {"sections": [{"name": "a"}, {"name": "b"}]}
        }));

        let tags = FieldPath::from("tags").lookup(&document);
        assert_eq!(tags.len(), 3);
        assert!(tags.contains(&&json!("async")));

        let names = FieldPath::from("content.sections.name").lookup(&document);
        assert_eq!(names, vec![&json!("a"), &json!("b")]);
    }

    #[test]
    fn test_lookup_missing_field() {
        let document = doc(json!({"technology": "rust"}));
        assert!(FieldPath::from("content.title").lookup(&document).is_empty());
    }

    #[test]
    fn test_project_missing_is_null() {
        let document = doc(json!({"technology": "rust"}));

        assert_eq!(FieldPath::from("technology").project(&document), json!("rust"));
        assert_eq!(FieldPath::from("version").project(&document), Value::Null);
    }

    #[test]
    fn test_flat_name() {
        assert_eq!(FieldPath::from("content.description").flat_name(), "content_description");
    }
}
