//! Store-native predicates and aggregation pipelines

use crate::state::document::{Document, FieldPath};
use crate::state::error::{StoreError, StoreResult};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::HashMap;

/// Sort order for pipeline stages
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// Ordering comparison used by range predicates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Gt,
    Gte,
    Lt,
    Lte,
}

impl Comparison {
    fn accepts(self, ordering: Ordering) -> bool {
        match self {
            Comparison::Gt => ordering == Ordering::Greater,
            Comparison::Gte => ordering != Ordering::Less,
            Comparison::Lt => ordering == Ordering::Less,
            Comparison::Lte => ordering != Ordering::Greater,
        }
    }
}

/// Predicate over documents
#[derive(Debug, Clone)]
pub enum Filter {
    /// Matches every document
    All,
    Eq(FieldPath, Value),
    Ne(FieldPath, Value),
    Compare(FieldPath, Comparison, Value),
    In(FieldPath, Vec<Value>),
    NotIn(FieldPath, Vec<Value>),
    Exists(FieldPath, bool),
    Regex(FieldPath, Regex),
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Nor(Vec<Filter>),
}

impl Default for Filter {
    fn default() -> Self {
        Filter::All
    }
}

impl Filter {
    /// Equality on a field
    pub fn eq(path: impl Into<FieldPath>, value: impl Into<Value>) -> Self {
        Filter::Eq(path.into(), value.into())
    }

    /// Conjunction, dropping `All` members and flattening nested conjunctions
    pub fn and(filters: impl IntoIterator<Item = Filter>) -> Self {
        let mut members = Vec::new();
        for filter in filters {
            match filter {
                Filter::All => {}
                Filter::And(inner) => members.extend(inner),
                other => members.push(other),
            }
        }

        match members.len() {
            0 => Filter::All,
            1 => members.pop().unwrap_or(Filter::All),
            _ => Filter::And(members),
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Filter::All)
    }

    /// Evaluate against a document
    pub fn matches(&self, document: &Document) -> bool {
        match self {
            Filter::All => true,
            Filter::Eq(path, expected) => path.lookup(document).into_iter().any(|v| v == expected),
            Filter::Ne(path, expected) => !path.lookup(document).into_iter().any(|v| v == expected),
            Filter::Compare(path, cmp, bound) => path
                .lookup(document)
                .into_iter()
                .any(|v| compare_values(v, bound).map_or(false, |o| cmp.accepts(o))),
            Filter::In(path, options) => path
                .lookup(document)
                .into_iter()
                .any(|v| options.contains(v)),
            Filter::NotIn(path, options) => !path
                .lookup(document)
                .into_iter()
                .any(|v| options.contains(v)),
            Filter::Exists(path, wanted) => path.lookup(document).is_empty() != *wanted,
            Filter::Regex(path, regex) => path
                .lookup(document)
                .into_iter()
                .filter_map(Value::as_str)
                .any(|s| regex.is_match(s)),
            Filter::And(filters) => filters.iter().all(|f| f.matches(document)),
            Filter::Or(filters) => filters.iter().any(|f| f.matches(document)),
            Filter::Nor(filters) => !filters.iter().any(|f| f.matches(document)),
        }
    }

    /// Parse a Mongo-style JSON predicate, e.g.
    /// `{"technology": "rust", "version": {"$ne": "latest"}}`.
    ///
    /// Field keys are taken as dotted paths; keys starting with `$` must be a
    /// known operator.
    pub fn from_json(predicate: &Value) -> StoreResult<Self> {
        let object = predicate
            .as_object()
            .ok_or_else(|| invalid(format!("predicate must be an object, got {}", predicate)))?;
        parse_object(object)
    }
}

fn invalid(msg: impl Into<String>) -> StoreError {
    StoreError::InvalidQuery(msg.into())
}

fn parse_object(object: &Map<String, Value>) -> StoreResult<Filter> {
    let mut clauses = Vec::with_capacity(object.len());

    for (key, value) in object {
        let clause = match key.as_str() {
            "$and" => Filter::And(parse_list(key, value)?),
            "$or" => Filter::Or(parse_list(key, value)?),
            "$nor" => Filter::Nor(parse_list(key, value)?),
            op if op.starts_with('$') => return Err(invalid(format!("unknown operator '{}'", op))),
            "" => return Err(invalid("empty field name")),
            field => parse_field(FieldPath::from(field), value)?,
        };
        clauses.push(clause);
    }

    Ok(Filter::and(clauses))
}

fn parse_list(op: &str, value: &Value) -> StoreResult<Vec<Filter>> {
    let items = value
        .as_array()
        .filter(|items| !items.is_empty())
        .ok_or_else(|| invalid(format!("'{}' expects a non-empty array", op)))?;

    items
        .iter()
        .map(|item| {
            item.as_object()
                .ok_or_else(|| invalid(format!("'{}' members must be objects", op)))
                .and_then(parse_object)
        })
        .collect()
}

fn parse_field(path: FieldPath, value: &Value) -> StoreResult<Filter> {
    let operators = match value {
        Value::Object(map) if !map.is_empty() && map.keys().all(|k| k.starts_with('$')) => map,
        // Anything else, including plain objects, is literal equality
        other => return Ok(Filter::Eq(path, other.clone())),
    };

    let case_insensitive = match operators.get("$options") {
        None => false,
        Some(Value::String(opts)) if opts.chars().all(|c| c == 'i') => opts.contains('i'),
        Some(other) => return Err(invalid(format!("unsupported $options {}", other))),
    };

    let mut clauses = Vec::new();
    for (op, operand) in operators {
        let clause = match op.as_str() {
            "$eq" => Filter::Eq(path.clone(), operand.clone()),
            "$ne" => Filter::Ne(path.clone(), operand.clone()),
            "$gt" => Filter::Compare(path.clone(), Comparison::Gt, operand.clone()),
            "$gte" => Filter::Compare(path.clone(), Comparison::Gte, operand.clone()),
            "$lt" => Filter::Compare(path.clone(), Comparison::Lt, operand.clone()),
            "$lte" => Filter::Compare(path.clone(), Comparison::Lte, operand.clone()),
            "$in" => Filter::In(path.clone(), operand_list(op, operand)?),
            "$nin" => Filter::NotIn(path.clone(), operand_list(op, operand)?),
            "$exists" => Filter::Exists(
                path.clone(),
                operand
                    .as_bool()
                    .ok_or_else(|| invalid("'$exists' expects a boolean"))?,
            ),
            "$regex" => {
                let pattern = operand
                    .as_str()
                    .ok_or_else(|| invalid("'$regex' expects a string"))?;
                let regex = RegexBuilder::new(pattern)
                    .case_insensitive(case_insensitive)
                    .build()
                    .map_err(|e| invalid(format!("invalid regex: {}", e)))?;
                Filter::Regex(path.clone(), regex)
            }
            "$options" => continue,
            unknown => return Err(invalid(format!("unknown operator '{}'", unknown))),
        };
        clauses.push(clause);
    }

    Ok(Filter::and(clauses))
}

fn operand_list(op: &str, operand: &Value) -> StoreResult<Vec<Value>> {
    operand
        .as_array()
        .cloned()
        .ok_or_else(|| invalid(format!("'{}' expects an array", op)))
}

fn compare_values(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

/// Full-text query with an additional scope predicate
#[derive(Debug, Clone)]
pub struct TextQuery {
    pub text: String,
    pub filter: Filter,
    pub limit: usize,
}

/// Document returned by a text search with its relevance score
#[derive(Debug, Clone)]
pub struct ScoredDocument {
    pub document: Document,
    pub score: f32,
}

/// Text search result: hits sorted by non-increasing score, capped at the
/// query limit, plus the number of documents that matched overall
#[derive(Debug, Clone, Default)]
pub struct TextSearchOutcome {
    pub hits: Vec<ScoredDocument>,
    pub total: usize,
}

/// Field name of the grouping key in group-count output
pub const GROUP_KEY_FIELD: &str = "_id";

/// Field name of the member count in group-count output
pub const GROUP_COUNT_FIELD: &str = "count";

/// One stage of an aggregation pipeline
#[derive(Debug, Clone)]
pub enum Stage {
    /// Keep documents matching the filter
    Match(Filter),
    /// Replace documents with `{_id: key, count: n}` per distinct key value
    GroupCount { key: FieldPath },
    /// Stable sort on the `count` field
    SortByCount(SortOrder),
    /// Keep the first `n` documents
    Limit(usize),
}

impl Stage {
    fn apply(&self, documents: Vec<Document>) -> Vec<Document> {
        match self {
            Stage::Match(filter) => documents
                .into_iter()
                .filter(|doc| filter.matches(doc))
                .collect(),
            Stage::GroupCount { key } => group_count(key, documents),
            Stage::SortByCount(order) => {
                let mut documents = documents;
                documents.sort_by(|a, b| {
                    let ordering = count_of(a).cmp(&count_of(b));
                    match order {
                        SortOrder::Ascending => ordering,
                        SortOrder::Descending => ordering.reverse(),
                    }
                });
                documents
            }
            Stage::Limit(n) => documents.into_iter().take(*n).collect(),
        }
    }
}

fn count_of(document: &Document) -> u64 {
    document
        .get(GROUP_COUNT_FIELD)
        .and_then(Value::as_u64)
        .unwrap_or(0)
}

/// Groups in first-appearance order so equal counts keep a stable order
fn group_count(key: &FieldPath, documents: Vec<Document>) -> Vec<Document> {
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<(Value, u64)> = Vec::new();

    for document in &documents {
        let value = key.project(document);
        let canonical = value.to_string();

        match positions.get(&canonical) {
            Some(&pos) => groups[pos].1 += 1,
            None => {
                positions.insert(canonical, groups.len());
                groups.push((value, 1));
            }
        }
    }

    groups
        .into_iter()
        .map(|(value, count)| {
            let mut row = Document::new();
            row.insert(GROUP_KEY_FIELD.to_string(), value);
            row.insert(GROUP_COUNT_FIELD.to_string(), Value::from(count));
            row
        })
        .collect()
}

/// Ordered list of aggregation stages
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn match_stage(mut self, filter: Filter) -> Self {
        self.stages.push(Stage::Match(filter));
        self
    }

    pub fn group_count(mut self, key: impl Into<FieldPath>) -> Self {
        self.stages.push(Stage::GroupCount { key: key.into() });
        self
    }

    pub fn sort_by_count(mut self, order: SortOrder) -> Self {
        self.stages.push(Stage::SortByCount(order));
        self
    }

    pub fn limit(mut self, n: usize) -> Self {
        self.stages.push(Stage::Limit(n));
        self
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Run every stage in order over the input documents
    pub fn execute(&self, documents: Vec<Document>) -> Vec<Document> {
        self.stages
            .iter()
            .fold(documents, |docs, stage| stage.apply(docs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_parse_literal_equality() {
        let filter = Filter::from_json(&json!({"technology": "rust"})).unwrap();

        assert!(filter.matches(&doc(json!({"technology": "rust"}))));
        assert!(!filter.matches(&doc(json!({"technology": "go"}))));
    }

    #[test]
    fn test_parse_operators() {
        let filter = Filter::from_json(&json!({
            "version": {"$ne": "latest"},
            "content.pages": {"$gte": 10, "$lt": 20}
        }))
        .unwrap();

        assert!(filter.matches(&doc(json!({"version": "1.0", "content": {"pages": 12}}))));
        assert!(!filter.matches(&doc(json!({"version": "latest", "content": {"pages": 12}}))));
        assert!(!filter.matches(&doc(json!({"version": "1.0", "content": {"pages": 20}}))));
    }

    #[test]
    fn test_parse_logical_operators() {
        let filter = Filter::from_json(&json!({
            "$or": [{"technology": "rust"}, {"tags": {"$in": ["wasm"]}}]
        }))
        .unwrap();

        assert!(filter.matches(&doc(json!({"technology": "rust"}))));
        assert!(filter.matches(&doc(json!({"technology": "go", "tags": ["go", "wasm"]}))));
        assert!(!filter.matches(&doc(json!({"technology": "go", "tags": ["go"]}))));
    }

    #[test]
    fn test_regex_with_options() {
        let filter = Filter::from_json(&json!({
            "content.title": {"$regex": "^own", "$options": "i"}
        }))
        .unwrap();

        assert!(filter.matches(&doc(json!({"content": {"title": "Ownership"}}))));
        assert!(!filter.matches(&doc(json!({"content": {"title": "Borrowing"}}))));
    }

    #[test]
    fn test_exists() {
        let filter = Filter::from_json(&json!({"content.title": {"$exists": false}})).unwrap();

        assert!(filter.matches(&doc(json!({"content": {}}))));
        assert!(!filter.matches(&doc(json!({"content": {"title": "x"}}))));
    }

    #[test]
    fn test_malformed_predicates_rejected() {
        assert!(Filter::from_json(&json!("technology")).is_err());
        assert!(Filter::from_json(&json!({"$where": "1 == 1"})).is_err());
        assert!(Filter::from_json(&json!({"technology": {"$bogus": 1}})).is_err());
        assert!(Filter::from_json(&json!({"$or": []})).is_err());
        assert!(Filter::from_json(&json!({"tags": {"$in": "rust"}})).is_err());
    }

    #[test]
    fn test_empty_predicate_matches_everything() {
        let filter = Filter::from_json(&json!({})).unwrap();
        assert!(filter.is_all());
    }

    #[test]
    fn test_and_flattens() {
        let filter = Filter::and(vec![
            Filter::All,
            Filter::eq("technology", "rust"),
            Filter::and(vec![Filter::eq("version", "1.0"), Filter::All]),
        ]);

        match filter {
            Filter::And(members) => assert_eq!(members.len(), 2),
            other => panic!("expected conjunction, got {:?}", other),
        }
    }

    #[test]
    fn test_group_count_pipeline() {
        let documents = vec![
            doc(json!({"technology": "b"})),
            doc(json!({"technology": "a"})),
            doc(json!({"technology": "a"})),
            doc(json!({"version": "1"})),
        ];

        let rows = Pipeline::new()
            .match_stage(Filter::All)
            .group_count("technology")
            .sort_by_count(SortOrder::Descending)
            .execute(documents);

        let summary: Vec<(Value, u64)> = rows
            .iter()
            .map(|r| (r["_id"].clone(), r["count"].as_u64().unwrap()))
            .collect();

        assert_eq!(
            summary,
            vec![(json!("a"), 2), (json!("b"), 1), (Value::Null, 1)]
        );
    }

    #[test]
    fn test_sort_by_count_is_stable_for_ties() {
        let documents = vec![
            doc(json!({"k": "x"})),
            doc(json!({"k": "y"})),
            doc(json!({"k": "z"})),
        ];

        let pipeline = Pipeline::new()
            .group_count("k")
            .sort_by_count(SortOrder::Descending)
            .limit(2);

        let first = pipeline.execute(documents.clone());
        let second = pipeline.execute(documents);

        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
        assert_eq!(first[0]["_id"], json!("x"));
    }
}
