//! Tool catalogue, typed arguments and result rendering

use crate::engine::{GroupCount, SearchOutcome};
use crate::models::Record;
use serde::Deserialize;
use serde_json::{json, Value};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};
use validator::Validate;

/// Tools callable through `tools/call`
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display, EnumIter)]
#[strum(serialize_all = "kebab-case")]
pub enum ToolName {
    SearchDocumentation,
    AggregateDocumentation,
    FuzzySearchDocumentation,
    IngestDocumentation,
}

impl ToolName {
    pub fn description(&self) -> &'static str {
        match self {
            ToolName::SearchDocumentation => {
                "Full-text search over documentation records, ranked by relevance"
            }
            ToolName::AggregateDocumentation => {
                "Count documentation records per distinct value of a field, largest groups first"
            }
            ToolName::FuzzySearchDocumentation => {
                "Find records whose field contains the term's characters in order, case-insensitively"
            }
            ToolName::IngestDocumentation => {
                "Fetch a JSON document from a URL and store it as a documentation record"
            }
        }
    }

    pub fn input_schema(&self) -> Value {
        match self {
            ToolName::SearchDocumentation => json!({
                "type": "object",
                "properties": {
                    "technology": { "type": "string", "description": "Restrict results to one technology" },
                    "query": { "type": "string", "description": "Search text" },
                    "limit": { "type": "integer", "minimum": 1, "default": 10, "description": "Maximum results" }
                },
                "required": ["query"]
            }),
            ToolName::AggregateDocumentation => json!({
                "type": "object",
                "properties": {
                    "groupBy": { "type": "string", "description": "Field to group by, e.g. technology or content.category" },
                    "filter": { "type": "object", "description": "Match predicate applied before grouping" }
                },
                "required": ["groupBy"]
            }),
            ToolName::FuzzySearchDocumentation => json!({
                "type": "object",
                "properties": {
                    "term": { "type": "string", "description": "Characters to look for, in order" },
                    "field": { "type": "string", "description": "Field to match, e.g. content.title" },
                    "limit": { "type": "integer", "minimum": 1, "default": 10, "description": "Maximum results" }
                },
                "required": ["term", "field"]
            }),
            ToolName::IngestDocumentation => json!({
                "type": "object",
                "properties": {
                    "url": { "type": "string", "description": "URL of a JSON document" },
                    "technology": { "type": "string", "description": "Technology the document describes" },
                    "version": { "type": "string", "description": "Documented version, defaults to latest" }
                },
                "required": ["url", "technology"]
            }),
        }
    }

    /// `tools/list` entries
    pub fn definitions() -> Vec<Value> {
        ToolName::iter()
            .map(|tool| {
                json!({
                    "name": tool.to_string(),
                    "description": tool.description(),
                    "inputSchema": tool.input_schema(),
                })
            })
            .collect()
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SearchArgs {
    #[serde(default)]
    pub technology: Option<String>,

    #[validate(length(min = 1))]
    pub query: String,

    #[serde(default)]
    #[validate(range(min = 1))]
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AggregateArgs {
    #[validate(length(min = 1))]
    pub group_by: String,

    #[serde(default)]
    pub filter: Option<Value>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct FuzzySearchArgs {
    #[validate(length(min = 1))]
    pub term: String,

    #[validate(length(min = 1))]
    pub field: String,

    #[serde(default)]
    #[validate(range(min = 1))]
    pub limit: Option<usize>,
}

/// Successful tool result carrying text
pub fn text_result(text: impl Into<String>) -> Value {
    json!({
        "content": [{ "type": "text", "text": text.into() }],
        "isError": false
    })
}

/// Failed tool result: error flag plus message
pub fn error_result(message: impl Into<String>) -> Value {
    json!({
        "content": [{ "type": "text", "text": message.into() }],
        "isError": true
    })
}

/// Human-readable ranked summary
pub fn render_search(query: &str, outcome: &SearchOutcome) -> String {
    if outcome.hits.is_empty() {
        return format!("No documentation found for \"{}\".", query);
    }

    let mut text = format!(
        "Found {} result(s) for \"{}\", showing {}:\n",
        outcome.total,
        query,
        outcome.hits.len()
    );

    for (rank, hit) in outcome.hits.iter().enumerate() {
        let record = &hit.record;
        text.push_str(&format!(
            "\n{}. {} {} (score {:.3})\n   id: {}\n",
            rank + 1,
            record.technology,
            record.version,
            hit.score,
            record.id
        ));
        if let Some(title) = record.title() {
            text.push_str(&format!("   title: {}\n", title));
        }
        if let Some(description) = record.description() {
            text.push_str(&format!("   description: {}\n", description));
        }
    }

    text
}

pub fn render_groups(groups: &[GroupCount]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(groups)
}

pub fn render_records(records: &[Record]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(records)
}
