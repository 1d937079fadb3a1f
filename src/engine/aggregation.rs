//! Group-count pipelines over a validated field

use crate::engine::error::{QueryError, QueryResult};
use crate::engine::validation::validate_field_name;
use crate::state::{
    Document, DocumentStore, Filter, FieldPath, Pipeline, SortOrder, GROUP_COUNT_FIELD,
    GROUP_KEY_FIELD,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// One group of an aggregation result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupCount {
    /// Value of the grouping field, `null` for records without it
    #[serde(rename = "_id")]
    pub value: Value,
    pub count: u64,
}

impl GroupCount {
    fn from_row(row: &Document) -> Self {
        Self {
            value: row.get(GROUP_KEY_FIELD).cloned().unwrap_or(Value::Null),
            count: row.get(GROUP_COUNT_FIELD).and_then(Value::as_u64).unwrap_or(0),
        }
    }
}

/// Build the match -> group-count -> sort-descending pipeline
pub fn group_count_pipeline(group_by: FieldPath, filter: Filter) -> Pipeline {
    Pipeline::new()
        .match_stage(filter)
        .group_count(group_by)
        .sort_by_count(SortOrder::Descending)
}

/// Aggregation engine over one collection
pub struct AggregationEngine {
    store: Arc<dyn DocumentStore>,
    collection: String,
}

impl AggregationEngine {
    pub fn new(store: Arc<dyn DocumentStore>, collection: impl Into<String>) -> Self {
        Self {
            store,
            collection: collection.into(),
        }
    }

    /// Count records per distinct value of `group_by`, largest groups first.
    ///
    /// `filter` is a Mongo-style predicate applied as the match stage; `None`
    /// or JSON `null` matches everything.
    pub async fn aggregate(
        &self,
        group_by: &str,
        filter: Option<&Value>,
    ) -> QueryResult<Vec<GroupCount>> {
        let key = FieldPath::new(validate_field_name(group_by)?);

        let filter = match filter {
            None | Some(Value::Null) => Filter::All,
            Some(predicate) => Filter::from_json(predicate)
                .map_err(|e| QueryError::InvalidArgument(e.to_string()))?,
        };

        tracing::debug!(collection = %self.collection, group_by = %key, "Executing aggregation");

        let pipeline = group_count_pipeline(key, filter);
        let rows = self.store.aggregate(&self.collection, &pipeline).await?;

        Ok(rows.iter().map(GroupCount::from_row).collect())
    }
}
