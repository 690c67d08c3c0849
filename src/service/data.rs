//! Collection-oriented data service contract.

use async_trait::async_trait;
use serde_json::Value;

use super::error::ServiceError;

/// A `select` over one collection: equality filters plus an optional
/// ascending order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub collection: String,
    pub filters: Vec<(String, Value)>,
    pub order_by: Option<String>,
}

impl Query {
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            ..Self::default()
        }
    }

    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push((field.into(), value.into()));
        self
    }

    pub fn order(mut self, field: impl Into<String>) -> Self {
        self.order_by = Some(field.into());
        self
    }

    /// True when `row` satisfies every filter.
    pub fn matches(&self, row: &Value) -> bool {
        self.filters
            .iter()
            .all(|(field, expected)| row.get(field) == Some(expected))
    }
}

#[async_trait]
pub trait DataService: Send + Sync {
    async fn select(&self, query: &Query) -> Result<Vec<Value>, ServiceError>;
    async fn insert(&self, collection: &str, rows: Vec<Value>) -> Result<(), ServiceError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_query_matches_all_filters() {
        let query = Query::new("user_progress")
            .eq("session_id", "s1")
            .eq("completed", true);
        assert!(query.matches(&json!({ "session_id": "s1", "completed": true, "score": 90 })));
        assert!(!query.matches(&json!({ "session_id": "s1", "completed": false })));
        assert!(!query.matches(&json!({ "completed": true })));
        assert!(Query::new("challenges").matches(&json!({})));
    }
}
