use std::cmp::Ordering;
use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;

use super::data::{DataService, Query};
use super::error::ServiceError;

/// In-process [`DataService`] keeping every collection in memory.
#[derive(Default)]
pub struct MemoryDataService {
    data: tokio::sync::RwLock<HashMap<String, Vec<Value>>>,
}

impl MemoryDataService {
    pub fn new() -> Self {
        Self {
            data: tokio::sync::RwLock::new(HashMap::new()),
        }
    }

    /// Appends rows to a collection as-is.
    pub async fn seed(&self, collection: &str, rows: Vec<Value>) {
        self.data
            .write()
            .await
            .entry(collection.to_string())
            .or_default()
            .extend(rows);
    }

    pub async fn rows(&self, collection: &str) -> Vec<Value> {
        self.data
            .read()
            .await
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl DataService for MemoryDataService {
    async fn select(&self, query: &Query) -> Result<Vec<Value>, ServiceError> {
        let data = self.data.read().await;
        let mut rows: Vec<Value> = data
            .get(&query.collection)
            .map(|rows| rows.iter().filter(|r| query.matches(r)).cloned().collect())
            .unwrap_or_default();
        if let Some(field) = &query.order_by {
            rows.sort_by(|a, b| compare_values(a.get(field), b.get(field)));
        }
        Ok(rows)
    }

    async fn insert(&self, collection: &str, rows: Vec<Value>) -> Result<(), ServiceError> {
        let mut stored = Vec::with_capacity(rows.len());
        for mut row in rows {
            let object = row.as_object_mut().ok_or_else(|| {
                ServiceError::InvalidRequest(format!("{} rows must be objects", collection))
            })?;
            object
                .entry("id")
                .or_insert_with(|| Value::String(uuid::Uuid::new_v4().to_string()));
            stored.push(row);
        }
        self.data
            .write()
            .await
            .entry(collection.to_string())
            .or_default()
            .extend(stored);
        Ok(())
    }
}

/// Missing values sort first, numbers numerically, everything else by text.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let x = x.as_f64().unwrap_or_default();
            let y = y.as_f64().unwrap_or_default();
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(x), Some(y)) => x.to_string().cmp(&y.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_select_filters_and_orders() {
        let service = MemoryDataService::new();
        service
            .seed(
                "challenges",
                vec![
                    json!({ "id": "b", "level": "beginner", "order_index": 2 }),
                    json!({ "id": "x", "level": "advanced", "order_index": 1 }),
                    json!({ "id": "a", "level": "beginner", "order_index": 1 }),
                    json!({ "id": "c", "level": "beginner", "order_index": 10 }),
                ],
            )
            .await;

        let rows = service
            .select(&Query::new("challenges").eq("level", "beginner").order("order_index"))
            .await
            .unwrap();
        let ids: Vec<&str> = rows.iter().filter_map(|r| r["id"].as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_insert_assigns_ids() {
        let service = MemoryDataService::new();
        service
            .insert("user_progress", vec![json!({ "session_id": "s1" })])
            .await
            .unwrap();
        let rows = service.rows("user_progress").await;
        assert_eq!(rows.len(), 1);
        assert!(rows[0]["id"].as_str().is_some());
    }

    #[tokio::test]
    async fn test_insert_rejects_non_objects() {
        let service = MemoryDataService::new();
        let err = service.insert("user_progress", vec![json!(1)]).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidRequest(_)));
        assert!(service.rows("user_progress").await.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_collection_is_empty() {
        let service = MemoryDataService::new();
        assert!(service.select(&Query::new("nothing")).await.unwrap().is_empty());
    }
}
