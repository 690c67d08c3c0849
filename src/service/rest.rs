//! PostgREST-style HTTP data service.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde_json::Value;

use super::data::{DataService, Query};
use super::error::ServiceError;
use crate::config::ServiceConfig;

pub struct RestDataService {
    config: ServiceConfig,
    client: reqwest::Client,
}

impl RestDataService {
    pub fn new(config: ServiceConfig) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ServiceError::Network(e.to_string()))?;
        Ok(Self { config, client })
    }

    fn build_headers(&self) -> Result<HeaderMap, ServiceError> {
        service_headers(&self.config.anon_key, &self.config.anon_key)
    }

    fn collection_url(&self, collection: &str) -> String {
        format!(
            "{}/rest/v1/{}",
            self.config.url.trim_end_matches('/'),
            collection
        )
    }

    /// Query-string pairs for a select: `select=*`, one `field=eq.value` per
    /// filter and an ascending `order`.
    fn query_pairs(query: &Query) -> Vec<(String, String)> {
        let mut pairs = vec![("select".to_string(), "*".to_string())];
        for (field, value) in &query.filters {
            let literal = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            pairs.push((field.clone(), format!("eq.{}", literal)));
        }
        if let Some(order) = &query.order_by {
            pairs.push(("order".to_string(), format!("{}.asc", order)));
        }
        pairs
    }
}

/// `apikey` plus bearer headers shared by the data and auth clients.
pub(crate) fn service_headers(anon_key: &str, bearer: &str) -> Result<HeaderMap, ServiceError> {
    let mut headers = HeaderMap::new();
    headers.insert(
        "apikey",
        HeaderValue::from_str(anon_key).map_err(|e| ServiceError::InvalidRequest(e.to_string()))?,
    );
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", bearer))
            .map_err(|e| ServiceError::InvalidRequest(e.to_string()))?,
    );
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    Ok(headers)
}

#[async_trait]
impl DataService for RestDataService {
    async fn select(&self, query: &Query) -> Result<Vec<Value>, ServiceError> {
        let response = self
            .client
            .get(self.collection_url(&query.collection))
            .headers(self.build_headers()?)
            .query(&Self::query_pairs(query))
            .send()
            .await
            .map_err(|e| ServiceError::Network(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ServiceError::Network(e.to_string()))?;
        if !status.is_success() {
            return Err(ServiceError::from_status(status.as_u16(), &text));
        }

        let rows: Vec<Value> = serde_json::from_str(&text)?;
        tracing::debug!(collection = %query.collection, rows = rows.len(), "Selected rows");
        Ok(rows)
    }

    async fn insert(&self, collection: &str, rows: Vec<Value>) -> Result<(), ServiceError> {
        let mut headers = self.build_headers()?;
        headers.insert("Prefer", HeaderValue::from_static("return=minimal"));

        let response = self
            .client
            .post(self.collection_url(collection))
            .headers(headers)
            .json(&rows)
            .send()
            .await
            .map_err(|e| ServiceError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response
                .text()
                .await
                .map_err(|e| ServiceError::Network(e.to_string()))?;
            return Err(ServiceError::from_status(status.as_u16(), &text));
        }
        tracing::debug!(collection, rows = rows.len(), "Inserted rows");
        Ok(())
    }
}
