//! OpenSearch client implementation.
//!
//! This module provides the concrete implementation of `SearchEngineClient`
//! using the OpenSearch Rust client.

use async_trait::async_trait;
use opensearch::cluster::ClusterHealthParts;
use opensearch::http::request::JsonBody;
use opensearch::http::response::Response;
use opensearch::http::transport::{SingleNodeConnectionPool, TransportBuilder};
use opensearch::indices::{
    IndicesCreateParts, IndicesDeleteParts, IndicesExistsAliasParts, IndicesExistsParts,
    IndicesGetAliasParts, IndicesPutAliasParts, IndicesRefreshParts,
};
use opensearch::params::Slices;
use opensearch::tasks::TasksGetParts;
use opensearch::{BulkParts, CountParts, OpenSearch};
use serde_json::{json, Value};
use tracing::{debug, info};
use url::Url;

use crate::errors::SearchError;
use crate::interfaces::SearchEngineClient;
use crate::types::BulkResponse;

/// OpenSearch client implementation.
///
/// A thin transport wrapper: every method issues one request and maps the
/// response into the crate's wire types. Batching, retry, and alias
/// bookkeeping live in the callers that hold this client.
pub struct OpenSearchClient {
    client: OpenSearch,
}

impl OpenSearchClient {
    /// Create a new OpenSearch client connected to the specified URL.
    ///
    /// # Arguments
    ///
    /// * `url` - The OpenSearch server URL (e.g., "http://localhost:9200")
    ///
    /// # Returns
    ///
    /// * `Ok(OpenSearchClient)` - A new client instance
    /// * `Err(SearchError)` - If connection setup fails
    pub async fn new(url: &str) -> Result<Self, SearchError> {
        let parsed_url = Url::parse(url).map_err(|e| SearchError::connection(e.to_string()))?;

        let conn_pool = SingleNodeConnectionPool::new(parsed_url);
        let transport = TransportBuilder::new(conn_pool)
            .disable_proxy()
            .build()
            .map_err(|e| SearchError::connection(e.to_string()))?;

        let client = OpenSearch::new(transport);

        info!(url = %url, "Created OpenSearch client");

        Ok(Self { client })
    }

    /// Map a non-success response into a `SearchError` carrying the body.
    async fn check_status(response: Response) -> Result<Response, SearchError> {
        let status = response.status_code();
        if status.is_success() {
            Ok(response)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(SearchError::response(status.as_u16(), body))
        }
    }
}

#[async_trait]
impl SearchEngineClient for OpenSearchClient {
    async fn bulk(&self, operations: Vec<Value>) -> Result<BulkResponse, SearchError> {
        let body: Vec<JsonBody<Value>> = operations.into_iter().map(Into::into).collect();

        let response = self
            .client
            .bulk(BulkParts::None)
            .body(body)
            .send()
            .await
            .map_err(|e| SearchError::request(e.to_string()))?;
        let response = Self::check_status(response).await?;

        response
            .json::<BulkResponse>()
            .await
            .map_err(|e| SearchError::parse(e.to_string()))
    }

    async fn create_index(&self, name: &str, body: Value) -> Result<(), SearchError> {
        let response = self
            .client
            .indices()
            .create(IndicesCreateParts::Index(name))
            .body(body)
            .send()
            .await
            .map_err(|e| SearchError::request(e.to_string()))?;
        Self::check_status(response).await?;

        debug!(index = %name, "Created index");
        Ok(())
    }

    async fn delete_index(&self, name: &str) -> Result<bool, SearchError> {
        let response = self
            .client
            .indices()
            .delete(IndicesDeleteParts::Index(&[name]))
            .send()
            .await
            .map_err(|e| SearchError::request(e.to_string()))?;

        // Not-found is a successful no-op, distinguishable via the boolean.
        if response.status_code().as_u16() == 404 {
            debug!(index = %name, "Index did not exist, nothing to delete");
            return Ok(false);
        }
        Self::check_status(response).await?;

        debug!(index = %name, "Deleted index");
        Ok(true)
    }

    async fn index_exists(&self, name: &str) -> Result<bool, SearchError> {
        let response = self
            .client
            .indices()
            .exists(IndicesExistsParts::Index(&[name]))
            .send()
            .await
            .map_err(|e| SearchError::request(e.to_string()))?;

        Ok(response.status_code().is_success())
    }

    async fn alias_exists(&self, name: &str) -> Result<bool, SearchError> {
        let response = self
            .client
            .indices()
            .exists_alias(IndicesExistsAliasParts::Name(&[name]))
            .send()
            .await
            .map_err(|e| SearchError::request(e.to_string()))?;

        Ok(response.status_code().is_success())
    }

    async fn get_alias(&self, name: &str) -> Result<Value, SearchError> {
        let response = self
            .client
            .indices()
            .get_alias(IndicesGetAliasParts::Name(&[name]))
            .send()
            .await
            .map_err(|e| SearchError::request(e.to_string()))?;
        let response = Self::check_status(response).await?;

        response
            .json::<Value>()
            .await
            .map_err(|e| SearchError::parse(e.to_string()))
    }

    async fn put_alias(&self, index: &str, name: &str) -> Result<(), SearchError> {
        let response = self
            .client
            .indices()
            .put_alias(IndicesPutAliasParts::IndexName(&[index], name))
            .send()
            .await
            .map_err(|e| SearchError::request(e.to_string()))?;
        Self::check_status(response).await?;

        debug!(index = %index, alias = %name, "Bound alias to index");
        Ok(())
    }

    async fn update_aliases(&self, actions: Vec<Value>) -> Result<(), SearchError> {
        let response = self
            .client
            .indices()
            .update_aliases()
            .body(json!({ "actions": actions }))
            .send()
            .await
            .map_err(|e| SearchError::request(e.to_string()))?;
        Self::check_status(response).await?;

        Ok(())
    }

    async fn reindex(
        &self,
        from: &str,
        to: &str,
        slices: i64,
        wait_for_completion: bool,
    ) -> Result<Option<String>, SearchError> {
        let response = self
            .client
            .reindex()
            .body(json!({
                "source": { "index": from },
                "dest": { "index": to }
            }))
            .slices(Slices::Count(slices as i32))
            .wait_for_completion(wait_for_completion)
            .send()
            .await
            .map_err(|e| SearchError::request(e.to_string()))?;
        let response = Self::check_status(response).await?;

        let body: Value = response
            .json()
            .await
            .map_err(|e| SearchError::parse(e.to_string()))?;

        // A waited-for reindex returns statistics instead of a task handle.
        Ok(body.get("task").and_then(Value::as_str).map(String::from))
    }

    async fn task_status(&self, task_id: &str) -> Result<Value, SearchError> {
        let response = self
            .client
            .tasks()
            .get(TasksGetParts::TaskId(task_id))
            .send()
            .await
            .map_err(|e| SearchError::request(e.to_string()))?;
        let response = Self::check_status(response).await?;

        response
            .json::<Value>()
            .await
            .map_err(|e| SearchError::parse(e.to_string()))
    }

    async fn refresh_index(&self, name: &str) -> Result<(), SearchError> {
        let response = self
            .client
            .indices()
            .refresh(IndicesRefreshParts::Index(&[name]))
            .send()
            .await
            .map_err(|e| SearchError::request(e.to_string()))?;
        Self::check_status(response).await?;

        Ok(())
    }

    async fn documents_count(&self, name: &str) -> Result<u64, SearchError> {
        let response = self
            .client
            .count(CountParts::Index(&[name]))
            .send()
            .await
            .map_err(|e| SearchError::request(e.to_string()))?;
        let response = Self::check_status(response).await?;

        let body: Value = response
            .json()
            .await
            .map_err(|e| SearchError::parse(e.to_string()))?;

        body.get("count")
            .and_then(Value::as_u64)
            .ok_or_else(|| SearchError::parse("count response missing 'count' field"))
    }

    async fn health_check(&self) -> Result<bool, SearchError> {
        let response = self
            .client
            .cluster()
            .health(ClusterHealthParts::None)
            .send()
            .await
            .map_err(|e| SearchError::request(e.to_string()))?;

        if !response.status_code().is_success() {
            return Ok(false);
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| SearchError::parse(e.to_string()))?;
        let status = body.get("status").and_then(Value::as_str).unwrap_or("red");

        Ok(status != "red")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_new_rejects_invalid_url() {
        let result = OpenSearchClient::new("not a url").await;
        assert!(matches!(result, Err(SearchError::ConnectionError(_))));
    }
}
