//! Search engine client trait definition.
//!
//! This module defines the abstract interface for the bulk write and index
//! administration operations the indexing core depends on, allowing for
//! different backend implementations (OpenSearch, Elasticsearch, mocks).

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::SearchError;
use crate::types::BulkResponse;

/// Abstract interface for search engine transport operations.
///
/// This is the narrow seam between the indexing core and the search engine:
/// the bulk write endpoint plus the index/alias administration APIs. The
/// client is constructed once at process start and injected into the bulk
/// indexer and index manager; its connection pool is stateless with respect
/// to batching and may be shared freely.
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync` to allow use across async tasks.
///
/// # Error Handling
///
/// All methods return `Result<T, SearchError>` for consistent error handling.
#[async_trait]
pub trait SearchEngineClient: Send + Sync {
    /// Submit one bulk write request.
    ///
    /// # Arguments
    ///
    /// * `operations` - JSON lines in newline-delimited bulk format: an
    ///   operation header object, followed (for index/update) by the
    ///   document payload line.
    ///
    /// # Returns
    ///
    /// * `Ok(BulkResponse)` - Per-item results in submission order.
    /// * `Err(SearchError)` - The request as a whole failed; nothing can be
    ///   assumed about any item.
    async fn bulk(&self, operations: Vec<Value>) -> Result<BulkResponse, SearchError>;

    /// Create a physical index with the given settings/mappings body.
    async fn create_index(&self, name: &str, body: Value) -> Result<(), SearchError>;

    /// Delete a physical index.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - The index existed and was deleted.
    /// * `Ok(false)` - The index did not exist (successful no-op).
    async fn delete_index(&self, name: &str) -> Result<bool, SearchError>;

    /// Whether an index (or alias) with this name exists.
    async fn index_exists(&self, name: &str) -> Result<bool, SearchError>;

    /// Whether an alias with this name exists.
    async fn alias_exists(&self, name: &str) -> Result<bool, SearchError>;

    /// Fetch alias metadata: a map of physical index name to its alias
    /// bindings, as returned by the get-alias API.
    async fn get_alias(&self, name: &str) -> Result<Value, SearchError>;

    /// Bind an alias to a physical index.
    async fn put_alias(&self, index: &str, name: &str) -> Result<(), SearchError>;

    /// Apply a list of alias actions atomically in a single request.
    ///
    /// The engine applies all actions as one transaction; there is no window
    /// in which an alias resolves to zero or two indices.
    async fn update_aliases(&self, actions: Vec<Value>) -> Result<(), SearchError>;

    /// Start a native sliced reindex from one physical index to another.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(task_id))` - Asynchronous reindex started; poll the task.
    /// * `Ok(None)` - `wait_for_completion` was set and the copy finished.
    async fn reindex(
        &self,
        from: &str,
        to: &str,
        slices: i64,
        wait_for_completion: bool,
    ) -> Result<Option<String>, SearchError>;

    /// Fetch the status document for a task handle.
    async fn task_status(&self, task_id: &str) -> Result<Value, SearchError>;

    /// Refresh an index so writes become immediately searchable.
    async fn refresh_index(&self, name: &str) -> Result<(), SearchError>;

    /// Number of documents in an index or alias.
    async fn documents_count(&self, name: &str) -> Result<u64, SearchError>;

    /// Whether the search engine is healthy and reachable.
    async fn health_check(&self) -> Result<bool, SearchError>;
}
