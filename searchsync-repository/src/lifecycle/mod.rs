//! Index lifecycle management.
//!
//! The [`IndexManager`] owns the mapping between logical aliases and
//! physical, timestamped indices: provisioning new indices, resolving the
//! current write index, running sliced reindex copies, and atomically
//! retargeting aliases so readers never observe a half-switched state.
//!
//! The manager guarantees only the atomicity of the switch step; sequencing
//! backfill-then-switch is the caller's responsibility.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde_json::{json, Value};
use tracing::{debug, info, instrument};

use crate::errors::SearchIndexError;
use crate::interfaces::SearchEngineClient;

/// Options for [`IndexManager::create_index`].
#[derive(Debug, Clone)]
pub struct CreateIndexOptions {
    /// Explicit physical name; defaults to `"{alias}-{timestamp}"`.
    pub index_name: Option<String>,
    /// Bind the alias to the new index as part of creation.
    pub with_alias: bool,
    /// Treat an existing index or alias as a no-op instead of an error.
    pub skip_if_exists: bool,
}

impl Default for CreateIndexOptions {
    fn default() -> Self {
        Self {
            index_name: None,
            with_alias: true,
            skip_if_exists: false,
        }
    }
}

/// Manager for physical indices and the aliases that address them.
///
/// Application code addresses indices only through aliases; physical names
/// are generated here and never hardcoded by callers. An alias resolves to
/// exactly one write index at a time.
pub struct IndexManager {
    client: Arc<dyn SearchEngineClient>,
}

impl IndexManager {
    /// Create a new index manager with the given client.
    pub fn new(client: Arc<dyn SearchEngineClient>) -> Self {
        Self { client }
    }

    /// Generate a physical index name for an alias, timestamped to UTC
    /// minute precision.
    pub fn index_name_with_timestamp(alias_name: &str) -> String {
        format!("{}-{}", alias_name, Utc::now().format("%Y%m%d-%H%M"))
    }

    /// Name of the migration bookkeeping index for an alias.
    pub fn migrations_index_name(alias_name: &str) -> String {
        format!("{}-migrations", alias_name)
    }

    /// Create a physical index for an alias.
    ///
    /// Fails with [`SearchIndexError::AlreadyExists`] if the physical name or
    /// (when binding) the alias name is already taken, unless
    /// `skip_if_exists` turns that into a no-op. Mappings are stamped with a
    /// `_meta.created_by` marker recording the provisioning version.
    ///
    /// # Returns
    ///
    /// The physical index name: the newly created index, or with
    /// `skip_if_exists` the existing index already backing the name or
    /// alias.
    #[instrument(skip(self, settings, mappings))]
    pub async fn create_index(
        &self,
        alias_name: &str,
        settings: Value,
        mappings: Value,
        options: CreateIndexOptions,
    ) -> Result<String, SearchIndexError> {
        let index_name = options
            .index_name
            .clone()
            .unwrap_or_else(|| Self::index_name_with_timestamp(alias_name));

        if self.client.index_exists(&index_name).await? {
            if options.skip_if_exists {
                debug!(index = %index_name, "Index already exists, skipping creation");
                return Ok(index_name);
            }
            return Err(SearchIndexError::already_exists(&index_name));
        }

        if options.with_alias && self.client.index_exists(alias_name).await? {
            if options.skip_if_exists {
                debug!(alias = %alias_name, "Alias already exists, skipping creation");
                // The generated name was never created; report the index the
                // alias actually writes to.
                return self.target_index_name(alias_name).await;
            }
            return Err(SearchIndexError::already_exists(alias_name));
        }

        let mut mappings = mappings;
        stamp_meta(&mut mappings);

        let body = json!({
            "settings": settings,
            "mappings": mappings
        });

        self.client.create_index(&index_name, body).await?;
        if options.with_alias {
            self.client.put_alias(&index_name, alias_name).await?;
        }

        info!(
            index = %index_name,
            alias = %alias_name,
            with_alias = options.with_alias,
            "Created index"
        );
        Ok(index_name)
    }

    /// Create the migration bookkeeping index for an alias.
    pub async fn create_migrations_index(
        &self,
        alias_name: &str,
    ) -> Result<String, SearchIndexError> {
        let index_name = Self::migrations_index_name(alias_name);

        let body = json!({
            "settings": { "number_of_shards": 1 },
            "mappings": {
                "properties": {
                    "completed": { "type": "boolean" },
                    "state": { "type": "object" },
                    "started_at": { "type": "date" },
                    "completed_at": { "type": "date" },
                    "name": { "type": "keyword" }
                }
            }
        });

        self.client.create_index(&index_name, body).await?;

        info!(index = %index_name, "Created migrations index");
        Ok(index_name)
    }

    /// Resolve an alias to its current write index.
    ///
    /// If multiple indices share the alias, the one flagged as the write
    /// index wins; an absent flag defaults to true (back-compatible single
    /// index case). A name with no alias at all is assumed to be a physical
    /// index already.
    pub async fn target_index_name(&self, alias_name: &str) -> Result<String, SearchIndexError> {
        self.target_index_names(alias_name)
            .await?
            .into_iter()
            .find(|(_, is_write_index)| *is_write_index)
            .map(|(name, _)| name)
            .ok_or_else(|| SearchIndexError::NoWriteIndex(alias_name.to_string()))
    }

    /// All physical indices reachable through an alias, mapped to whether
    /// each is the write index.
    pub async fn target_index_names(
        &self,
        alias_name: &str,
    ) -> Result<HashMap<String, bool>, SearchIndexError> {
        if !self.client.alias_exists(alias_name).await? {
            return Ok(HashMap::from([(alias_name.to_string(), true)]));
        }

        let info = self.client.get_alias(alias_name).await?;
        let indices = info.as_object().ok_or_else(|| {
            SearchIndexError::alias_resolution(format!(
                "unexpected get_alias payload for '{}'",
                alias_name
            ))
        })?;

        Ok(indices
            .iter()
            .map(|(index, meta)| {
                // An unset flag means this is the write index.
                let is_write_index = meta
                    .pointer(&format!("/aliases/{}/is_write_index", alias_name))
                    .and_then(Value::as_bool)
                    .unwrap_or(true);
                (index.clone(), is_write_index)
            })
            .collect())
    }

    /// Atomically retarget an alias from one physical index to another.
    ///
    /// Both actions are submitted as a single request, which the engine
    /// applies as one transaction: at no point does the alias resolve to
    /// zero or two indices.
    #[instrument(skip(self))]
    pub async fn switch_alias(
        &self,
        from: &str,
        to: &str,
        alias_name: &str,
    ) -> Result<(), SearchIndexError> {
        let actions = vec![
            json!({ "remove": { "index": from, "alias": alias_name } }),
            json!({ "add": { "index": to, "alias": alias_name } }),
        ];

        self.client.update_aliases(actions).await?;

        info!(from = %from, to = %to, alias = %alias_name, "Switched alias");
        Ok(())
    }

    /// Copy documents between physical indices using the engine's native
    /// sliced reindex.
    ///
    /// Asynchronous by design: returns a task handle for polling unless
    /// `wait_for_completion` is set, in which case `None` is returned once
    /// the copy has finished.
    pub async fn reindex(
        &self,
        from: &str,
        to: &str,
        slices: i64,
        wait_for_completion: bool,
    ) -> Result<Option<String>, SearchIndexError> {
        let task = self
            .client
            .reindex(from, to, slices, wait_for_completion)
            .await?;

        if task.is_none() && !wait_for_completion {
            return Err(SearchIndexError::task(format!(
                "reindex from '{}' to '{}' did not return a task handle",
                from, to
            )));
        }

        info!(from = %from, to = %to, slices, task = ?task, "Started reindex");
        Ok(task)
    }

    /// Whether a reindex task has finished.
    ///
    /// A task that finished with a task-level error or per-document
    /// failures is not a success; both surface as
    /// [`SearchIndexError::Task`] rather than `Ok(true)`.
    pub async fn task_completed(&self, task_id: &str) -> Result<bool, SearchIndexError> {
        let status = self.client.task_status(task_id).await?;

        if let Some(error) = status.get("error").filter(|error| !error.is_null()) {
            return Err(SearchIndexError::task(format!(
                "task '{}' failed: {}",
                task_id, error
            )));
        }

        let completed = status
            .get("completed")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        if completed {
            let failures = status
                .pointer("/response/failures")
                .and_then(Value::as_array)
                .map(Vec::len)
                .unwrap_or(0);
            if failures > 0 {
                return Err(SearchIndexError::task(format!(
                    "task '{}' completed with {} failed documents",
                    task_id, failures
                )));
            }
        }

        Ok(completed)
    }

    /// Delete a physical index. Missing indices are a successful no-op,
    /// reported as `Ok(false)`.
    pub async fn delete_index(&self, index_name: &str) -> Result<bool, SearchIndexError> {
        Ok(self.client.delete_index(index_name).await?)
    }

    /// Whether an index with this name exists.
    pub async fn index_exists(&self, index_name: &str) -> Result<bool, SearchIndexError> {
        Ok(self.client.index_exists(index_name).await?)
    }

    /// Whether an alias with this name exists.
    pub async fn alias_exists(&self, alias_name: &str) -> Result<bool, SearchIndexError> {
        Ok(self.client.alias_exists(alias_name).await?)
    }

    /// Refresh an index so writes become immediately searchable.
    pub async fn refresh_index(&self, index_name: &str) -> Result<(), SearchIndexError> {
        Ok(self.client.refresh_index(index_name).await?)
    }

    /// Number of documents in an index or alias.
    pub async fn documents_count(&self, index_name: &str) -> Result<u64, SearchIndexError> {
        Ok(self.client.documents_count(index_name).await?)
    }
}

/// Stamp `_meta.created_by` into a mappings body, preserving any existing
/// `_meta` keys.
fn stamp_meta(mappings: &mut Value) {
    if let Some(root) = mappings.as_object_mut() {
        let meta = root.entry("_meta").or_insert_with(|| json!({}));
        if let Some(meta) = meta.as_object_mut() {
            meta.entry("created_by".to_string())
                .or_insert_with(|| json!(env!("CARGO_PKG_VERSION")));
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::errors::SearchError;
    use crate::types::BulkResponse;

    /// Mock client backed by in-memory index/alias state.
    struct MockClient {
        indices: Mutex<HashSet<String>>,
        aliases: Mutex<HashMap<String, Value>>,
        created: Mutex<Vec<(String, Value)>>,
        put_aliases: Mutex<Vec<(String, String)>>,
        alias_actions: Mutex<Vec<Vec<Value>>>,
        task_status: Value,
    }

    impl MockClient {
        fn new() -> Self {
            Self {
                indices: Mutex::new(HashSet::new()),
                aliases: Mutex::new(HashMap::new()),
                created: Mutex::new(Vec::new()),
                put_aliases: Mutex::new(Vec::new()),
                alias_actions: Mutex::new(Vec::new()),
                task_status: json!({ "completed": true }),
            }
        }

        fn with_index(self, name: &str) -> Self {
            self.indices.lock().unwrap().insert(name.to_string());
            self
        }

        fn with_alias(self, name: &str, payload: Value) -> Self {
            self.aliases
                .lock()
                .unwrap()
                .insert(name.to_string(), payload);
            self
        }

        fn with_task_status(mut self, payload: Value) -> Self {
            self.task_status = payload;
            self
        }
    }

    #[async_trait]
    impl SearchEngineClient for MockClient {
        async fn bulk(&self, _operations: Vec<Value>) -> Result<BulkResponse, SearchError> {
            Ok(BulkResponse {
                took: 0,
                errors: false,
                items: Vec::new(),
            })
        }

        async fn create_index(&self, name: &str, body: Value) -> Result<(), SearchError> {
            self.indices.lock().unwrap().insert(name.to_string());
            self.created.lock().unwrap().push((name.to_string(), body));
            Ok(())
        }

        async fn delete_index(&self, name: &str) -> Result<bool, SearchError> {
            Ok(self.indices.lock().unwrap().remove(name))
        }

        async fn index_exists(&self, name: &str) -> Result<bool, SearchError> {
            Ok(self.indices.lock().unwrap().contains(name)
                || self.aliases.lock().unwrap().contains_key(name))
        }

        async fn alias_exists(&self, name: &str) -> Result<bool, SearchError> {
            Ok(self.aliases.lock().unwrap().contains_key(name))
        }

        async fn get_alias(&self, name: &str) -> Result<Value, SearchError> {
            self.aliases
                .lock()
                .unwrap()
                .get(name)
                .cloned()
                .ok_or_else(|| SearchError::response(404, "alias missing"))
        }

        async fn put_alias(&self, index: &str, name: &str) -> Result<(), SearchError> {
            self.put_aliases
                .lock()
                .unwrap()
                .push((index.to_string(), name.to_string()));
            Ok(())
        }

        async fn update_aliases(&self, actions: Vec<Value>) -> Result<(), SearchError> {
            self.alias_actions.lock().unwrap().push(actions);
            Ok(())
        }

        async fn reindex(
            &self,
            _from: &str,
            _to: &str,
            _slices: i64,
            wait_for_completion: bool,
        ) -> Result<Option<String>, SearchError> {
            if wait_for_completion {
                Ok(None)
            } else {
                Ok(Some("node-1:42".to_string()))
            }
        }

        async fn task_status(&self, _task_id: &str) -> Result<Value, SearchError> {
            Ok(self.task_status.clone())
        }

        async fn refresh_index(&self, _name: &str) -> Result<(), SearchError> {
            Ok(())
        }

        async fn documents_count(&self, _name: &str) -> Result<u64, SearchError> {
            Ok(0)
        }

        async fn health_check(&self) -> Result<bool, SearchError> {
            Ok(true)
        }
    }

    fn manager(client: MockClient) -> (Arc<MockClient>, IndexManager) {
        let client = Arc::new(client);
        (client.clone(), IndexManager::new(client))
    }

    #[test]
    fn test_index_name_with_timestamp_format() {
        let name = IndexManager::index_name_with_timestamp("issues");

        let suffix = name.strip_prefix("issues-").unwrap();
        // "%Y%m%d-%H%M" is always 13 characters.
        assert_eq!(suffix.len(), 13);
        assert!(suffix
            .chars()
            .all(|c| c.is_ascii_digit() || c == '-'));
    }

    #[test]
    fn test_migrations_index_name() {
        assert_eq!(
            IndexManager::migrations_index_name("issues"),
            "issues-migrations"
        );
    }

    #[tokio::test]
    async fn test_create_index_binds_alias_and_stamps_meta() {
        let (client, manager) = manager(MockClient::new());

        let name = manager
            .create_index(
                "issues",
                json!({ "number_of_shards": 1 }),
                json!({ "properties": { "id": { "type": "long" } } }),
                CreateIndexOptions::default(),
            )
            .await
            .unwrap();

        assert!(name.starts_with("issues-"));

        let created = client.created.lock().unwrap();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].0, name);
        assert_eq!(
            created[0].1["mappings"]["_meta"]["created_by"],
            env!("CARGO_PKG_VERSION")
        );

        let put_aliases = client.put_aliases.lock().unwrap();
        assert_eq!(*put_aliases, vec![(name, "issues".to_string())]);
    }

    #[tokio::test]
    async fn test_create_index_fails_when_index_exists() {
        let (_, manager) = manager(MockClient::new().with_index("issues-20240101-0000"));

        let err = manager
            .create_index(
                "issues",
                json!({}),
                json!({}),
                CreateIndexOptions {
                    index_name: Some("issues-20240101-0000".to_string()),
                    ..CreateIndexOptions::default()
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, SearchIndexError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn test_create_index_fails_when_alias_name_taken() {
        let (_, manager) = manager(MockClient::new().with_index("issues"));

        let err = manager
            .create_index("issues", json!({}), json!({}), CreateIndexOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, SearchIndexError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn test_create_index_skip_if_exists_resolves_existing_write_index() {
        let payload = json!({
            "issues-current": { "aliases": { "issues": { "is_write_index": true } } }
        });
        let (client, manager) = manager(
            MockClient::new()
                .with_index("issues-current")
                .with_alias("issues", payload),
        );

        let name = manager
            .create_index(
                "issues",
                json!({}),
                json!({}),
                CreateIndexOptions {
                    skip_if_exists: true,
                    ..CreateIndexOptions::default()
                },
            )
            .await
            .unwrap();

        // The alias is taken: nothing is created, and the name returned is
        // the index the alias actually writes to, not a generated one.
        assert_eq!(name, "issues-current");
        assert!(client.created.lock().unwrap().is_empty());
        assert!(client.put_aliases.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_index_skip_if_exists_is_a_noop() {
        let (client, manager) = manager(MockClient::new().with_index("issues-20240101-0000"));

        let name = manager
            .create_index(
                "issues",
                json!({}),
                json!({}),
                CreateIndexOptions {
                    index_name: Some("issues-20240101-0000".to_string()),
                    skip_if_exists: true,
                    ..CreateIndexOptions::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(name, "issues-20240101-0000");
        assert!(client.created.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_target_index_name_prefers_write_index_flag() {
        let payload = json!({
            "issues-old": { "aliases": { "issues": { "is_write_index": false } } },
            "issues-new": { "aliases": { "issues": { "is_write_index": true } } }
        });
        let (_, manager) = manager(MockClient::new().with_alias("issues", payload));

        assert_eq!(manager.target_index_name("issues").await.unwrap(), "issues-new");
    }

    #[tokio::test]
    async fn test_target_index_name_defaults_unset_flag_to_write() {
        let payload = json!({
            "issues-only": { "aliases": { "issues": {} } }
        });
        let (_, manager) = manager(MockClient::new().with_alias("issues", payload));

        assert_eq!(
            manager.target_index_name("issues").await.unwrap(),
            "issues-only"
        );
    }

    #[tokio::test]
    async fn test_target_index_name_without_alias_is_identity() {
        let (_, manager) = manager(MockClient::new());

        assert_eq!(manager.target_index_name("issues").await.unwrap(), "issues");
    }

    #[tokio::test]
    async fn test_switch_alias_submits_single_atomic_action_list() {
        let (client, manager) = manager(MockClient::new());

        manager
            .switch_alias("issues-old", "issues-new", "issues")
            .await
            .unwrap();

        let calls = client.alias_actions.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls[0],
            vec![
                json!({ "remove": { "index": "issues-old", "alias": "issues" } }),
                json!({ "add": { "index": "issues-new", "alias": "issues" } }),
            ]
        );
    }

    #[tokio::test]
    async fn test_delete_index_missing_returns_false() {
        let (_, manager) = manager(MockClient::new());

        assert!(!manager.delete_index("issues-gone").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_index_existing_returns_true() {
        let (_, manager) = manager(MockClient::new().with_index("issues-20240101-0000"));

        assert!(manager.delete_index("issues-20240101-0000").await.unwrap());
    }

    #[tokio::test]
    async fn test_reindex_returns_task_handle() {
        let (_, manager) = manager(MockClient::new());

        let task = manager
            .reindex("issues-old", "issues-new", 4, false)
            .await
            .unwrap();

        assert_eq!(task.as_deref(), Some("node-1:42"));
        assert!(manager.task_completed("node-1:42").await.unwrap());
    }

    #[tokio::test]
    async fn test_task_completed_with_document_failures_is_an_error() {
        let (_, manager) = manager(MockClient::new().with_task_status(json!({
            "completed": true,
            "response": {
                "failures": [
                    { "id": "issue_1", "status": 409, "cause": { "type": "version_conflict_engine_exception" } }
                ]
            }
        })));

        let err = manager.task_completed("node-1:42").await.unwrap_err();

        assert!(matches!(err, SearchIndexError::Task(_)));
    }

    #[tokio::test]
    async fn test_task_completed_with_task_error_is_an_error() {
        let (_, manager) = manager(MockClient::new().with_task_status(json!({
            "completed": true,
            "error": { "type": "search_phase_execution_exception", "reason": "all shards failed" }
        })));

        let err = manager.task_completed("node-1:42").await.unwrap_err();

        assert!(matches!(err, SearchIndexError::Task(_)));
    }

    #[tokio::test]
    async fn test_task_completed_clean_success_and_still_running() {
        let (_, manager) = manager(MockClient::new().with_task_status(json!({
            "completed": true,
            "response": { "failures": [] }
        })));
        assert!(manager.task_completed("node-1:42").await.unwrap());

        let (_, manager) = self::manager(MockClient::new().with_task_status(json!({
            "completed": false
        })));
        assert!(!manager.task_completed("node-1:42").await.unwrap());
    }

    #[tokio::test]
    async fn test_create_migrations_index_uses_bookkeeping_mappings() {
        let (client, manager) = manager(MockClient::new());

        let name = manager.create_migrations_index("issues").await.unwrap();

        assert_eq!(name, "issues-migrations");
        let created = client.created.lock().unwrap();
        assert_eq!(
            created[0].1["mappings"]["properties"]["completed"]["type"],
            "boolean"
        );
        assert_eq!(
            created[0].1["mappings"]["properties"]["name"]["type"],
            "keyword"
        );
    }
}
