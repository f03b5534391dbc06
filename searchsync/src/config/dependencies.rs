//! Dependency initialization and wiring for the indexing pipeline.

use std::env;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::IndexingError;
use searchsync_pipeline::{BulkIndexer, BulkIndexerConfig};
use searchsync_repository::{IndexManager, OpenSearchClient, SearchEngineClient};
use searchsync_shared::RecordStore;

/// Default OpenSearch URL.
const DEFAULT_OPENSEARCH_URL: &str = "http://localhost:9200";

/// Default bulk request ceiling in bytes (10 MiB).
const DEFAULT_MAX_BULK_SIZE_BYTES: usize = 10 * 1024 * 1024;

/// Default slice count for reindex copies.
const DEFAULT_REINDEX_SLICES: i64 = 4;

/// Default interval between reindex task status polls, in seconds.
const DEFAULT_TASK_POLL_INTERVAL_SECS: u64 = 5;

/// Container for all initialized dependencies.
pub struct Dependencies {
    /// Shared transport client, health-checked at startup.
    pub client: Arc<dyn SearchEngineClient>,
    /// Index lifecycle manager wired to the client.
    pub manager: IndexManager,
    /// Bulk indexer configuration for worker instances.
    pub indexer_config: BulkIndexerConfig,
    /// Slice count used for reindex copies.
    pub reindex_slices: i64,
    /// Interval between reindex task status polls.
    pub task_poll_interval: Duration,
}

impl Dependencies {
    /// Initialize all dependencies from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `SEARCHSYNC_OPENSEARCH_URL`: OpenSearch server URL
    ///   (default: http://localhost:9200)
    /// - `SEARCHSYNC_MAX_BULK_SIZE_BYTES`: bulk request ceiling in bytes
    ///   (default: 10 MiB)
    /// - `SEARCHSYNC_REINDEX_SLICES`: slice count for reindex copies (default: 4)
    /// - `SEARCHSYNC_TASK_POLL_INTERVAL_SECS`: seconds between task polls
    ///   (default: 5)
    ///
    /// # Returns
    ///
    /// * `Ok(Dependencies)` - Initialized dependencies
    /// * `Err(IndexingError)` - If initialization fails
    pub async fn new() -> Result<Self, IndexingError> {
        let opensearch_url = env::var("SEARCHSYNC_OPENSEARCH_URL")
            .unwrap_or_else(|_| DEFAULT_OPENSEARCH_URL.to_string());
        let max_bulk_size_bytes =
            env_parse("SEARCHSYNC_MAX_BULK_SIZE_BYTES", DEFAULT_MAX_BULK_SIZE_BYTES)?;
        let reindex_slices = env_parse("SEARCHSYNC_REINDEX_SLICES", DEFAULT_REINDEX_SLICES)?;
        let task_poll_interval_secs = env_parse(
            "SEARCHSYNC_TASK_POLL_INTERVAL_SECS",
            DEFAULT_TASK_POLL_INTERVAL_SECS,
        )?;

        info!(
            opensearch_url = %opensearch_url,
            max_bulk_size_bytes,
            reindex_slices,
            task_poll_interval_secs,
            "Initializing dependencies"
        );

        // Initialize OpenSearch client
        let search_client = OpenSearchClient::new(&opensearch_url).await.map_err(|e| {
            IndexingError::config(format!("Failed to create OpenSearch client: {}", e))
        })?;

        // Verify OpenSearch is reachable
        let healthy = search_client
            .health_check()
            .await
            .map_err(|e| IndexingError::config(format!("OpenSearch health check failed: {}", e)))?;

        if !healthy {
            return Err(IndexingError::config("OpenSearch cluster is unhealthy"));
        }

        info!("OpenSearch connection verified");

        Ok(Self::wire(
            Arc::new(search_client),
            BulkIndexerConfig {
                max_bulk_size_bytes,
            },
            reindex_slices,
            Duration::from_secs(task_poll_interval_secs),
        ))
    }

    /// Assemble the container around an already-verified client.
    fn wire(
        client: Arc<dyn SearchEngineClient>,
        indexer_config: BulkIndexerConfig,
        reindex_slices: i64,
        task_poll_interval: Duration,
    ) -> Self {
        let manager = IndexManager::new(client.clone());
        Self {
            client,
            manager,
            indexer_config,
            reindex_slices,
            task_poll_interval,
        }
    }

    /// Construct a bulk indexer against the given record store, sharing
    /// this container's transport client and configuration.
    pub fn bulk_indexer(&self, store: Arc<dyn RecordStore>) -> BulkIndexer {
        BulkIndexer::with_config(self.client.clone(), store, self.indexer_config.clone())
    }
}

/// Read an environment variable and parse it, falling back to a default when
/// unset. A set-but-unparseable value is a hard configuration error.
fn env_parse<T: FromStr>(name: &str, default: T) -> Result<T, IndexingError> {
    match env::var(name) {
        Ok(raw) => raw.parse::<T>().map_err(|_| {
            IndexingError::config(format!("{} has unparseable value '{}'", name, raw))
        }),
        Err(_) => Ok(default),
    }
}
