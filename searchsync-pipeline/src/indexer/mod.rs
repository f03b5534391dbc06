//! Bulk indexer: accumulate references, flush size-bounded batches.
//!
//! One [`BulkIndexer`] instance belongs to one logical job and is not safe
//! for concurrent use; parallelism comes from running independent instances
//! on separate workers, each with its own buffers. The injected transport
//! client may be shared freely across instances.

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{error, info, instrument, warn};

use searchsync_repository::SearchEngineClient;
use searchsync_shared::{DocumentReference, Operation, RecordStore};

/// Default bulk request ceiling: 10 MiB.
pub const DEFAULT_MAX_BULK_SIZE_BYTES: usize = 10 * 1024 * 1024;

/// Fixed per-line overhead covering the newline separators of the bulk wire
/// format.
const ENTRY_OVERHEAD_BYTES: usize = 2;

/// Configuration for the bulk indexer.
#[derive(Debug, Clone)]
pub struct BulkIndexerConfig {
    /// Hard ceiling on a flushed batch's serialized byte size. Only a single
    /// entry that is itself larger than the ceiling may exceed it, since a
    /// document cannot be split.
    pub max_bulk_size_bytes: usize,
}

impl Default for BulkIndexerConfig {
    fn default() -> Self {
        Self {
            max_bulk_size_bytes: DEFAULT_MAX_BULK_SIZE_BYTES,
        }
    }
}

/// Accumulates document references into size-bounded bulk write batches.
///
/// The indexer guarantees a uniform recovery path: no method returns an
/// error or panics mid-pipeline. Every processed reference ends up either
/// successfully written, in the failures list returned by [`flush`], or
/// explicitly skipped with a logged reason.
///
/// [`flush`]: BulkIndexer::flush
pub struct BulkIndexer {
    client: Arc<dyn SearchEngineClient>,
    store: Arc<dyn RecordStore>,
    config: BulkIndexerConfig,
    body: Vec<Value>,
    body_size_bytes: usize,
    ref_buffer: Vec<DocumentReference>,
    failures: Vec<DocumentReference>,
}

impl BulkIndexer {
    /// Create a new bulk indexer with default configuration.
    pub fn new(client: Arc<dyn SearchEngineClient>, store: Arc<dyn RecordStore>) -> Self {
        Self::with_config(client, store, BulkIndexerConfig::default())
    }

    /// Create a new bulk indexer with custom configuration.
    pub fn with_config(
        client: Arc<dyn SearchEngineClient>,
        store: Arc<dyn RecordStore>,
        config: BulkIndexerConfig,
    ) -> Self {
        Self {
            client,
            store,
            config,
            body: Vec::new(),
            body_size_bytes: 0,
            ref_buffer: Vec::new(),
            failures: Vec::new(),
        }
    }

    /// Process one reference, resolving it against the source of truth.
    ///
    /// A missing record becomes a delete; a record that no longer matches
    /// indexing-eligibility policy is redirected to a delete; a blank
    /// indexed document is skipped. A flush is triggered implicitly when the
    /// new entry would push the batch over its byte ceiling.
    #[instrument(skip(self, reference), fields(reference = %reference))]
    pub async fn process(&mut self, reference: DocumentReference) {
        let record = match self.store.find(&reference).await {
            Ok(record) => record,
            Err(e) => {
                error!(
                    reference = %reference,
                    error = %e,
                    "Record store lookup failed, marking reference for retry"
                );
                self.failures.push(reference);
                return;
            }
        };

        let Some(record) = record else {
            self.delete(reference, None).await;
            return;
        };

        if !record.search_eligible() {
            // Policy redirection, not a failure.
            warn!(
                reference = %reference,
                "Record no longer index-eligible, removing its document"
            );
            self.delete(reference, None).await;
            return;
        }

        let Some(document) = record.as_indexed_json() else {
            warn!(
                reference = %reference,
                "Record produced a blank indexed document, skipping"
            );
            return;
        };

        match reference.record_kind.default_operation() {
            Operation::Index => self.index(reference, document).await,
            Operation::Upsert => self.upsert(reference, document).await,
            Operation::Delete => self.delete(reference, None).await,
        }
    }

    /// Enqueue a delete-by-id operation.
    ///
    /// `index_name` overrides the reference's default alias; used when
    /// cleaning documents out of an explicitly named physical index during
    /// reindex cleanup.
    pub async fn delete(&mut self, reference: DocumentReference, index_name: Option<&str>) {
        let header = json!({ "delete": operation_target(&reference, index_name) });
        self.submit(reference, vec![header]).await;
    }

    /// Submit the accumulated batch as one bulk request.
    ///
    /// Response items are attributed to references by position; a
    /// transport-level error fails every reference in the batch, since no
    /// partial-success assumption can be made without a response. Batch
    /// state is reset either way.
    ///
    /// # Returns
    ///
    /// The cumulative failures list. Failures are never retried internally;
    /// the producer re-enqueues them.
    pub async fn flush(&mut self) -> Vec<DocumentReference> {
        if self.body.is_empty() {
            return self.failures.clone();
        }

        let body = std::mem::take(&mut self.body);
        let refs = std::mem::take(&mut self.ref_buffer);
        let bytes = self.body_size_bytes;
        self.body_size_bytes = 0;
        let entries = refs.len();

        match self.client.bulk(body).await {
            Err(e) => {
                error!(
                    error = %e,
                    entries,
                    bytes,
                    "Bulk request failed in transit, marking whole batch as failed"
                );
                self.failures.extend(refs);
            }
            Ok(response) => {
                let mut errors = 0usize;
                for (position, reference) in refs.into_iter().enumerate() {
                    match response.items.get(position) {
                        Some(item) if !item.is_failure() => {}
                        Some(item) => {
                            warn!(
                                reference = %reference,
                                error = ?item.result().and_then(|r| r.error.as_ref()),
                                "Bulk item failed"
                            );
                            errors += 1;
                            self.failures.push(reference);
                        }
                        None => {
                            warn!(
                                reference = %reference,
                                "Bulk response missing item for reference, marking as failed"
                            );
                            errors += 1;
                            self.failures.push(reference);
                        }
                    }
                }
                info!(bytes, entries, errors, "Flushed bulk request");
            }
        }

        self.failures.clone()
    }

    async fn index(&mut self, reference: DocumentReference, document: Value) {
        let header = json!({ "index": operation_target(&reference, None) });
        self.submit(reference, vec![header, document]).await;
    }

    async fn upsert(&mut self, reference: DocumentReference, document: Value) {
        if reference.routing.is_some() && document.get("routing").is_none() {
            // Configuration defect in the record's serializer: merging a
            // document without its routing field would place it on the wrong
            // shard. Report loudly and drop the entry.
            error!(
                reference = %reference,
                "Indexed document omits the routing field its reference routes by, dropping entry"
            );
            return;
        }

        let header = json!({ "update": operation_target(&reference, None) });
        let payload = json!({ "doc": document, "doc_as_upsert": true });
        self.submit(reference, vec![header, payload]).await;
    }

    /// Append an operation group, flushing first if it would cross the byte
    /// ceiling.
    async fn submit(&mut self, reference: DocumentReference, lines: Vec<Value>) {
        let mut entry_size_bytes = 0usize;
        for line in &lines {
            match serde_json::to_vec(line) {
                Ok(serialized) => entry_size_bytes += serialized.len() + ENTRY_OVERHEAD_BYTES,
                Err(e) => {
                    error!(
                        reference = %reference,
                        error = %e,
                        "Failed to serialize bulk entry, marking reference for retry"
                    );
                    self.failures.push(reference);
                    return;
                }
            }
        }

        // Ceiling check happens before appending, so no flushed batch ever
        // exceeds the limit. An entry that alone exceeds the ceiling is still
        // sent, by itself: a single document cannot be split.
        if !self.body.is_empty()
            && self.body_size_bytes + entry_size_bytes > self.config.max_bulk_size_bytes
        {
            self.flush().await;
        }

        self.body.extend(lines);
        self.body_size_bytes += entry_size_bytes;
        self.ref_buffer.push(reference);
    }
}

/// Operation header target: index, id, and optional routing.
fn operation_target(reference: &DocumentReference, index_name: Option<&str>) -> Value {
    let mut target = json!({
        "_index": index_name.unwrap_or_else(|| reference.record_kind.index_alias()),
        "_id": reference.document_id,
    });
    if let Some(routing) = &reference.routing {
        target["routing"] = json!(routing);
    }
    target
}
