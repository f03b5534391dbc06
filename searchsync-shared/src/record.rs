//! Trait seams between the indexing core and its collaborators.
//!
//! Producers hand the core records that implement [`IndexableRecord`]; the
//! core re-resolves references against the source of truth through
//! [`RecordStore`]. Both seams exist so the pipeline can be exercised with
//! mock implementations in tests.

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::StoreError;
use crate::reference::{DocumentReference, RecordKind};

/// Capability interface every indexable backing record must implement.
///
/// This is the seam between the business-logic layer that decides *which*
/// records changed and the indexing core that writes them out.
pub trait IndexableRecord: Send + Sync {
    /// The kind of record, used to resolve its target index alias.
    fn record_kind(&self) -> RecordKind;

    /// Primary key in the source-of-truth store.
    fn database_id(&self) -> i64;

    /// Stable identifier inside the search engine. May be a composite key
    /// and therefore differ from [`Self::database_id`].
    fn document_id(&self) -> String;

    /// Shard routing key. Required for kinds where
    /// [`RecordKind::routing_required`] is true, absent otherwise.
    fn routing(&self) -> Option<String> {
        None
    }

    /// Whether the record still matches indexing-eligibility policy.
    ///
    /// Returning false instructs the indexer to remove the document instead
    /// of writing it.
    fn search_eligible(&self) -> bool {
        true
    }

    /// The record's indexed JSON representation, or `None` to signal that
    /// there is nothing to index (skip, do not write an empty document).
    fn as_indexed_json(&self) -> Option<Value>;
}

/// Read access to the authoritative relational store.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` to allow sharing across async tasks.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Fetch the backing record for a reference.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(record))` - The record still exists.
    /// * `Ok(None)` - The record is gone; the reference resolves to a delete.
    /// * `Err(StoreError)` - The store could not be queried; the reference
    ///   should be treated as retryable, not as a delete.
    async fn find(
        &self,
        reference: &DocumentReference,
    ) -> Result<Option<Box<dyn IndexableRecord>>, StoreError>;
}
