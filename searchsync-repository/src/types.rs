//! Wire types for the bulk write API.
//!
//! The bulk endpoint returns an ordered array of per-item results, one per
//! operation group submitted, in submission order. That ordering is what lets
//! the indexer attribute failures back to the references it buffered.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;

/// Response to a bulk write request.
#[derive(Debug, Clone, Deserialize)]
pub struct BulkResponse {
    /// Milliseconds the engine spent on the request.
    #[serde(default)]
    pub took: u64,
    /// True if any item carries an error.
    pub errors: bool,
    /// Per-item results, in the same order operations were submitted.
    pub items: Vec<BulkResponseItem>,
}

/// One bulk item result, keyed by the operation name
/// (`index`, `create`, `update`, or `delete`).
#[derive(Debug, Clone, Deserialize)]
#[serde(transparent)]
pub struct BulkResponseItem(pub HashMap<String, BulkItemResult>);

impl BulkResponseItem {
    /// The item's result, whichever operation it was.
    pub fn result(&self) -> Option<&BulkItemResult> {
        self.0.values().next()
    }

    /// Whether this item failed.
    ///
    /// Only an explicit `error` object counts: a delete of a missing id
    /// comes back as a 404 with `result: "not_found"` and no error, and is a
    /// successful no-op.
    pub fn is_failure(&self) -> bool {
        self.result().map_or(true, |result| result.error.is_some())
    }
}

/// Result details for a single bulk operation.
#[derive(Debug, Clone, Deserialize)]
pub struct BulkItemResult {
    /// Physical index the operation landed in.
    #[serde(rename = "_index", default)]
    pub index: Option<String>,
    /// Document id the operation addressed.
    #[serde(rename = "_id", default)]
    pub id: Option<String>,
    /// HTTP-style status for this item.
    pub status: u16,
    /// Engine result string (`created`, `updated`, `deleted`, `not_found`).
    #[serde(default)]
    pub result: Option<String>,
    /// Error object, present only on failure.
    #[serde(default)]
    pub error: Option<Value>,
}
