//! # Searchsync Repository
//!
//! This crate provides traits and implementations for interacting with the
//! search engine. It includes the narrow [`SearchEngineClient`] transport
//! seam, a concrete OpenSearch implementation, the bulk write wire types,
//! and the [`IndexManager`] that owns index naming, alias switching, and
//! reindex bookkeeping.

pub mod errors;
pub mod interfaces;
pub mod lifecycle;
pub mod opensearch;
pub mod types;

pub use errors::{SearchError, SearchIndexError};
pub use interfaces::SearchEngineClient;
pub use lifecycle::{CreateIndexOptions, IndexManager};
pub use opensearch::{index_mappings, index_settings, OpenSearchClient};
pub use types::{BulkItemResult, BulkResponse, BulkResponseItem};
