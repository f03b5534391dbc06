//! # Searchsync Pipeline
//!
//! This crate provides the bulk indexing pipeline: it accepts a stream of
//! document references, resolves each against the source of truth, batches
//! the resulting write operations under a byte ceiling, and reports which
//! references failed.
//!
//! ## Architecture
//!
//! A producer (out of scope here) converts changed records into
//! `DocumentReference`s and hands them to a [`BulkIndexer`]. The indexer
//! owns the accumulate/flush protocol; failed references are returned to the
//! producer for re-enqueueing. Retry and backoff policy belong to the
//! producer, never to this crate.

pub mod indexer;

pub use indexer::{BulkIndexer, BulkIndexerConfig};
