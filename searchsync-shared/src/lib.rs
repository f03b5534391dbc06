//! # Searchsync Shared
//!
//! Shared types and trait seams for the searchsync indexing system.
//!
//! This crate defines the identity of indexable work items
//! ([`DocumentReference`]), the closed set of record kinds the system indexes,
//! and the two seams to the outside world: [`IndexableRecord`] (what a backing
//! record must expose to be indexed) and [`RecordStore`] (how a reference is
//! resolved against the source of truth).

pub mod errors;
pub mod record;
pub mod reference;

pub use errors::{ReferenceError, StoreError};
pub use record::{IndexableRecord, RecordStore};
pub use reference::{DocumentReference, Operation, RecordKind};
