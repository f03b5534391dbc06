//! Index lifecycle error types.

use thiserror::Error;

use crate::errors::SearchError;

/// Errors that can occur during index lifecycle operations.
///
/// Lifecycle errors indicate caller sequencing bugs (creating an index that
/// already exists, switching an alias nothing resolves through), not
/// transient conditions, and are therefore raised rather than swallowed.
#[derive(Error, Debug)]
pub enum SearchIndexError {
    /// An index or alias with this name already exists.
    #[error("Index or alias '{0}' already exists")]
    AlreadyExists(String),

    /// No write index could be resolved for the alias.
    #[error("No write index resolved for alias '{0}'")]
    NoWriteIndex(String),

    /// Alias metadata came back in an unexpected shape.
    #[error("Alias resolution error: {0}")]
    AliasResolution(String),

    /// A reindex task could not be started or inspected.
    #[error("Reindex task error: {0}")]
    Task(String),

    /// Underlying transport error.
    #[error(transparent)]
    Search(#[from] SearchError),
}

impl SearchIndexError {
    /// Create an already-exists error.
    pub fn already_exists(name: impl Into<String>) -> Self {
        Self::AlreadyExists(name.into())
    }

    /// Create an alias resolution error.
    pub fn alias_resolution(msg: impl Into<String>) -> Self {
        Self::AliasResolution(msg.into())
    }

    /// Create a task error.
    pub fn task(msg: impl Into<String>) -> Self {
        Self::Task(msg.into())
    }
}
