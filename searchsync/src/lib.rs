//! # Searchsync
//!
//! Main library for the searchsync document indexing pipeline.
//!
//! This crate provides the entry point, configuration, and the index
//! cutover routine for operating the pipeline against a live cluster.

pub mod config;
pub mod cutover;

pub use config::Dependencies;

use thiserror::Error;

/// Errors that can occur during initialization or execution.
#[derive(Error, Debug)]
pub enum IndexingError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Cutover aborted before the alias switch.
    #[error("Cutover error: {0}")]
    CutoverError(String),

    /// Index lifecycle error.
    #[error("Index lifecycle error: {0}")]
    LifecycleError(#[from] searchsync_repository::SearchIndexError),

    /// Search error.
    #[error("Search error: {0}")]
    SearchError(#[from] searchsync_repository::SearchError),

    /// IO error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl IndexingError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Create a cutover error.
    pub fn cutover(msg: impl Into<String>) -> Self {
        Self::CutoverError(msg.into())
    }
}
