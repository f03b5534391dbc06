//! Error types for document references and record resolution.

use thiserror::Error;

/// Errors that can occur while parsing or building document references.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReferenceError {
    /// The serialized form could not be parsed back into a reference.
    #[error("Malformed reference: {0}")]
    MalformedReference(String),

    /// The reference names a record kind the system does not index.
    #[error("Invalid record: {0}")]
    InvalidRecord(String),
}

impl ReferenceError {
    /// Create a malformed reference error.
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedReference(msg.into())
    }

    /// Create an invalid record error.
    pub fn invalid_record(msg: impl Into<String>) -> Self {
        Self::InvalidRecord(msg.into())
    }
}

/// Error returned when the source-of-truth store cannot be queried.
///
/// A store error says nothing about whether the record exists; callers
/// treat the affected reference as retryable.
#[derive(Error, Debug, Clone)]
#[error("Record store error: {0}")]
pub struct StoreError(String);

impl StoreError {
    /// Create a store error.
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}
