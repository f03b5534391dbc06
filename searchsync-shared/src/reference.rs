//! Document reference identity and serialization.
//!
//! A [`DocumentReference`] is the ephemeral work item linking a
//! source-of-truth record to its search-engine representation. Its serialized
//! form is what producers push onto durable queues, so the encoding must be
//! deterministic, lossless, and tolerant of the legacy delimiter still
//! present in older queue entries.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::{ReferenceError, StoreError};
use crate::record::{IndexableRecord, RecordStore};

/// Canonical field delimiter for serialized references.
///
/// Reserved: no field value may contain it.
pub const DELIMITER: char = '|';

/// Legacy delimiter, accepted on read for queue entries serialized before the
/// canonical delimiter was introduced.
pub const LEGACY_DELIMITER: char = ' ';

/// The closed set of record kinds the system indexes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordKind {
    Issue,
    MergeRequest,
    Note,
    Project,
    Vulnerability,
}

impl RecordKind {
    /// Every kind, in alias order. Used when provisioning or iterating all
    /// indices.
    pub const ALL: [RecordKind; 5] = [
        Self::Issue,
        Self::MergeRequest,
        Self::Note,
        Self::Project,
        Self::Vulnerability,
    ];

    /// Stable token used in serialized references.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Issue => "Issue",
            Self::MergeRequest => "MergeRequest",
            Self::Note => "Note",
            Self::Project => "Project",
            Self::Vulnerability => "Vulnerability",
        }
    }

    /// Parse a serialized kind token.
    pub fn parse(token: &str) -> Result<Self, ReferenceError> {
        match token {
            "Issue" => Ok(Self::Issue),
            "MergeRequest" => Ok(Self::MergeRequest),
            "Note" => Ok(Self::Note),
            "Project" => Ok(Self::Project),
            "Vulnerability" => Ok(Self::Vulnerability),
            other => Err(ReferenceError::invalid_record(format!(
                "unknown record kind '{}'",
                other
            ))),
        }
    }

    /// The alias this kind's documents are written through.
    pub fn index_alias(&self) -> &'static str {
        match self {
            Self::Issue => "issues",
            Self::MergeRequest => "merge_requests",
            Self::Note => "notes",
            Self::Project => "projects",
            Self::Vulnerability => "vulnerabilities",
        }
    }

    /// Whether documents of this kind must carry a shard routing key.
    ///
    /// Project-scoped kinds are routed so that a project's documents land on
    /// the same shard; top-level kinds are not.
    pub fn routing_required(&self) -> bool {
        match self {
            Self::Issue | Self::MergeRequest | Self::Note | Self::Vulnerability => true,
            Self::Project => false,
        }
    }

    /// The write semantics used when the backing record exists.
    ///
    /// Vulnerability documents aggregate fields maintained by multiple
    /// writers, so they are merged (`doc_as_upsert`) rather than replaced.
    pub fn default_operation(&self) -> Operation {
        match self {
            Self::Vulnerability => Operation::Upsert,
            Self::Issue | Self::MergeRequest | Self::Note | Self::Project => Operation::Index,
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The write operation a reference resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Fully replace the document.
    Index,
    /// Merge into the existing document, creating it if absent.
    Upsert,
    /// Remove the document by id.
    Delete,
}

/// Identity of "a record that should exist (or not) in the search index".
///
/// References are immutable once created. They are built by producers at the
/// moment a record changes and consumed exactly once by the bulk indexer; the
/// core never persists them, but producers may queue their serialized form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentReference {
    /// Kind of the backing record; resolves the target index alias.
    pub record_kind: RecordKind,
    /// Primary key of the backing record in the source of truth.
    pub database_id: i64,
    /// Stable identifier inside the search engine.
    pub document_id: String,
    /// Shard routing key, present only for routed kinds.
    pub routing: Option<String>,
}

impl DocumentReference {
    /// Create a reference from its parts.
    pub fn new(
        record_kind: RecordKind,
        database_id: i64,
        document_id: impl Into<String>,
        routing: Option<String>,
    ) -> Self {
        Self {
            record_kind,
            database_id,
            document_id: document_id.into(),
            routing,
        }
    }

    /// Build a reference from a live backing record.
    pub fn build(record: &dyn IndexableRecord) -> Self {
        Self::new(
            record.record_kind(),
            record.database_id(),
            record.document_id(),
            record.routing(),
        )
    }

    /// Serialize to the canonical delimiter-joined queue form.
    ///
    /// Routing is omitted (3-field form) when absent.
    pub fn serialize(&self) -> String {
        match &self.routing {
            Some(routing) => format!(
                "{}{d}{}{d}{}{d}{}",
                self.record_kind,
                self.database_id,
                self.document_id,
                routing,
                d = DELIMITER
            ),
            None => format!(
                "{}{d}{}{d}{}",
                self.record_kind,
                self.database_id,
                self.document_id,
                d = DELIMITER
            ),
        }
    }

    /// Parse a serialized reference.
    ///
    /// Probes for the canonical delimiter first and falls back to the legacy
    /// space delimiter. Anything else fails loudly rather than degrading.
    pub fn deserialize(raw: &str) -> Result<Self, ReferenceError> {
        let delimiter = if raw.contains(DELIMITER) {
            DELIMITER
        } else {
            LEGACY_DELIMITER
        };

        let fields: Vec<&str> = raw.split(delimiter).collect();
        let (kind, database_id, document_id, routing) = match fields.as_slice() {
            [kind, database_id, document_id] => (kind, database_id, document_id, None),
            [kind, database_id, document_id, routing] => {
                if routing.is_empty() {
                    return Err(ReferenceError::malformed(format!(
                        "empty routing field in '{}'",
                        raw
                    )));
                }
                (kind, database_id, document_id, Some(routing.to_string()))
            }
            _ => {
                return Err(ReferenceError::malformed(format!(
                    "expected 3 or 4 fields, got {} in '{}'",
                    fields.len(),
                    raw
                )));
            }
        };

        let record_kind = RecordKind::parse(kind)?;
        let database_id = database_id.parse::<i64>().map_err(|_| {
            ReferenceError::malformed(format!("database id '{}' is not an integer", database_id))
        })?;

        Ok(Self::new(record_kind, database_id, *document_id, routing))
    }

    /// Resolve the operation this reference currently calls for.
    ///
    /// The one place in this type with I/O: the backing record is looked up
    /// in the source of truth, and absence means the document must be
    /// deleted.
    pub async fn operation(&self, store: &dyn RecordStore) -> Result<Operation, StoreError> {
        Ok(match store.find(self).await? {
            None => Operation::Delete,
            Some(_) => self.record_kind.default_operation(),
        })
    }
}

impl fmt::Display for DocumentReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.serialize())
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_serialize_with_routing() {
        let reference =
            DocumentReference::new(RecordKind::Issue, 42, "issue_42", Some("project_7".into()));
        assert_eq!(reference.serialize(), "Issue|42|issue_42|project_7");
    }

    #[test]
    fn test_serialize_without_routing() {
        let reference = DocumentReference::new(RecordKind::Project, 7, "project_7", None);
        assert_eq!(reference.serialize(), "Project|7|project_7");
    }

    #[test]
    fn test_round_trip_canonical() {
        let reference = DocumentReference::new(
            RecordKind::Vulnerability,
            99,
            "vulnerability_99",
            Some("project_3".into()),
        );
        let raw = reference.serialize();

        assert_eq!(DocumentReference::deserialize(&raw).unwrap(), reference);
        // String-level round trip for canonical forms.
        assert_eq!(
            DocumentReference::deserialize(&raw).unwrap().serialize(),
            raw
        );
    }

    #[test]
    fn test_deserialize_legacy_delimiter() {
        let reference = DocumentReference::deserialize("Issue 42 issue_42 project_7").unwrap();

        assert_eq!(reference.record_kind, RecordKind::Issue);
        assert_eq!(reference.database_id, 42);
        assert_eq!(reference.document_id, "issue_42");
        assert_eq!(reference.routing, Some("project_7".to_string()));
        // Re-serialization upgrades legacy entries to the canonical delimiter.
        assert_eq!(reference.serialize(), "Issue|42|issue_42|project_7");
    }

    #[test]
    fn test_deserialize_three_field_form() {
        let reference = DocumentReference::deserialize("Project|7|project_7").unwrap();

        assert_eq!(reference.record_kind, RecordKind::Project);
        assert!(reference.routing.is_none());
    }

    #[test]
    fn test_deserialize_rejects_wrong_field_count() {
        let err = DocumentReference::deserialize("Issue|42").unwrap_err();
        assert!(matches!(err, ReferenceError::MalformedReference(_)));

        let err = DocumentReference::deserialize("Issue|42|a|b|c").unwrap_err();
        assert!(matches!(err, ReferenceError::MalformedReference(_)));
    }

    #[test]
    fn test_deserialize_rejects_unknown_kind() {
        let err = DocumentReference::deserialize("Widget|42|widget_42").unwrap_err();
        assert!(matches!(err, ReferenceError::InvalidRecord(_)));
    }

    #[test]
    fn test_deserialize_rejects_non_integer_id() {
        let err = DocumentReference::deserialize("Issue|forty-two|issue_42").unwrap_err();
        assert!(matches!(err, ReferenceError::MalformedReference(_)));
    }

    #[test]
    fn test_deserialize_rejects_empty_routing() {
        let err = DocumentReference::deserialize("Issue|42|issue_42|").unwrap_err();
        assert!(matches!(err, ReferenceError::MalformedReference(_)));
    }

    #[test]
    fn test_kind_aliases_and_routing_policy() {
        assert_eq!(RecordKind::Issue.index_alias(), "issues");
        assert_eq!(RecordKind::Vulnerability.index_alias(), "vulnerabilities");
        assert!(RecordKind::Issue.routing_required());
        assert!(!RecordKind::Project.routing_required());
    }

    #[test]
    fn test_default_operation_policy() {
        assert_eq!(
            RecordKind::Vulnerability.default_operation(),
            Operation::Upsert
        );
        assert_eq!(RecordKind::Issue.default_operation(), Operation::Index);
        assert_eq!(RecordKind::Project.default_operation(), Operation::Index);
    }

    struct FakeRecord;

    impl IndexableRecord for FakeRecord {
        fn record_kind(&self) -> RecordKind {
            RecordKind::Issue
        }

        fn database_id(&self) -> i64 {
            42
        }

        fn document_id(&self) -> String {
            "issue_42".to_string()
        }

        fn routing(&self) -> Option<String> {
            Some("project_7".to_string())
        }

        fn as_indexed_json(&self) -> Option<serde_json::Value> {
            Some(json!({"id": 42}))
        }
    }

    struct FakeStore {
        present: bool,
    }

    #[async_trait]
    impl RecordStore for FakeStore {
        async fn find(
            &self,
            _reference: &DocumentReference,
        ) -> Result<Option<Box<dyn IndexableRecord>>, StoreError> {
            if self.present {
                Ok(Some(Box::new(FakeRecord)))
            } else {
                Ok(None)
            }
        }
    }

    #[test]
    fn test_build_from_record() {
        let reference = DocumentReference::build(&FakeRecord);

        assert_eq!(reference.record_kind, RecordKind::Issue);
        assert_eq!(reference.database_id, 42);
        assert_eq!(reference.document_id, "issue_42");
        assert_eq!(reference.routing, Some("project_7".to_string()));
    }

    #[tokio::test]
    async fn test_operation_resolves_delete_for_missing_record() {
        let reference = DocumentReference::build(&FakeRecord);
        let store = FakeStore { present: false };

        assert_eq!(
            reference.operation(&store).await.unwrap(),
            Operation::Delete
        );
    }

    #[tokio::test]
    async fn test_operation_resolves_kind_default_for_live_record() {
        let reference = DocumentReference::build(&FakeRecord);
        let store = FakeStore { present: true };

        assert_eq!(reference.operation(&store).await.unwrap(), Operation::Index);
    }
}
