//! Per-kind index settings and mappings.
//!
//! This module defines the provisioning bodies used when the lifecycle
//! manager creates a physical index for a record kind. Field sets are
//! deliberately small: ids and routing as keywords for exact lookups,
//! title/description as analyzed text.

use serde_json::{json, Value};

use searchsync_shared::RecordKind;

/// Index settings for a record kind.
///
/// Notes carry by far the largest document volume and get more primary
/// shards; every other kind stays at one.
pub fn index_settings(kind: RecordKind) -> Value {
    let number_of_shards = match kind {
        RecordKind::Note => 5,
        _ => 1,
    };

    json!({
        "number_of_shards": number_of_shards,
        "number_of_replicas": 1
    })
}

/// Index mappings for a record kind.
pub fn index_mappings(kind: RecordKind) -> Value {
    let mut properties = json!({
        "id": { "type": "long" },
        "title": { "type": "text" },
        "description": { "type": "text" },
        "created_at": { "type": "date" },
        "updated_at": { "type": "date" }
    });

    if kind.routing_required() {
        properties["routing"] = json!({ "type": "keyword" });
        properties["project_id"] = json!({ "type": "long" });
    }

    match kind {
        RecordKind::Vulnerability => {
            properties["severity"] = json!({ "type": "keyword" });
            properties["state"] = json!({ "type": "keyword" });
        }
        RecordKind::Project => {
            properties["path"] = json!({ "type": "keyword" });
            properties["visibility_level"] = json!({ "type": "integer" });
        }
        RecordKind::Note => {
            properties["noteable_type"] = json!({ "type": "keyword" });
        }
        RecordKind::Issue | RecordKind::MergeRequest => {
            properties["state"] = json!({ "type": "keyword" });
            properties["iid"] = json!({ "type": "integer" });
        }
    }

    json!({ "properties": properties })
}
