//! Entity ↔ snapshot conversion.
//!
//! A snapshot is the JSON object form of an entity's scalar fields.
//! Relationship collections and computed values are excluded by the models'
//! serde attributes; absent values are omitted rather than written as null.
//! Decoding relies on the concrete shape to know which fields are nullable,
//! so an omitted optional field decodes to `None` while `""` stays `""`.

use serde_json::{Map, Value};

use super::SnapshotError;
use crate::models::SyncEntity;

/// Scalar-only transport representation of an entity.
pub type Snapshot = Map<String, Value>;

/// Captures the scalar fields of `entity`.
pub fn to_snapshot<E: SyncEntity>(entity: &E) -> Result<Snapshot, SnapshotError> {
    let value = serde_json::to_value(entity).map_err(|e| SnapshotError::Encode {
        kind: E::KIND,
        reason: e.to_string(),
    })?;

    match value {
        Value::Object(mut map) => {
            map.retain(|_, v| !v.is_null());
            Ok(map)
        }
        other => Err(SnapshotError::Encode {
            kind: E::KIND,
            reason: format!("expected an object, got {}", other),
        }),
    }
}

/// Materializes an entity of type `E` from a snapshot.
pub fn from_snapshot<E: SyncEntity>(snapshot: &Snapshot) -> Result<E, SnapshotError> {
    serde_json::from_value(Value::Object(snapshot.clone())).map_err(|source| {
        SnapshotError::Decode {
            kind: E::KIND,
            source,
        }
    })
}
