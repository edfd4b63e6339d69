//! Snapshot codec error types.

use thiserror::Error;

use super::EntityKind;

/// Errors produced while converting between entities and snapshots.
#[derive(Error, Debug)]
pub enum SnapshotError {
    /// A required field is missing or a value has the wrong shape.
    #[error("Failed to decode {kind} snapshot: {source}")]
    Decode {
        kind: EntityKind,
        #[source]
        source: serde_json::Error,
    },

    /// The entity did not serialize to a JSON object.
    #[error("Failed to encode {kind} snapshot: {reason}")]
    Encode { kind: EntityKind, reason: String },
}
