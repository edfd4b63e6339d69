use homebase_core::{EntityKind, SnapshotError};
use thiserror::Error;

use crate::db::DbError;

#[derive(Error, Debug)]
pub enum SyncError {
    /// The wire tag names no entity kind.
    #[error("Unknown entity kind '{0}'")]
    UnknownEntityKind(String),

    /// The kind exists but no handler is registered for it.
    #[error("No handler registered for entity kind '{0}'")]
    UnsupportedKind(EntityKind),

    #[error(transparent)]
    Decode(#[from] SnapshotError),

    /// A stored ledger row could not be read back.
    #[error("Corrupt ledger value in {column}: {value}")]
    CorruptLedger { column: &'static str, value: String },

    #[error(transparent)]
    Storage(DbError),

    #[error("Sync operation cancelled")]
    Cancelled,
}

impl From<DbError> for SyncError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Corrupt { column, value } if column.starts_with("sync_change_log.") => {
                SyncError::CorruptLedger { column, value }
            }
            other => SyncError::Storage(other),
        }
    }
}

impl From<sqlx::Error> for SyncError {
    fn from(err: sqlx::Error) -> Self {
        SyncError::Storage(DbError::Sqlx(err))
    }
}
