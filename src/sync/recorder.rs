use chrono::{DateTime, Utc};
use homebase_core::{ChangeOperation, EntityKind};
use sqlx::SqliteConnection;
use std::sync::Arc;
use uuid::Uuid;

use super::{Clock, EntityRecord};
use crate::db::{ChangeLedger, DbError, NewChange};

/// Appends ledger entries stamped with server time.
///
/// Callers pass the connection of the transaction that performed the entity
/// write, so the entry commits or rolls back together with it.
#[derive(Clone)]
pub struct ChangeRecorder {
    clock: Arc<dyn Clock>,
}

impl ChangeRecorder {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Records `operation` on `record` and returns the new ledger id.
    pub async fn record(
        &self,
        conn: &mut SqliteConnection,
        kind: EntityKind,
        operation: ChangeOperation,
        record: &EntityRecord,
    ) -> Result<i64, DbError> {
        self.record_change(
            conn,
            NewChange {
                entity_kind: kind,
                entity_id: record.id,
                operation,
                tenant_id: record.tenant_id,
                space_id: record.space_id,
                timestamp: self.now(),
            },
        )
        .await
    }

    pub async fn record_change(
        &self,
        conn: &mut SqliteConnection,
        change: NewChange,
    ) -> Result<i64, DbError> {
        let id = ChangeLedger::append(conn, &change).await?;
        tracing::debug!(
            "Recorded {} {} {} as ledger entry {}",
            change.operation,
            change.entity_kind,
            change.entity_id,
            id
        );
        Ok(id)
    }

    /// Convenience for callers holding only the entity's identity.
    pub async fn record_identity(
        &self,
        conn: &mut SqliteConnection,
        kind: EntityKind,
        entity_id: Uuid,
        operation: ChangeOperation,
        tenant_id: Option<Uuid>,
        space_id: Option<Uuid>,
    ) -> Result<i64, DbError> {
        self.record_change(
            conn,
            NewChange {
                entity_kind: kind,
                entity_id,
                operation,
                tenant_id,
                space_id,
                timestamp: self.now(),
            },
        )
        .await
    }
}
