//! Fixtures shared by the sync engine tests.

use chrono::{DateTime, TimeZone, Utc};
use homebase_core::sync::to_snapshot;
use homebase_core::{ChangeOperation, EntityKind, SyncEntity, SyncPushEntry};
use sqlx::SqlitePool;
use std::sync::Arc;
use tempfile::TempDir;
use uuid::Uuid;

use super::{EntityRegistry, FixedClock, SyncEngine};
use crate::db::{init_db, ChangeLedger, NewChange};

pub(crate) struct Harness {
    pub engine: SyncEngine,
    pub clock: Arc<FixedClock>,
    pub pool: SqlitePool,
    _temp_dir: TempDir,
}

/// Fresh database and an engine whose clock stands at [`t0`].
pub(crate) async fn harness() -> Harness {
    let temp_dir = TempDir::new().unwrap();
    let pool = init_db(&temp_dir.path().join("test.db")).await.unwrap();
    let clock = Arc::new(FixedClock::new(t0()));
    let engine = SyncEngine::new(
        pool.clone(),
        Arc::new(EntityRegistry::standard()),
        clock.clone(),
    );

    Harness {
        engine,
        clock,
        pool,
        _temp_dir: temp_dir,
    }
}

pub(crate) fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
}

/// Appends a bare ledger entry without touching any entity table.
pub(crate) async fn seed_change(
    pool: &SqlitePool,
    kind: EntityKind,
    entity_id: Uuid,
    tenant_id: Option<Uuid>,
    timestamp: DateTime<Utc>,
) -> i64 {
    let mut conn = pool.acquire().await.unwrap();
    ChangeLedger::append(
        &mut conn,
        &NewChange {
            entity_kind: kind,
            entity_id,
            operation: ChangeOperation::Updated,
            tenant_id,
            space_id: None,
            timestamp,
        },
    )
    .await
    .unwrap()
}

pub(crate) fn created<E: SyncEntity>(entity: &E, timestamp: DateTime<Utc>) -> SyncPushEntry {
    SyncPushEntry::new(
        E::KIND,
        entity.id(),
        ChangeOperation::Created,
        timestamp,
        Some(to_snapshot(entity).unwrap()),
    )
}

pub(crate) fn updated<E: SyncEntity>(entity: &E, timestamp: DateTime<Utc>) -> SyncPushEntry {
    SyncPushEntry::new(
        E::KIND,
        entity.id(),
        ChangeOperation::Updated,
        timestamp,
        Some(to_snapshot(entity).unwrap()),
    )
}

pub(crate) fn deleted(kind: EntityKind, entity_id: Uuid, timestamp: DateTime<Utc>) -> SyncPushEntry {
    SyncPushEntry::new(kind, entity_id, ChangeOperation::Deleted, timestamp, None)
}
