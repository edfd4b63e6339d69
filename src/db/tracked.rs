//! CRUD write path that keeps the change ledger in step with entity tables.

use homebase_core::{ChangeOperation, SyncEntity};
use sqlx::SqlitePool;
use uuid::Uuid;

use super::{DbError, EntityStore};
use crate::sync::{ChangeRecorder, TenantScope};

/// Wraps one [`EntityStore`] so that every create, update and delete also
/// appends a ledger entry in the same transaction.
pub struct TrackedRepository<S> {
    pool: SqlitePool,
    store: S,
    recorder: ChangeRecorder,
}

impl<S: EntityStore> TrackedRepository<S> {
    pub fn new(pool: SqlitePool, store: S, recorder: ChangeRecorder) -> Self {
        Self {
            pool,
            store,
            recorder,
        }
    }

    /// Stores a new entity owned by the caller's tenant. System callers keep
    /// whatever owner the entity already carries.
    pub async fn create(
        &self,
        scope: TenantScope,
        mut entity: S::Entity,
    ) -> Result<S::Entity, DbError> {
        if let TenantScope::Tenant(tenant_id) = scope {
            entity.set_tenant_id(Some(tenant_id));
        }

        let mut tx = self.pool.begin().await?;
        self.store.insert(&mut *tx, &entity).await?;
        self.recorder
            .record_identity(
                &mut *tx,
                <S::Entity as SyncEntity>::KIND,
                entity.id(),
                ChangeOperation::Created,
                entity.tenant_id(),
                entity.space_id(),
            )
            .await?;
        tx.commit().await?;

        Ok(entity)
    }

    /// Overwrites a live entity the caller may write. Returns false when
    /// there is no such entity.
    pub async fn update(&self, scope: TenantScope, mut entity: S::Entity) -> Result<bool, DbError> {
        let mut tx = self.pool.begin().await?;

        let existing = match self.store.load_by_id_unfiltered(&mut *tx, entity.id()).await? {
            Some(existing) if !existing.is_deleted() && scope.can_write(existing.tenant_id()) => {
                existing
            }
            _ => return Ok(false),
        };
        entity.set_tenant_id(existing.tenant_id());

        if !self.store.overwrite(&mut *tx, &entity).await? {
            return Ok(false);
        }
        self.recorder
            .record_identity(
                &mut *tx,
                <S::Entity as SyncEntity>::KIND,
                entity.id(),
                ChangeOperation::Updated,
                entity.tenant_id(),
                entity.space_id(),
            )
            .await?;
        tx.commit().await?;

        Ok(true)
    }

    /// Soft-deletes a live entity the caller may write, stamped with server
    /// time. Returns false when there is no such entity.
    pub async fn delete(&self, scope: TenantScope, id: Uuid) -> Result<bool, DbError> {
        let mut tx = self.pool.begin().await?;

        let existing = match self.store.load_by_id_unfiltered(&mut *tx, id).await? {
            Some(existing) if scope.can_write(existing.tenant_id()) => existing,
            _ => return Ok(false),
        };

        if !self
            .store
            .mark_deleted(&mut *tx, id, self.recorder.now())
            .await?
        {
            return Ok(false);
        }
        self.recorder
            .record_identity(
                &mut *tx,
                <S::Entity as SyncEntity>::KIND,
                id,
                ChangeOperation::Deleted,
                existing.tenant_id(),
                existing.space_id(),
            )
            .await?;
        tx.commit().await?;

        Ok(true)
    }

    /// A live entity visible to the caller.
    pub async fn get(&self, scope: TenantScope, id: Uuid) -> Result<Option<S::Entity>, DbError> {
        let mut conn = self.pool.acquire().await?;
        let entity = self.store.load_by_id_unfiltered(&mut *conn, id).await?;
        Ok(entity.filter(|e| !e.is_deleted() && scope.can_read(e.tenant_id())))
    }

    /// Every live entity visible to the caller.
    pub async fn list(&self, scope: TenantScope) -> Result<Vec<S::Entity>, DbError> {
        let mut conn = self.pool.acquire().await?;
        self.store.load_visible(&mut *conn, scope.tenant_id()).await
    }
}
