//! Kind-tag to entity-store dispatch.
//!
//! Each entity kind is served by one [`EntityHandler`], usually the generic
//! [`StoreHandler`] wrapped around that kind's [`EntityStore`]. Handlers work
//! on snapshots and [`EntityRecord`]s so the pull and push engines never name
//! a concrete entity type.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use homebase_core::sync::{from_snapshot, to_snapshot};
use homebase_core::{EntityKind, Snapshot, SyncEntity};
use serde_json::Value;
use sqlx::SqliteConnection;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

use super::SyncError;
use crate::db::{
    CalendarEventStore, CalendarStore, ContactStore, EntityStore, ShoppingItemStore,
    ShoppingListStore, TaskItemStore, TaskListStore,
};

/// Type-erased view of a stored entity.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityRecord {
    pub id: Uuid,
    pub tenant_id: Option<Uuid>,
    pub space_id: Option<Uuid>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub snapshot: Snapshot,
}

impl EntityRecord {
    pub fn from_entity<E: SyncEntity>(entity: &E) -> Result<Self, SyncError> {
        Ok(Self {
            id: entity.id(),
            tenant_id: entity.tenant_id(),
            space_id: entity.space_id(),
            deleted_at: entity.deleted_at(),
            snapshot: to_snapshot(entity)?,
        })
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Storage operations for one entity kind.
#[async_trait]
pub trait EntityHandler: Send + Sync {
    fn kind(&self) -> EntityKind;

    /// Decodes `snapshot` as entity `id` and encodes it again, yielding the
    /// form the entity would have once stored.
    fn canonicalize(&self, id: Uuid, snapshot: &Snapshot) -> Result<Snapshot, SyncError>;

    /// Loads by id, soft-deleted rows included.
    async fn load_by_ids(
        &self,
        conn: &mut SqliteConnection,
        ids: &[Uuid],
    ) -> Result<Vec<EntityRecord>, SyncError>;

    async fn load_by_id(
        &self,
        conn: &mut SqliteConnection,
        id: Uuid,
    ) -> Result<Option<EntityRecord>, SyncError>;

    /// Inserts a new entity with the given id and owner.
    async fn insert(
        &self,
        conn: &mut SqliteConnection,
        id: Uuid,
        snapshot: &Snapshot,
        tenant_id: Option<Uuid>,
    ) -> Result<EntityRecord, SyncError>;

    /// Replaces every scalar field of `existing` with the snapshot's values.
    /// The owner is kept.
    async fn overwrite_scalars(
        &self,
        conn: &mut SqliteConnection,
        existing: &EntityRecord,
        snapshot: &Snapshot,
    ) -> Result<EntityRecord, SyncError>;

    /// Soft-deletes a live row. Returns false when it is missing or already
    /// deleted.
    async fn mark_deleted(
        &self,
        conn: &mut SqliteConnection,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<bool, SyncError>;
}

/// Adapts an [`EntityStore`] to [`EntityHandler`].
pub struct StoreHandler<S> {
    store: S,
}

impl<S: EntityStore> StoreHandler<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    fn decode(id: Uuid, snapshot: &Snapshot) -> Result<S::Entity, SyncError> {
        // The entry's id is authoritative over any id inside the snapshot.
        let mut snapshot = snapshot.clone();
        snapshot.insert("id".to_string(), Value::String(id.to_string()));
        Ok(from_snapshot::<S::Entity>(&snapshot)?)
    }
}

#[async_trait]
impl<S: EntityStore> EntityHandler for StoreHandler<S> {
    fn kind(&self) -> EntityKind {
        <S::Entity as SyncEntity>::KIND
    }

    fn canonicalize(&self, id: Uuid, snapshot: &Snapshot) -> Result<Snapshot, SyncError> {
        Ok(to_snapshot(&Self::decode(id, snapshot)?)?)
    }

    async fn load_by_ids(
        &self,
        conn: &mut SqliteConnection,
        ids: &[Uuid],
    ) -> Result<Vec<EntityRecord>, SyncError> {
        self.store
            .load_by_ids_unfiltered(conn, ids)
            .await?
            .iter()
            .map(EntityRecord::from_entity)
            .collect()
    }

    async fn load_by_id(
        &self,
        conn: &mut SqliteConnection,
        id: Uuid,
    ) -> Result<Option<EntityRecord>, SyncError> {
        self.store
            .load_by_id_unfiltered(conn, id)
            .await?
            .as_ref()
            .map(EntityRecord::from_entity)
            .transpose()
    }

    async fn insert(
        &self,
        conn: &mut SqliteConnection,
        id: Uuid,
        snapshot: &Snapshot,
        tenant_id: Option<Uuid>,
    ) -> Result<EntityRecord, SyncError> {
        let mut entity = Self::decode(id, snapshot)?;
        entity.set_tenant_id(tenant_id);
        self.store.insert(conn, &entity).await?;
        EntityRecord::from_entity(&entity)
    }

    async fn overwrite_scalars(
        &self,
        conn: &mut SqliteConnection,
        existing: &EntityRecord,
        snapshot: &Snapshot,
    ) -> Result<EntityRecord, SyncError> {
        let mut entity = Self::decode(existing.id, snapshot)?;
        entity.set_tenant_id(existing.tenant_id);
        self.store.overwrite(conn, &entity).await?;
        EntityRecord::from_entity(&entity)
    }

    async fn mark_deleted(
        &self,
        conn: &mut SqliteConnection,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<bool, SyncError> {
        Ok(self.store.mark_deleted(conn, id, at).await?)
    }
}

/// Lookup table from entity kind to handler, built once at startup.
#[derive(Default, Clone)]
pub struct EntityRegistry {
    handlers: HashMap<EntityKind, Arc<dyn EntityHandler>>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry serving every built-in entity kind.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.register(CalendarStore);
        registry.register(CalendarEventStore);
        registry.register(TaskListStore);
        registry.register(TaskItemStore);
        registry.register(ContactStore);
        registry.register(ShoppingListStore);
        registry.register(ShoppingItemStore);
        registry
    }

    pub fn register<S: EntityStore>(&mut self, store: S) {
        self.register_handler(Arc::new(StoreHandler::new(store)));
    }

    /// Registers a handler, replacing any previous one for its kind.
    pub fn register_handler(&mut self, handler: Arc<dyn EntityHandler>) {
        self.handlers.insert(handler.kind(), handler);
    }

    pub fn lookup(&self, kind: EntityKind) -> Result<&dyn EntityHandler, SyncError> {
        self.handlers
            .get(&kind)
            .map(|handler| handler.as_ref())
            .ok_or(SyncError::UnsupportedKind(kind))
    }

    /// Resolves a raw wire tag to its kind and handler.
    pub fn resolve(&self, tag: &str) -> Result<(EntityKind, &dyn EntityHandler), SyncError> {
        let kind = EntityKind::from_str(tag)
            .map_err(|_| SyncError::UnknownEntityKind(tag.to_string()))?;
        Ok((kind, self.lookup(kind)?))
    }

    pub fn kinds(&self) -> impl Iterator<Item = EntityKind> + '_ {
        self.handlers.keys().copied()
    }
}
