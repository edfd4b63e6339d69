//! Domain models for the organizer.
//!
//! Every model is a flat record of scalar fields plus, for some kinds,
//! relationship collections and computed values that are populated by the
//! application services and never travel over the sync protocol.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

use crate::sync::EntityKind;

/// An entity that can be recorded in the change ledger and carried in a
/// sync snapshot.
pub trait SyncEntity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Wire tag of this entity shape.
    const KIND: EntityKind;

    fn id(&self) -> Uuid;

    fn set_id(&mut self, id: Uuid);

    /// Owning tenant. `None` marks a globally visible entity.
    fn tenant_id(&self) -> Option<Uuid>;

    fn set_tenant_id(&mut self, tenant_id: Option<Uuid>);

    fn space_id(&self) -> Option<Uuid>;

    fn deleted_at(&self) -> Option<DateTime<Utc>>;

    fn is_deleted(&self) -> bool {
        self.deleted_at().is_some()
    }
}

/// Implements the bookkeeping half of [`SyncEntity`] for a model that carries
/// the standard `id` / `tenant_id` / `space_id` / `deleted_at` fields.
macro_rules! sync_entity {
    ($ty:ty, $kind:expr) => {
        impl $crate::models::SyncEntity for $ty {
            const KIND: $crate::sync::EntityKind = $kind;

            fn id(&self) -> uuid::Uuid {
                self.id
            }

            fn set_id(&mut self, id: uuid::Uuid) {
                self.id = id;
            }

            fn tenant_id(&self) -> Option<uuid::Uuid> {
                self.tenant_id
            }

            fn set_tenant_id(&mut self, tenant_id: Option<uuid::Uuid>) {
                self.tenant_id = tenant_id;
            }

            fn space_id(&self) -> Option<uuid::Uuid> {
                self.space_id
            }

            fn deleted_at(&self) -> Option<chrono::DateTime<chrono::Utc>> {
                self.deleted_at
            }
        }
    };
}

mod calendar;
mod contact;
mod shopping;
mod task;

pub use calendar::{Calendar, CalendarEvent, CalendarVisibility, EventStatus};
pub use contact::Contact;
pub use shopping::{ShoppingItem, ShoppingList};
pub use task::{TaskItem, TaskList, TaskPriority, TaskStatus};
