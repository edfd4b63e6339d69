//! Homebase Core Library
//!
//! Shared models and sync protocol types for Homebase servers and clients.

pub mod models;
pub mod sync;

pub use models::{
    Calendar, CalendarEvent, CalendarVisibility, Contact, EventStatus, ShoppingItem, ShoppingList,
    SyncEntity, TaskItem, TaskList, TaskPriority, TaskStatus,
};
pub use sync::{
    ChangeOperation, EntityKind, PullRequest, PullResponse, PushRequest, PushResponse,
    Resolution, Snapshot, SnapshotError, SyncChangeEntry, SyncConflict, SyncPushEntry,
};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
