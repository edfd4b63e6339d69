//! Wire types for the pull and push endpoints.
//!
//! Field names use camelCase on the wire.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::Snapshot;

/// Page size used when a pull does not ask for one.
pub const DEFAULT_PULL_LIMIT: i64 = 1000;

/// Upper bound on a single pull page.
pub const MAX_PULL_LIMIT: i64 = 1000;

/// Stable wire tag identifying a concrete entity shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Calendar,
    CalendarEvent,
    TaskList,
    TaskItem,
    Contact,
    ShoppingList,
    ShoppingItem,
}

impl EntityKind {
    pub const ALL: [EntityKind; 7] = [
        EntityKind::Calendar,
        EntityKind::CalendarEvent,
        EntityKind::TaskList,
        EntityKind::TaskItem,
        EntityKind::Contact,
        EntityKind::ShoppingList,
        EntityKind::ShoppingItem,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Calendar => "calendar",
            EntityKind::CalendarEvent => "calendar_event",
            EntityKind::TaskList => "task_list",
            EntityKind::TaskItem => "task_item",
            EntityKind::Contact => "contact",
            EntityKind::ShoppingList => "shopping_list",
            EntityKind::ShoppingItem => "shopping_item",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EntityKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("Unknown entity kind '{}'", s))
    }
}

/// What a ledger entry did to its entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeOperation {
    Created,
    Updated,
    Deleted,
}

impl ChangeOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeOperation::Created => "created",
            ChangeOperation::Updated => "updated",
            ChangeOperation::Deleted => "deleted",
        }
    }
}

impl fmt::Display for ChangeOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for ChangeOperation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "created" => Ok(ChangeOperation::Created),
            "updated" => Ok(ChangeOperation::Updated),
            "deleted" => Ok(ChangeOperation::Deleted),
            _ => Err(format!(
                "Invalid operation '{}'. Valid options: created, updated, deleted",
                s
            )),
        }
    }
}

/// One ledger entry as returned by a pull.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SyncChangeEntry {
    pub id: i64,
    pub entity_kind: EntityKind,
    pub entity_id: Uuid,
    pub operation: ChangeOperation,
    pub tenant_id: Option<Uuid>,
    pub space_id: Option<Uuid>,
    pub timestamp: DateTime<Utc>,
    /// Current state of the entity. Always `None` for deletes, and also
    /// `None` when the row could not be found at pull time.
    pub data: Option<Snapshot>,
}

/// One client mutation submitted by a push.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SyncPushEntry {
    /// Raw wire tag; an unknown tag skips this entry only.
    pub entity_kind: String,
    pub entity_id: Uuid,
    pub operation: ChangeOperation,
    /// Client wall clock at the time of the mutation.
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Snapshot>,
}

impl SyncPushEntry {
    pub fn new(
        kind: EntityKind,
        entity_id: Uuid,
        operation: ChangeOperation,
        timestamp: DateTime<Utc>,
        data: Option<Snapshot>,
    ) -> Self {
        Self {
            entity_kind: kind.as_str().to_string(),
            entity_id,
            operation,
            timestamp,
            data,
        }
    }
}

/// A push entry rejected because the server holds a newer change.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SyncConflict {
    pub entity_kind: String,
    pub entity_id: Uuid,
    pub client_timestamp: DateTime<Utc>,
    pub server_timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct PullRequest {
    pub cursor: Option<i64>,
    pub space_id: Option<Uuid>,
    pub limit: Option<i32>,
}

impl PullRequest {
    pub fn cursor(&self) -> i64 {
        self.cursor.unwrap_or(0)
    }

    /// Requested page size clamped to `[1, MAX_PULL_LIMIT]`.
    pub fn effective_limit(&self) -> i64 {
        self.limit
            .map(|limit| i64::from(limit).clamp(1, MAX_PULL_LIMIT))
            .unwrap_or(DEFAULT_PULL_LIMIT)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PullResponse {
    pub changes: Vec<SyncChangeEntry>,
    pub cursor: i64,
    pub has_more: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct PushRequest {
    pub changes: Vec<SyncPushEntry>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PushResponse {
    pub applied_count: i32,
    pub rejected_count: i32,
    /// Entries neither applied nor rejected (unknown kind, undecodable or
    /// missing snapshot, missing update target).
    #[serde(default)]
    pub skipped_count: i32,
    pub conflicts: Vec<SyncConflict>,
}
