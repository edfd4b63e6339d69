use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::sync::EntityKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Low,
    Normal,
    High,
    Urgent,
}

impl fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskPriority::Low => write!(f, "low"),
            TaskPriority::Normal => write!(f, "normal"),
            TaskPriority::High => write!(f, "high"),
            TaskPriority::Urgent => write!(f, "urgent"),
        }
    }
}

impl FromStr for TaskPriority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(TaskPriority::Low),
            "normal" => Ok(TaskPriority::Normal),
            "high" => Ok(TaskPriority::High),
            "urgent" => Ok(TaskPriority::Urgent),
            _ => Err(format!(
                "Invalid task priority '{}'. Valid options: low, normal, high, urgent",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Open,
    InProgress,
    Done,
    Cancelled,
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskStatus::Open => write!(f, "open"),
            TaskStatus::InProgress => write!(f, "in_progress"),
            TaskStatus::Done => write!(f, "done"),
            TaskStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "open" => Ok(TaskStatus::Open),
            "in_progress" => Ok(TaskStatus::InProgress),
            "done" => Ok(TaskStatus::Done),
            "cancelled" => Ok(TaskStatus::Cancelled),
            _ => Err(format!(
                "Invalid task status '{}'. Valid options: open, in_progress, done, cancelled",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskList {
    pub id: Uuid,
    #[serde(skip)]
    pub tenant_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub space_id: Option<Uuid>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub items: Vec<TaskItem>,
}

impl TaskList {
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            tenant_id: None,
            space_id: None,
            name: name.into(),
            color: None,
            sort_order: 0,
            created_at: now,
            updated_at: now,
            deleted_at: None,
            items: Vec::new(),
        }
    }

    pub fn with_tenant(mut self, tenant_id: Uuid) -> Self {
        self.tenant_id = Some(tenant_id);
        self
    }

    pub fn with_space(mut self, space_id: Uuid) -> Self {
        self.space_id = Some(space_id);
        self
    }

    /// Number of items that still need attention.
    pub fn open_count(&self) -> usize {
        self.items
            .iter()
            .filter(|item| matches!(item.status, TaskStatus::Open | TaskStatus::InProgress))
            .count()
    }
}

sync_entity!(TaskList, EntityKind::TaskList);

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskItem {
    pub id: Uuid,
    #[serde(skip)]
    pub tenant_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub space_id: Option<Uuid>,
    pub task_list_id: Uuid,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_at: Option<DateTime<Utc>>,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence_rule: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl TaskItem {
    pub fn new(task_list_id: Uuid, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            tenant_id: None,
            space_id: None,
            task_list_id,
            title: title.into(),
            notes: None,
            due_at: None,
            priority: TaskPriority::Normal,
            status: TaskStatus::Open,
            completed_at: None,
            recurrence_rule: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    pub fn with_tenant(mut self, tenant_id: Uuid) -> Self {
        self.tenant_id = Some(tenant_id);
        self
    }

    pub fn with_space(mut self, space_id: Uuid) -> Self {
        self.space_id = Some(space_id);
        self
    }

    pub fn with_due(mut self, due_at: DateTime<Utc>) -> Self {
        self.due_at = Some(due_at);
        self
    }

    pub fn with_priority(mut self, priority: TaskPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn complete(&mut self, at: DateTime<Utc>) {
        self.status = TaskStatus::Done;
        self.completed_at = Some(at);
    }

    /// Derived from `due_at` and `status`; never stored or synced.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        match self.due_at {
            Some(due) => due < now && !matches!(self.status, TaskStatus::Done | TaskStatus::Cancelled),
            None => false,
        }
    }
}

sync_entity!(TaskItem, EntityKind::TaskItem);

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_task_status_display_matches_wire() {
        for status in [
            TaskStatus::Open,
            TaskStatus::InProgress,
            TaskStatus::Done,
            TaskStatus::Cancelled,
        ] {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status));
            assert_eq!(TaskStatus::from_str(&status.to_string()).unwrap(), status);
        }
    }

    #[test]
    fn test_priority_from_str_invalid() {
        assert!(TaskPriority::from_str("whenever").is_err());
        assert!(TaskPriority::from_str("").is_err());
    }

    #[test]
    fn test_is_overdue() {
        let now = Utc::now();
        let mut item = TaskItem::new(Uuid::new_v4(), "File taxes").with_due(now - Duration::days(1));
        assert!(item.is_overdue(now));

        item.complete(now);
        assert!(!item.is_overdue(now));

        let undated = TaskItem::new(Uuid::new_v4(), "Someday");
        assert!(!undated.is_overdue(now));
    }

    #[test]
    fn test_open_count() {
        let mut list = TaskList::new("Chores");
        let mut done = TaskItem::new(list.id, "Dishes");
        done.complete(Utc::now());
        list.items = vec![TaskItem::new(list.id, "Laundry"), done];

        assert_eq!(list.open_count(), 1);
    }
}
