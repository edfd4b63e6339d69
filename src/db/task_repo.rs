use async_trait::async_trait;
use homebase_core::{TaskItem, TaskList};
use sqlx::SqliteConnection;

use super::store::{opt_timestamp, opt_uuid, EntityStore};
use super::{
    format_timestamp, parse_enum, parse_opt_timestamp, parse_opt_uuid, parse_timestamp,
    parse_uuid, DbError,
};

pub struct TaskListStore;

pub struct TaskItemStore;

#[derive(sqlx::FromRow)]
pub struct TaskListRow {
    id: String,
    tenant_id: Option<String>,
    space_id: Option<String>,
    name: String,
    color: Option<String>,
    sort_order: i32,
    created_at: String,
    updated_at: String,
    deleted_at: Option<String>,
}

#[derive(sqlx::FromRow)]
pub struct TaskItemRow {
    id: String,
    tenant_id: Option<String>,
    space_id: Option<String>,
    task_list_id: String,
    title: String,
    notes: Option<String>,
    due_at: Option<String>,
    priority: String,
    status: String,
    completed_at: Option<String>,
    recurrence_rule: Option<String>,
    created_at: String,
    updated_at: String,
    deleted_at: Option<String>,
}

#[async_trait]
impl EntityStore for TaskListStore {
    type Entity = TaskList;
    type Row = TaskListRow;

    const TABLE: &'static str = "task_lists";

    fn from_row(row: TaskListRow) -> Result<TaskList, DbError> {
        Ok(TaskList {
            id: parse_uuid("task_lists.id", &row.id)?,
            tenant_id: parse_opt_uuid("task_lists.tenant_id", row.tenant_id.as_deref())?,
            space_id: parse_opt_uuid("task_lists.space_id", row.space_id.as_deref())?,
            name: row.name,
            color: row.color,
            sort_order: row.sort_order,
            created_at: parse_timestamp("task_lists.created_at", &row.created_at)?,
            updated_at: parse_timestamp("task_lists.updated_at", &row.updated_at)?,
            deleted_at: parse_opt_timestamp("task_lists.deleted_at", row.deleted_at.as_deref())?,
            items: Vec::new(),
        })
    }

    async fn insert(&self, conn: &mut SqliteConnection, list: &TaskList) -> Result<(), DbError> {
        sqlx::query(
            r#"
            INSERT INTO task_lists (id, tenant_id, space_id, name, color, sort_order, created_at, updated_at, deleted_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(list.id.to_string())
        .bind(opt_uuid(list.tenant_id))
        .bind(opt_uuid(list.space_id))
        .bind(&list.name)
        .bind(&list.color)
        .bind(list.sort_order)
        .bind(format_timestamp(list.created_at))
        .bind(format_timestamp(list.updated_at))
        .bind(opt_timestamp(list.deleted_at))
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    async fn overwrite(&self, conn: &mut SqliteConnection, list: &TaskList) -> Result<bool, DbError> {
        let result = sqlx::query(
            r#"
            UPDATE task_lists
            SET space_id = ?, name = ?, color = ?, sort_order = ?,
                created_at = ?, updated_at = ?, deleted_at = ?
            WHERE id = ?
            "#,
        )
        .bind(opt_uuid(list.space_id))
        .bind(&list.name)
        .bind(&list.color)
        .bind(list.sort_order)
        .bind(format_timestamp(list.created_at))
        .bind(format_timestamp(list.updated_at))
        .bind(opt_timestamp(list.deleted_at))
        .bind(list.id.to_string())
        .execute(&mut *conn)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl EntityStore for TaskItemStore {
    type Entity = TaskItem;
    type Row = TaskItemRow;

    const TABLE: &'static str = "task_items";

    fn from_row(row: TaskItemRow) -> Result<TaskItem, DbError> {
        Ok(TaskItem {
            id: parse_uuid("task_items.id", &row.id)?,
            tenant_id: parse_opt_uuid("task_items.tenant_id", row.tenant_id.as_deref())?,
            space_id: parse_opt_uuid("task_items.space_id", row.space_id.as_deref())?,
            task_list_id: parse_uuid("task_items.task_list_id", &row.task_list_id)?,
            title: row.title,
            notes: row.notes,
            due_at: parse_opt_timestamp("task_items.due_at", row.due_at.as_deref())?,
            priority: parse_enum("task_items.priority", &row.priority)?,
            status: parse_enum("task_items.status", &row.status)?,
            completed_at: parse_opt_timestamp(
                "task_items.completed_at",
                row.completed_at.as_deref(),
            )?,
            recurrence_rule: row.recurrence_rule,
            created_at: parse_timestamp("task_items.created_at", &row.created_at)?,
            updated_at: parse_timestamp("task_items.updated_at", &row.updated_at)?,
            deleted_at: parse_opt_timestamp("task_items.deleted_at", row.deleted_at.as_deref())?,
        })
    }

    async fn insert(&self, conn: &mut SqliteConnection, item: &TaskItem) -> Result<(), DbError> {
        sqlx::query(
            r#"
            INSERT INTO task_items (id, tenant_id, space_id, task_list_id, title, notes, due_at, priority, status, completed_at, recurrence_rule, created_at, updated_at, deleted_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(item.id.to_string())
        .bind(opt_uuid(item.tenant_id))
        .bind(opt_uuid(item.space_id))
        .bind(item.task_list_id.to_string())
        .bind(&item.title)
        .bind(&item.notes)
        .bind(opt_timestamp(item.due_at))
        .bind(item.priority.to_string())
        .bind(item.status.to_string())
        .bind(opt_timestamp(item.completed_at))
        .bind(&item.recurrence_rule)
        .bind(format_timestamp(item.created_at))
        .bind(format_timestamp(item.updated_at))
        .bind(opt_timestamp(item.deleted_at))
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    async fn overwrite(&self, conn: &mut SqliteConnection, item: &TaskItem) -> Result<bool, DbError> {
        let result = sqlx::query(
            r#"
            UPDATE task_items
            SET space_id = ?, task_list_id = ?, title = ?, notes = ?, due_at = ?, priority = ?,
                status = ?, completed_at = ?, recurrence_rule = ?,
                created_at = ?, updated_at = ?, deleted_at = ?
            WHERE id = ?
            "#,
        )
        .bind(opt_uuid(item.space_id))
        .bind(item.task_list_id.to_string())
        .bind(&item.title)
        .bind(&item.notes)
        .bind(opt_timestamp(item.due_at))
        .bind(item.priority.to_string())
        .bind(item.status.to_string())
        .bind(opt_timestamp(item.completed_at))
        .bind(&item.recurrence_rule)
        .bind(format_timestamp(item.created_at))
        .bind(format_timestamp(item.updated_at))
        .bind(opt_timestamp(item.deleted_at))
        .bind(item.id.to_string())
        .execute(&mut *conn)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_db;
    use chrono::{Duration, Utc};
    use homebase_core::{TaskPriority, TaskStatus};
    use tempfile::TempDir;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_task_item_roundtrip_through_table() {
        let temp_dir = TempDir::new().unwrap();
        let pool = init_db(&temp_dir.path().join("test.db")).await.unwrap();
        let mut conn = pool.acquire().await.unwrap();

        let list = TaskList::new("Errands");
        TaskListStore.insert(&mut conn, &list).await.unwrap();

        let mut item = TaskItem::new(list.id, "Pick up parcel")
            .with_due(Utc::now() + Duration::days(2))
            .with_priority(TaskPriority::High);
        item.status = TaskStatus::InProgress;
        TaskItemStore.insert(&mut conn, &item).await.unwrap();

        let loaded = TaskItemStore
            .load_by_id_unfiltered(&mut conn, item.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded, item);
    }

    #[tokio::test]
    async fn test_load_by_ids_includes_soft_deleted() {
        let temp_dir = TempDir::new().unwrap();
        let pool = init_db(&temp_dir.path().join("test.db")).await.unwrap();
        let mut conn = pool.acquire().await.unwrap();

        let kept = TaskList::new("Kept");
        let removed = TaskList::new("Removed");
        TaskListStore.insert(&mut conn, &kept).await.unwrap();
        TaskListStore.insert(&mut conn, &removed).await.unwrap();
        assert!(TaskListStore
            .mark_deleted(&mut conn, removed.id, Utc::now())
            .await
            .unwrap());

        let loaded = TaskListStore
            .load_by_ids_unfiltered(&mut conn, &[kept.id, removed.id, Uuid::new_v4()])
            .await
            .unwrap();
        assert_eq!(loaded.len(), 2);

        let visible = TaskListStore.load_visible(&mut conn, None).await.unwrap();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].id, kept.id);
    }

    #[tokio::test]
    async fn test_mark_deleted_twice_is_noop() {
        let temp_dir = TempDir::new().unwrap();
        let pool = init_db(&temp_dir.path().join("test.db")).await.unwrap();
        let mut conn = pool.acquire().await.unwrap();

        let list = TaskList::new("Once");
        TaskListStore.insert(&mut conn, &list).await.unwrap();

        assert!(TaskListStore.mark_deleted(&mut conn, list.id, Utc::now()).await.unwrap());
        assert!(!TaskListStore.mark_deleted(&mut conn, list.id, Utc::now()).await.unwrap());
        assert!(!TaskListStore
            .mark_deleted(&mut conn, Uuid::new_v4(), Utc::now())
            .await
            .unwrap());
    }
}
