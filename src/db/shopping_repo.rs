use async_trait::async_trait;
use homebase_core::{ShoppingItem, ShoppingList};
use sqlx::SqliteConnection;

use super::store::{opt_timestamp, opt_uuid, EntityStore};
use super::{
    format_timestamp, parse_opt_timestamp, parse_opt_uuid, parse_timestamp, parse_uuid, DbError,
};

pub struct ShoppingListStore;

pub struct ShoppingItemStore;

#[derive(sqlx::FromRow)]
pub struct ShoppingListRow {
    id: String,
    tenant_id: Option<String>,
    space_id: Option<String>,
    name: String,
    created_at: String,
    updated_at: String,
    deleted_at: Option<String>,
}

#[derive(sqlx::FromRow)]
pub struct ShoppingItemRow {
    id: String,
    tenant_id: Option<String>,
    space_id: Option<String>,
    shopping_list_id: String,
    name: String,
    quantity: Option<f64>,
    unit: Option<String>,
    category: Option<String>,
    checked: bool,
    sort_order: i32,
    created_at: String,
    updated_at: String,
    deleted_at: Option<String>,
}

#[async_trait]
impl EntityStore for ShoppingListStore {
    type Entity = ShoppingList;
    type Row = ShoppingListRow;

    const TABLE: &'static str = "shopping_lists";

    fn from_row(row: ShoppingListRow) -> Result<ShoppingList, DbError> {
        Ok(ShoppingList {
            id: parse_uuid("shopping_lists.id", &row.id)?,
            tenant_id: parse_opt_uuid("shopping_lists.tenant_id", row.tenant_id.as_deref())?,
            space_id: parse_opt_uuid("shopping_lists.space_id", row.space_id.as_deref())?,
            name: row.name,
            created_at: parse_timestamp("shopping_lists.created_at", &row.created_at)?,
            updated_at: parse_timestamp("shopping_lists.updated_at", &row.updated_at)?,
            deleted_at: parse_opt_timestamp(
                "shopping_lists.deleted_at",
                row.deleted_at.as_deref(),
            )?,
            items: Vec::new(),
        })
    }

    async fn insert(&self, conn: &mut SqliteConnection, list: &ShoppingList) -> Result<(), DbError> {
        sqlx::query(
            r#"
            INSERT INTO shopping_lists (id, tenant_id, space_id, name, created_at, updated_at, deleted_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(list.id.to_string())
        .bind(opt_uuid(list.tenant_id))
        .bind(opt_uuid(list.space_id))
        .bind(&list.name)
        .bind(format_timestamp(list.created_at))
        .bind(format_timestamp(list.updated_at))
        .bind(opt_timestamp(list.deleted_at))
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    async fn overwrite(
        &self,
        conn: &mut SqliteConnection,
        list: &ShoppingList,
    ) -> Result<bool, DbError> {
        let result = sqlx::query(
            r#"
            UPDATE shopping_lists
            SET space_id = ?, name = ?, created_at = ?, updated_at = ?, deleted_at = ?
            WHERE id = ?
            "#,
        )
        .bind(opt_uuid(list.space_id))
        .bind(&list.name)
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
impl EntityStore for ShoppingItemStore {
    type Entity = ShoppingItem;
    type Row = ShoppingItemRow;

    const TABLE: &'static str = "shopping_items";

    fn from_row(row: ShoppingItemRow) -> Result<ShoppingItem, DbError> {
        Ok(ShoppingItem {
            id: parse_uuid("shopping_items.id", &row.id)?,
            tenant_id: parse_opt_uuid("shopping_items.tenant_id", row.tenant_id.as_deref())?,
            space_id: parse_opt_uuid("shopping_items.space_id", row.space_id.as_deref())?,
            shopping_list_id: parse_uuid("shopping_items.shopping_list_id", &row.shopping_list_id)?,
            name: row.name,
            quantity: row.quantity,
            unit: row.unit,
            category: row.category,
            checked: row.checked,
            sort_order: row.sort_order,
            created_at: parse_timestamp("shopping_items.created_at", &row.created_at)?,
            updated_at: parse_timestamp("shopping_items.updated_at", &row.updated_at)?,
            deleted_at: parse_opt_timestamp(
                "shopping_items.deleted_at",
                row.deleted_at.as_deref(),
            )?,
        })
    }

    async fn insert(&self, conn: &mut SqliteConnection, item: &ShoppingItem) -> Result<(), DbError> {
        sqlx::query(
            r#"
            INSERT INTO shopping_items (id, tenant_id, space_id, shopping_list_id, name, quantity, unit, category, checked, sort_order, created_at, updated_at, deleted_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(item.id.to_string())
        .bind(opt_uuid(item.tenant_id))
        .bind(opt_uuid(item.space_id))
        .bind(item.shopping_list_id.to_string())
        .bind(&item.name)
        .bind(item.quantity)
        .bind(&item.unit)
        .bind(&item.category)
        .bind(item.checked)
        .bind(item.sort_order)
        .bind(format_timestamp(item.created_at))
        .bind(format_timestamp(item.updated_at))
        .bind(opt_timestamp(item.deleted_at))
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    async fn overwrite(
        &self,
        conn: &mut SqliteConnection,
        item: &ShoppingItem,
    ) -> Result<bool, DbError> {
        let result = sqlx::query(
            r#"
            UPDATE shopping_items
            SET space_id = ?, shopping_list_id = ?, name = ?, quantity = ?, unit = ?, category = ?,
                checked = ?, sort_order = ?, created_at = ?, updated_at = ?, deleted_at = ?
            WHERE id = ?
            "#,
        )
        .bind(opt_uuid(item.space_id))
        .bind(item.shopping_list_id.to_string())
        .bind(&item.name)
        .bind(item.quantity)
        .bind(&item.unit)
        .bind(&item.category)
        .bind(item.checked)
        .bind(item.sort_order)
        .bind(format_timestamp(item.created_at))
        .bind(format_timestamp(item.updated_at))
        .bind(opt_timestamp(item.deleted_at))
        .bind(item.id.to_string())
        .execute(&mut *conn)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
