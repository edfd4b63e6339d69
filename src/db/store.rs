//! Per-kind entity storage.
//!
//! Every store works on a borrowed connection so callers can compose several
//! stores and the change ledger inside a single transaction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use homebase_core::SyncEntity;
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, QueryBuilder, Sqlite, SqliteConnection};
use uuid::Uuid;

use super::{format_timestamp, DbError};

#[async_trait]
pub trait EntityStore: Send + Sync + 'static {
    type Entity: SyncEntity;
    type Row: for<'r> FromRow<'r, SqliteRow> + Send + Unpin;

    /// Table holding this kind. Every such table has `id`, `tenant_id`,
    /// `updated_at` and `deleted_at` columns.
    const TABLE: &'static str;

    fn from_row(row: Self::Row) -> Result<Self::Entity, DbError>;

    async fn insert(
        &self,
        conn: &mut SqliteConnection,
        entity: &Self::Entity,
    ) -> Result<(), DbError>;

    /// Replaces every scalar column of an existing row except `id` and
    /// `tenant_id`. Returns false when no row has the entity's id.
    async fn overwrite(
        &self,
        conn: &mut SqliteConnection,
        entity: &Self::Entity,
    ) -> Result<bool, DbError>;

    /// Loads rows by id regardless of soft-delete state. Missing ids are
    /// simply absent from the result.
    async fn load_by_ids_unfiltered(
        &self,
        conn: &mut SqliteConnection,
        ids: &[Uuid],
    ) -> Result<Vec<Self::Entity>, DbError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut query: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT * FROM {} WHERE id IN (", Self::TABLE));
        let mut separated = query.separated(", ");
        for id in ids {
            separated.push_bind(id.to_string());
        }
        separated.push_unseparated(")");

        let rows = query
            .build_query_as::<Self::Row>()
            .fetch_all(&mut *conn)
            .await?;
        rows.into_iter().map(Self::from_row).collect()
    }

    async fn load_by_id_unfiltered(
        &self,
        conn: &mut SqliteConnection,
        id: Uuid,
    ) -> Result<Option<Self::Entity>, DbError> {
        let row: Option<Self::Row> =
            sqlx::query_as(&format!("SELECT * FROM {} WHERE id = ?", Self::TABLE))
                .bind(id.to_string())
                .fetch_optional(&mut *conn)
                .await?;

        row.map(Self::from_row).transpose()
    }

    /// Live rows visible to `tenant_id`: its own plus global (null-tenant)
    /// rows. `None` means no tenant restriction.
    async fn load_visible(
        &self,
        conn: &mut SqliteConnection,
        tenant_id: Option<Uuid>,
    ) -> Result<Vec<Self::Entity>, DbError> {
        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT * FROM {} WHERE deleted_at IS NULL",
            Self::TABLE
        ));
        if let Some(tenant_id) = tenant_id {
            query.push(" AND (tenant_id = ");
            query.push_bind(tenant_id.to_string());
            query.push(" OR tenant_id IS NULL)");
        }
        query.push(" ORDER BY created_at, id");

        let rows = query
            .build_query_as::<Self::Row>()
            .fetch_all(&mut *conn)
            .await?;
        rows.into_iter().map(Self::from_row).collect()
    }

    /// Sets the tombstone on a live row. Returns false when the row is
    /// missing or already deleted.
    async fn mark_deleted(
        &self,
        conn: &mut SqliteConnection,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<bool, DbError> {
        let at = format_timestamp(at);
        let result = sqlx::query(&format!(
            "UPDATE {} SET deleted_at = ?, updated_at = ? WHERE id = ? AND deleted_at IS NULL",
            Self::TABLE
        ))
        .bind(&at)
        .bind(&at)
        .bind(id.to_string())
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

pub(crate) fn opt_uuid(id: Option<Uuid>) -> Option<String> {
    id.map(|id| id.to_string())
}

pub(crate) fn opt_timestamp(ts: Option<DateTime<Utc>>) -> Option<String> {
    ts.map(format_timestamp)
}
