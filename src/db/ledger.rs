//! The append-only change ledger.
//!
//! Row ids are assigned by SQLite (`AUTOINCREMENT`), so they are strictly
//! increasing and never reused even after a rolled back insert. Triggers in
//! the schema reject any UPDATE or DELETE.

use chrono::{DateTime, Utc};
use homebase_core::{ChangeOperation, EntityKind};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};
use std::collections::HashMap;
use uuid::Uuid;

use super::store::opt_uuid;
use super::{format_timestamp, parse_enum, parse_opt_uuid, parse_timestamp, parse_uuid, DbError};

/// Upper bound on bound parameters per `IN (...)` list.
const IN_CHUNK: usize = 500;

/// A committed ledger entry.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeLogEntry {
    pub id: i64,
    pub entity_kind: EntityKind,
    pub entity_id: Uuid,
    pub operation: ChangeOperation,
    pub tenant_id: Option<Uuid>,
    pub space_id: Option<Uuid>,
    pub timestamp: DateTime<Utc>,
}

/// An entry about to be appended. The id is assigned on insert.
#[derive(Debug, Clone, PartialEq)]
pub struct NewChange {
    pub entity_kind: EntityKind,
    pub entity_id: Uuid,
    pub operation: ChangeOperation,
    pub tenant_id: Option<Uuid>,
    pub space_id: Option<Uuid>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LedgerStats {
    pub count: i64,
    pub latest_id: Option<i64>,
    /// Entry count per stored kind tag, ordered by tag.
    pub by_kind: Vec<(String, i64)>,
}

#[derive(sqlx::FromRow)]
struct ChangeLogRow {
    id: i64,
    entity_kind: String,
    entity_id: String,
    operation: String,
    tenant_id: Option<String>,
    space_id: Option<String>,
    timestamp: String,
}

impl TryFrom<ChangeLogRow> for ChangeLogEntry {
    type Error = DbError;

    fn try_from(row: ChangeLogRow) -> Result<Self, Self::Error> {
        Ok(ChangeLogEntry {
            id: row.id,
            entity_kind: parse_enum("sync_change_log.entity_kind", &row.entity_kind)?,
            entity_id: parse_uuid("sync_change_log.entity_id", &row.entity_id)?,
            operation: parse_enum("sync_change_log.operation", &row.operation)?,
            tenant_id: parse_opt_uuid("sync_change_log.tenant_id", row.tenant_id.as_deref())?,
            space_id: parse_opt_uuid("sync_change_log.space_id", row.space_id.as_deref())?,
            timestamp: parse_timestamp("sync_change_log.timestamp", &row.timestamp)?,
        })
    }
}

pub struct ChangeLedger;

impl ChangeLedger {
    /// Appends one entry and returns its assigned id.
    pub async fn append(conn: &mut SqliteConnection, change: &NewChange) -> Result<i64, DbError> {
        let result = sqlx::query(
            r#"
            INSERT INTO sync_change_log (entity_kind, entity_id, operation, tenant_id, space_id, timestamp)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(change.entity_kind.as_str())
        .bind(change.entity_id.to_string())
        .bind(change.operation.as_str())
        .bind(opt_uuid(change.tenant_id))
        .bind(opt_uuid(change.space_id))
        .bind(format_timestamp(change.timestamp))
        .execute(&mut *conn)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Takes SQLite's write lock for the enclosing transaction. Must be the
    /// first statement of the transaction; later readers and writers wait on
    /// the busy timeout until it commits or rolls back.
    pub async fn lock_for_write(conn: &mut SqliteConnection) -> Result<(), DbError> {
        sqlx::query("UPDATE sync_write_lock SET generation = generation + 1 WHERE id = 1")
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    /// Entries with `id > cursor` in ascending id order, at most `limit`.
    ///
    /// With a tenant, only that tenant's entries and global (null-tenant)
    /// entries qualify. With a space, only entries in exactly that space.
    pub async fn fetch_page(
        conn: &mut SqliteConnection,
        cursor: i64,
        tenant_id: Option<Uuid>,
        space_id: Option<Uuid>,
        limit: i64,
    ) -> Result<Vec<ChangeLogEntry>, DbError> {
        let mut query: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT * FROM sync_change_log WHERE id > ");
        query.push_bind(cursor);
        if let Some(tenant_id) = tenant_id {
            query.push(" AND (tenant_id = ");
            query.push_bind(tenant_id.to_string());
            query.push(" OR tenant_id IS NULL)");
        }
        if let Some(space_id) = space_id {
            query.push(" AND space_id = ");
            query.push_bind(space_id.to_string());
        }
        query.push(" ORDER BY id ASC LIMIT ");
        query.push_bind(limit);

        let rows = query
            .build_query_as::<ChangeLogRow>()
            .fetch_all(&mut *conn)
            .await?;
        rows.into_iter().map(ChangeLogEntry::try_from).collect()
    }

    /// Timestamp of the highest-id entry for each of `entity_ids` of one kind.
    /// Ids with no history are absent from the map.
    pub async fn latest_timestamps(
        conn: &mut SqliteConnection,
        kind: EntityKind,
        entity_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, DateTime<Utc>>, DbError> {
        let mut latest = HashMap::with_capacity(entity_ids.len());

        for chunk in entity_ids.chunks(IN_CHUNK) {
            let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(
                "SELECT entity_id, timestamp FROM sync_change_log WHERE id IN \
                 (SELECT MAX(id) FROM sync_change_log WHERE entity_kind = ",
            );
            query.push_bind(kind.as_str());
            query.push(" AND entity_id IN (");
            let mut separated = query.separated(", ");
            for id in chunk {
                separated.push_bind(id.to_string());
            }
            separated.push_unseparated(") GROUP BY entity_id)");

            let rows: Vec<(String, String)> = query.build_query_as().fetch_all(&mut *conn).await?;
            for (entity_id, timestamp) in rows {
                latest.insert(
                    parse_uuid("sync_change_log.entity_id", &entity_id)?,
                    parse_timestamp("sync_change_log.timestamp", &timestamp)?,
                );
            }
        }

        Ok(latest)
    }

    pub async fn count(conn: &mut SqliteConnection) -> Result<i64, DbError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM sync_change_log")
            .fetch_one(&mut *conn)
            .await?;
        Ok(count)
    }

    pub async fn stats(conn: &mut SqliteConnection) -> Result<LedgerStats, DbError> {
        let count = Self::count(conn).await?;
        let (latest_id,): (Option<i64>,) = sqlx::query_as("SELECT MAX(id) FROM sync_change_log")
            .fetch_one(&mut *conn)
            .await?;
        let by_kind: Vec<(String, i64)> = sqlx::query_as(
            r#"
            SELECT entity_kind, COUNT(*) FROM sync_change_log
            GROUP BY entity_kind
            ORDER BY entity_kind
            "#,
        )
        .fetch_all(&mut *conn)
        .await?;

        Ok(LedgerStats {
            count,
            latest_id,
            by_kind,
        })
    }

    /// The most recent entries, newest first, optionally for one tenant only.
    pub async fn tail(
        conn: &mut SqliteConnection,
        limit: i64,
        tenant_id: Option<Uuid>,
    ) -> Result<Vec<ChangeLogEntry>, DbError> {
        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT * FROM sync_change_log");
        if let Some(tenant_id) = tenant_id {
            query.push(" WHERE tenant_id = ");
            query.push_bind(tenant_id.to_string());
        }
        query.push(" ORDER BY id DESC LIMIT ");
        query.push_bind(limit);

        let rows = query
            .build_query_as::<ChangeLogRow>()
            .fetch_all(&mut *conn)
            .await?;
        rows.into_iter().map(ChangeLogEntry::try_from).collect()
    }
}
