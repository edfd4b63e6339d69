use async_trait::async_trait;
use homebase_core::{Calendar, CalendarEvent};
use sqlx::SqliteConnection;

use super::store::{opt_timestamp, opt_uuid, EntityStore};
use super::{
    format_timestamp, parse_enum, parse_opt_timestamp, parse_opt_uuid, parse_timestamp,
    parse_uuid, DbError,
};

pub struct CalendarStore;

pub struct CalendarEventStore;

// Row types for database queries
#[derive(sqlx::FromRow)]
pub struct CalendarRow {
    id: String,
    tenant_id: Option<String>,
    space_id: Option<String>,
    name: String,
    color: Option<String>,
    description: Option<String>,
    visibility: String,
    created_at: String,
    updated_at: String,
    deleted_at: Option<String>,
}

#[derive(sqlx::FromRow)]
pub struct CalendarEventRow {
    id: String,
    tenant_id: Option<String>,
    space_id: Option<String>,
    calendar_id: String,
    title: String,
    description: Option<String>,
    location: Option<String>,
    starts_at: String,
    ends_at: String,
    all_day: bool,
    recurrence_rule: Option<String>,
    status: String,
    created_at: String,
    updated_at: String,
    deleted_at: Option<String>,
}

#[async_trait]
impl EntityStore for CalendarStore {
    type Entity = Calendar;
    type Row = CalendarRow;

    const TABLE: &'static str = "calendars";

    fn from_row(row: CalendarRow) -> Result<Calendar, DbError> {
        Ok(Calendar {
            id: parse_uuid("calendars.id", &row.id)?,
            tenant_id: parse_opt_uuid("calendars.tenant_id", row.tenant_id.as_deref())?,
            space_id: parse_opt_uuid("calendars.space_id", row.space_id.as_deref())?,
            name: row.name,
            color: row.color,
            description: row.description,
            visibility: parse_enum("calendars.visibility", &row.visibility)?,
            created_at: parse_timestamp("calendars.created_at", &row.created_at)?,
            updated_at: parse_timestamp("calendars.updated_at", &row.updated_at)?,
            deleted_at: parse_opt_timestamp("calendars.deleted_at", row.deleted_at.as_deref())?,
            events: Vec::new(),
        })
    }

    async fn insert(&self, conn: &mut SqliteConnection, calendar: &Calendar) -> Result<(), DbError> {
        sqlx::query(
            r#"
            INSERT INTO calendars (id, tenant_id, space_id, name, color, description, visibility, created_at, updated_at, deleted_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(calendar.id.to_string())
        .bind(opt_uuid(calendar.tenant_id))
        .bind(opt_uuid(calendar.space_id))
        .bind(&calendar.name)
        .bind(&calendar.color)
        .bind(&calendar.description)
        .bind(calendar.visibility.to_string())
        .bind(format_timestamp(calendar.created_at))
        .bind(format_timestamp(calendar.updated_at))
        .bind(opt_timestamp(calendar.deleted_at))
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    async fn overwrite(
        &self,
        conn: &mut SqliteConnection,
        calendar: &Calendar,
    ) -> Result<bool, DbError> {
        let result = sqlx::query(
            r#"
            UPDATE calendars
            SET space_id = ?, name = ?, color = ?, description = ?, visibility = ?,
                created_at = ?, updated_at = ?, deleted_at = ?
            WHERE id = ?
            "#,
        )
        .bind(opt_uuid(calendar.space_id))
        .bind(&calendar.name)
        .bind(&calendar.color)
        .bind(&calendar.description)
        .bind(calendar.visibility.to_string())
        .bind(format_timestamp(calendar.created_at))
        .bind(format_timestamp(calendar.updated_at))
        .bind(opt_timestamp(calendar.deleted_at))
        .bind(calendar.id.to_string())
        .execute(&mut *conn)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl EntityStore for CalendarEventStore {
    type Entity = CalendarEvent;
    type Row = CalendarEventRow;

    const TABLE: &'static str = "calendar_events";

    fn from_row(row: CalendarEventRow) -> Result<CalendarEvent, DbError> {
        Ok(CalendarEvent {
            id: parse_uuid("calendar_events.id", &row.id)?,
            tenant_id: parse_opt_uuid("calendar_events.tenant_id", row.tenant_id.as_deref())?,
            space_id: parse_opt_uuid("calendar_events.space_id", row.space_id.as_deref())?,
            calendar_id: parse_uuid("calendar_events.calendar_id", &row.calendar_id)?,
            title: row.title,
            description: row.description,
            location: row.location,
            starts_at: parse_timestamp("calendar_events.starts_at", &row.starts_at)?,
            ends_at: parse_timestamp("calendar_events.ends_at", &row.ends_at)?,
            all_day: row.all_day,
            recurrence_rule: row.recurrence_rule,
            status: parse_enum("calendar_events.status", &row.status)?,
            created_at: parse_timestamp("calendar_events.created_at", &row.created_at)?,
            updated_at: parse_timestamp("calendar_events.updated_at", &row.updated_at)?,
            deleted_at: parse_opt_timestamp(
                "calendar_events.deleted_at",
                row.deleted_at.as_deref(),
            )?,
            occurrences: Vec::new(),
        })
    }

    async fn insert(
        &self,
        conn: &mut SqliteConnection,
        event: &CalendarEvent,
    ) -> Result<(), DbError> {
        sqlx::query(
            r#"
            INSERT INTO calendar_events (id, tenant_id, space_id, calendar_id, title, description, location, starts_at, ends_at, all_day, recurrence_rule, status, created_at, updated_at, deleted_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(event.id.to_string())
        .bind(opt_uuid(event.tenant_id))
        .bind(opt_uuid(event.space_id))
        .bind(event.calendar_id.to_string())
        .bind(&event.title)
        .bind(&event.description)
        .bind(&event.location)
        .bind(format_timestamp(event.starts_at))
        .bind(format_timestamp(event.ends_at))
        .bind(event.all_day)
        .bind(&event.recurrence_rule)
        .bind(event.status.to_string())
        .bind(format_timestamp(event.created_at))
        .bind(format_timestamp(event.updated_at))
        .bind(opt_timestamp(event.deleted_at))
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    async fn overwrite(
        &self,
        conn: &mut SqliteConnection,
        event: &CalendarEvent,
    ) -> Result<bool, DbError> {
        let result = sqlx::query(
            r#"
            UPDATE calendar_events
            SET space_id = ?, calendar_id = ?, title = ?, description = ?, location = ?,
                starts_at = ?, ends_at = ?, all_day = ?, recurrence_rule = ?, status = ?,
                created_at = ?, updated_at = ?, deleted_at = ?
            WHERE id = ?
            "#,
        )
        .bind(opt_uuid(event.space_id))
        .bind(event.calendar_id.to_string())
        .bind(&event.title)
        .bind(&event.description)
        .bind(&event.location)
        .bind(format_timestamp(event.starts_at))
        .bind(format_timestamp(event.ends_at))
        .bind(event.all_day)
        .bind(&event.recurrence_rule)
        .bind(event.status.to_string())
        .bind(format_timestamp(event.created_at))
        .bind(format_timestamp(event.updated_at))
        .bind(opt_timestamp(event.deleted_at))
        .bind(event.id.to_string())
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
    use homebase_core::{CalendarVisibility, EventStatus};
    use sqlx::SqlitePool;
    use tempfile::TempDir;
    use uuid::Uuid;

    struct TestContext {
        pool: SqlitePool,
        _temp_dir: TempDir, // Keep alive for duration of test
    }

    async fn setup() -> TestContext {
        let temp_dir = TempDir::new().unwrap();
        let pool = init_db(&temp_dir.path().join("test.db")).await.unwrap();
        TestContext {
            pool,
            _temp_dir: temp_dir,
        }
    }

    #[tokio::test]
    async fn test_insert_and_load_calendar() {
        let ctx = setup().await;
        let mut conn = ctx.pool.acquire().await.unwrap();

        let calendar = Calendar::new("Family")
            .with_tenant(Uuid::new_v4())
            .with_space(Uuid::new_v4())
            .with_color("#ff8800")
            .with_visibility(CalendarVisibility::Shared);
        CalendarStore.insert(&mut conn, &calendar).await.unwrap();

        let loaded = CalendarStore
            .load_by_id_unfiltered(&mut conn, calendar.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded, calendar);
    }

    #[tokio::test]
    async fn test_overwrite_event_keeps_tenant() {
        let ctx = setup().await;
        let mut conn = ctx.pool.acquire().await.unwrap();

        let tenant = Uuid::new_v4();
        let start = Utc::now();
        let event = CalendarEvent::new(Uuid::new_v4(), "Dentist", start, start + Duration::hours(1))
            .with_tenant(tenant);
        CalendarEventStore.insert(&mut conn, &event).await.unwrap();

        let mut changed = event.clone();
        changed.tenant_id = None;
        changed.title = "Dentist (moved)".to_string();
        changed.status = EventStatus::Tentative;
        changed.location = Some("Main St".to_string());
        assert!(CalendarEventStore.overwrite(&mut conn, &changed).await.unwrap());

        let loaded = CalendarEventStore
            .load_by_id_unfiltered(&mut conn, event.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded.title, "Dentist (moved)");
        assert_eq!(loaded.status, EventStatus::Tentative);
        assert_eq!(loaded.tenant_id, Some(tenant));
    }

    #[tokio::test]
    async fn test_overwrite_missing_row() {
        let ctx = setup().await;
        let mut conn = ctx.pool.acquire().await.unwrap();

        let calendar = Calendar::new("Ghost");
        assert!(!CalendarStore.overwrite(&mut conn, &calendar).await.unwrap());
    }
}
