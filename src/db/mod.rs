mod calendar_repo;
mod contact_repo;
mod ledger;
mod shopping_repo;
mod store;
mod task_repo;
mod tracked;

pub use calendar_repo::{CalendarEventStore, CalendarStore};
pub use contact_repo::ContactStore;
pub use ledger::{ChangeLedger, ChangeLogEntry, LedgerStats, NewChange};
pub use shopping_repo::{ShoppingItemStore, ShoppingListStore};
pub use store::EntityStore;
pub use task_repo::{TaskItemStore, TaskListStore};
pub use tracked::TrackedRepository;

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::{Path, PathBuf};
use thiserror::Error;
use uuid::Uuid;

/// Errors raised by the persistence layer.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("Migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("Failed to create database directory {path:?}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A stored value could not be parsed back into its domain type.
    #[error("Corrupt value in {column}: {value}")]
    Corrupt { column: &'static str, value: String },
}

/// Initialize the database connection pool and run migrations
pub async fn init_db(path: &Path) -> Result<SqlitePool, DbError> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| DbError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let options = SqliteConnectOptions::new()
        .filename(path)
        .foreign_keys(true)
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    // Run migrations
    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}

// Column codecs shared by the stores. Timestamps are stored as RFC 3339 text
// with full sub-second precision so that a value read back compares equal to
// the value written. Parsing goes through `FromStr`, which also accepts the
// signed years `to_rfc3339` emits outside 0000..=9999.

pub(crate) fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339()
}

pub(crate) fn parse_timestamp(column: &'static str, value: &str) -> Result<DateTime<Utc>, DbError> {
    value.parse::<DateTime<Utc>>().map_err(|_| DbError::Corrupt {
        column,
        value: value.to_string(),
    })
}

pub(crate) fn parse_opt_timestamp(
    column: &'static str,
    value: Option<&str>,
) -> Result<Option<DateTime<Utc>>, DbError> {
    value.map(|v| parse_timestamp(column, v)).transpose()
}

pub(crate) fn parse_uuid(column: &'static str, value: &str) -> Result<Uuid, DbError> {
    Uuid::parse_str(value).map_err(|_| DbError::Corrupt {
        column,
        value: value.to_string(),
    })
}

pub(crate) fn parse_opt_uuid(
    column: &'static str,
    value: Option<&str>,
) -> Result<Option<Uuid>, DbError> {
    value.map(|v| parse_uuid(column, v)).transpose()
}

pub(crate) fn parse_date(column: &'static str, value: &str) -> Result<NaiveDate, DbError> {
    value.parse::<NaiveDate>().map_err(|_| DbError::Corrupt {
        column,
        value: value.to_string(),
    })
}

/// Parses a symbolic enum column through its `FromStr` impl.
pub(crate) fn parse_enum<T: std::str::FromStr>(
    column: &'static str,
    value: &str,
) -> Result<T, DbError> {
    value.parse().map_err(|_| DbError::Corrupt {
        column,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_init_db_creates_tables() {
        let temp_dir = tempdir().unwrap();
        let db_path = temp_dir.path().join("nested").join("test.db");

        let pool = init_db(&db_path).await.unwrap();

        // Verify tables exist
        let tables: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' AND name NOT LIKE '_sqlx_%' ORDER BY name",
        )
        .fetch_all(&pool)
        .await
        .unwrap();

        let table_names: Vec<&str> = tables.iter().map(|t| t.0.as_str()).collect();
        for expected in [
            "calendar_events",
            "calendars",
            "contacts",
            "shopping_items",
            "shopping_lists",
            "sync_change_log",
            "task_items",
            "task_lists",
        ] {
            assert!(table_names.contains(&expected), "missing table {}", expected);
        }
    }

    #[test]
    fn test_timestamp_roundtrip_keeps_precision() {
        let now = Utc::now();
        let parsed = parse_timestamp("ts", &format_timestamp(now)).unwrap();
        assert_eq!(parsed, now);
    }

    #[test]
    fn test_extended_years_read_back() {
        let far = Utc.with_ymd_and_hms(10000, 1, 1, 0, 0, 0).unwrap();
        let stored = format_timestamp(far);
        assert_eq!(stored, "+10000-01-01T00:00:00+00:00");
        assert_eq!(parse_timestamp("created_at", &stored).unwrap(), far);

        let date = NaiveDate::from_ymd_opt(10000, 2, 29).unwrap();
        assert_eq!(parse_date("birthday", &date.to_string()).unwrap(), date);
    }

    #[test]
    fn test_parse_errors_name_the_column() {
        let err = parse_uuid("entity_id", "nope").unwrap_err();
        assert!(err.to_string().contains("entity_id"));
        assert!(parse_date("birthday", "2025-13-01").is_err());
        assert!(parse_opt_timestamp("deleted_at", None).unwrap().is_none());
    }
}
