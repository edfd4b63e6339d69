use async_trait::async_trait;
use homebase_core::Contact;
use sqlx::SqliteConnection;

use super::store::{opt_timestamp, opt_uuid, EntityStore};
use super::{
    format_timestamp, parse_date, parse_opt_timestamp, parse_opt_uuid, parse_timestamp,
    parse_uuid, DbError,
};

pub struct ContactStore;

#[derive(sqlx::FromRow)]
pub struct ContactRow {
    id: String,
    tenant_id: Option<String>,
    space_id: Option<String>,
    display_name: String,
    given_name: Option<String>,
    family_name: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    birthday: Option<String>,
    notes: Option<String>,
    favorite: bool,
    created_at: String,
    updated_at: String,
    deleted_at: Option<String>,
}

#[async_trait]
impl EntityStore for ContactStore {
    type Entity = Contact;
    type Row = ContactRow;

    const TABLE: &'static str = "contacts";

    fn from_row(row: ContactRow) -> Result<Contact, DbError> {
        Ok(Contact {
            id: parse_uuid("contacts.id", &row.id)?,
            tenant_id: parse_opt_uuid("contacts.tenant_id", row.tenant_id.as_deref())?,
            space_id: parse_opt_uuid("contacts.space_id", row.space_id.as_deref())?,
            display_name: row.display_name,
            given_name: row.given_name,
            family_name: row.family_name,
            email: row.email,
            phone: row.phone,
            birthday: row
                .birthday
                .as_deref()
                .map(|d| parse_date("contacts.birthday", d))
                .transpose()?,
            notes: row.notes,
            favorite: row.favorite,
            created_at: parse_timestamp("contacts.created_at", &row.created_at)?,
            updated_at: parse_timestamp("contacts.updated_at", &row.updated_at)?,
            deleted_at: parse_opt_timestamp("contacts.deleted_at", row.deleted_at.as_deref())?,
        })
    }

    async fn insert(&self, conn: &mut SqliteConnection, contact: &Contact) -> Result<(), DbError> {
        sqlx::query(
            r#"
            INSERT INTO contacts (id, tenant_id, space_id, display_name, given_name, family_name, email, phone, birthday, notes, favorite, created_at, updated_at, deleted_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(contact.id.to_string())
        .bind(opt_uuid(contact.tenant_id))
        .bind(opt_uuid(contact.space_id))
        .bind(&contact.display_name)
        .bind(&contact.given_name)
        .bind(&contact.family_name)
        .bind(&contact.email)
        .bind(&contact.phone)
        .bind(contact.birthday.map(|d| d.to_string()))
        .bind(&contact.notes)
        .bind(contact.favorite)
        .bind(format_timestamp(contact.created_at))
        .bind(format_timestamp(contact.updated_at))
        .bind(opt_timestamp(contact.deleted_at))
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    async fn overwrite(&self, conn: &mut SqliteConnection, contact: &Contact) -> Result<bool, DbError> {
        let result = sqlx::query(
            r#"
            UPDATE contacts
            SET space_id = ?, display_name = ?, given_name = ?, family_name = ?, email = ?,
                phone = ?, birthday = ?, notes = ?, favorite = ?,
                created_at = ?, updated_at = ?, deleted_at = ?
            WHERE id = ?
            "#,
        )
        .bind(opt_uuid(contact.space_id))
        .bind(&contact.display_name)
        .bind(&contact.given_name)
        .bind(&contact.family_name)
        .bind(&contact.email)
        .bind(&contact.phone)
        .bind(contact.birthday.map(|d| d.to_string()))
        .bind(&contact.notes)
        .bind(contact.favorite)
        .bind(format_timestamp(contact.created_at))
        .bind(format_timestamp(contact.updated_at))
        .bind(opt_timestamp(contact.deleted_at))
        .bind(contact.id.to_string())
        .execute(&mut *conn)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
