use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::sync::EntityKind;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Contact {
    pub id: Uuid,
    #[serde(skip)]
    pub tenant_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub space_id: Option<Uuid>,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birthday: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub favorite: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Contact {
    pub fn new(display_name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            tenant_id: None,
            space_id: None,
            display_name: display_name.into(),
            given_name: None,
            family_name: None,
            email: None,
            phone: None,
            birthday: None,
            notes: None,
            favorite: false,
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

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    pub fn with_birthday(mut self, birthday: NaiveDate) -> Self {
        self.birthday = Some(birthday);
        self
    }
}

impl fmt::Display for Contact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name)?;
        if let Some(email) = &self.email {
            write!(f, " <{}>", email)?;
        }
        Ok(())
    }
}

sync_entity!(Contact, EntityKind::Contact);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contact_display() {
        let contact = Contact::new("Ada Lovelace").with_email("ada@example.com");
        assert_eq!(format!("{}", contact), "Ada Lovelace <ada@example.com>");

        let plain = Contact::new("Grace");
        assert_eq!(format!("{}", plain), "Grace");
    }

    #[test]
    fn test_contact_json_omits_absent_fields() {
        let contact = Contact::new("Ada")
            .with_birthday(NaiveDate::from_ymd_opt(1815, 12, 10).unwrap());
        let value = serde_json::to_value(&contact).unwrap();

        assert_eq!(value["birthday"], "1815-12-10");
        assert!(value.get("email").is_none());
        assert!(value.get("deleted_at").is_none());
    }
}
