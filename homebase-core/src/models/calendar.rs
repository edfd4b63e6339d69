use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::sync::EntityKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalendarVisibility {
    Private,
    Shared,
    Public,
}

impl fmt::Display for CalendarVisibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CalendarVisibility::Private => write!(f, "private"),
            CalendarVisibility::Shared => write!(f, "shared"),
            CalendarVisibility::Public => write!(f, "public"),
        }
    }
}

impl FromStr for CalendarVisibility {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "private" => Ok(CalendarVisibility::Private),
            "shared" => Ok(CalendarVisibility::Shared),
            "public" => Ok(CalendarVisibility::Public),
            _ => Err(format!(
                "Invalid calendar visibility '{}'. Valid options: private, shared, public",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    Tentative,
    Confirmed,
    Cancelled,
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventStatus::Tentative => write!(f, "tentative"),
            EventStatus::Confirmed => write!(f, "confirmed"),
            EventStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl FromStr for EventStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "tentative" => Ok(EventStatus::Tentative),
            "confirmed" => Ok(EventStatus::Confirmed),
            "cancelled" => Ok(EventStatus::Cancelled),
            _ => Err(format!(
                "Invalid event status '{}'. Valid options: tentative, confirmed, cancelled",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Calendar {
    pub id: Uuid,
    #[serde(skip)]
    pub tenant_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub space_id: Option<Uuid>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub visibility: CalendarVisibility,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
    /// Events loaded alongside the calendar by the calendar service.
    #[serde(skip)]
    pub events: Vec<CalendarEvent>,
}

impl Calendar {
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            tenant_id: None,
            space_id: None,
            name: name.into(),
            color: None,
            description: None,
            visibility: CalendarVisibility::Private,
            created_at: now,
            updated_at: now,
            deleted_at: None,
            events: Vec::new(),
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

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn with_visibility(mut self, visibility: CalendarVisibility) -> Self {
        self.visibility = visibility;
        self
    }
}

sync_entity!(Calendar, EntityKind::Calendar);

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CalendarEvent {
    pub id: Uuid,
    #[serde(skip)]
    pub tenant_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub space_id: Option<Uuid>,
    pub calendar_id: Uuid,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub all_day: bool,
    /// RFC 5545 recurrence rule, e.g. `FREQ=WEEKLY;BYDAY=MO`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence_rule: Option<String>,
    pub status: EventStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
    /// Start instants expanded from `recurrence_rule` by the recurrence
    /// service for a requested window.
    #[serde(skip)]
    pub occurrences: Vec<DateTime<Utc>>,
}

impl CalendarEvent {
    pub fn new(
        calendar_id: Uuid,
        title: impl Into<String>,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            tenant_id: None,
            space_id: None,
            calendar_id,
            title: title.into(),
            description: None,
            location: None,
            starts_at,
            ends_at,
            all_day: false,
            recurrence_rule: None,
            status: EventStatus::Confirmed,
            created_at: now,
            updated_at: now,
            deleted_at: None,
            occurrences: Vec::new(),
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

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_recurrence(mut self, rule: impl Into<String>) -> Self {
        self.recurrence_rule = Some(rule.into());
        self
    }

    pub fn with_status(mut self, status: EventStatus) -> Self {
        self.status = status;
        self
    }

    pub fn is_recurring(&self) -> bool {
        self.recurrence_rule.is_some()
    }
}

sync_entity!(CalendarEvent, EntityKind::CalendarEvent);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SyncEntity;
    use chrono::Duration;

    #[test]
    fn test_calendar_new() {
        let calendar = Calendar::new("Family");

        assert_eq!(calendar.name, "Family");
        assert_eq!(calendar.visibility, CalendarVisibility::Private);
        assert!(calendar.tenant_id.is_none());
        assert!(!calendar.is_deleted());
    }

    #[test]
    fn test_visibility_from_str() {
        assert_eq!(
            CalendarVisibility::from_str("SHARED").unwrap(),
            CalendarVisibility::Shared
        );
        assert!(CalendarVisibility::from_str("secret").is_err());
    }

    #[test]
    fn test_event_status_json_is_symbolic() {
        let json = serde_json::to_string(&EventStatus::Cancelled).unwrap();
        assert_eq!(json, "\"cancelled\"");
    }

    #[test]
    fn test_event_tenant_not_serialized() {
        let start = Utc::now();
        let event = CalendarEvent::new(Uuid::new_v4(), "Dentist", start, start + Duration::hours(1))
            .with_tenant(Uuid::new_v4());

        let value = serde_json::to_value(&event).unwrap();
        assert!(value.get("tenant_id").is_none());
        assert!(value.get("occurrences").is_none());
        assert_eq!(value["status"], "confirmed");
    }
}
