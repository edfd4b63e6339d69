use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::sync::EntityKind;

/// A named shopping list shared within a space.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShoppingList {
    pub id: Uuid,
    #[serde(skip)]
    pub tenant_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub space_id: Option<Uuid>,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub items: Vec<ShoppingItem>,
}

impl ShoppingList {
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            tenant_id: None,
            space_id: None,
            name: name.into(),
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

    /// Items not yet checked off.
    pub fn remaining(&self) -> impl Iterator<Item = &ShoppingItem> {
        self.items.iter().filter(|item| !item.checked)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShoppingItem {
    pub id: Uuid,
    #[serde(skip)]
    pub tenant_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub space_id: Option<Uuid>,
    pub shopping_list_id: Uuid,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    /// Free-form aisle or store section, e.g. "produce".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub checked: bool,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl ShoppingItem {
    pub fn new(shopping_list_id: Uuid, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            tenant_id: None,
            space_id: None,
            shopping_list_id,
            name: name.into(),
            quantity: None,
            unit: None,
            category: None,
            checked: false,
            sort_order: 0,
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

    pub fn with_quantity(mut self, quantity: f64, unit: impl Into<String>) -> Self {
        let unit = unit.into();
        self.quantity = Some(quantity);
        self.unit = if unit.is_empty() { None } else { Some(unit) };
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }
}

impl fmt::Display for ShoppingItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.quantity, &self.unit) {
            (Some(qty), Some(unit)) => write!(f, "{} {} {}", qty, unit, self.name),
            (Some(qty), None) => write!(f, "{} {}", qty, self.name),
            (None, Some(unit)) => write!(f, "{} ({})", self.name, unit),
            (None, None) => write!(f, "{}", self.name),
        }
    }
}

sync_entity!(ShoppingList, EntityKind::ShoppingList);
sync_entity!(ShoppingItem, EntityKind::ShoppingItem);
