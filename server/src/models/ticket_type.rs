use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::models::pricing::DynamicPricingRule;

pub const DEFAULT_CURRENCY: &str = "USD";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    Private,
    Hidden,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Private => "private",
            Visibility::Hidden => "hidden",
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Visibility {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "public" => Ok(Visibility::Public),
            "private" => Ok(Visibility::Private),
            "hidden" => Ok(Visibility::Hidden),
            other => Err(format!("unknown visibility '{}'", other)),
        }
    }
}

/// A purchasable category of admission for one event.
///
/// `quantity_sold + quantity_reserved` never exceeds `capacity`; the counters
/// only change through the inventory operations of the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketType {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub event_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub base_price: Decimal,
    pub currency: String,
    pub order: i32,
    pub visibility: Visibility,
    pub is_active: bool,
    pub capacity: i32,
    pub quantity_sold: i32,
    pub quantity_reserved: i32,
    pub sales_start_date: Option<DateTime<Utc>>,
    pub sales_end_date: Option<DateTime<Utc>>,
    pub dynamic_pricing: Option<DynamicPricingRule>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: Uuid,
}

impl TicketType {
    pub fn available(&self) -> i32 {
        self.capacity - self.quantity_sold - self.quantity_reserved
    }

    pub fn availability(&self) -> Availability {
        Availability {
            available: self.available(),
            sold: self.quantity_sold,
            reserved: self.quantity_reserved,
            capacity: self.capacity,
        }
    }

    /// Whether the advisory sales window is open at `now`.
    pub fn is_on_sale(&self, now: DateTime<Utc>) -> bool {
        let started = self.sales_start_date.map_or(true, |start| now >= start);
        let not_ended = self.sales_end_date.map_or(true, |end| now <= end);
        self.is_active && started && not_ended
    }
}

/// Read-only snapshot of a ticket type's counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Availability {
    pub available: i32,
    pub sold: i32,
    pub reserved: i32,
    pub capacity: i32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTicketType {
    pub name: String,
    pub description: Option<String>,
    pub base_price: Decimal,
    pub currency: Option<String>,
    pub order: Option<i32>,
    pub visibility: Option<Visibility>,
    pub is_active: Option<bool>,
    pub capacity: i32,
    pub sales_start_date: Option<DateTime<Utc>>,
    pub sales_end_date: Option<DateTime<Utc>>,
    pub dynamic_pricing: Option<DynamicPricingRule>,
}

/// Partial update of a ticket type. Absent fields are left untouched; the
/// nullable ones are cleared by an explicit `null`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketTypePatch {
    pub name: Option<String>,
    #[serde(
        default,
        deserialize_with = "crate::models::nullable",
        skip_serializing_if = "Option::is_none"
    )]
    pub description: Option<Option<String>>,
    pub base_price: Option<Decimal>,
    pub currency: Option<String>,
    pub order: Option<i32>,
    pub visibility: Option<Visibility>,
    pub is_active: Option<bool>,
    pub capacity: Option<i32>,
    #[serde(
        default,
        deserialize_with = "crate::models::nullable",
        skip_serializing_if = "Option::is_none"
    )]
    pub sales_start_date: Option<Option<DateTime<Utc>>>,
    #[serde(
        default,
        deserialize_with = "crate::models::nullable",
        skip_serializing_if = "Option::is_none"
    )]
    pub sales_end_date: Option<Option<DateTime<Utc>>>,
    #[serde(
        default,
        deserialize_with = "crate::models::nullable",
        skip_serializing_if = "Option::is_none"
    )]
    pub dynamic_pricing: Option<Option<DynamicPricingRule>>,
}

impl TicketTypePatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.base_price.is_none()
            && self.currency.is_none()
            && self.order.is_none()
            && self.visibility.is_none()
            && self.is_active.is_none()
            && self.capacity.is_none()
            && self.sales_start_date.is_none()
            && self.sales_end_date.is_none()
            && self.dynamic_pricing.is_none()
    }
}
