use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DiscountType {
    /// `value` is a percentage of the cart subtotal, 0 to 100.
    Percentage,
    /// `value` is an absolute amount in the event currency.
    FixedAmount,
}

impl DiscountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscountType::Percentage => "percentage",
            DiscountType::FixedAmount => "fixedAmount",
        }
    }
}

impl fmt::Display for DiscountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DiscountType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "percentage" => Ok(DiscountType::Percentage),
            "fixedAmount" => Ok(DiscountType::FixedAmount),
            other => Err(format!("unknown discount type '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromoCode {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub event_id: Uuid,
    /// Stored uppercased; lookups are case-insensitive.
    pub code: String,
    pub description: Option<String>,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    pub max_uses: Option<i32>,
    pub used_count: i32,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    /// Empty means the code applies to every ticket type of the event.
    pub applicable_ticket_types: Vec<Uuid>,
    pub minimum_purchase_amount: Option<Decimal>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: Uuid,
}

impl PromoCode {
    pub fn has_remaining_uses(&self) -> bool {
        self.max_uses.map_or(true, |max| self.used_count < max)
    }

    pub fn is_within_window(&self, now: DateTime<Utc>) -> bool {
        let started = self.valid_from.map_or(true, |from| now >= from);
        let not_expired = self.valid_until.map_or(true, |until| now <= until);
        started && not_expired
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPromoCode {
    pub code: String,
    pub description: Option<String>,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    pub max_uses: Option<i32>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    #[serde(default)]
    pub applicable_ticket_types: Vec<Uuid>,
    pub minimum_purchase_amount: Option<Decimal>,
    pub is_active: Option<bool>,
}

/// Same absent/`null` convention as [`crate::models::TicketTypePatch`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromoCodePatch {
    #[serde(
        default,
        deserialize_with = "crate::models::nullable",
        skip_serializing_if = "Option::is_none"
    )]
    pub description: Option<Option<String>>,
    pub discount_type: Option<DiscountType>,
    pub discount_value: Option<Decimal>,
    #[serde(
        default,
        deserialize_with = "crate::models::nullable",
        skip_serializing_if = "Option::is_none"
    )]
    pub max_uses: Option<Option<i32>>,
    #[serde(
        default,
        deserialize_with = "crate::models::nullable",
        skip_serializing_if = "Option::is_none"
    )]
    pub valid_from: Option<Option<DateTime<Utc>>>,
    #[serde(
        default,
        deserialize_with = "crate::models::nullable",
        skip_serializing_if = "Option::is_none"
    )]
    pub valid_until: Option<Option<DateTime<Utc>>>,
    pub applicable_ticket_types: Option<Vec<Uuid>>,
    #[serde(
        default,
        deserialize_with = "crate::models::nullable",
        skip_serializing_if = "Option::is_none"
    )]
    pub minimum_purchase_amount: Option<Option<Decimal>>,
    pub is_active: Option<bool>,
}

/// One priced line of a cart, as supplied by the checkout flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub ticket_type_id: Uuid,
    pub price: Decimal,
    pub quantity: i32,
}

impl CartLine {
    /// `None` when the product leaves the `Decimal` range.
    pub fn total(&self) -> Option<Decimal> {
        self.price.checked_mul(Decimal::from(self.quantity))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromoValidation {
    pub is_valid: bool,
    pub promo_code: Option<PromoCode>,
    pub discount_amount: Decimal,
    pub reason: Option<String>,
}

impl PromoValidation {
    pub fn valid(promo_code: PromoCode, discount_amount: Decimal) -> Self {
        Self {
            is_valid: true,
            promo_code: Some(promo_code),
            discount_amount,
            reason: None,
        }
    }

    pub fn invalid(reason: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            promo_code: None,
            discount_amount: Decimal::ZERO,
            reason: Some(reason.into()),
        }
    }
}

pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}
