use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::ticket_type::DEFAULT_CURRENCY;

pub const DEFAULT_MAX_TICKETS_PER_ORDER: i32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ServiceFeeType {
    #[default]
    Percentage,
    /// Charged once per ticket.
    Fixed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FeePayer {
    #[default]
    Buyer,
    Organizer,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceFee {
    #[serde(rename = "type")]
    pub fee_type: ServiceFeeType,
    pub value: Decimal,
    pub payer: FeePayer,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundPolicy {
    pub refunds_allowed: bool,
    /// Hours before the event start after which refunds close.
    pub deadline_hours: Option<i32>,
    pub refund_percentage: Decimal,
}

impl Default for RefundPolicy {
    fn default() -> Self {
        Self {
            refunds_allowed: false,
            deadline_hours: None,
            refund_percentage: Decimal::ONE_HUNDRED,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum QuestionKind {
    Text,
    Select,
    Checkbox,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomQuestion {
    pub id: String,
    pub label: String,
    pub kind: QuestionKind,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub options: Vec<String>,
}

/// Per-event checkout configuration. Passive: the core only reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketingSettings {
    pub currency: String,
    pub tax_rate: Decimal,
    #[serde(default)]
    pub service_fee: ServiceFee,
    #[serde(default)]
    pub refund_policy: RefundPolicy,
    #[serde(default)]
    pub custom_questions: Vec<CustomQuestion>,
    pub max_tickets_per_order: i32,
    #[serde(default)]
    pub require_approval: bool,
    #[serde(default)]
    pub enable_waitlist: bool,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Default for TicketingSettings {
    fn default() -> Self {
        Self {
            currency: DEFAULT_CURRENCY.to_string(),
            tax_rate: Decimal::ZERO,
            service_fee: ServiceFee::default(),
            refund_policy: RefundPolicy::default(),
            custom_questions: Vec::new(),
            max_tickets_per_order: DEFAULT_MAX_TICKETS_PER_ORDER,
            require_approval: false,
            enable_waitlist: false,
            updated_at: None,
        }
    }
}
