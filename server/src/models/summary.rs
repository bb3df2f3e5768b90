use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::pricing::{PriceSource, ResolvedPrice};
use crate::models::promo_code::{PromoCode, PromoValidation};
use crate::models::settings::TicketingSettings;
use crate::models::ticket_type::{Availability, TicketType};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketTypeWithAvailability {
    #[serde(flatten)]
    pub ticket_type: TicketType,
    pub available_quantity: i32,
    pub current_price: Decimal,
    pub price_source: PriceSource,
}

/// Result of finalizing a sale: the new counters plus the price that applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Confirmation {
    pub availability: Availability,
    pub unit_price: ResolvedPrice,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryTotals {
    pub total_capacity: i64,
    pub tickets_sold: i64,
    pub tickets_reserved: i64,
    pub tickets_available: i64,
    pub revenue: Decimal,
    pub active_promo_codes: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketingConfigSummary {
    pub event_id: Uuid,
    pub settings: TicketingSettings,
    pub ticket_types: Vec<TicketTypeWithAvailability>,
    pub promo_codes: Vec<PromoCode>,
    pub totals: SummaryTotals,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteItem {
    pub ticket_type_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequest {
    pub items: Vec<QuoteItem>,
    pub promo_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteLine {
    pub ticket_type_id: Uuid,
    pub name: String,
    pub quantity: i32,
    pub unit_price: ResolvedPrice,
    pub line_total: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderQuote {
    pub currency: String,
    pub lines: Vec<QuoteLine>,
    pub subtotal: Decimal,
    pub promo: Option<PromoValidation>,
    pub discount_amount: Decimal,
    pub service_fee: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}
