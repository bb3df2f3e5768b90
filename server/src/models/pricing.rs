use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Time-windowed price overrides for one ticket type.
///
/// Sub-rules may overlap; resolution order is fixed by the price resolver.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DynamicPricingRule {
    pub enabled: bool,
    pub early_bird: Option<EarlyBirdPrice>,
    pub last_minute: Option<LastMinutePrice>,
    #[serde(default)]
    pub tiered: Vec<PricingTier>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EarlyBirdPrice {
    pub price: Decimal,
    pub end_date: DateTime<Utc>,
    /// Optional cap on tickets sold at this price.
    pub quantity: Option<i32>,
    #[serde(default)]
    pub quantity_sold: i32,
}

impl EarlyBirdPrice {
    pub fn has_remaining(&self) -> bool {
        self.quantity.map_or(true, |cap| self.quantity_sold < cap)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LastMinutePrice {
    pub price: Decimal,
    pub start_date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingTier {
    pub name: String,
    pub price: Decimal,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub quantity: Option<i32>,
    #[serde(default)]
    pub quantity_sold: i32,
}

impl PricingTier {
    pub fn has_remaining(&self) -> bool {
        self.quantity.map_or(true, |cap| self.quantity_sold < cap)
    }

    pub fn contains(&self, now: DateTime<Utc>) -> bool {
        now >= self.start_date && now <= self.end_date
    }
}

/// Which component of the pricing rule produced a price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum PriceSource {
    EarlyBird,
    LastMinute,
    Tier { index: usize, name: String },
    Base,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedPrice {
    pub amount: Decimal,
    pub source: PriceSource,
}
