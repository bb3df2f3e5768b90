//! Dynamic price resolution.
//!
//! Pure functions: no I/O, no mutation of the rule being resolved. The first
//! matching component wins, in this order:
//!
//! 1. early bird, while `now <= end_date` and its cap is not exhausted
//! 2. last minute, once `now >= start_date`
//! 3. the first tier in array order whose `[start_date, end_date]` contains
//!    `now` and whose cap is not exhausted
//! 4. the ticket type's base price
//!
//! `enabled` gates step 1 only; a disabled rule still applies its last
//! minute price and tiers.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::models::{DynamicPricingRule, PriceSource, ResolvedPrice, TicketType};

pub fn resolve_price(
    base_price: Decimal,
    rule: Option<&DynamicPricingRule>,
    now: DateTime<Utc>,
) -> ResolvedPrice {
    let base = ResolvedPrice {
        amount: base_price,
        source: PriceSource::Base,
    };

    let Some(rule) = rule else {
        return base;
    };

    if let Some(early_bird) = rule.early_bird.as_ref().filter(|_| rule.enabled) {
        if now <= early_bird.end_date && early_bird.has_remaining() {
            return ResolvedPrice {
                amount: early_bird.price,
                source: PriceSource::EarlyBird,
            };
        }
    }

    if let Some(last_minute) = &rule.last_minute {
        if now >= last_minute.start_date {
            return ResolvedPrice {
                amount: last_minute.price,
                source: PriceSource::LastMinute,
            };
        }
    }

    rule.tiered
        .iter()
        .enumerate()
        .find(|(_, tier)| tier.contains(now) && tier.has_remaining())
        .map(|(index, tier)| ResolvedPrice {
            amount: tier.price,
            source: PriceSource::Tier {
                index,
                name: tier.name.clone(),
            },
        })
        .unwrap_or(base)
}

/// Price and provenance of a ticket type at `now`.
pub fn resolve_ticket_price(ticket_type: &TicketType, now: DateTime<Utc>) -> ResolvedPrice {
    resolve_price(ticket_type.base_price, ticket_type.dynamic_pricing.as_ref(), now)
}

pub fn resolve_effective_price(ticket_type: &TicketType, now: DateTime<Utc>) -> Decimal {
    resolve_ticket_price(ticket_type, now).amount
}

/// Charges `quantity` sales against the cap counter of the component that
/// produced `source`. Base and last-minute prices carry no cap.
pub fn record_sale(rule: &mut DynamicPricingRule, source: &PriceSource, quantity: i32) {
    match source {
        PriceSource::EarlyBird => {
            if let Some(early_bird) = rule.early_bird.as_mut() {
                early_bird.quantity_sold += quantity;
            }
        }
        PriceSource::Tier { index, .. } => {
            if let Some(tier) = rule.tiered.get_mut(*index) {
                tier.quantity_sold += quantity;
            }
        }
        PriceSource::LastMinute | PriceSource::Base => {}
    }
}
