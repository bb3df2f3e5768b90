//! Counter rules applied inside the store's atomic section.
//!
//! Every backend runs these functions while holding the record exclusively,
//! so the check and the write they describe are one indivisible step. On
//! `Err` the record must be left exactly as it was.

use chrono::{DateTime, Utc};

use crate::domain::error::Rejection;
use crate::domain::pricing::{record_sale, resolve_ticket_price};
use crate::models::{
    DynamicPricingRule, PromoCode, PromoCodePatch, ResolvedPrice, TicketType, TicketTypePatch,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InventoryOp {
    Reserve(i32),
    Release(i32),
    Confirm(i32),
    Cancel(i32),
}

impl InventoryOp {
    pub fn quantity(&self) -> i32 {
        match *self {
            InventoryOp::Reserve(qty)
            | InventoryOp::Release(qty)
            | InventoryOp::Confirm(qty)
            | InventoryOp::Cancel(qty) => qty,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            InventoryOp::Reserve(_) => "reserve",
            InventoryOp::Release(_) => "release",
            InventoryOp::Confirm(_) => "confirm",
            InventoryOp::Cancel(_) => "cancel",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InventoryOutcome {
    pub ticket_type: TicketType,
    /// Set for `Confirm`: the price that applied at confirmation time.
    pub price: Option<ResolvedPrice>,
}

/// Applies `op` to the counters of `ticket_type`.
///
/// `Confirm` also re-derives the effective price at `now` and charges the
/// quantity against the cap of the pricing component that produced it.
pub fn apply_inventory_op(
    ticket_type: &mut TicketType,
    op: InventoryOp,
    now: DateTime<Utc>,
) -> Result<Option<ResolvedPrice>, Rejection> {
    let sold = i64::from(ticket_type.quantity_sold);
    let reserved = i64::from(ticket_type.quantity_reserved);
    let capacity = i64::from(ticket_type.capacity);

    let price = match op {
        InventoryOp::Reserve(qty) => {
            if sold + reserved + i64::from(qty) > capacity {
                return Err(Rejection::InsufficientAvailability {
                    requested: qty,
                    available: ticket_type.available(),
                });
            }
            ticket_type.quantity_reserved += qty;
            None
        }
        InventoryOp::Release(qty) => {
            ticket_type.quantity_reserved = (ticket_type.quantity_reserved - qty).max(0);
            None
        }
        InventoryOp::Confirm(qty) => {
            if qty > ticket_type.quantity_reserved {
                return Err(Rejection::InsufficientReserved {
                    requested: qty,
                    reserved: ticket_type.quantity_reserved,
                });
            }
            let price = resolve_ticket_price(ticket_type, now);
            if let Some(rule) = ticket_type.dynamic_pricing.as_mut() {
                record_sale(rule, &price.source, qty);
            }
            ticket_type.quantity_reserved -= qty;
            ticket_type.quantity_sold += qty;
            Some(price)
        }
        InventoryOp::Cancel(qty) => {
            if qty > ticket_type.quantity_sold {
                return Err(Rejection::InsufficientSold {
                    requested: qty,
                    sold: ticket_type.quantity_sold,
                });
            }
            ticket_type.quantity_sold -= qty;
            None
        }
    };

    ticket_type.updated_at = now;
    Ok(price)
}

/// Applies attribute changes. Name uniqueness is the store's concern; this
/// only guards capacity against the tickets already committed.
pub fn apply_ticket_type_patch(
    ticket_type: &mut TicketType,
    patch: &TicketTypePatch,
    now: DateTime<Utc>,
) -> Result<(), Rejection> {
    if let Some(capacity) = patch.capacity {
        let committed =
            i64::from(ticket_type.quantity_sold) + i64::from(ticket_type.quantity_reserved);
        if i64::from(capacity) < committed {
            return Err(Rejection::CapacityBelowCommitted {
                capacity,
                committed,
            });
        }
        ticket_type.capacity = capacity;
    }

    if let Some(name) = &patch.name {
        ticket_type.name = name.trim().to_string();
    }
    if let Some(description) = &patch.description {
        ticket_type.description = description.clone();
    }
    if let Some(base_price) = patch.base_price {
        ticket_type.base_price = base_price;
    }
    if let Some(currency) = &patch.currency {
        ticket_type.currency = currency.to_uppercase();
    }
    if let Some(order) = patch.order {
        ticket_type.order = order;
    }
    if let Some(visibility) = patch.visibility {
        ticket_type.visibility = visibility;
    }
    if let Some(is_active) = patch.is_active {
        ticket_type.is_active = is_active;
    }
    if let Some(start) = patch.sales_start_date {
        ticket_type.sales_start_date = start;
    }
    if let Some(end) = patch.sales_end_date {
        ticket_type.sales_end_date = end;
    }
    if let Some(rule) = &patch.dynamic_pricing {
        let mut rule = rule.clone();
        if let (Some(next), Some(previous)) = (&mut rule, &ticket_type.dynamic_pricing) {
            carry_cap_counters(previous, next);
        }
        ticket_type.dynamic_pricing = rule;
    }

    ticket_type.updated_at = now;
    Ok(())
}

/// Sold-against-cap counters survive a rule edit. The early bird keeps its
/// count; a tier keeps the count of the previous tier with the same name.
fn carry_cap_counters(previous: &DynamicPricingRule, next: &mut DynamicPricingRule) {
    if let (Some(next_bird), Some(previous_bird)) = (&mut next.early_bird, &previous.early_bird) {
        next_bird.quantity_sold = previous_bird.quantity_sold;
    }
    for tier in &mut next.tiered {
        if let Some(old) = previous.tiered.iter().find(|old| old.name == tier.name) {
            tier.quantity_sold = old.quantity_sold;
        }
    }
}

/// Consumes one use of `promo`.
pub fn apply_redemption(promo: &mut PromoCode, now: DateTime<Utc>) -> Result<(), Rejection> {
    if let Some(max_uses) = promo.max_uses {
        if promo.used_count >= max_uses {
            return Err(Rejection::UsageLimitReached { max_uses });
        }
    }
    promo.used_count += 1;
    promo.updated_at = now;
    Ok(())
}

pub fn apply_promo_code_patch(
    promo: &mut PromoCode,
    patch: &PromoCodePatch,
    now: DateTime<Utc>,
) -> Result<(), Rejection> {
    if let Some(max_uses) = patch.max_uses {
        if let Some(max_uses) = max_uses.filter(|max| *max < promo.used_count) {
            return Err(Rejection::MaxUsesBelowUsed {
                max_uses,
                used_count: promo.used_count,
            });
        }
        promo.max_uses = max_uses;
    }

    if let Some(description) = &patch.description {
        promo.description = description.clone();
    }
    if let Some(discount_type) = patch.discount_type {
        promo.discount_type = discount_type;
    }
    if let Some(value) = patch.discount_value {
        promo.discount_value = value;
    }
    if let Some(from) = patch.valid_from {
        promo.valid_from = from;
    }
    if let Some(until) = patch.valid_until {
        promo.valid_until = until;
    }
    if let Some(ids) = &patch.applicable_ticket_types {
        promo.applicable_ticket_types = ids.clone();
    }
    if let Some(minimum) = patch.minimum_purchase_amount {
        promo.minimum_purchase_amount = minimum;
    }
    if let Some(is_active) = patch.is_active {
        promo.is_active = is_active;
    }

    promo.updated_at = now;
    Ok(())
}
