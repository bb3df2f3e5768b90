#![allow(dead_code)]

//! Shared fixtures for the integration tests.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use ticketing_server::domain::{FixedClock, RetryPolicy};
use ticketing_server::models::{CartLine, DiscountType, NewPromoCode, NewTicketType};
use ticketing_server::state::AppState;
use ticketing_server::store::{EventScope, MemoryStore};

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap()
}

/// Services on a fresh in-memory store, with the clock pinned to `now`.
pub fn state_at(now: DateTime<Utc>) -> AppState {
    AppState::new(
        Arc::new(MemoryStore::new()),
        Arc::new(FixedClock::new(now)),
        RetryPolicy::none(),
    )
}

pub fn scope() -> EventScope {
    EventScope::new(Uuid::new_v4(), Uuid::new_v4())
}

pub fn ticket(name: &str, base_price: Decimal, capacity: i32) -> NewTicketType {
    NewTicketType {
        name: name.to_string(),
        base_price,
        capacity,
        ..Default::default()
    }
}

pub fn promo(code: &str, discount_type: DiscountType, value: Decimal) -> NewPromoCode {
    NewPromoCode {
        code: code.to_string(),
        description: None,
        discount_type,
        discount_value: value,
        max_uses: None,
        valid_from: None,
        valid_until: None,
        applicable_ticket_types: Vec::new(),
        minimum_purchase_amount: None,
        is_active: None,
    }
}

pub fn line(ticket_type_id: Uuid, price: Decimal, quantity: i32) -> CartLine {
    CartLine {
        ticket_type_id,
        price,
        quantity,
    }
}

pub fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}
