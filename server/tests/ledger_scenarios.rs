//! End-to-end inventory scenarios on the in-memory store.

mod common;

use chrono::Duration;
use uuid::Uuid;

use common::{dec, scope, state_at, t0, ticket};
use ticketing_server::models::{Availability, NewTicketType, TicketTypePatch, Visibility};

#[tokio::test]
async fn reserve_over_capacity_leaves_counters_untouched() {
    let state = state_at(t0());
    let scope = scope();
    let ga = state
        .ledger
        .create(&scope, Uuid::new_v4(), ticket("General", dec("25.00"), 100))
        .await
        .unwrap();

    let after_reserve = state.ledger.reserve(&scope, ga.id, 30).await.unwrap();
    assert_eq!(after_reserve.available, 70);

    let err = state.ledger.reserve(&scope, ga.id, 80).await.unwrap_err();
    assert_eq!(err.code(), "CONFLICT");
    assert!(err.to_string().contains("insufficient availability"));
    assert_eq!(
        state.ledger.get_availability(&scope, ga.id).await.unwrap(),
        Availability {
            available: 70,
            sold: 0,
            reserved: 30,
            capacity: 100,
        }
    );

    let confirmation = state.ledger.confirm(&scope, ga.id, 30).await.unwrap();
    assert_eq!(
        confirmation.availability,
        Availability {
            available: 70,
            sold: 30,
            reserved: 0,
            capacity: 100,
        }
    );
    assert_eq!(confirmation.unit_price.amount, dec("25.00"));
}

#[tokio::test]
async fn counters_stay_within_bounds_across_a_mixed_history() {
    let state = state_at(t0());
    let scope = scope();
    let id = state
        .ledger
        .create(&scope, Uuid::new_v4(), ticket("Floor", dec("10"), 10))
        .await
        .unwrap()
        .id;
    let ledger = &state.ledger;

    ledger.reserve(&scope, id, 6).await.unwrap();
    ledger.confirm(&scope, id, 4).await.unwrap();
    assert!(ledger.reserve(&scope, id, 5).await.is_err());
    ledger.release(&scope, id, 5).await.unwrap();
    ledger.reserve(&scope, id, 6).await.unwrap();
    assert!(ledger.confirm(&scope, id, 7).await.is_err());
    ledger.cancel(&scope, id, 4).await.unwrap();
    assert!(ledger.cancel(&scope, id, 1).await.is_err());
    ledger.confirm(&scope, id, 6).await.unwrap();

    let a = ledger.get_availability(&scope, id).await.unwrap();
    assert_eq!((a.sold, a.reserved, a.available), (6, 0, 4));
    assert!(a.sold >= 0 && a.reserved >= 0);
    assert!(a.sold + a.reserved <= a.capacity);
}

#[tokio::test]
async fn release_beyond_reserved_floors_at_zero() {
    let state = state_at(t0());
    let scope = scope();
    let id = state
        .ledger
        .create(&scope, Uuid::new_v4(), ticket("Balcony", dec("15"), 20))
        .await
        .unwrap()
        .id;

    state.ledger.reserve(&scope, id, 3).await.unwrap();
    let a = state.ledger.release(&scope, id, 10).await.unwrap();
    assert_eq!(a.reserved, 0);
    assert_eq!(a.available, 20);
}

#[tokio::test]
async fn create_then_get_returns_supplied_fields() {
    let state = state_at(t0());
    let scope = scope();
    let input = NewTicketType {
        name: "Backstage".to_string(),
        description: Some("Meet the band".to_string()),
        base_price: dec("199.99"),
        currency: Some("EUR".to_string()),
        order: Some(3),
        visibility: Some(Visibility::Hidden),
        is_active: Some(false),
        capacity: 12,
        sales_start_date: Some(t0()),
        sales_end_date: Some(t0() + Duration::days(30)),
        dynamic_pricing: None,
    };
    let created = state
        .ledger
        .create(&scope, Uuid::new_v4(), input.clone())
        .await
        .unwrap();
    let fetched = state.ledger.get(&scope, created.id).await.unwrap();

    assert_eq!(fetched.name, input.name);
    assert_eq!(fetched.description, input.description);
    assert_eq!(fetched.base_price, input.base_price);
    assert_eq!(fetched.currency, "EUR");
    assert_eq!(fetched.order, 3);
    assert_eq!(fetched.visibility, Visibility::Hidden);
    assert!(!fetched.is_active);
    assert_eq!(fetched.capacity, 12);
    assert_eq!(fetched.sales_start_date, input.sales_start_date);
    assert_eq!(fetched.sales_end_date, input.sales_end_date);
}

#[tokio::test]
async fn update_changes_only_patched_fields() {
    let state = state_at(t0());
    let scope = scope();
    let created = state
        .ledger
        .create(&scope, Uuid::new_v4(), ticket("Standard", dec("40"), 50))
        .await
        .unwrap();
    state.ledger.reserve(&scope, created.id, 5).await.unwrap();

    let patch = TicketTypePatch {
        base_price: Some(dec("45")),
        capacity: Some(60),
        ..Default::default()
    };
    let updated = state.ledger.update(&scope, created.id, patch).await.unwrap();

    assert_eq!(updated.base_price, dec("45"));
    assert_eq!(updated.capacity, 60);
    assert_eq!(updated.name, created.name);
    assert_eq!(updated.currency, created.currency);
    assert_eq!(updated.quantity_reserved, 5);
    assert_eq!(updated.created_at, created.created_at);
}

#[tokio::test]
async fn tenants_never_see_each_others_ticket_types() {
    let state = state_at(t0());
    let event_id = Uuid::new_v4();
    let tenant_a = ticketing_server::store::EventScope::new(Uuid::new_v4(), event_id);
    let tenant_b = ticketing_server::store::EventScope::new(Uuid::new_v4(), event_id);

    let created = state
        .ledger
        .create(&tenant_a, Uuid::new_v4(), ticket("General", dec("10"), 10))
        .await
        .unwrap();
    // Same name is free in the other tenant
    state
        .ledger
        .create(&tenant_b, Uuid::new_v4(), ticket("General", dec("10"), 10))
        .await
        .unwrap();

    let err = state.ledger.get(&tenant_b, created.id).await.unwrap_err();
    assert_eq!(err.code(), "NOT_FOUND");
    let err = state.ledger.reserve(&tenant_b, created.id, 1).await.unwrap_err();
    assert_eq!(err.code(), "NOT_FOUND");
    assert_eq!(state.ledger.list(&tenant_a).await.unwrap().len(), 1);
}
