//! Oversell and over-redemption under concurrent callers.
//!
//! Run with: `cargo test --test concurrency -- --nocapture`

mod common;

use std::sync::Arc;

use uuid::Uuid;

use common::{dec, promo, scope, state_at, t0, ticket};
use ticketing_server::domain::TicketingError;
use ticketing_server::models::{DiscountType, NewPromoCode};

fn tally<T>(results: Vec<Result<T, TicketingError>>) -> (usize, usize) {
    let mut ok = 0;
    let mut conflicts = 0;
    for result in results {
        match result {
            Ok(_) => ok += 1,
            Err(err) => {
                assert_eq!(err.code(), "CONFLICT", "unexpected failure: {}", err);
                conflicts += 1;
            }
        }
    }
    (ok, conflicts)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_reserves_never_oversell() {
    const CAPACITY: i32 = 50;
    const EXTRA: usize = 30;

    let state = state_at(t0());
    let scope = scope();
    let id = state
        .ledger
        .create(&scope, Uuid::new_v4(), ticket("General", dec("20"), CAPACITY))
        .await
        .unwrap()
        .id;

    let ledger = Arc::clone(&state.ledger);
    let handles: Vec<_> = (0..CAPACITY as usize + EXTRA)
        .map(|_| {
            let ledger = Arc::clone(&ledger);
            tokio::spawn(async move { ledger.reserve(&scope, id, 1).await })
        })
        .collect();

    let mut results = Vec::with_capacity(handles.len());
    for handle in handles {
        results.push(handle.await.unwrap());
    }

    let (ok, conflicts) = tally(results);
    assert_eq!(ok, CAPACITY as usize);
    assert_eq!(conflicts, EXTRA);

    let availability = ledger.get_availability(&scope, id).await.unwrap();
    assert_eq!(availability.reserved, CAPACITY);
    assert_eq!(availability.available, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_mixed_operations_keep_the_invariant() {
    let state = state_at(t0());
    let scope = scope();
    let id = state
        .ledger
        .create(&scope, Uuid::new_v4(), ticket("Mixed", dec("5"), 40))
        .await
        .unwrap()
        .id;
    state.ledger.reserve(&scope, id, 20).await.unwrap();

    let mut handles = Vec::new();
    for i in 0..120 {
        let ledger = Arc::clone(&state.ledger);
        handles.push(tokio::spawn(async move {
            match i % 4 {
                0 => ledger.reserve(&scope, id, 2).await.map(|_| ()),
                1 => ledger.confirm(&scope, id, 1).await.map(|_| ()),
                2 => ledger.release(&scope, id, 1).await.map(|_| ()),
                _ => ledger.cancel(&scope, id, 1).await.map(|_| ()),
            }
        }));
    }
    for handle in handles {
        if let Err(err) = handle.await.unwrap() {
            assert_eq!(err.code(), "CONFLICT");
        }
    }

    let a = state.ledger.get_availability(&scope, id).await.unwrap();
    assert!(a.sold >= 0);
    assert!(a.reserved >= 0);
    assert!(a.sold + a.reserved <= a.capacity);
    assert_eq!(a.available, a.capacity - a.sold - a.reserved);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_redemptions_stop_at_max_uses() {
    const MAX_USES: i32 = 25;

    let state = state_at(t0());
    let scope = scope();
    let input = NewPromoCode {
        max_uses: Some(MAX_USES),
        ..promo("FLASH", DiscountType::Percentage, dec("15"))
    };
    let created = state
        .promos
        .create(&scope, Uuid::new_v4(), input)
        .await
        .unwrap();

    let handles: Vec<_> = (0..100)
        .map(|_| {
            let promos = Arc::clone(&state.promos);
            tokio::spawn(async move { promos.redeem(&scope, "flash").await })
        })
        .collect();

    let mut results = Vec::with_capacity(handles.len());
    for handle in handles {
        results.push(handle.await.unwrap());
    }

    let (ok, conflicts) = tally(results);
    assert_eq!(ok, MAX_USES as usize);
    assert_eq!(conflicts, 100 - MAX_USES as usize);
    assert_eq!(
        state.promos.get(&scope, created.id).await.unwrap().used_count,
        MAX_USES
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn different_ticket_types_do_not_interfere() {
    let state = state_at(t0());
    let scope = scope();
    let mut ids = Vec::new();
    for name in ["North", "South", "East", "West"] {
        let created = state
            .ledger
            .create(&scope, Uuid::new_v4(), ticket(name, dec("10"), 10))
            .await
            .unwrap();
        ids.push(created.id);
    }

    let mut handles = Vec::new();
    for &id in &ids {
        for _ in 0..15 {
            let ledger = Arc::clone(&state.ledger);
            handles.push(tokio::spawn(async move {
                ledger.reserve(&scope, id, 1).await
            }));
        }
    }
    let mut results = Vec::new();
    for handle in handles {
        results.push(handle.await.unwrap());
    }
    let (ok, conflicts) = tally(results);
    assert_eq!(ok, 40);
    assert_eq!(conflicts, 20);

    for id in ids {
        assert_eq!(
            state.ledger.get_availability(&scope, id).await.unwrap().reserved,
            10
        );
    }
}
