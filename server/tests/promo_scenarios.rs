mod common;

use rust_decimal::Decimal;
use uuid::Uuid;

use common::{dec, line, promo, scope, state_at, t0, ticket};
use ticketing_server::models::{DiscountType, NewPromoCode, PromoCodePatch};

#[tokio::test]
async fn percentage_discount_of_cart_subtotal() {
    let state = state_at(t0());
    let scope = scope();
    state
        .promos
        .create(&scope, Uuid::new_v4(), promo("SAVE20", DiscountType::Percentage, dec("20")))
        .await
        .unwrap();

    let cart = [
        line(Uuid::new_v4(), dec("50.00"), 2),
        line(Uuid::new_v4(), dec("25.00"), 2),
    ];
    let result = state.promos.validate(&scope, "save20", &cart).await.unwrap();

    assert!(result.is_valid);
    assert_eq!(result.discount_amount, dec("30.00"));
    assert_eq!(result.promo_code.unwrap().code, "SAVE20");
}

#[tokio::test]
async fn fixed_discount_is_not_clamped_to_subtotal() {
    let state = state_at(t0());
    let scope = scope();
    state
        .promos
        .create(&scope, Uuid::new_v4(), promo("FIFTY", DiscountType::FixedAmount, dec("50")))
        .await
        .unwrap();

    let cart = [line(Uuid::new_v4(), dec("10.00"), 1)];
    let result = state.promos.validate(&scope, "FIFTY", &cart).await.unwrap();

    // Exceeds the subtotal; left as-is pending a product decision
    assert!(result.is_valid);
    assert_eq!(result.discount_amount, dec("50.00"));
}

#[tokio::test]
async fn restricted_code_discounts_any_cart() {
    let state = state_at(t0());
    let scope = scope();
    let actor = Uuid::new_v4();
    let vip = state
        .ledger
        .create(&scope, actor, ticket("VIP", dec("100"), 10))
        .await
        .unwrap();
    let ga = state
        .ledger
        .create(&scope, actor, ticket("GA", dec("50"), 100))
        .await
        .unwrap();
    let input = NewPromoCode {
        applicable_ticket_types: vec![vip.id],
        ..promo("VIP10", DiscountType::Percentage, dec("10"))
    };
    state.promos.create(&scope, actor, input).await.unwrap();

    let cart = [line(vip.id, dec("100"), 1), line(ga.id, dec("50"), 2)];
    let result = state.promos.validate(&scope, "VIP10", &cart).await.unwrap();

    // Subtotal covers the GA lines too: 10% of 200, not of 100
    assert!(result.is_valid);
    assert_eq!(result.discount_amount, dec("20"));

    // The restriction is not enforced at validation time
    let ga_only = [line(ga.id, dec("50"), 2)];
    let result = state.promos.validate(&scope, "VIP10", &ga_only).await.unwrap();
    assert!(result.is_valid);
    assert_eq!(result.discount_amount, dec("10"));
    assert!(result.reason.is_none());
}

#[tokio::test]
async fn codes_are_scoped_to_their_event() {
    let state = state_at(t0());
    let tenant = Uuid::new_v4();
    let concert = ticketing_server::store::EventScope::new(tenant, Uuid::new_v4());
    let festival = ticketing_server::store::EventScope::new(tenant, Uuid::new_v4());
    state
        .promos
        .create(&concert, Uuid::new_v4(), promo("EARLY", DiscountType::Percentage, dec("5")))
        .await
        .unwrap();

    let cart = [line(Uuid::new_v4(), dec("10"), 1)];
    let err = state.promos.validate(&festival, "EARLY", &cart).await.unwrap_err();
    assert_eq!(err.code(), "NOT_FOUND");
    let err = state.promos.redeem(&festival, "EARLY").await.unwrap_err();
    assert_eq!(err.code(), "NOT_FOUND");
}

#[tokio::test]
async fn validation_errors_for_malformed_codes() {
    let state = state_at(t0());
    let scope = scope();
    let too_short = promo("AB", DiscountType::Percentage, dec("10"));
    let too_much = promo("HUGE", DiscountType::Percentage, dec("120"));
    let negative = promo("NEG", DiscountType::FixedAmount, dec("-1"));

    for input in [too_short, too_much, negative] {
        let err = state
            .promos
            .create(&scope, Uuid::new_v4(), input)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }
    assert!(state.promos.list(&scope).await.unwrap().is_empty());
}

#[tokio::test]
async fn oversized_cart_is_rejected_not_panicking() {
    let state = state_at(t0());
    let scope = scope();
    state
        .promos
        .create(&scope, Uuid::new_v4(), promo("BIG", DiscountType::Percentage, dec("10")))
        .await
        .unwrap();

    let cart = [line(Uuid::new_v4(), Decimal::MAX, 2)];
    let err = state.promos.validate(&scope, "BIG", &cart).await.unwrap_err();
    assert_eq!(err.code(), "VALIDATION_ERROR");

    let cart = [
        line(Uuid::new_v4(), Decimal::MAX, 1),
        line(Uuid::new_v4(), Decimal::MAX, 1),
    ];
    let err = state.promos.validate(&scope, "BIG", &cart).await.unwrap_err();
    assert_eq!(err.code(), "VALIDATION_ERROR");
}

#[tokio::test]
async fn cleared_usage_limit_reopens_the_code() {
    let state = state_at(t0());
    let scope = scope();
    let input = NewPromoCode {
        max_uses: Some(1),
        ..promo("ONCE", DiscountType::FixedAmount, dec("5"))
    };
    let created = state.promos.create(&scope, Uuid::new_v4(), input).await.unwrap();
    state.promos.redeem(&scope, "ONCE").await.unwrap();
    assert!(state.promos.redeem(&scope, "ONCE").await.is_err());

    let patch = PromoCodePatch {
        max_uses: Some(None),
        ..Default::default()
    };
    let updated = state.promos.update(&scope, created.id, patch).await.unwrap();
    assert_eq!(updated.max_uses, None);
    assert_eq!(state.promos.redeem(&scope, "ONCE").await.unwrap().used_count, 2);
}
