//! Promo code lifecycle, side-effect-free validation and atomic redemption.

use std::sync::Arc;

use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::domain::clock::Clock;
use crate::domain::error::TicketingError;
use crate::domain::money;
use crate::domain::retry::RetryPolicy;
use crate::domain::validation::{
    validate_new_promo_code, validate_price, validate_promo_code_patch, validate_quantity,
};
use crate::models::{
    normalize_code, CartLine, DiscountType, NewPromoCode, PromoCode, PromoCodePatch,
    PromoValidation,
};
use crate::store::{EventScope, PromoCodeStore, ScopedRepository, StoreError, TicketTypeStore};

const PROMO_CODE: &str = "Promo code";

pub struct PromoService {
    promo_codes: Arc<dyn PromoCodeStore>,
    ticket_types: Arc<dyn TicketTypeStore>,
    clock: Arc<dyn Clock>,
    retry: RetryPolicy,
}

impl PromoService {
    pub fn new(
        promo_codes: Arc<dyn PromoCodeStore>,
        ticket_types: Arc<dyn TicketTypeStore>,
        clock: Arc<dyn Clock>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            promo_codes,
            ticket_types,
            clock,
            retry,
        }
    }

    #[instrument(
        skip(self, input),
        fields(tenant_id = %scope.tenant_id(), event_id = %scope.event_id(), code = %input.code)
    )]
    pub async fn create(
        &self,
        scope: &EventScope,
        actor_id: Uuid,
        input: NewPromoCode,
    ) -> Result<PromoCode, TicketingError> {
        validate_new_promo_code(&input)?;
        self.ensure_ticket_types_exist(scope, &input.applicable_ticket_types)
            .await?;

        let code = normalize_code(&input.code);
        if self.find_by_code(scope, &code).await?.is_some() {
            return Err(TicketingError::conflict(format!(
                "Promo code '{}' already exists for this event",
                code
            )));
        }

        let now = self.clock.now();
        let promo = PromoCode {
            id: Uuid::new_v4(),
            tenant_id: scope.tenant_id(),
            event_id: scope.event_id(),
            code,
            description: input.description,
            discount_type: input.discount_type,
            discount_value: input.discount_value,
            max_uses: input.max_uses,
            used_count: 0,
            valid_from: input.valid_from,
            valid_until: input.valid_until,
            applicable_ticket_types: input.applicable_ticket_types,
            minimum_purchase_amount: input.minimum_purchase_amount,
            is_active: input.is_active.unwrap_or(true),
            created_at: now,
            updated_at: now,
            created_by: actor_id,
        };

        let store = &self.promo_codes;
        let created = self
            .retry
            .run("create_promo_code", move || store.insert(scope, promo.clone()))
            .await
            .map_err(|e| TicketingError::from_store(e, PROMO_CODE))?;

        info!(promo_code_id = %created.id, code = %created.code, "Promo code created");
        Ok(created)
    }

    pub async fn get(&self, scope: &EventScope, id: Uuid) -> Result<PromoCode, TicketingError> {
        let store = &self.promo_codes;
        self.retry
            .run("get_promo_code", move || store.find(scope, id))
            .await
            .map_err(|e| TicketingError::from_store(e, PROMO_CODE))?
            .ok_or_else(|| TicketingError::not_found("Promo code not found"))
    }

    pub async fn list(&self, scope: &EventScope) -> Result<Vec<PromoCode>, TicketingError> {
        let store = &self.promo_codes;
        let mut promo_codes = self
            .retry
            .run("list_promo_codes", move || store.list(scope))
            .await
            .map_err(|e| TicketingError::from_store(e, PROMO_CODE))?;
        promo_codes.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(promo_codes)
    }

    #[instrument(skip(self, patch), fields(tenant_id = %scope.tenant_id(), event_id = %scope.event_id()))]
    pub async fn update(
        &self,
        scope: &EventScope,
        id: Uuid,
        patch: PromoCodePatch,
    ) -> Result<PromoCode, TicketingError> {
        let current = self.get(scope, id).await?;
        validate_promo_code_patch(&current, &patch)?;
        if let Some(ids) = &patch.applicable_ticket_types {
            self.ensure_ticket_types_exist(scope, ids).await?;
        }

        let now = self.clock.now();
        let store = &self.promo_codes;
        let patch = &patch;
        let updated = self
            .retry
            .run("update_promo_code", move || {
                store.update_promo_code(scope, id, patch, now)
            })
            .await
            .map_err(|e| rejected(e, "update"))?;

        info!(promo_code_id = %id, "Promo code updated");
        Ok(updated)
    }

    #[instrument(skip(self), fields(tenant_id = %scope.tenant_id(), event_id = %scope.event_id()))]
    pub async fn delete(&self, scope: &EventScope, id: Uuid) -> Result<(), TicketingError> {
        let store = &self.promo_codes;
        let removed = self
            .retry
            .run("delete_promo_code", move || store.remove(scope, id))
            .await
            .map_err(|e| rejected(e, "delete"))?;

        info!(promo_code_id = %id, code = %removed.code, "Promo code deleted");
        Ok(())
    }

    /// Checks `code` against `lines` without consuming a use.
    ///
    /// An unknown code is `NotFound`. Every other failed check yields an
    /// invalid result with a reason and a zero discount. Checks run in this
    /// order and stop at the first failure: active flag, validity window,
    /// usage limit, minimum purchase.
    ///
    /// `applicable_ticket_types` is stored but not enforced here; the
    /// subtotal covers every supplied line. Fixed discounts are not clamped
    /// to the subtotal.
    pub async fn validate(
        &self,
        scope: &EventScope,
        code: &str,
        lines: &[CartLine],
    ) -> Result<PromoValidation, TicketingError> {
        let mut line_totals = Vec::with_capacity(lines.len());
        for line in lines {
            validate_quantity(line.quantity)?;
            validate_price("Price", line.price)?;
            line_totals.push(line.total().ok_or_else(|| money::out_of_range("Line total"))?);
        }
        let subtotal = money::sum("Cart subtotal", line_totals)?;

        let promo = self
            .find_by_code(scope, code)
            .await?
            .ok_or_else(|| TicketingError::not_found("Promo code not found"))?;
        let now = self.clock.now();

        if !promo.is_active {
            return Ok(PromoValidation::invalid("Promo code is not active"));
        }
        if promo.valid_from.is_some_and(|from| now < from) {
            return Ok(PromoValidation::invalid("Promo code is not yet valid"));
        }
        if promo.valid_until.is_some_and(|until| now > until) {
            return Ok(PromoValidation::invalid("Promo code has expired"));
        }
        if !promo.has_remaining_uses() {
            return Ok(PromoValidation::invalid("Promo code usage limit reached"));
        }

        if let Some(minimum) = promo.minimum_purchase_amount {
            if subtotal < minimum {
                return Ok(PromoValidation::invalid(format!(
                    "Minimum purchase amount of {} not met",
                    minimum
                )));
            }
        }

        let discount = match promo.discount_type {
            DiscountType::Percentage => {
                money::percent_of("Discount", subtotal, promo.discount_value)?
            }
            DiscountType::FixedAmount => promo.discount_value,
        };
        Ok(PromoValidation::valid(promo, discount))
    }

    /// Consumes one use of `code`. Fails with a conflict once `max_uses` is
    /// reached; concurrent callers never push the count past it.
    #[instrument(skip(self), fields(tenant_id = %scope.tenant_id(), event_id = %scope.event_id()))]
    pub async fn redeem(&self, scope: &EventScope, code: &str) -> Result<PromoCode, TicketingError> {
        let now = self.clock.now();
        let store = &self.promo_codes;
        let redeemed = self
            .retry
            .run("redeem_promo_code", move || store.redeem(scope, code, now))
            .await
            .map_err(|e| rejected(e, "redeem"))?;

        info!(
            promo_code_id = %redeemed.id,
            used_count = redeemed.used_count,
            "Promo code redeemed"
        );
        Ok(redeemed)
    }

    async fn find_by_code(
        &self,
        scope: &EventScope,
        code: &str,
    ) -> Result<Option<PromoCode>, TicketingError> {
        let store = &self.promo_codes;
        self.retry
            .run("find_promo_code", move || store.find_by_key(scope, code))
            .await
            .map_err(|e| TicketingError::from_store(e, PROMO_CODE))
    }

    async fn ensure_ticket_types_exist(
        &self,
        scope: &EventScope,
        ids: &[Uuid],
    ) -> Result<(), TicketingError> {
        let store = &self.ticket_types;
        for &id in ids {
            let found = self
                .retry
                .run("get_ticket_type", move || store.find(scope, id))
                .await
                .map_err(|e| TicketingError::from_store(e, "Ticket type"))?;
            if found.is_none() {
                return Err(TicketingError::validation(format!(
                    "Ticket type {} does not belong to this event",
                    id
                )));
            }
        }
        Ok(())
    }
}

fn rejected(err: StoreError, operation: &str) -> TicketingError {
    if let StoreError::Rejected(rejection) = &err {
        warn!(operation, reason = %rejection, "Promo code operation rejected");
    }
    TicketingError::from_store(err, PROMO_CODE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::clock::FixedClock;
    use crate::store::MemoryStore;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use rust_decimal::Decimal;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 1, 9, 0, 0).unwrap()
    }

    fn service() -> PromoService {
        let store = Arc::new(MemoryStore::new());
        PromoService::new(
            store.clone(),
            store,
            Arc::new(FixedClock::new(now())),
            RetryPolicy::none(),
        )
    }

    fn percent(code: &str, value: i64) -> NewPromoCode {
        NewPromoCode {
            code: code.to_string(),
            description: None,
            discount_type: DiscountType::Percentage,
            discount_value: Decimal::from(value),
            max_uses: None,
            valid_from: None,
            valid_until: None,
            applicable_ticket_types: Vec::new(),
            minimum_purchase_amount: None,
            is_active: None,
        }
    }

    fn line(price: i64, quantity: i32) -> CartLine {
        CartLine {
            ticket_type_id: Uuid::new_v4(),
            price: Decimal::from(price),
            quantity,
        }
    }

    #[tokio::test]
    async fn test_code_is_stored_uppercased_and_matched_case_insensitively() {
        let service = service();
        let scope = EventScope::new(Uuid::new_v4(), Uuid::new_v4());
        let created = service
            .create(&scope, Uuid::new_v4(), percent("summer", 10))
            .await
            .unwrap();
        assert_eq!(created.code, "SUMMER");

        let result = service
            .validate(&scope, "Summer", &[line(100, 1)])
            .await
            .unwrap();
        assert!(result.is_valid);
        assert_eq!(result.discount_amount, Decimal::from(10));
    }

    #[tokio::test]
    async fn test_duplicate_code_conflicts_regardless_of_case() {
        let service = service();
        let scope = EventScope::new(Uuid::new_v4(), Uuid::new_v4());
        service
            .create(&scope, Uuid::new_v4(), percent("SAVE10", 10))
            .await
            .unwrap();
        let err = service
            .create(&scope, Uuid::new_v4(), percent("save10", 15))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "CONFLICT");
    }

    #[tokio::test]
    async fn test_unknown_applicable_ticket_type_is_rejected() {
        let service = service();
        let scope = EventScope::new(Uuid::new_v4(), Uuid::new_v4());
        let input = NewPromoCode {
            applicable_ticket_types: vec![Uuid::new_v4()],
            ..percent("VIPONLY", 10)
        };
        let err = service.create(&scope, Uuid::new_v4(), input).await.unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_unknown_code_is_not_found() {
        let service = service();
        let scope = EventScope::new(Uuid::new_v4(), Uuid::new_v4());
        let err = service
            .validate(&scope, "NOPE", &[line(10, 1)])
            .await
            .unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_first_failing_check_wins() {
        let service = service();
        let scope = EventScope::new(Uuid::new_v4(), Uuid::new_v4());
        let input = NewPromoCode {
            is_active: Some(false),
            valid_until: Some(now() - Duration::days(1)),
            ..percent("OLDCODE", 10)
        };
        service.create(&scope, Uuid::new_v4(), input).await.unwrap();

        let result = service
            .validate(&scope, "OLDCODE", &[line(10, 1)])
            .await
            .unwrap();
        assert!(!result.is_valid);
        assert_eq!(result.reason.as_deref(), Some("Promo code is not active"));
        assert_eq!(result.discount_amount, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_window_checks() {
        let service = service();
        let scope = EventScope::new(Uuid::new_v4(), Uuid::new_v4());
        let future = NewPromoCode {
            valid_from: Some(now() + Duration::hours(1)),
            ..percent("LATER", 10)
        };
        let expired = NewPromoCode {
            valid_from: Some(now() - Duration::days(2)),
            valid_until: Some(now() - Duration::seconds(1)),
            ..percent("GONE", 10)
        };
        service.create(&scope, Uuid::new_v4(), future).await.unwrap();
        service.create(&scope, Uuid::new_v4(), expired).await.unwrap();

        let later = service.validate(&scope, "LATER", &[line(10, 1)]).await.unwrap();
        assert_eq!(later.reason.as_deref(), Some("Promo code is not yet valid"));
        let gone = service.validate(&scope, "GONE", &[line(10, 1)]).await.unwrap();
        assert_eq!(gone.reason.as_deref(), Some("Promo code has expired"));
    }

    #[tokio::test]
    async fn test_minimum_purchase_amount() {
        let service = service();
        let scope = EventScope::new(Uuid::new_v4(), Uuid::new_v4());
        let input = NewPromoCode {
            minimum_purchase_amount: Some(Decimal::from(100)),
            ..percent("BIGSPEND", 10)
        };
        service.create(&scope, Uuid::new_v4(), input).await.unwrap();

        let short = service
            .validate(&scope, "BIGSPEND", &[line(40, 2)])
            .await
            .unwrap();
        assert!(!short.is_valid);

        let enough = service
            .validate(&scope, "BIGSPEND", &[line(50, 2)])
            .await
            .unwrap();
        assert!(enough.is_valid);
        assert_eq!(enough.discount_amount, Decimal::from(10));
    }

    #[tokio::test]
    async fn test_validate_has_no_side_effects() {
        let service = service();
        let scope = EventScope::new(Uuid::new_v4(), Uuid::new_v4());
        let input = NewPromoCode {
            max_uses: Some(1),
            ..percent("ONCE", 10)
        };
        let created = service.create(&scope, Uuid::new_v4(), input).await.unwrap();
        for _ in 0..3 {
            let result = service.validate(&scope, "ONCE", &[line(10, 1)]).await.unwrap();
            assert!(result.is_valid);
        }
        assert_eq!(service.get(&scope, created.id).await.unwrap().used_count, 0);
    }

    #[tokio::test]
    async fn test_redeem_past_limit_conflicts() {
        let service = service();
        let scope = EventScope::new(Uuid::new_v4(), Uuid::new_v4());
        let input = NewPromoCode {
            max_uses: Some(2),
            ..percent("TWICE", 10)
        };
        service.create(&scope, Uuid::new_v4(), input).await.unwrap();

        assert_eq!(service.redeem(&scope, "twice").await.unwrap().used_count, 1);
        assert_eq!(service.redeem(&scope, "TWICE").await.unwrap().used_count, 2);
        let err = service.redeem(&scope, "TWICE").await.unwrap_err();
        assert_eq!(err.code(), "CONFLICT");

        let result = service.validate(&scope, "TWICE", &[line(10, 1)]).await.unwrap();
        assert_eq!(result.reason.as_deref(), Some("Promo code usage limit reached"));
    }

    #[tokio::test]
    async fn test_delete_after_redemption_conflicts() {
        let service = service();
        let scope = EventScope::new(Uuid::new_v4(), Uuid::new_v4());
        let created = service
            .create(&scope, Uuid::new_v4(), percent("USED", 10))
            .await
            .unwrap();
        service.redeem(&scope, "USED").await.unwrap();

        let err = service.delete(&scope, created.id).await.unwrap_err();
        assert_eq!(err.code(), "CONFLICT");
    }

    #[tokio::test]
    async fn test_max_uses_cannot_drop_below_used_count() {
        let service = service();
        let scope = EventScope::new(Uuid::new_v4(), Uuid::new_v4());
        let created = service
            .create(&scope, Uuid::new_v4(), percent("LIMIT", 10))
            .await
            .unwrap();
        service.redeem(&scope, "LIMIT").await.unwrap();
        service.redeem(&scope, "LIMIT").await.unwrap();

        let patch = PromoCodePatch {
            max_uses: Some(Some(1)),
            ..Default::default()
        };
        let err = service.update(&scope, created.id, patch).await.unwrap_err();
        assert_eq!(err.code(), "CONFLICT");
    }
}
