//! Inventory ledger: ticket type lifecycle and the four counter operations.
//!
//! Counter mutations go through [`TicketTypeStore::apply_inventory`], which
//! runs the check and the write as one step. The ledger never reads a counter
//! and writes it back itself.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::domain::clock::Clock;
use crate::domain::counters::{InventoryOp, InventoryOutcome};
use crate::domain::error::TicketingError;
use crate::domain::retry::RetryPolicy;
use crate::domain::validation::{
    validate_new_ticket_type, validate_quantity, validate_ticket_type_patch,
};
use crate::models::ticket_type::DEFAULT_CURRENCY;
use crate::models::{
    Availability, Confirmation, NewTicketType, TicketType, TicketTypePatch, Visibility,
};
use crate::store::{EventScope, ScopedRepository, StoreError, TicketTypeStore};

const TICKET_TYPE: &str = "Ticket type";

pub struct InventoryLedger {
    store: Arc<dyn TicketTypeStore>,
    clock: Arc<dyn Clock>,
    retry: RetryPolicy,
}

impl InventoryLedger {
    pub fn new(store: Arc<dyn TicketTypeStore>, clock: Arc<dyn Clock>, retry: RetryPolicy) -> Self {
        Self {
            store,
            clock,
            retry,
        }
    }

    #[instrument(
        skip(self, input),
        fields(tenant_id = %scope.tenant_id(), event_id = %scope.event_id(), name = %input.name)
    )]
    pub async fn create(
        &self,
        scope: &EventScope,
        actor_id: Uuid,
        input: NewTicketType,
    ) -> Result<TicketType, TicketingError> {
        validate_new_ticket_type(&input)?;

        let name = input.name.trim().to_string();
        self.ensure_name_free(scope, &name, None).await?;

        let now = self.clock.now();
        let ticket_type = TicketType {
            id: Uuid::new_v4(),
            tenant_id: scope.tenant_id(),
            event_id: scope.event_id(),
            name,
            description: input.description,
            base_price: input.base_price,
            currency: input
                .currency
                .map(|c| c.to_uppercase())
                .unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
            order: input.order.unwrap_or(0),
            visibility: input.visibility.unwrap_or(Visibility::Public),
            is_active: input.is_active.unwrap_or(true),
            capacity: input.capacity,
            quantity_sold: 0,
            quantity_reserved: 0,
            sales_start_date: input.sales_start_date,
            sales_end_date: input.sales_end_date,
            dynamic_pricing: input.dynamic_pricing,
            created_at: now,
            updated_at: now,
            created_by: actor_id,
        };

        let store = &self.store;
        let created = self
            .retry
            .run("create_ticket_type", move || {
                store.insert(scope, ticket_type.clone())
            })
            .await
            .map_err(|e| TicketingError::from_store(e, TICKET_TYPE))?;

        info!(ticket_type_id = %created.id, capacity = created.capacity, "Ticket type created");
        Ok(created)
    }

    #[instrument(skip(self, patch), fields(tenant_id = %scope.tenant_id(), event_id = %scope.event_id()))]
    pub async fn update(
        &self,
        scope: &EventScope,
        id: Uuid,
        patch: TicketTypePatch,
    ) -> Result<TicketType, TicketingError> {
        let current = self.get(scope, id).await?;
        validate_ticket_type_patch(&current, &patch)?;

        if patch.is_empty() {
            return Ok(current);
        }
        if let Some(name) = &patch.name {
            let name = name.trim();
            if name != current.name {
                self.ensure_name_free(scope, name, Some(id)).await?;
            }
        }

        let now = self.clock.now();
        let store = &self.store;
        let patch = &patch;
        let updated = self
            .retry
            .run("update_ticket_type", move || {
                store.update_ticket_type(scope, id, patch, now)
            })
            .await
            .map_err(|e| self.rejected(e, "update"))?;

        info!(ticket_type_id = %id, "Ticket type updated");
        Ok(updated)
    }

    #[instrument(skip(self), fields(tenant_id = %scope.tenant_id(), event_id = %scope.event_id()))]
    pub async fn delete(&self, scope: &EventScope, id: Uuid) -> Result<(), TicketingError> {
        let store = &self.store;
        let removed = self
            .retry
            .run("delete_ticket_type", move || store.remove(scope, id))
            .await
            .map_err(|e| self.rejected(e, "delete"))?;

        info!(ticket_type_id = %id, name = %removed.name, "Ticket type deleted");
        Ok(())
    }

    pub async fn get(&self, scope: &EventScope, id: Uuid) -> Result<TicketType, TicketingError> {
        let store = &self.store;
        self.retry
            .run("get_ticket_type", move || store.find(scope, id))
            .await
            .map_err(|e| TicketingError::from_store(e, TICKET_TYPE))?
            .ok_or_else(|| TicketingError::not_found("Ticket type not found"))
    }

    /// All ticket types of the event, ordered by display order then name.
    pub async fn list(&self, scope: &EventScope) -> Result<Vec<TicketType>, TicketingError> {
        let store = &self.store;
        let mut ticket_types = self
            .retry
            .run("list_ticket_types", move || store.list(scope))
            .await
            .map_err(|e| TicketingError::from_store(e, TICKET_TYPE))?;
        ticket_types.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.name.cmp(&b.name)));
        Ok(ticket_types)
    }

    #[instrument(skip(self), fields(tenant_id = %scope.tenant_id(), event_id = %scope.event_id()))]
    pub async fn reserve(
        &self,
        scope: &EventScope,
        id: Uuid,
        quantity: i32,
    ) -> Result<Availability, TicketingError> {
        let outcome = self.apply(scope, id, InventoryOp::Reserve(quantity)).await?;
        debug!(ticket_type_id = %id, quantity, "Tickets reserved");
        Ok(outcome.ticket_type.availability())
    }

    /// Returns held tickets to the pool. Releasing more than is reserved
    /// empties the reservation.
    #[instrument(skip(self), fields(tenant_id = %scope.tenant_id(), event_id = %scope.event_id()))]
    pub async fn release(
        &self,
        scope: &EventScope,
        id: Uuid,
        quantity: i32,
    ) -> Result<Availability, TicketingError> {
        let outcome = self.apply(scope, id, InventoryOp::Release(quantity)).await?;
        debug!(ticket_type_id = %id, quantity, "Reservation released");
        Ok(outcome.ticket_type.availability())
    }

    /// Turns `quantity` reserved tickets into sold ones and reports the unit
    /// price in force at this moment.
    #[instrument(skip(self), fields(tenant_id = %scope.tenant_id(), event_id = %scope.event_id()))]
    pub async fn confirm(
        &self,
        scope: &EventScope,
        id: Uuid,
        quantity: i32,
    ) -> Result<Confirmation, TicketingError> {
        let outcome = self.apply(scope, id, InventoryOp::Confirm(quantity)).await?;
        let availability = outcome.ticket_type.availability();
        let unit_price = outcome.price.ok_or_else(|| {
            TicketingError::Store(StoreError::Backend(
                "confirmation returned no price".to_string(),
            ))
        })?;

        info!(
            ticket_type_id = %id,
            quantity,
            unit_price = %unit_price.amount,
            sold = availability.sold,
            "Sale confirmed"
        );
        Ok(Confirmation {
            availability,
            unit_price,
        })
    }

    #[instrument(skip(self), fields(tenant_id = %scope.tenant_id(), event_id = %scope.event_id()))]
    pub async fn cancel(
        &self,
        scope: &EventScope,
        id: Uuid,
        quantity: i32,
    ) -> Result<Availability, TicketingError> {
        let outcome = self.apply(scope, id, InventoryOp::Cancel(quantity)).await?;
        info!(ticket_type_id = %id, quantity, "Sale cancelled");
        Ok(outcome.ticket_type.availability())
    }

    pub async fn get_availability(
        &self,
        scope: &EventScope,
        id: Uuid,
    ) -> Result<Availability, TicketingError> {
        Ok(self.get(scope, id).await?.availability())
    }

    async fn apply(
        &self,
        scope: &EventScope,
        id: Uuid,
        op: InventoryOp,
    ) -> Result<InventoryOutcome, TicketingError> {
        validate_quantity(op.quantity())?;

        let now = self.clock.now();
        let store = &self.store;
        self.retry
            .run(op.name(), move || store.apply_inventory(scope, id, op, now))
            .await
            .map_err(|e| self.rejected(e, op.name()))
    }

    async fn ensure_name_free(
        &self,
        scope: &EventScope,
        name: &str,
        except: Option<Uuid>,
    ) -> Result<(), TicketingError> {
        let store = &self.store;
        let existing = self
            .retry
            .run("find_ticket_type_by_name", move || store.find_by_key(scope, name))
            .await
            .map_err(|e| TicketingError::from_store(e, TICKET_TYPE))?;

        match existing {
            Some(other) if Some(other.id) != except => Err(TicketingError::conflict(format!(
                "Ticket type '{}' already exists for this event",
                name
            ))),
            _ => Ok(()),
        }
    }

    fn rejected(&self, err: StoreError, operation: &str) -> TicketingError {
        if let StoreError::Rejected(rejection) = &err {
            warn!(operation, reason = %rejection, "Ticket type operation rejected");
        }
        TicketingError::from_store(err, TICKET_TYPE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::clock::FixedClock;
    use crate::store::MemoryStore;
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;

    fn ledger() -> InventoryLedger {
        let now = Utc.with_ymd_and_hms(2026, 5, 1, 12, 0, 0).unwrap();
        InventoryLedger::new(
            Arc::new(MemoryStore::new()),
            Arc::new(FixedClock::new(now)),
            RetryPolicy::none(),
        )
    }

    fn scope() -> EventScope {
        EventScope::new(Uuid::new_v4(), Uuid::new_v4())
    }

    fn general(capacity: i32) -> NewTicketType {
        NewTicketType {
            name: "General Admission".to_string(),
            base_price: Decimal::new(5000, 2),
            capacity,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_applies_defaults() {
        let ledger = ledger();
        let scope = scope();
        let actor = Uuid::new_v4();
        let created = ledger.create(&scope, actor, general(100)).await.unwrap();

        assert_eq!(created.currency, "USD");
        assert_eq!(created.visibility, Visibility::Public);
        assert!(created.is_active);
        assert_eq!(created.quantity_sold, 0);
        assert_eq!(created.quantity_reserved, 0);
        assert_eq!(created.created_by, actor);
        assert_eq!(ledger.get(&scope, created.id).await.unwrap(), created);
    }

    #[tokio::test]
    async fn test_create_rejects_duplicate_name() {
        let ledger = ledger();
        let scope = scope();
        ledger.create(&scope, Uuid::new_v4(), general(10)).await.unwrap();
        let err = ledger
            .create(&scope, Uuid::new_v4(), general(10))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "CONFLICT");
    }

    #[tokio::test]
    async fn test_create_validates_before_touching_store() {
        let ledger = ledger();
        let scope = scope();
        let err = ledger
            .create(&scope, Uuid::new_v4(), general(0))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
        assert!(ledger.list(&scope).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rename_to_own_name_is_allowed() {
        let ledger = ledger();
        let scope = scope();
        let created = ledger.create(&scope, Uuid::new_v4(), general(10)).await.unwrap();
        let patch = TicketTypePatch {
            name: Some("General Admission".to_string()),
            description: Some(Some("Standing".to_string())),
            ..Default::default()
        };
        let updated = ledger.update(&scope, created.id, patch).await.unwrap();
        assert_eq!(updated.description.as_deref(), Some("Standing"));
        assert_eq!(updated.base_price, created.base_price);
    }

    #[tokio::test]
    async fn test_rename_onto_sibling_conflicts() {
        let ledger = ledger();
        let scope = scope();
        ledger.create(&scope, Uuid::new_v4(), general(10)).await.unwrap();
        let vip = NewTicketType {
            name: "VIP".to_string(),
            ..general(5)
        };
        let vip = ledger.create(&scope, Uuid::new_v4(), vip).await.unwrap();

        let patch = TicketTypePatch {
            name: Some("General Admission".to_string()),
            ..Default::default()
        };
        let err = ledger.update(&scope, vip.id, patch).await.unwrap_err();
        assert_eq!(err.code(), "CONFLICT");
    }

    #[tokio::test]
    async fn test_capacity_shrink_below_committed_conflicts() {
        let ledger = ledger();
        let scope = scope();
        let created = ledger.create(&scope, Uuid::new_v4(), general(10)).await.unwrap();
        ledger.reserve(&scope, created.id, 6).await.unwrap();

        let patch = TicketTypePatch {
            capacity: Some(5),
            ..Default::default()
        };
        let err = ledger.update(&scope, created.id, patch).await.unwrap_err();
        assert_eq!(err.code(), "CONFLICT");
        assert_eq!(ledger.get(&scope, created.id).await.unwrap().capacity, 10);
    }

    #[tokio::test]
    async fn test_zero_quantity_is_a_validation_error() {
        let ledger = ledger();
        let scope = scope();
        let created = ledger.create(&scope, Uuid::new_v4(), general(10)).await.unwrap();
        let err = ledger.reserve(&scope, created.id, 0).await.unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_delete_with_sales_conflicts() {
        let ledger = ledger();
        let scope = scope();
        let created = ledger.create(&scope, Uuid::new_v4(), general(10)).await.unwrap();
        ledger.reserve(&scope, created.id, 2).await.unwrap();
        ledger.confirm(&scope, created.id, 2).await.unwrap();

        let err = ledger.delete(&scope, created.id).await.unwrap_err();
        assert_eq!(err.code(), "CONFLICT");

        ledger.cancel(&scope, created.id, 2).await.unwrap();
        ledger.delete(&scope, created.id).await.unwrap();
        let err = ledger.get(&scope, created.id).await.unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_list_orders_by_order_then_name() {
        let ledger = ledger();
        let scope = scope();
        for (name, order) in [("Balcony", 2), ("Stalls", 1), ("Box", 1)] {
            let input = NewTicketType {
                name: name.to_string(),
                order: Some(order),
                ..general(10)
            };
            ledger.create(&scope, Uuid::new_v4(), input).await.unwrap();
        }
        let names: Vec<_> = ledger
            .list(&scope)
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, vec!["Box", "Stalls", "Balcony"]);
    }
}
