//! Storage boundary for ticket types, promo codes and ticketing settings.
//!
//! Every method takes an [`EventScope`]; there is no way to address a record
//! without naming its tenant and event. Counter mutations are single atomic
//! operations: the backend runs the rule from [`crate::domain::counters`]
//! while holding the one record exclusively.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::counters::{InventoryOp, InventoryOutcome};
use crate::domain::error::Rejection;
use crate::models::{
    PromoCode, PromoCodePatch, TicketType, TicketTypePatch, TicketingSettings,
};

pub mod error;
pub mod memory;
pub mod postgres;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Tenant + event partition that every stored record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventScope {
    tenant_id: Uuid,
    event_id: Uuid,
}

impl EventScope {
    pub fn new(tenant_id: Uuid, event_id: Uuid) -> Self {
        Self {
            tenant_id,
            event_id,
        }
    }

    pub fn tenant_id(&self) -> Uuid {
        self.tenant_id
    }

    pub fn event_id(&self) -> Uuid {
        self.event_id
    }
}

/// A record addressable through a [`ScopedRepository`].
pub trait ScopedEntity: Clone + Send + Sync + 'static {
    const KIND: &'static str;

    fn id(&self) -> Uuid;

    /// Key that must be unique within the scope.
    fn unique_key(&self) -> String;

    /// Deletion guard, checked atomically with the delete itself.
    fn check_removable(&self) -> Result<(), Rejection>;
}

impl ScopedEntity for TicketType {
    const KIND: &'static str = "Ticket type";

    fn id(&self) -> Uuid {
        self.id
    }

    fn unique_key(&self) -> String {
        self.name.clone()
    }

    fn check_removable(&self) -> Result<(), Rejection> {
        if self.quantity_sold > 0 {
            return Err(Rejection::HasSales {
                sold: self.quantity_sold,
            });
        }
        Ok(())
    }
}

impl ScopedEntity for PromoCode {
    const KIND: &'static str = "Promo code";

    fn id(&self) -> Uuid {
        self.id
    }

    fn unique_key(&self) -> String {
        self.code.clone()
    }

    fn check_removable(&self) -> Result<(), Rejection> {
        if self.used_count > 0 {
            return Err(Rejection::HasRedemptions {
                used_count: self.used_count,
            });
        }
        Ok(())
    }
}

#[async_trait]
pub trait ScopedRepository<E: ScopedEntity>: Send + Sync {
    async fn find(&self, scope: &EventScope, id: Uuid) -> Result<Option<E>, StoreError>;

    /// Uniqueness read: the record whose `unique_key` equals `key`.
    async fn find_by_key(&self, scope: &EventScope, key: &str) -> Result<Option<E>, StoreError>;

    async fn list(&self, scope: &EventScope) -> Result<Vec<E>, StoreError>;

    /// Fails with `Duplicate` when the unique key is already taken.
    async fn insert(&self, scope: &EventScope, entity: E) -> Result<E, StoreError>;

    /// Deletes the record if [`ScopedEntity::check_removable`] allows it.
    async fn remove(&self, scope: &EventScope, id: Uuid) -> Result<E, StoreError>;
}

#[async_trait]
pub trait TicketTypeStore: ScopedRepository<TicketType> {
    /// Applies `patch` atomically: a rename must keep the name unique and a
    /// capacity change must stay above `sold + reserved`.
    async fn update_ticket_type(
        &self,
        scope: &EventScope,
        id: Uuid,
        patch: &TicketTypePatch,
        now: DateTime<Utc>,
    ) -> Result<TicketType, StoreError>;

    async fn apply_inventory(
        &self,
        scope: &EventScope,
        id: Uuid,
        op: InventoryOp,
        now: DateTime<Utc>,
    ) -> Result<InventoryOutcome, StoreError>;
}

#[async_trait]
pub trait PromoCodeStore: ScopedRepository<PromoCode> {
    async fn update_promo_code(
        &self,
        scope: &EventScope,
        id: Uuid,
        patch: &PromoCodePatch,
        now: DateTime<Utc>,
    ) -> Result<PromoCode, StoreError>;

    /// Checks `used_count < max_uses` and increments `used_count` as one step.
    async fn redeem(
        &self,
        scope: &EventScope,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<PromoCode, StoreError>;
}

#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn get_settings(&self, scope: &EventScope)
        -> Result<Option<TicketingSettings>, StoreError>;

    async fn upsert_settings(
        &self,
        scope: &EventScope,
        settings: TicketingSettings,
    ) -> Result<TicketingSettings, StoreError>;
}
