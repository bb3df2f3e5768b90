//! In-process backend.
//!
//! Records live in a `DashMap`; `get_mut` holds the record's shard lock for
//! the whole check-and-write, which is what makes each counter mutation
//! atomic. Unique keys live in a second map and are claimed through its
//! entry API before the record is written.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;

use crate::domain::counters::{
    apply_inventory_op, apply_promo_code_patch, apply_redemption, apply_ticket_type_patch,
    InventoryOp, InventoryOutcome,
};
use crate::domain::error::Rejection;
use crate::models::{
    normalize_code, PromoCode, PromoCodePatch, TicketType, TicketTypePatch, TicketingSettings,
};
use crate::store::{
    EventScope, PromoCodeStore, ScopedEntity, ScopedRepository, SettingsStore, StoreError,
    TicketTypeStore,
};

pub struct MemoryRepository<E> {
    records: DashMap<(EventScope, Uuid), E>,
    keys: DashMap<(EventScope, String), Uuid>,
}

impl<E> Default for MemoryRepository<E> {
    fn default() -> Self {
        Self {
            records: DashMap::new(),
            keys: DashMap::new(),
        }
    }
}

fn duplicate<E: ScopedEntity>(key: &str) -> StoreError {
    StoreError::Duplicate(format!(
        "{} '{}' already exists for this event",
        E::KIND,
        key
    ))
}

impl<E: ScopedEntity> MemoryRepository<E> {
    pub fn find(&self, scope: &EventScope, id: Uuid) -> Option<E> {
        self.records
            .get(&(*scope, id))
            .map(|record| record.value().clone())
    }

    pub fn find_by_key(&self, scope: &EventScope, key: &str) -> Option<E> {
        let id = *self.keys.get(&(*scope, key.to_string()))?;
        self.find(scope, id)
    }

    pub fn list(&self, scope: &EventScope) -> Vec<E> {
        self.records
            .iter()
            .filter(|record| record.key().0 == *scope)
            .map(|record| record.value().clone())
            .collect()
    }

    pub fn insert(&self, scope: &EventScope, entity: E) -> Result<E, StoreError> {
        let key = entity.unique_key();
        match self.keys.entry((*scope, key.clone())) {
            Entry::Occupied(_) => return Err(duplicate::<E>(&key)),
            Entry::Vacant(slot) => {
                slot.insert(entity.id());
            }
        }
        self.records.insert((*scope, entity.id()), entity.clone());
        Ok(entity)
    }

    pub fn remove(&self, scope: &EventScope, id: Uuid) -> Result<E, StoreError> {
        let record_key = (*scope, id);
        if let Some((_, removed)) = self
            .records
            .remove_if(&record_key, |_, entity| entity.check_removable().is_ok())
        {
            self.keys
                .remove_if(&(*scope, removed.unique_key()), |_, owner| *owner == id);
            return Ok(removed);
        }

        match self.records.get(&record_key) {
            None => Err(StoreError::NotFound),
            Some(current) => match current.check_removable() {
                Err(rejection) => Err(StoreError::Rejected(rejection)),
                Ok(()) => Err(StoreError::Transient(format!(
                    "{} changed during delete",
                    E::KIND
                ))),
            },
        }
    }

    /// Runs `apply` on a copy of the record under its lock and writes the
    /// copy back only if `apply` succeeds.
    pub fn mutate<R>(
        &self,
        scope: &EventScope,
        id: Uuid,
        apply: impl FnOnce(&mut E) -> Result<R, Rejection>,
    ) -> Result<(E, R), StoreError> {
        let mut record = self
            .records
            .get_mut(&(*scope, id))
            .ok_or(StoreError::NotFound)?;
        let mut next = record.value().clone();
        let output = apply(&mut next)?;
        *record.value_mut() = next.clone();
        Ok((next, output))
    }

    /// Like [`Self::mutate`], but first claims `new_key` when it differs from
    /// the record's current unique key.
    pub fn mutate_with_key<R>(
        &self,
        scope: &EventScope,
        id: Uuid,
        new_key: Option<String>,
        apply: impl FnOnce(&mut E) -> Result<R, Rejection>,
    ) -> Result<(E, R), StoreError> {
        let current_key = self
            .find(scope, id)
            .map(|entity| entity.unique_key())
            .ok_or(StoreError::NotFound)?;
        let Some(new_key) = new_key.filter(|key| *key != current_key) else {
            return self.mutate(scope, id, apply);
        };

        match self.keys.entry((*scope, new_key.clone())) {
            Entry::Occupied(_) => return Err(duplicate::<E>(&new_key)),
            Entry::Vacant(slot) => {
                slot.insert(id);
            }
        }

        let mut previous_key = None;
        let result = self.mutate(scope, id, |entity| {
            previous_key = Some(entity.unique_key());
            apply(entity)
        });

        let stale_key = match &result {
            Ok(_) => previous_key,
            Err(_) => Some(new_key),
        };
        if let Some(stale_key) = stale_key {
            self.keys
                .remove_if(&(*scope, stale_key), |_, owner| *owner == id);
        }
        result
    }
}

/// Everything in memory. Used for tests and `STORE_BACKEND=memory`.
#[derive(Default)]
pub struct MemoryStore {
    ticket_types: MemoryRepository<TicketType>,
    promo_codes: MemoryRepository<PromoCode>,
    settings: DashMap<EventScope, TicketingSettings>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ScopedRepository<TicketType> for MemoryStore {
    async fn find(&self, scope: &EventScope, id: Uuid) -> Result<Option<TicketType>, StoreError> {
        Ok(self.ticket_types.find(scope, id))
    }

    async fn find_by_key(
        &self,
        scope: &EventScope,
        key: &str,
    ) -> Result<Option<TicketType>, StoreError> {
        Ok(self.ticket_types.find_by_key(scope, key))
    }

    async fn list(&self, scope: &EventScope) -> Result<Vec<TicketType>, StoreError> {
        Ok(self.ticket_types.list(scope))
    }

    async fn insert(&self, scope: &EventScope, entity: TicketType) -> Result<TicketType, StoreError> {
        self.ticket_types.insert(scope, entity)
    }

    async fn remove(&self, scope: &EventScope, id: Uuid) -> Result<TicketType, StoreError> {
        self.ticket_types.remove(scope, id)
    }
}

#[async_trait]
impl TicketTypeStore for MemoryStore {
    async fn update_ticket_type(
        &self,
        scope: &EventScope,
        id: Uuid,
        patch: &TicketTypePatch,
        now: DateTime<Utc>,
    ) -> Result<TicketType, StoreError> {
        let new_name = patch.name.as_ref().map(|name| name.trim().to_string());
        let (updated, ()) = self.ticket_types.mutate_with_key(scope, id, new_name, |tt| {
            apply_ticket_type_patch(tt, patch, now)
        })?;
        Ok(updated)
    }

    async fn apply_inventory(
        &self,
        scope: &EventScope,
        id: Uuid,
        op: InventoryOp,
        now: DateTime<Utc>,
    ) -> Result<InventoryOutcome, StoreError> {
        let (ticket_type, price) = self
            .ticket_types
            .mutate(scope, id, |tt| apply_inventory_op(tt, op, now))?;
        Ok(InventoryOutcome { ticket_type, price })
    }
}

#[async_trait]
impl ScopedRepository<PromoCode> for MemoryStore {
    async fn find(&self, scope: &EventScope, id: Uuid) -> Result<Option<PromoCode>, StoreError> {
        Ok(self.promo_codes.find(scope, id))
    }

    async fn find_by_key(
        &self,
        scope: &EventScope,
        key: &str,
    ) -> Result<Option<PromoCode>, StoreError> {
        Ok(self.promo_codes.find_by_key(scope, &normalize_code(key)))
    }

    async fn list(&self, scope: &EventScope) -> Result<Vec<PromoCode>, StoreError> {
        Ok(self.promo_codes.list(scope))
    }

    async fn insert(&self, scope: &EventScope, entity: PromoCode) -> Result<PromoCode, StoreError> {
        self.promo_codes.insert(scope, entity)
    }

    async fn remove(&self, scope: &EventScope, id: Uuid) -> Result<PromoCode, StoreError> {
        self.promo_codes.remove(scope, id)
    }
}

#[async_trait]
impl PromoCodeStore for MemoryStore {
    async fn update_promo_code(
        &self,
        scope: &EventScope,
        id: Uuid,
        patch: &PromoCodePatch,
        now: DateTime<Utc>,
    ) -> Result<PromoCode, StoreError> {
        let (updated, ()) = self
            .promo_codes
            .mutate(scope, id, |promo| apply_promo_code_patch(promo, patch, now))?;
        Ok(updated)
    }

    async fn redeem(
        &self,
        scope: &EventScope,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<PromoCode, StoreError> {
        let id = self
            .promo_codes
            .find_by_key(scope, &normalize_code(code))
            .map(|promo| promo.id)
            .ok_or(StoreError::NotFound)?;
        let (redeemed, ()) = self
            .promo_codes
            .mutate(scope, id, |promo| apply_redemption(promo, now))?;
        Ok(redeemed)
    }
}

#[async_trait]
impl SettingsStore for MemoryStore {
    async fn get_settings(
        &self,
        scope: &EventScope,
    ) -> Result<Option<TicketingSettings>, StoreError> {
        Ok(self.settings.get(scope).map(|entry| entry.value().clone()))
    }

    async fn upsert_settings(
        &self,
        scope: &EventScope,
        settings: TicketingSettings,
    ) -> Result<TicketingSettings, StoreError> {
        self.settings.insert(*scope, settings.clone());
        Ok(settings)
    }
}
