use std::sync::Arc;

use crate::domain::{
    Clock, InventoryLedger, PromoService, RetryPolicy, SystemClock, TicketingConfigService,
};
use crate::store::{MemoryStore, PromoCodeStore, SettingsStore, TicketTypeStore};

/// Services shared by every handler. Built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<InventoryLedger>,
    pub promos: Arc<PromoService>,
    pub config: Arc<TicketingConfigService>,
}

impl AppState {
    pub fn new<S>(store: Arc<S>, clock: Arc<dyn Clock>, retry: RetryPolicy) -> Self
    where
        S: TicketTypeStore + PromoCodeStore + SettingsStore + 'static,
    {
        let ticket_types: Arc<dyn TicketTypeStore> = store.clone();
        let promo_codes: Arc<dyn PromoCodeStore> = store.clone();
        let settings: Arc<dyn SettingsStore> = store;

        let ledger = Arc::new(InventoryLedger::new(
            ticket_types.clone(),
            clock.clone(),
            retry,
        ));
        let promos = Arc::new(PromoService::new(
            promo_codes,
            ticket_types,
            clock.clone(),
            retry,
        ));
        let config = Arc::new(TicketingConfigService::new(
            ledger.clone(),
            promos.clone(),
            settings,
            clock,
            retry,
        ));

        Self {
            ledger,
            promos,
            config,
        }
    }

    /// Process-local state on a fresh [`MemoryStore`] with the system clock.
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(MemoryStore::new()),
            Arc::new(SystemClock),
            RetryPolicy::default(),
        )
    }
}
