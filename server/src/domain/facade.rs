//! Event-level read model over the ledger, the promo service and settings.

use std::collections::HashMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::domain::clock::Clock;
use crate::domain::error::TicketingError;
use crate::domain::ledger::InventoryLedger;
use crate::domain::money;
use crate::domain::pricing::resolve_ticket_price;
use crate::domain::promo::PromoService;
use crate::domain::retry::RetryPolicy;
use crate::domain::validation::{validate_quantity, validate_settings};
use crate::models::{
    CartLine, FeePayer, OrderQuote, QuoteLine, QuoteRequest, ServiceFeeType, SummaryTotals,
    TicketTypeWithAvailability, TicketingConfigSummary, TicketingSettings,
};
use crate::store::{EventScope, SettingsStore};

pub struct TicketingConfigService {
    ledger: Arc<InventoryLedger>,
    promos: Arc<PromoService>,
    settings: Arc<dyn SettingsStore>,
    clock: Arc<dyn Clock>,
    retry: RetryPolicy,
}

impl TicketingConfigService {
    pub fn new(
        ledger: Arc<InventoryLedger>,
        promos: Arc<PromoService>,
        settings: Arc<dyn SettingsStore>,
        clock: Arc<dyn Clock>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            ledger,
            promos,
            settings,
            clock,
            retry,
        }
    }

    /// Stored settings, or the defaults when the event has none yet.
    pub async fn get_settings(
        &self,
        scope: &EventScope,
    ) -> Result<TicketingSettings, TicketingError> {
        let store = &self.settings;
        let stored = self
            .retry
            .run("get_settings", move || store.get_settings(scope))
            .await
            .map_err(|e| TicketingError::from_store(e, "Ticketing settings"))?;
        Ok(stored.unwrap_or_default())
    }

    #[instrument(skip(self, settings), fields(tenant_id = %scope.tenant_id(), event_id = %scope.event_id()))]
    pub async fn upsert_settings(
        &self,
        scope: &EventScope,
        mut settings: TicketingSettings,
    ) -> Result<TicketingSettings, TicketingError> {
        validate_settings(&settings)?;
        settings.currency = settings.currency.to_uppercase();
        settings.updated_at = Some(self.clock.now());

        let store = &self.settings;
        let saved = self
            .retry
            .run("upsert_settings", move || {
                store.upsert_settings(scope, settings.clone())
            })
            .await
            .map_err(|e| TicketingError::from_store(e, "Ticketing settings"))?;

        info!("Ticketing settings saved");
        Ok(saved)
    }

    /// Every ticket type with its free capacity and the price in force now.
    pub async fn list_ticket_types_with_availability(
        &self,
        scope: &EventScope,
    ) -> Result<Vec<TicketTypeWithAvailability>, TicketingError> {
        let now = self.clock.now();
        let ticket_types = self.ledger.list(scope).await?;
        Ok(ticket_types
            .into_iter()
            .map(|ticket_type| {
                let price = resolve_ticket_price(&ticket_type, now);
                TicketTypeWithAvailability {
                    available_quantity: ticket_type.available(),
                    current_price: price.amount,
                    price_source: price.source,
                    ticket_type,
                }
            })
            .collect())
    }

    pub async fn get_config_summary(
        &self,
        scope: &EventScope,
    ) -> Result<TicketingConfigSummary, TicketingError> {
        let settings = self.get_settings(scope).await?;
        let ticket_types = self.list_ticket_types_with_availability(scope).await?;
        let promo_codes = self.promos.list(scope).await?;
        let now = self.clock.now();

        let mut totals = SummaryTotals::default();
        for entry in &ticket_types {
            let ticket_type = &entry.ticket_type;
            totals.total_capacity += i64::from(ticket_type.capacity);
            totals.tickets_sold += i64::from(ticket_type.quantity_sold);
            totals.tickets_reserved += i64::from(ticket_type.quantity_reserved);
            totals.tickets_available += i64::from(entry.available_quantity);
            let sales = money::times(
                "Revenue",
                ticket_type.base_price,
                i64::from(ticket_type.quantity_sold),
            )?;
            totals.revenue = money::sum("Revenue", [totals.revenue, sales])?;
        }
        totals.active_promo_codes = promo_codes
            .iter()
            .filter(|p| p.is_active && p.is_within_window(now) && p.has_remaining_uses())
            .count();

        Ok(TicketingConfigSummary {
            event_id: scope.event_id(),
            settings,
            ticket_types,
            promo_codes,
            totals,
        })
    }

    /// Prices a prospective order without reserving anything or consuming a
    /// promo code use.
    pub async fn quote_order(
        &self,
        scope: &EventScope,
        request: QuoteRequest,
    ) -> Result<OrderQuote, TicketingError> {
        if request.items.is_empty() {
            return Err(TicketingError::validation(
                "Quote must contain at least one item",
            ));
        }
        for item in &request.items {
            validate_quantity(item.quantity)?;
        }

        let settings = self.get_settings(scope).await?;
        let ticket_count: i64 = request.items.iter().map(|i| i64::from(i.quantity)).sum();
        if ticket_count > i64::from(settings.max_tickets_per_order) {
            return Err(TicketingError::conflict(format!(
                "Orders are limited to {} tickets",
                settings.max_tickets_per_order
            )));
        }

        let now = self.clock.now();
        let mut requested: HashMap<Uuid, i64> = HashMap::new();
        let mut lines = Vec::with_capacity(request.items.len());
        for item in &request.items {
            let ticket_type = self.ledger.get(scope, item.ticket_type_id).await?;
            if !ticket_type.is_on_sale(now) {
                return Err(TicketingError::conflict(format!(
                    "Ticket type '{}' is not on sale",
                    ticket_type.name
                )));
            }

            let wanted = requested.entry(ticket_type.id).or_insert(0);
            *wanted += i64::from(item.quantity);
            if *wanted > i64::from(ticket_type.available()) {
                return Err(TicketingError::conflict(format!(
                    "insufficient availability for '{}': requested {}, available {}",
                    ticket_type.name,
                    wanted,
                    ticket_type.available()
                )));
            }

            let unit_price = resolve_ticket_price(&ticket_type, now);
            lines.push(QuoteLine {
                ticket_type_id: ticket_type.id,
                name: ticket_type.name,
                quantity: item.quantity,
                line_total: money::times(
                    "Line total",
                    unit_price.amount,
                    i64::from(item.quantity),
                )?,
                unit_price,
            });
        }

        let subtotal = money::sum("Subtotal", lines.iter().map(|l| l.line_total))?;

        let promo = match &request.promo_code {
            Some(code) => {
                let cart: Vec<CartLine> = lines
                    .iter()
                    .map(|l| CartLine {
                        ticket_type_id: l.ticket_type_id,
                        price: l.unit_price.amount,
                        quantity: l.quantity,
                    })
                    .collect();
                Some(self.promos.validate(scope, code, &cart).await?)
            }
            None => None,
        };
        let discount_amount = promo
            .as_ref()
            .filter(|p| p.is_valid)
            .map_or(Decimal::ZERO, |p| p.discount_amount);

        let fee = &settings.service_fee;
        let service_fee = match fee.fee_type {
            ServiceFeeType::Percentage => money::percent_of("Service fee", subtotal, fee.value)?,
            ServiceFeeType::Fixed => money::times("Service fee", fee.value, ticket_count)?,
        };
        // Both operands are non-negative, so the difference cannot overflow.
        let discounted = subtotal - discount_amount;
        let tax = money::percent_of("Tax", discounted, settings.tax_rate)?;
        let buyer_fee = match fee.payer {
            FeePayer::Buyer => service_fee,
            FeePayer::Organizer => Decimal::ZERO,
        };
        let total = money::sum("Total", [discounted, tax, buyer_fee])?;

        Ok(OrderQuote {
            currency: settings.currency,
            lines,
            subtotal,
            promo,
            discount_amount,
            service_fee,
            tax,
            total,
        })
    }
}
