//! Postgres backend.
//!
//! Counter and attribute mutations run in one transaction scoped to the one
//! row: `SELECT ... FOR UPDATE`, the shared rule from `domain::counters`,
//! then a write-back. Concurrent callers on the same row serialize on the
//! row lock; different rows never wait on each other.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;
use sqlx::{FromRow, PgConnection};
use uuid::Uuid;

use crate::domain::counters::{
    apply_inventory_op, apply_promo_code_patch, apply_redemption, apply_ticket_type_patch,
    InventoryOp, InventoryOutcome,
};
use crate::models::{
    normalize_code, DynamicPricingRule, PromoCode, PromoCodePatch, TicketType, TicketTypePatch,
    TicketingSettings,
};
use crate::store::{
    EventScope, PromoCodeStore, ScopedEntity, ScopedRepository, SettingsStore, StoreError,
    TicketTypeStore,
};

const SELECT_TICKET_TYPES: &str = "SELECT id, tenant_id, event_id, name, description, \
    base_price, currency, display_order, visibility, is_active, capacity, quantity_sold, \
    quantity_reserved, sales_start_date, sales_end_date, dynamic_pricing, created_by, \
    created_at, updated_at FROM ticket_types WHERE tenant_id = $1 AND event_id = $2";

const SELECT_PROMO_CODES: &str = "SELECT id, tenant_id, event_id, code, description, \
    discount_type, discount_value, max_uses, used_count, valid_from, valid_until, \
    applicable_ticket_types, minimum_purchase_amount, is_active, created_by, created_at, \
    updated_at FROM promo_codes WHERE tenant_id = $1 AND event_id = $2";

#[derive(Debug, FromRow)]
struct TicketTypeRow {
    id: Uuid,
    tenant_id: Uuid,
    event_id: Uuid,
    name: String,
    description: Option<String>,
    base_price: Decimal,
    currency: String,
    display_order: i32,
    visibility: String,
    is_active: bool,
    capacity: i32,
    quantity_sold: i32,
    quantity_reserved: i32,
    sales_start_date: Option<DateTime<Utc>>,
    sales_end_date: Option<DateTime<Utc>>,
    dynamic_pricing: Option<Json<DynamicPricingRule>>,
    created_by: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<TicketTypeRow> for TicketType {
    type Error = StoreError;

    fn try_from(row: TicketTypeRow) -> Result<Self, Self::Error> {
        Ok(TicketType {
            id: row.id,
            tenant_id: row.tenant_id,
            event_id: row.event_id,
            name: row.name,
            description: row.description,
            base_price: row.base_price,
            currency: row.currency,
            order: row.display_order,
            visibility: row.visibility.parse().map_err(StoreError::Backend)?,
            is_active: row.is_active,
            capacity: row.capacity,
            quantity_sold: row.quantity_sold,
            quantity_reserved: row.quantity_reserved,
            sales_start_date: row.sales_start_date,
            sales_end_date: row.sales_end_date,
            dynamic_pricing: row.dynamic_pricing.map(|Json(rule)| rule),
            created_at: row.created_at,
            updated_at: row.updated_at,
            created_by: row.created_by,
        })
    }
}

#[derive(Debug, FromRow)]
struct PromoCodeRow {
    id: Uuid,
    tenant_id: Uuid,
    event_id: Uuid,
    code: String,
    description: Option<String>,
    discount_type: String,
    discount_value: Decimal,
    max_uses: Option<i32>,
    used_count: i32,
    valid_from: Option<DateTime<Utc>>,
    valid_until: Option<DateTime<Utc>>,
    applicable_ticket_types: Vec<Uuid>,
    minimum_purchase_amount: Option<Decimal>,
    is_active: bool,
    created_by: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PromoCodeRow> for PromoCode {
    type Error = StoreError;

    fn try_from(row: PromoCodeRow) -> Result<Self, Self::Error> {
        Ok(PromoCode {
            id: row.id,
            tenant_id: row.tenant_id,
            event_id: row.event_id,
            code: row.code,
            description: row.description,
            discount_type: row.discount_type.parse().map_err(StoreError::Backend)?,
            discount_value: row.discount_value,
            max_uses: row.max_uses,
            used_count: row.used_count,
            valid_from: row.valid_from,
            valid_until: row.valid_until,
            applicable_ticket_types: row.applicable_ticket_types,
            minimum_purchase_amount: row.minimum_purchase_amount,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
            created_by: row.created_by,
        })
    }
}

/// Replaces the driver's unique-violation text with one naming the key.
fn name_duplicate<E: ScopedEntity>(err: StoreError, key: &str) -> StoreError {
    match err {
        StoreError::Duplicate(_) => StoreError::Duplicate(format!(
            "{} '{}' already exists for this event",
            E::KIND,
            key
        )),
        other => other,
    }
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!()
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))
    }

    async fn lock_ticket_type(
        conn: &mut PgConnection,
        scope: &EventScope,
        id: Uuid,
    ) -> Result<TicketType, StoreError> {
        let sql = format!("{} AND id = $3 FOR UPDATE", SELECT_TICKET_TYPES);
        let row = sqlx::query_as::<_, TicketTypeRow>(&sql)
            .bind(scope.tenant_id())
            .bind(scope.event_id())
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or(StoreError::NotFound)?;
        TicketType::try_from(row)
    }

    async fn write_ticket_type(conn: &mut PgConnection, tt: &TicketType) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE ticket_types SET name = $4, description = $5, base_price = $6, \
             currency = $7, display_order = $8, visibility = $9, is_active = $10, \
             capacity = $11, quantity_sold = $12, quantity_reserved = $13, \
             sales_start_date = $14, sales_end_date = $15, dynamic_pricing = $16, \
             updated_at = $17 WHERE tenant_id = $1 AND event_id = $2 AND id = $3",
        )
        .bind(tt.tenant_id)
        .bind(tt.event_id)
        .bind(tt.id)
        .bind(&tt.name)
        .bind(&tt.description)
        .bind(tt.base_price)
        .bind(&tt.currency)
        .bind(tt.order)
        .bind(tt.visibility.as_str())
        .bind(tt.is_active)
        .bind(tt.capacity)
        .bind(tt.quantity_sold)
        .bind(tt.quantity_reserved)
        .bind(tt.sales_start_date)
        .bind(tt.sales_end_date)
        .bind(tt.dynamic_pricing.as_ref().map(Json))
        .bind(tt.updated_at)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    async fn lock_promo_code(
        conn: &mut PgConnection,
        scope: &EventScope,
        id: Uuid,
    ) -> Result<PromoCode, StoreError> {
        let sql = format!("{} AND id = $3 FOR UPDATE", SELECT_PROMO_CODES);
        let row = sqlx::query_as::<_, PromoCodeRow>(&sql)
            .bind(scope.tenant_id())
            .bind(scope.event_id())
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or(StoreError::NotFound)?;
        PromoCode::try_from(row)
    }

    async fn write_promo_code(conn: &mut PgConnection, promo: &PromoCode) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE promo_codes SET description = $4, discount_type = $5, discount_value = $6, \
             max_uses = $7, used_count = $8, valid_from = $9, valid_until = $10, \
             applicable_ticket_types = $11, minimum_purchase_amount = $12, is_active = $13, \
             updated_at = $14 WHERE tenant_id = $1 AND event_id = $2 AND id = $3",
        )
        .bind(promo.tenant_id)
        .bind(promo.event_id)
        .bind(promo.id)
        .bind(&promo.description)
        .bind(promo.discount_type.as_str())
        .bind(promo.discount_value)
        .bind(promo.max_uses)
        .bind(promo.used_count)
        .bind(promo.valid_from)
        .bind(promo.valid_until)
        .bind(&promo.applicable_ticket_types)
        .bind(promo.minimum_purchase_amount)
        .bind(promo.is_active)
        .bind(promo.updated_at)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl ScopedRepository<TicketType> for PgStore {
    async fn find(&self, scope: &EventScope, id: Uuid) -> Result<Option<TicketType>, StoreError> {
        let sql = format!("{} AND id = $3", SELECT_TICKET_TYPES);
        sqlx::query_as::<_, TicketTypeRow>(&sql)
            .bind(scope.tenant_id())
            .bind(scope.event_id())
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(TicketType::try_from)
            .transpose()
    }

    async fn find_by_key(
        &self,
        scope: &EventScope,
        key: &str,
    ) -> Result<Option<TicketType>, StoreError> {
        let sql = format!("{} AND name = $3", SELECT_TICKET_TYPES);
        sqlx::query_as::<_, TicketTypeRow>(&sql)
            .bind(scope.tenant_id())
            .bind(scope.event_id())
            .bind(key)
            .fetch_optional(&self.pool)
            .await?
            .map(TicketType::try_from)
            .transpose()
    }

    async fn list(&self, scope: &EventScope) -> Result<Vec<TicketType>, StoreError> {
        let sql = format!("{} ORDER BY display_order, name", SELECT_TICKET_TYPES);
        sqlx::query_as::<_, TicketTypeRow>(&sql)
            .bind(scope.tenant_id())
            .bind(scope.event_id())
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(TicketType::try_from)
            .collect()
    }

    async fn insert(&self, scope: &EventScope, tt: TicketType) -> Result<TicketType, StoreError> {
        sqlx::query(
            "INSERT INTO ticket_types (id, tenant_id, event_id, name, description, base_price, \
             currency, display_order, visibility, is_active, capacity, quantity_sold, \
             quantity_reserved, sales_start_date, sales_end_date, dynamic_pricing, created_by, \
             created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, \
             $17, $18, $19)",
        )
        .bind(tt.id)
        .bind(scope.tenant_id())
        .bind(scope.event_id())
        .bind(&tt.name)
        .bind(&tt.description)
        .bind(tt.base_price)
        .bind(&tt.currency)
        .bind(tt.order)
        .bind(tt.visibility.as_str())
        .bind(tt.is_active)
        .bind(tt.capacity)
        .bind(tt.quantity_sold)
        .bind(tt.quantity_reserved)
        .bind(tt.sales_start_date)
        .bind(tt.sales_end_date)
        .bind(tt.dynamic_pricing.as_ref().map(Json))
        .bind(tt.created_by)
        .bind(tt.created_at)
        .bind(tt.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| name_duplicate::<TicketType>(e.into(), &tt.name))?;
        Ok(tt)
    }

    async fn remove(&self, scope: &EventScope, id: Uuid) -> Result<TicketType, StoreError> {
        let mut tx = self.pool.begin().await?;
        let tt = Self::lock_ticket_type(&mut tx, scope, id).await?;
        tt.check_removable()?;
        sqlx::query("DELETE FROM ticket_types WHERE tenant_id = $1 AND event_id = $2 AND id = $3")
            .bind(scope.tenant_id())
            .bind(scope.event_id())
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(tt)
    }
}

#[async_trait]
impl TicketTypeStore for PgStore {
    async fn update_ticket_type(
        &self,
        scope: &EventScope,
        id: Uuid,
        patch: &TicketTypePatch,
        now: DateTime<Utc>,
    ) -> Result<TicketType, StoreError> {
        let mut tx = self.pool.begin().await?;
        let mut tt = Self::lock_ticket_type(&mut tx, scope, id).await?;
        apply_ticket_type_patch(&mut tt, patch, now)?;
        Self::write_ticket_type(&mut tx, &tt)
            .await
            .map_err(|e| name_duplicate::<TicketType>(e, &tt.name))?;
        tx.commit().await?;
        Ok(tt)
    }

    async fn apply_inventory(
        &self,
        scope: &EventScope,
        id: Uuid,
        op: InventoryOp,
        now: DateTime<Utc>,
    ) -> Result<InventoryOutcome, StoreError> {
        let mut tx = self.pool.begin().await?;
        let mut ticket_type = Self::lock_ticket_type(&mut tx, scope, id).await?;
        let price = apply_inventory_op(&mut ticket_type, op, now)?;
        Self::write_ticket_type(&mut tx, &ticket_type).await?;
        tx.commit().await?;
        Ok(InventoryOutcome { ticket_type, price })
    }
}

#[async_trait]
impl ScopedRepository<PromoCode> for PgStore {
    async fn find(&self, scope: &EventScope, id: Uuid) -> Result<Option<PromoCode>, StoreError> {
        let sql = format!("{} AND id = $3", SELECT_PROMO_CODES);
        sqlx::query_as::<_, PromoCodeRow>(&sql)
            .bind(scope.tenant_id())
            .bind(scope.event_id())
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(PromoCode::try_from)
            .transpose()
    }

    async fn find_by_key(
        &self,
        scope: &EventScope,
        key: &str,
    ) -> Result<Option<PromoCode>, StoreError> {
        let sql = format!("{} AND code = $3", SELECT_PROMO_CODES);
        sqlx::query_as::<_, PromoCodeRow>(&sql)
            .bind(scope.tenant_id())
            .bind(scope.event_id())
            .bind(normalize_code(key))
            .fetch_optional(&self.pool)
            .await?
            .map(PromoCode::try_from)
            .transpose()
    }

    async fn list(&self, scope: &EventScope) -> Result<Vec<PromoCode>, StoreError> {
        let sql = format!("{} ORDER BY created_at, code", SELECT_PROMO_CODES);
        sqlx::query_as::<_, PromoCodeRow>(&sql)
            .bind(scope.tenant_id())
            .bind(scope.event_id())
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(PromoCode::try_from)
            .collect()
    }

    async fn insert(&self, scope: &EventScope, promo: PromoCode) -> Result<PromoCode, StoreError> {
        sqlx::query(
            "INSERT INTO promo_codes (id, tenant_id, event_id, code, description, discount_type, \
             discount_value, max_uses, used_count, valid_from, valid_until, \
             applicable_ticket_types, minimum_purchase_amount, is_active, created_by, \
             created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)",
        )
        .bind(promo.id)
        .bind(scope.tenant_id())
        .bind(scope.event_id())
        .bind(&promo.code)
        .bind(&promo.description)
        .bind(promo.discount_type.as_str())
        .bind(promo.discount_value)
        .bind(promo.max_uses)
        .bind(promo.used_count)
        .bind(promo.valid_from)
        .bind(promo.valid_until)
        .bind(&promo.applicable_ticket_types)
        .bind(promo.minimum_purchase_amount)
        .bind(promo.is_active)
        .bind(promo.created_by)
        .bind(promo.created_at)
        .bind(promo.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| name_duplicate::<PromoCode>(e.into(), &promo.code))?;
        Ok(promo)
    }

    async fn remove(&self, scope: &EventScope, id: Uuid) -> Result<PromoCode, StoreError> {
        let mut tx = self.pool.begin().await?;
        let promo = Self::lock_promo_code(&mut tx, scope, id).await?;
        promo.check_removable()?;
        sqlx::query("DELETE FROM promo_codes WHERE tenant_id = $1 AND event_id = $2 AND id = $3")
            .bind(scope.tenant_id())
            .bind(scope.event_id())
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(promo)
    }
}

#[async_trait]
impl PromoCodeStore for PgStore {
    async fn update_promo_code(
        &self,
        scope: &EventScope,
        id: Uuid,
        patch: &PromoCodePatch,
        now: DateTime<Utc>,
    ) -> Result<PromoCode, StoreError> {
        let mut tx = self.pool.begin().await?;
        let mut promo = Self::lock_promo_code(&mut tx, scope, id).await?;
        apply_promo_code_patch(&mut promo, patch, now)?;
        Self::write_promo_code(&mut tx, &promo).await?;
        tx.commit().await?;
        Ok(promo)
    }

    async fn redeem(
        &self,
        scope: &EventScope,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<PromoCode, StoreError> {
        let mut tx = self.pool.begin().await?;
        let id: Uuid = sqlx::query_scalar(
            "SELECT id FROM promo_codes WHERE tenant_id = $1 AND event_id = $2 AND code = $3",
        )
        .bind(scope.tenant_id())
        .bind(scope.event_id())
        .bind(normalize_code(code))
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(StoreError::NotFound)?;

        let mut promo = Self::lock_promo_code(&mut tx, scope, id).await?;
        apply_redemption(&mut promo, now)?;
        Self::write_promo_code(&mut tx, &promo).await?;
        tx.commit().await?;
        Ok(promo)
    }
}

#[async_trait]
impl SettingsStore for PgStore {
    async fn get_settings(
        &self,
        scope: &EventScope,
    ) -> Result<Option<TicketingSettings>, StoreError> {
        let settings: Option<Json<TicketingSettings>> = sqlx::query_scalar(
            "SELECT settings FROM ticketing_settings WHERE tenant_id = $1 AND event_id = $2",
        )
        .bind(scope.tenant_id())
        .bind(scope.event_id())
        .fetch_optional(&self.pool)
        .await?;
        Ok(settings.map(|Json(settings)| settings))
    }

    async fn upsert_settings(
        &self,
        scope: &EventScope,
        settings: TicketingSettings,
    ) -> Result<TicketingSettings, StoreError> {
        sqlx::query(
            "INSERT INTO ticketing_settings (tenant_id, event_id, settings, updated_at) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (tenant_id, event_id) \
             DO UPDATE SET settings = EXCLUDED.settings, updated_at = EXCLUDED.updated_at",
        )
        .bind(scope.tenant_id())
        .bind(scope.event_id())
        .bind(Json(&settings))
        .bind(settings.updated_at.unwrap_or_else(Utc::now))
        .execute(&self.pool)
        .await?;
        Ok(settings)
    }
}
