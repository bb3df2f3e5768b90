use axum::extract::{Path, State};
use axum::response::Response;
use serde::Deserialize;

use crate::handlers::{AppJson, EventPath, RecordPath, RequestContext};
use crate::models::{CartLine, NewPromoCode, PromoCodePatch};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{created, empty_success, success};

#[derive(Debug, Deserialize)]
pub struct ValidatePromoRequest {
    pub code: String,
    #[serde(default)]
    pub items: Vec<CartLine>,
}

#[derive(Debug, Deserialize)]
pub struct RedeemPromoRequest {
    pub code: String,
}

pub async fn list_promo_codes(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(path): Path<EventPath>,
) -> Result<Response, AppError> {
    let promo_codes = state.promos.list(&ctx.scope(path.event_id)).await?;
    Ok(success(promo_codes, "Promo codes retrieved"))
}

pub async fn create_promo_code(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(path): Path<EventPath>,
    AppJson(input): AppJson<NewPromoCode>,
) -> Result<Response, AppError> {
    let promo_code = state
        .promos
        .create(&ctx.scope(path.event_id), ctx.actor_id, input)
        .await?;
    Ok(created(promo_code, "Promo code created"))
}

pub async fn get_promo_code(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(path): Path<RecordPath>,
) -> Result<Response, AppError> {
    let promo_code = state
        .promos
        .get(&ctx.scope(path.event_id), path.id)
        .await?;
    Ok(success(promo_code, "Promo code retrieved"))
}

pub async fn update_promo_code(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(path): Path<RecordPath>,
    AppJson(patch): AppJson<PromoCodePatch>,
) -> Result<Response, AppError> {
    let promo_code = state
        .promos
        .update(&ctx.scope(path.event_id), path.id, patch)
        .await?;
    Ok(success(promo_code, "Promo code updated"))
}

pub async fn delete_promo_code(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(path): Path<RecordPath>,
) -> Result<Response, AppError> {
    state
        .promos
        .delete(&ctx.scope(path.event_id), path.id)
        .await?;
    Ok(empty_success("Promo code deleted"))
}

/// Preview only; never consumes a use.
pub async fn validate_promo_code(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(path): Path<EventPath>,
    AppJson(body): AppJson<ValidatePromoRequest>,
) -> Result<Response, AppError> {
    let validation = state
        .promos
        .validate(&ctx.scope(path.event_id), &body.code, &body.items)
        .await?;
    Ok(success(validation, "Promo code checked"))
}

pub async fn redeem_promo_code(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(path): Path<EventPath>,
    AppJson(body): AppJson<RedeemPromoRequest>,
) -> Result<Response, AppError> {
    let promo_code = state
        .promos
        .redeem(&ctx.scope(path.event_id), &body.code)
        .await?;
    Ok(success(promo_code, "Promo code redeemed"))
}
