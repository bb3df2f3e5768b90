use axum::extract::{Path, State};
use axum::response::Response;

use crate::handlers::{AppJson, EventPath, RequestContext};
use crate::models::{QuoteRequest, TicketingSettings};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::success;

pub async fn get_settings(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(path): Path<EventPath>,
) -> Result<Response, AppError> {
    let settings = state.config.get_settings(&ctx.scope(path.event_id)).await?;
    Ok(success(settings, "Ticketing settings retrieved"))
}

pub async fn put_settings(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(path): Path<EventPath>,
    AppJson(settings): AppJson<TicketingSettings>,
) -> Result<Response, AppError> {
    let settings = state
        .config
        .upsert_settings(&ctx.scope(path.event_id), settings)
        .await?;
    Ok(success(settings, "Ticketing settings saved"))
}

pub async fn get_summary(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(path): Path<EventPath>,
) -> Result<Response, AppError> {
    let summary = state
        .config
        .get_config_summary(&ctx.scope(path.event_id))
        .await?;
    Ok(success(summary, "Ticketing summary retrieved"))
}

pub async fn quote_order(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(path): Path<EventPath>,
    AppJson(request): AppJson<QuoteRequest>,
) -> Result<Response, AppError> {
    let quote = state
        .config
        .quote_order(&ctx.scope(path.event_id), request)
        .await?;
    Ok(success(quote, "Order quoted"))
}
