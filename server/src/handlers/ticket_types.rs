use axum::extract::{Path, State};
use axum::response::Response;
use serde::Deserialize;

use crate::handlers::{AppJson, EventPath, RecordPath, RequestContext};
use crate::models::{NewTicketType, TicketTypePatch};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{created, empty_success, success};

#[derive(Debug, Deserialize)]
pub struct QuantityRequest {
    pub quantity: i32,
}

pub async fn list_ticket_types(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(path): Path<EventPath>,
) -> Result<Response, AppError> {
    let ticket_types = state
        .config
        .list_ticket_types_with_availability(&ctx.scope(path.event_id))
        .await?;
    Ok(success(ticket_types, "Ticket types retrieved"))
}

pub async fn create_ticket_type(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(path): Path<EventPath>,
    AppJson(input): AppJson<NewTicketType>,
) -> Result<Response, AppError> {
    let ticket_type = state
        .ledger
        .create(&ctx.scope(path.event_id), ctx.actor_id, input)
        .await?;
    Ok(created(ticket_type, "Ticket type created"))
}

pub async fn get_ticket_type(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(path): Path<RecordPath>,
) -> Result<Response, AppError> {
    let ticket_type = state
        .ledger
        .get(&ctx.scope(path.event_id), path.id)
        .await?;
    Ok(success(ticket_type, "Ticket type retrieved"))
}

pub async fn update_ticket_type(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(path): Path<RecordPath>,
    AppJson(patch): AppJson<TicketTypePatch>,
) -> Result<Response, AppError> {
    let ticket_type = state
        .ledger
        .update(&ctx.scope(path.event_id), path.id, patch)
        .await?;
    Ok(success(ticket_type, "Ticket type updated"))
}

pub async fn delete_ticket_type(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(path): Path<RecordPath>,
) -> Result<Response, AppError> {
    state
        .ledger
        .delete(&ctx.scope(path.event_id), path.id)
        .await?;
    Ok(empty_success("Ticket type deleted"))
}

pub async fn get_availability(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(path): Path<RecordPath>,
) -> Result<Response, AppError> {
    let availability = state
        .ledger
        .get_availability(&ctx.scope(path.event_id), path.id)
        .await?;
    Ok(success(availability, "Availability retrieved"))
}

pub async fn reserve_tickets(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(path): Path<RecordPath>,
    AppJson(body): AppJson<QuantityRequest>,
) -> Result<Response, AppError> {
    let availability = state
        .ledger
        .reserve(&ctx.scope(path.event_id), path.id, body.quantity)
        .await?;
    Ok(success(availability, "Tickets reserved"))
}

pub async fn release_tickets(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(path): Path<RecordPath>,
    AppJson(body): AppJson<QuantityRequest>,
) -> Result<Response, AppError> {
    let availability = state
        .ledger
        .release(&ctx.scope(path.event_id), path.id, body.quantity)
        .await?;
    Ok(success(availability, "Reservation released"))
}

pub async fn confirm_tickets(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(path): Path<RecordPath>,
    AppJson(body): AppJson<QuantityRequest>,
) -> Result<Response, AppError> {
    let confirmation = state
        .ledger
        .confirm(&ctx.scope(path.event_id), path.id, body.quantity)
        .await?;
    Ok(success(confirmation, "Sale confirmed"))
}

pub async fn cancel_tickets(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(path): Path<RecordPath>,
    AppJson(body): AppJson<QuantityRequest>,
) -> Result<Response, AppError> {
    let availability = state
        .ledger
        .cancel(&ctx.scope(path.event_id), path.id, body.quantity)
        .await?;
    Ok(success(availability, "Sale cancelled"))
}
