use axum::response::Response;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::utils::response::success;

pub mod context;
pub mod promo_codes;
pub mod settings;
pub mod ticket_types;

pub use context::{AppJson, RequestContext};

#[derive(Serialize)]
struct HealthPayload {
    status: &'static str,
    service: &'static str,
}

pub async fn health_check() -> Response {
    let payload = HealthPayload {
        status: "ok",
        service: "ticketing-api",
    };

    success(payload, "Health check successful")
}

#[derive(Debug, Deserialize)]
pub struct EventPath {
    pub event_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct RecordPath {
    pub event_id: Uuid,
    pub id: Uuid,
}
