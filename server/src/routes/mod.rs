use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::config::{create_cors_layer, create_security_headers_layer};
use crate::handlers::health_check;
use crate::handlers::promo_codes::{
    create_promo_code, delete_promo_code, get_promo_code, list_promo_codes, redeem_promo_code,
    update_promo_code, validate_promo_code,
};
use crate::handlers::settings::{get_settings, get_summary, put_settings, quote_order};
use crate::handlers::ticket_types::{
    cancel_tickets, confirm_tickets, create_ticket_type, delete_ticket_type, get_availability,
    get_ticket_type, list_ticket_types, release_tickets, reserve_tickets, update_ticket_type,
};
use crate::state::AppState;

fn event_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/ticket-types",
            get(list_ticket_types).post(create_ticket_type),
        )
        .route(
            "/ticket-types/:id",
            get(get_ticket_type)
                .patch(update_ticket_type)
                .delete(delete_ticket_type),
        )
        .route("/ticket-types/:id/availability", get(get_availability))
        .route("/ticket-types/:id/reserve", post(reserve_tickets))
        .route("/ticket-types/:id/release", post(release_tickets))
        .route("/ticket-types/:id/confirm", post(confirm_tickets))
        .route("/ticket-types/:id/cancel", post(cancel_tickets))
        .route(
            "/promo-codes",
            get(list_promo_codes).post(create_promo_code),
        )
        .route("/promo-codes/validate", post(validate_promo_code))
        .route("/promo-codes/redeem", post(redeem_promo_code))
        .route(
            "/promo-codes/:id",
            get(get_promo_code)
                .patch(update_promo_code)
                .delete(delete_promo_code),
        )
        .route("/settings", get(get_settings).put(put_settings))
        .route("/summary", get(get_summary))
        .route("/quote", post(quote_order))
}

pub fn create_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1/events/:event_id", event_routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(create_security_headers_layer())
        .layer(create_cors_layer())
}
