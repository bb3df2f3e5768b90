//! Multi-tenant ticketing core: inventory ledger, dynamic pricing, promo
//! codes and per-event ticketing settings, served over a thin axum API.

pub mod config;
pub mod domain;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod state;
pub mod store;
pub mod utils;
