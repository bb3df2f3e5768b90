use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use dotenvy::dotenv;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use ticketing_server::config::{Config, StoreBackend};
use ticketing_server::domain::SystemClock;
use ticketing_server::routes::create_routes;
use ticketing_server::state::AppState;
use ticketing_server::store::{MemoryStore, PgStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env();
    let clock = Arc::new(SystemClock);

    let state = match config.store_backend {
        StoreBackend::Postgres => {
            let database_url = config
                .database_url
                .as_deref()
                .context("DATABASE_URL must be set for the postgres store backend")?;
            let store = PgStore::connect(database_url, config.db_max_connections)
                .await
                .context("Failed to connect to database")?;
            tracing::info!("Successfully connected to database");

            store.migrate().await.context("Failed to run migrations")?;
            tracing::info!("Migrations run successfully");

            AppState::new(Arc::new(store), clock, config.retry)
        }
        StoreBackend::Memory => {
            tracing::warn!("Using the in-memory store; data is lost on restart");
            AppState::new(Arc::new(MemoryStore::new()), clock, config.retry)
        }
    };

    let app: Router = create_routes(state);

    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    tracing::info!(
        backend = %config.store_backend,
        "🚀 Server running at http://{}",
        config.bind_addr
    );

    axum::serve(listener, app).await.context("Server failed")?;
    Ok(())
}
