use std::env;
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::domain::retry::{
    RetryPolicy, DEFAULT_BASE_DELAY, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_DELAY,
};

pub mod cors;
pub mod security;

pub use cors::create_cors_layer;
pub use security::create_security_headers_layer;

const DEFAULT_PORT: u16 = 3001;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StoreBackend::Postgres),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(format!("unknown store backend '{}'", other)),
        }
    }
}

impl fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreBackend::Postgres => f.write_str("postgres"),
            StoreBackend::Memory => f.write_str("memory"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: Option<String>,
    pub store_backend: StoreBackend,
    pub bind_addr: SocketAddr,
    pub db_max_connections: u32,
    pub retry: RetryPolicy,
}

impl Config {
    pub fn from_env() -> Self {
        let retry = RetryPolicy::new(
            env_or("RETRY_MAX_ATTEMPTS", DEFAULT_MAX_ATTEMPTS),
            Duration::from_millis(env_or(
                "RETRY_BASE_DELAY_MS",
                DEFAULT_BASE_DELAY.as_millis() as u64,
            )),
            Duration::from_millis(env_or(
                "RETRY_MAX_DELAY_MS",
                DEFAULT_MAX_DELAY.as_millis() as u64,
            )),
        );

        Self {
            database_url: env::var("DATABASE_URL").ok().filter(|url| !url.is_empty()),
            store_backend: env_or("STORE_BACKEND", StoreBackend::Postgres),
            bind_addr: env_or("BIND_ADDR", SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT))),
            db_max_connections: env_or("DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS),
            retry,
        }
    }
}

/// Reads `key` and parses it, falling back to `default` when unset or invalid.
fn env_or<T>(key: &str, default: T) -> T
where
    T: FromStr + fmt::Display,
    T::Err: fmt::Display,
{
    match env::var(key) {
        Ok(raw) => match raw.trim().parse::<T>() {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("Config: invalid {} '{}' ({}), using {}", key, raw, e, default);
                default
            }
        },
        Err(_) => default,
    }
}
