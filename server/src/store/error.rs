use thiserror::Error;

use crate::domain::error::Rejection;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Contention, timeouts and lost connections. The only retryable class.
    #[error("transient store failure: {0}")]
    Transient(String),

    #[error("{0}")]
    Duplicate(String),

    #[error(transparent)]
    Rejected(#[from] Rejection),

    #[error("record not found")]
    NotFound,

    #[error("store backend failure: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Transient(_))
    }
}

const SERIALIZATION_FAILURE: &str = "40001";
const DEADLOCK_DETECTED: &str = "40P01";
const LOCK_NOT_AVAILABLE: &str = "55P03";
const UNIQUE_VIOLATION: &str = "23505";

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                StoreError::Transient(err.to_string())
            }
            sqlx::Error::Database(db) => match db.code().as_deref() {
                Some(SERIALIZATION_FAILURE) | Some(DEADLOCK_DETECTED) | Some(LOCK_NOT_AVAILABLE) => {
                    StoreError::Transient(db.message().to_string())
                }
                Some(UNIQUE_VIOLATION) => StoreError::Duplicate(db.message().to_string()),
                _ => StoreError::Backend(db.message().to_string()),
            },
            _ => StoreError::Backend(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_timeout_is_transient() {
        assert!(StoreError::from(sqlx::Error::PoolTimedOut).is_transient());
    }

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        assert!(matches!(
            StoreError::from(sqlx::Error::RowNotFound),
            StoreError::NotFound
        ));
    }
}
