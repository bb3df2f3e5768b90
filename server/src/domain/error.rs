use thiserror::Error;

use crate::store::StoreError;

/// A business rule refused a counter or attribute mutation.
///
/// Raised inside the store's atomic section, so the refused mutation was
/// never applied. Never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("insufficient availability: requested {requested}, available {available}")]
    InsufficientAvailability { requested: i32, available: i32 },

    #[error("cannot confirm {requested} tickets: only {reserved} reserved")]
    InsufficientReserved { requested: i32, reserved: i32 },

    #[error("cannot cancel {requested} tickets: only {sold} sold")]
    InsufficientSold { requested: i32, sold: i32 },

    #[error("capacity {capacity} is below the {committed} tickets already sold or reserved")]
    CapacityBelowCommitted { capacity: i32, committed: i64 },

    #[error("promo code usage limit of {max_uses} reached")]
    UsageLimitReached { max_uses: i32 },

    #[error("max uses {max_uses} is below the {used_count} uses already redeemed")]
    MaxUsesBelowUsed { max_uses: i32, used_count: i32 },

    #[error("ticket type has {sold} tickets sold and cannot be deleted")]
    HasSales { sold: i32 },

    #[error("promo code has been redeemed {used_count} times and cannot be deleted")]
    HasRedemptions { used_count: i32 },
}

#[derive(Debug, Error)]
pub enum TicketingError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Store error: {0}")]
    Store(StoreError),
}

impl TicketingError {
    pub fn validation(message: impl Into<String>) -> Self {
        TicketingError::Validation(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        TicketingError::Conflict(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        TicketingError::NotFound(message.into())
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            TicketingError::Validation(_) => "VALIDATION_ERROR",
            TicketingError::Conflict(_) => "CONFLICT",
            TicketingError::NotFound(_) => "NOT_FOUND",
            TicketingError::Store(StoreError::Transient(_)) => "STORE_UNAVAILABLE",
            TicketingError::Store(_) => "STORE_ERROR",
        }
    }

    /// Maps a store failure, naming the record for `NotFound`.
    pub fn from_store(err: StoreError, what: &str) -> Self {
        match err {
            StoreError::NotFound => TicketingError::NotFound(format!("{} not found", what)),
            StoreError::Duplicate(msg) => TicketingError::Conflict(msg),
            StoreError::Rejected(rejection) => TicketingError::Conflict(rejection.to_string()),
            other => TicketingError::Store(other),
        }
    }
}

impl From<StoreError> for TicketingError {
    fn from(err: StoreError) -> Self {
        TicketingError::from_store(err, "Record")
    }
}
