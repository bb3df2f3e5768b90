pub mod clock;
pub mod counters;
pub mod error;
pub mod facade;
pub mod ledger;
pub mod money;
pub mod pricing;
pub mod promo;
pub mod retry;
pub mod validation;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{Rejection, TicketingError};
pub use facade::TicketingConfigService;
pub use ledger::InventoryLedger;
pub use promo::PromoService;
pub use retry::RetryPolicy;
