//! Checked `Decimal` arithmetic for order amounts. Prices are only bounded
//! below, so every product and sum can leave the representable range.

use rust_decimal::Decimal;

use crate::domain::error::TicketingError;

pub fn out_of_range(what: &str) -> TicketingError {
    TicketingError::validation(format!("{} exceeds the supported amount range", what))
}

pub fn times(what: &str, amount: Decimal, quantity: i64) -> Result<Decimal, TicketingError> {
    amount
        .checked_mul(Decimal::from(quantity))
        .ok_or_else(|| out_of_range(what))
}

pub fn sum<I>(what: &str, amounts: I) -> Result<Decimal, TicketingError>
where
    I: IntoIterator<Item = Decimal>,
{
    amounts
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, amount| acc.checked_add(amount))
        .ok_or_else(|| out_of_range(what))
}

/// `rate` percent of `amount`.
pub fn percent_of(what: &str, amount: Decimal, rate: Decimal) -> Result<Decimal, TicketingError> {
    amount
        .checked_mul(rate)
        .and_then(|scaled| scaled.checked_div(Decimal::ONE_HUNDRED))
        .ok_or_else(|| out_of_range(what))
}
