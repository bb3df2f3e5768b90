//! Input guards for create and update paths. Violations are reported, never clamped.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::domain::error::TicketingError;
use crate::models::{
    DiscountType, DynamicPricingRule, NewPromoCode, NewTicketType, PromoCode, PromoCodePatch,
    QuestionKind, ServiceFeeType, TicketType, TicketTypePatch, TicketingSettings,
};

pub const MIN_NAME_LEN: usize = 2;
pub const MIN_CODE_LEN: usize = 3;
pub const MIN_CAPACITY: i32 = 1;

type Result<T = ()> = std::result::Result<T, TicketingError>;

pub fn validate_name(name: &str) -> Result {
    if name.trim().chars().count() < MIN_NAME_LEN {
        return Err(TicketingError::validation(format!(
            "Name must be at least {} characters",
            MIN_NAME_LEN
        )));
    }
    Ok(())
}

pub fn validate_price(field: &str, price: Decimal) -> Result {
    if price.is_sign_negative() && !price.is_zero() {
        return Err(TicketingError::validation(format!(
            "{} must be greater than or equal to 0",
            field
        )));
    }
    Ok(())
}

pub fn validate_capacity(capacity: i32) -> Result {
    if capacity < MIN_CAPACITY {
        return Err(TicketingError::validation(format!(
            "Quantity must be at least {}",
            MIN_CAPACITY
        )));
    }
    Ok(())
}

/// Quantity argument of a reserve/release/confirm/cancel call.
pub fn validate_quantity(quantity: i32) -> Result {
    if quantity < 1 {
        return Err(TicketingError::validation(
            "Quantity must be a positive integer",
        ));
    }
    Ok(())
}

pub fn validate_promo_code(code: &str) -> Result {
    let trimmed = code.trim();
    if trimmed.chars().count() < MIN_CODE_LEN {
        return Err(TicketingError::validation(format!(
            "Promo code must be at least {} characters",
            MIN_CODE_LEN
        )));
    }
    if trimmed.chars().any(char::is_whitespace) {
        return Err(TicketingError::validation(
            "Promo code must not contain whitespace",
        ));
    }
    Ok(())
}

pub fn validate_discount(discount_type: DiscountType, value: Decimal) -> Result {
    match discount_type {
        DiscountType::Percentage => validate_percentage("Percentage discount", value),
        DiscountType::FixedAmount => validate_price("Fixed discount", value),
    }
}

pub fn validate_percentage(field: &str, value: Decimal) -> Result {
    if value < Decimal::ZERO || value > Decimal::ONE_HUNDRED {
        return Err(TicketingError::validation(format!(
            "{} must be between 0 and 100",
            field
        )));
    }
    Ok(())
}

fn validate_currency(currency: &str) -> Result {
    if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(TicketingError::validation(
            "Currency must be a 3-letter ISO code",
        ));
    }
    Ok(())
}

fn validate_window(
    what: &str,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> Result {
    if let (Some(start), Some(end)) = (start, end) {
        if start > end {
            return Err(TicketingError::validation(format!(
                "{} start must not be after its end",
                what
            )));
        }
    }
    Ok(())
}

fn validate_cap(what: &str, cap: Option<i32>) -> Result {
    if let Some(cap) = cap {
        if cap < 1 {
            return Err(TicketingError::validation(format!(
                "{} quantity cap must be at least 1",
                what
            )));
        }
    }
    Ok(())
}

pub fn validate_pricing_rule(rule: &DynamicPricingRule) -> Result {
    if let Some(early_bird) = &rule.early_bird {
        validate_price("Early bird price", early_bird.price)?;
        validate_cap("Early bird", early_bird.quantity)?;
    }
    if let Some(last_minute) = &rule.last_minute {
        validate_price("Last minute price", last_minute.price)?;
    }
    for tier in &rule.tiered {
        if tier.name.trim().is_empty() {
            return Err(TicketingError::validation("Pricing tier name is required"));
        }
        validate_price("Tier price", tier.price)?;
        validate_cap("Tier", tier.quantity)?;
        validate_window("Pricing tier", Some(tier.start_date), Some(tier.end_date))?;
    }
    Ok(())
}

pub fn validate_new_ticket_type(input: &NewTicketType) -> Result {
    validate_name(&input.name)?;
    validate_price("Price", input.base_price)?;
    validate_capacity(input.capacity)?;
    if let Some(currency) = &input.currency {
        validate_currency(currency)?;
    }
    validate_window("Sales window", input.sales_start_date, input.sales_end_date)?;
    if let Some(rule) = &input.dynamic_pricing {
        validate_pricing_rule(rule)?;
    }
    Ok(())
}

/// Checks a patch against the record it will be applied to.
pub fn validate_ticket_type_patch(current: &TicketType, patch: &TicketTypePatch) -> Result {
    if let Some(name) = &patch.name {
        validate_name(name)?;
    }
    if let Some(price) = patch.base_price {
        validate_price("Price", price)?;
    }
    if let Some(capacity) = patch.capacity {
        validate_capacity(capacity)?;
    }
    if let Some(currency) = &patch.currency {
        validate_currency(currency)?;
    }
    validate_window(
        "Sales window",
        patch.sales_start_date.unwrap_or(current.sales_start_date),
        patch.sales_end_date.unwrap_or(current.sales_end_date),
    )?;
    if let Some(Some(rule)) = &patch.dynamic_pricing {
        validate_pricing_rule(rule)?;
    }
    Ok(())
}

pub fn validate_new_promo_code(input: &NewPromoCode) -> Result {
    validate_promo_code(&input.code)?;
    validate_discount(input.discount_type, input.discount_value)?;
    validate_cap("Promo code max uses", input.max_uses)?;
    if let Some(minimum) = input.minimum_purchase_amount {
        validate_price("Minimum purchase amount", minimum)?;
    }
    validate_window("Validity window", input.valid_from, input.valid_until)
}

pub fn validate_promo_code_patch(current: &PromoCode, patch: &PromoCodePatch) -> Result {
    let discount_type = patch.discount_type.unwrap_or(current.discount_type);
    let discount_value = patch.discount_value.unwrap_or(current.discount_value);
    validate_discount(discount_type, discount_value)?;
    validate_cap("Promo code max uses", patch.max_uses.flatten())?;
    if let Some(Some(minimum)) = patch.minimum_purchase_amount {
        validate_price("Minimum purchase amount", minimum)?;
    }
    validate_window(
        "Validity window",
        patch.valid_from.unwrap_or(current.valid_from),
        patch.valid_until.unwrap_or(current.valid_until),
    )
}

pub fn validate_settings(settings: &TicketingSettings) -> Result {
    validate_currency(&settings.currency)?;
    validate_percentage("Tax rate", settings.tax_rate)?;
    match settings.service_fee.fee_type {
        ServiceFeeType::Percentage => {
            validate_percentage("Service fee", settings.service_fee.value)?;
        }
        ServiceFeeType::Fixed => validate_price("Service fee", settings.service_fee.value)?,
    }
    validate_percentage(
        "Refund percentage",
        settings.refund_policy.refund_percentage,
    )?;
    if settings.refund_policy.deadline_hours.is_some_and(|h| h < 0) {
        return Err(TicketingError::validation(
            "Refund deadline must not be negative",
        ));
    }
    if settings.max_tickets_per_order < 1 {
        return Err(TicketingError::validation(
            "Max tickets per order must be at least 1",
        ));
    }
    for question in &settings.custom_questions {
        if question.id.trim().is_empty() || question.label.trim().is_empty() {
            return Err(TicketingError::validation(
                "Custom questions need an id and a label",
            ));
        }
        if question.kind == QuestionKind::Select && question.options.is_empty() {
            return Err(TicketingError::validation(format!(
                "Custom question '{}' needs at least one option",
                question.id
            )));
        }
    }
    Ok(())
}
