//! Money calculation utilities using rust_decimal for precision
//!
//! All calculations are done using `Decimal` internally, then converted to `f64`
//! for storage/serialization.

use super::error::{OrderError, ValidationError};
use rust_decimal::prelude::*;
use shared::order::CartLine;

/// Rounding strategy for monetary values (2 decimal places, half-up)
const DECIMAL_PLACES: u32 = 2;

/// Maximum allowed price per item
const MAX_PRICE: f64 = 1_000_000.0;
/// Maximum allowed quantity per line
pub const MAX_QUANTITY: i32 = 9999;
/// Maximum allowed payment amount
const MAX_PAYMENT_AMOUNT: f64 = 1_000_000.0;

/// Validate that a f64 value is finite (not NaN, not Infinity)
#[inline]
pub(crate) fn require_finite(value: f64, field_name: &str) -> Result<(), OrderError> {
    if !value.is_finite() {
        return Err(ValidationError::InvalidAmount(format!(
            "{} must be a finite number, got {}",
            field_name, value
        ))
        .into());
    }
    Ok(())
}

/// Quantity must be positive and within bounds
pub fn validate_quantity(quantity: i32) -> Result<(), OrderError> {
    if quantity <= 0 || quantity > MAX_QUANTITY {
        return Err(ValidationError::InvalidQuantity(quantity).into());
    }
    Ok(())
}

/// Unit price and modifiers must be finite, price non-negative
pub fn validate_price(price: f64, modifiers: impl IntoIterator<Item = f64>) -> Result<(), OrderError> {
    require_finite(price, "price")?;
    if !(0.0..=MAX_PRICE).contains(&price) {
        return Err(ValidationError::InvalidAmount(format!(
            "price must be between 0 and {}, got {}",
            MAX_PRICE, price
        ))
        .into());
    }
    for pm in modifiers {
        require_finite(pm, "price_modifier")?;
        if pm.abs() > MAX_PRICE {
            return Err(ValidationError::InvalidAmount(format!(
                "price_modifier exceeds maximum allowed, got {}",
                pm
            ))
            .into());
        }
    }
    Ok(())
}

/// Payment amount must be finite, positive and bounded
pub fn validate_payment_amount(amount: f64) -> Result<(), OrderError> {
    require_finite(amount, "payment amount")?;
    if amount <= 0.0 || amount > MAX_PAYMENT_AMOUNT {
        return Err(ValidationError::InvalidAmount(format!(
            "payment amount must be between 0 and {}, got {}",
            MAX_PAYMENT_AMOUNT, amount
        ))
        .into());
    }
    Ok(())
}

/// Convert f64 to Decimal for calculation
#[inline]
pub fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_default()
}

/// Convert Decimal back to f64 for storage, rounded to 2 decimal places
#[inline]
pub fn to_f64(value: Decimal) -> f64 {
    value
        .round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
        .to_f64()
        .unwrap_or_default()
}

/// `(unit_price + Σ modifiers) × quantity`
pub fn line_total(unit_price: f64, modifier_per_unit: f64, quantity: i32) -> f64 {
    let unit = to_decimal(unit_price) + to_decimal(modifier_per_unit);
    to_f64(unit * Decimal::from(quantity))
}

/// Recompute a line's total from its own fields
pub fn recalculate_line(line: &mut CartLine) {
    line.total = line_total(line.unit_price, line.modifier_per_unit(), line.quantity);
}

/// Cart subtotal: Σ line totals
pub fn subtotal(lines: &[CartLine]) -> f64 {
    to_f64(lines.iter().map(|l| to_decimal(l.total)).sum())
}

/// Computed totals for a submission
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrderTotals {
    pub subtotal: f64,
    pub tax: f64,
    pub discount: f64,
    pub total: f64,
}

/// Totals with tax applied to the subtotal
///
/// `discount` is clamped to `[0, subtotal + tax]`; the total never goes negative.
pub fn compute_totals(lines: &[CartLine], tax_rate_percent: f64, discount: f64) -> OrderTotals {
    let subtotal: Decimal = lines.iter().map(|l| to_decimal(l.total)).sum();
    let subtotal = subtotal.round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero);
    let tax = (subtotal * to_decimal(tax_rate_percent) / Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero);
    let gross = subtotal + tax;
    let discount = to_decimal(discount).max(Decimal::ZERO).min(gross);

    OrderTotals {
        subtotal: to_f64(subtotal),
        tax: to_f64(tax),
        discount: to_f64(discount),
        total: to_f64(gross - discount),
    }
}

/// Change due back to the customer, never negative
pub fn change_due(amount_received: f64, total: f64) -> f64 {
    to_f64((to_decimal(amount_received) - to_decimal(total)).max(Decimal::ZERO))
}

/// `received >= total` compared at cent precision
pub fn covers(amount_received: f64, total: f64) -> bool {
    let received = to_decimal(amount_received).round_dp(DECIMAL_PLACES);
    received >= to_decimal(total).round_dp(DECIMAL_PLACES)
}
