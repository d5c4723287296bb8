/// Currency helpers for Kenyan Shilling amounts.
///
/// Amounts are carried as `BigDecimal` end to end and persisted unrounded;
/// rounding only happens here, when an amount is displayed or handed to the
/// gateway.
use std::str::FromStr;

use bigdecimal::BigDecimal;
use num_traits::{ToPrimitive, Zero};

pub const CURRENCY_SYMBOL: &str = "KSh";

/// Round half-up to `digits` decimal places. Negative inputs round away from zero.
pub fn round_half_up(amount: &BigDecimal, digits: i64) -> BigDecimal {
    let half = BigDecimal::new(5.into(), digits + 1);
    if amount < &BigDecimal::zero() {
        -(amount.abs() + half).with_scale(digits)
    } else {
        (amount + half).with_scale(digits)
    }
}

/// Smallest integer greater than or equal to `value`.
pub fn ceil_to_integer(value: &BigDecimal) -> BigDecimal {
    let truncated = value.with_scale(0);
    if &truncated < value {
        truncated + BigDecimal::from(1)
    } else {
        truncated
    }
}

/// M-Pesa only accepts whole shillings, so charges are rounded up.
pub fn to_whole_shillings(amount: &BigDecimal) -> i64 {
    ceil_to_integer(amount).to_i64().unwrap_or(0)
}

/// Format an amount as `KSh 1248` (no decimals, half-up).
pub fn format_kes(amount: &BigDecimal) -> String {
    format!("{} {}", CURRENCY_SYMBOL, round_half_up(amount, 0))
}

/// Format a plain quantity (km, kg) with one decimal place.
pub fn format_one_decimal(value: &BigDecimal) -> String {
    round_half_up(value, 1).to_string()
}

/// Converts a JSON float through its shortest decimal form, so `15.3` stays `15.3`.
pub fn decimal_from_f64(value: f64) -> Option<BigDecimal> {
    if !value.is_finite() {
        return None;
    }
    BigDecimal::from_str(&value.to_string()).ok()
}
