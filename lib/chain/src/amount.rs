//! Base-unit amount arithmetic.
//!
//! Token amounts are integers in the token's smallest unit. User inputs are
//! decimal text and are scaled exactly; no floating point is involved.

use crate::error::ChainError;
use rootcause::Report;

/// Numerator of the slippage factor applied to registered top-up amounts.
const SLIPPAGE_NUMERATOR: u128 = 9_999;
/// Denominator of the slippage factor.
const SLIPPAGE_DENOMINATOR: u128 = 10_000;
/// Decimal places kept when scaling a percentage.
const PERCENT_DECIMALS: u32 = 6;

fn invalid(value: &str, reason: impl Into<String>) -> Report<ChainError> {
    ChainError::InvalidAmount {
        value: value.to_string(),
        reason: reason.into(),
    }
    .into()
}

fn overflow(what: &str) -> Report<ChainError> {
    ChainError::AmountOverflow {
        what: what.to_string(),
    }
    .into()
}

/// Parses non-negative decimal text into units of `10^-decimals`.
///
/// Digits beyond `decimals` places are truncated.
///
/// # Errors
///
/// Returns an error for empty, negative or non-numeric text, or if the
/// scaled value does not fit in a `u128`.
pub fn parse_decimal_units(text: &str, decimals: u32) -> Result<u128, Report<ChainError>> {
    let trimmed = text.trim();
    let (whole, fraction) = trimmed.split_once('.').unwrap_or((trimmed, ""));
    if whole.is_empty() && fraction.is_empty() {
        return Err(invalid(text, "no digits"));
    }
    if !whole.chars().chain(fraction.chars()).all(|c| c.is_ascii_digit()) {
        return Err(invalid(text, "expected a non-negative decimal number"));
    }

    let scale = 10u128
        .checked_pow(decimals)
        .ok_or_else(|| overflow("decimal scale"))?;
    let whole_units = if whole.is_empty() {
        0
    } else {
        whole
            .parse::<u128>()
            .map_err(|e| invalid(text, e.to_string()))?
            .checked_mul(scale)
            .ok_or_else(|| overflow(text))?
    };

    let kept: String = fraction.chars().take(decimals as usize).collect();
    let fraction_units = if kept.is_empty() {
        0
    } else {
        let padding = 10u128.pow(decimals - kept.len() as u32);
        kept.parse::<u128>()
            .map_err(|e| invalid(text, e.to_string()))?
            * padding
    };

    whole_units
        .checked_add(fraction_units)
        .ok_or_else(|| overflow(text))
}

/// Returns `percent` percent of `total`, rounded down.
///
/// # Errors
///
/// Returns an error if `percent` is not a decimal number or the product
/// overflows.
pub fn percentage_of(total: u128, percent: &str) -> Result<u128, Report<ChainError>> {
    let scaled = parse_decimal_units(percent, PERCENT_DECIMALS)?;
    let product = total
        .checked_mul(scaled)
        .ok_or_else(|| overflow("percentage of total"))?;
    Ok(product / (100 * 10u128.pow(PERCENT_DECIMALS)))
}

/// Discounts an amount by the 0.9999 slippage factor, rounding down.
#[must_use]
pub fn apply_slippage(amount: u128) -> u128 {
    amount / SLIPPAGE_DENOMINATOR * SLIPPAGE_NUMERATOR
        + amount % SLIPPAGE_DENOMINATOR * SLIPPAGE_NUMERATOR / SLIPPAGE_DENOMINATOR
}
