//! Fixed-point money helpers.
//!
//! CRITICAL: Never use floating-point for money calculations.
//! Balances and amounts are `rust_decimal::Decimal` values kept at scale 2,
//! matching the `NUMERIC(19, 2)` columns they are stored in.

use rust_decimal::Decimal;

/// Number of fractional digits carried by every amount.
pub const MONEY_SCALE: u32 = 2;

/// Total number of significant digits a stored amount may have.
pub const MONEY_PRECISION: u32 = 19;

/// Currency tag printed next to amounts. The bank operates in a single currency.
pub const CURRENCY_CODE: &str = "XOF";

/// Returns `amount` rescaled to exactly two fractional digits.
///
/// Only use this on values already known to fit the scale (see [`fits_money_scale`]);
/// rescaling never rounds a well-formed amount.
#[must_use]
pub fn to_money_scale(amount: Decimal) -> Decimal {
    let mut scaled = amount;
    scaled.rescale(MONEY_SCALE);
    scaled
}

/// Returns true if `amount` has at most two significant fractional digits
/// and fits in a `NUMERIC(19, 2)` column.
#[must_use]
pub fn fits_money_scale(amount: Decimal) -> bool {
    let normalized = amount.normalize();
    if normalized.scale() > MONEY_SCALE {
        return false;
    }
    let integer_digits = normalized.trunc().abs().to_string().trim_start_matches('0').len();
    u32::try_from(integer_digits).is_ok_and(|digits| digits <= MONEY_PRECISION - MONEY_SCALE)
}

/// Formats an amount with two fractional digits, e.g. `1000.00`.
#[must_use]
pub fn format_amount(amount: Decimal) -> String {
    to_money_scale(amount).to_string()
}

/// Formats an amount followed by the currency tag, e.g. `1000.00 XOF`.
#[must_use]
pub fn format_with_currency(amount: Decimal) -> String {
    format!("{} {CURRENCY_CODE}", format_amount(amount))
}
