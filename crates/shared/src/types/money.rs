//! Money rounding rules.
//!
//! CRITICAL: Never use floating-point for money calculations.
//! Every monetary amount is a `rust_decimal::Decimal` held at [`MONEY_SCALE`]
//! decimal places, and every rounding step goes through [`round_money`].

use rust_decimal::{Decimal, RoundingStrategy};

/// Number of decimal places kept on every currency amount.
pub const MONEY_SCALE: u32 = 2;

/// The single rounding rule used for money: round half up (away from zero)
/// to [`MONEY_SCALE`] places.
///
/// ```
/// use rust_decimal_macros::dec;
/// use bookwell_shared::types::money::round_money;
///
/// assert_eq!(round_money(dec!(10.005)), dec!(10.01));
/// assert_eq!(round_money(dec!(10.004)), dec!(10.00));
/// ```
#[must_use]
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// The smallest currency unit (0.01).
#[must_use]
pub fn smallest_unit() -> Decimal {
    Decimal::new(1, MONEY_SCALE)
}

/// Returns true if the amount is already expressed at money scale or finer
/// digits are all zero.
#[must_use]
pub fn is_money_scaled(amount: Decimal) -> bool {
    round_money(amount) == amount
}

/// Returns true if the amount is closer to zero than one smallest unit.
#[must_use]
pub fn is_negligible(amount: Decimal) -> bool {
    amount.abs() < smallest_unit()
}

#[cfg(test)]
#[path = "money_tests.rs"]
mod tests;
