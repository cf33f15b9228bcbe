//! Currency rounding.
//!
//! Every monetary value is rounded to whole currency units at the moment it
//! is produced, never in a final pass. Persisted breakdowns depend on this.

use rust_decimal::{Decimal, RoundingStrategy};

/// Rounds to the nearest whole currency unit, halves away from zero.
///
/// # Example
///
/// ```
/// use payroll_engine::calculation::round_currency;
/// use rust_decimal::Decimal;
/// use std::str::FromStr;
///
/// assert_eq!(round_currency(Decimal::from_str("57142.857").unwrap()), Decimal::from(57143));
/// assert_eq!(round_currency(Decimal::from_str("0.5").unwrap()), Decimal::ONE);
/// assert_eq!(round_currency(Decimal::from_str("11428.4").unwrap()), Decimal::from(11428));
/// ```
pub fn round_currency(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}
