//! Fixed-point price arithmetic for the catalog.
//!
//! All money values are [`rust_decimal::Decimal`] with two fractional digits;
//! floating point never enters the calculation.

use rust_decimal::{Decimal, RoundingStrategy};

/// Price after applying a percentage discount.
///
/// `discount` is an integer percent in `1..=99`; `None` means no discount.
/// The result is `base * (100 - discount) / 100`, rounded half-to-even to
/// two fractional digits.
#[must_use]
pub fn discounted_price(base: Decimal, discount: Option<i32>) -> Decimal {
    let factor = match discount {
        Some(d) => Decimal::from(100 - d) / Decimal::from(100),
        None => Decimal::ONE,
    };
    (base * factor).round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven)
}
