//! Decimal price arithmetic for orders.
//!
//! Prices are `rust_decimal::Decimal` in the store's single currency. The
//! order total is always derived from `quantity * unit_price`; a caller
//! supplied total is only ever compared against it.

use rust_decimal::Decimal;

/// Largest accepted difference between a caller supplied total and the
/// computed one (one cent).
pub const PRICE_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Compute `quantity * unit_price`.
///
/// Returns `None` on decimal overflow.
#[must_use]
pub fn line_total(quantity: u32, unit_price: Decimal) -> Option<Decimal> {
    unit_price.checked_mul(Decimal::from(quantity))
}

/// Whether `claimed` is within [`PRICE_TOLERANCE`] of `computed`.
///
/// A difference too large to represent never matches.
#[must_use]
pub fn totals_match(claimed: Decimal, computed: Decimal) -> bool {
    claimed
        .checked_sub(computed)
        .is_some_and(|diff| diff.abs() <= PRICE_TOLERANCE)
}
