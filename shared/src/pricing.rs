//! Pricing engine
//!
//! The server-side result is authoritative: reservations recompute every
//! line with [`effective_price`] and never trust a client-supplied price.

use crate::models::{Discount, DiscountType, Product};
use rust_decimal::prelude::*;

/// Rounding for monetary values (2 decimal places, half away from zero)
const DECIMAL_PLACES: u32 = 2;

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Round a monetary amount to 2 decimal places
#[inline]
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

/// Effective unit price of a product after its active discount
pub fn effective_price(product: &Product) -> Decimal {
    apply_discount(product.price, product.discount.as_ref())
}

/// Apply an optional discount to a base price
///
/// Result is clamped to `0..=price`. Inactive discounts and negative
/// discount values leave the price unchanged.
pub fn apply_discount(price: Decimal, discount: Option<&Discount>) -> Decimal {
    let Some(discount) = discount.filter(|d| d.active && d.value > Decimal::ZERO) else {
        return round_money(price);
    };

    let discounted = match discount.kind {
        DiscountType::Percentage => price * (Decimal::ONE - discount.value / HUNDRED),
        DiscountType::Fixed => price - discount.value,
    };

    round_money(discounted.max(Decimal::ZERO).min(price))
}

/// Convert a major-unit amount to integer minor units (kobo, cents)
///
/// Returns `None` if the amount does not fit.
pub fn to_minor_units(amount: Decimal) -> Option<i64> {
    (amount * HUNDRED)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
}
