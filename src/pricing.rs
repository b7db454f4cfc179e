//! Pricing
//!
//! Discount pricing for catalog products. Every function here is pure: the
//! current instant is always passed in, either directly or through a [`Clock`].

use jiff::Timestamp;
use rust_decimal::{Decimal, RoundingStrategy, prelude::ToPrimitive};
use rusty_money::{Money, iso::Currency};
use thiserror::Error;

use crate::products::Product;

/// Largest discount percentage a product may carry.
pub const MAX_DISCOUNT_PERCENT: u8 = 100;

/// Errors raised when pricing inputs are outside their valid range.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvalidInputError {
    /// Discount percentage below 0 or above 100.
    #[error("discount percent {0} is outside 0..=100")]
    DiscountPercentOutOfRange(i64),

    /// Base price below zero (minor units).
    #[error("base price {0} is negative")]
    NegativeBasePrice(i64),

    /// Base price too large to discount exactly (minor units).
    #[error("base price {0} cannot be represented while discounting")]
    BasePriceOutOfRange(i64),
}

/// Source of the current instant.
pub trait Clock {
    /// Returns the current instant.
    fn now(&self) -> Timestamp;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

/// Clock pinned to a single instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub Timestamp);

impl Clock for FixedClock {
    fn now(&self) -> Timestamp {
        self.0
    }
}

/// Calculates the price a buyer pays right now.
///
/// A discount is active only while `discount_expiry` is strictly after `now`.
/// The discounted amount is computed exactly and rounded once to the
/// currency's minor unit, midpoints away from zero, so the result always lies
/// between zero and `base_price`.
///
/// # Errors
///
/// - [`InvalidInputError::DiscountPercentOutOfRange`]: `discount_percent` is above 100.
/// - [`InvalidInputError::NegativeBasePrice`]: `base_price` is below zero.
/// - [`InvalidInputError::BasePriceOutOfRange`]: the discounted amount cannot be represented.
pub fn effective_price<'a>(
    base_price: Money<'a, Currency>,
    discount_percent: u8,
    discount_expiry: Option<Timestamp>,
    now: Timestamp,
) -> Result<Money<'a, Currency>, InvalidInputError> {
    validate_inputs(&base_price, discount_percent)?;

    if !discount_active(discount_expiry, now) {
        return Ok(base_price);
    }

    let minor = remaining_minor(base_price.to_minor_units(), discount_percent)?;

    Ok(Money::from_minor(minor, base_price.currency()))
}

/// Returns the discount percentage as a plain number for display.
pub fn discount_percent_display(discount_percent: u8) -> f64 {
    f64::from(discount_percent)
}

/// Whether a discount with this expiry still applies at `now`.
pub fn discount_active(discount_expiry: Option<Timestamp>, now: Timestamp) -> bool {
    discount_expiry.is_some_and(|expiry| expiry > now)
}

/// Checks that a price and discount percentage are within range.
///
/// # Errors
///
/// Returns an [`InvalidInputError`] describing the first input out of range.
pub fn validate_inputs(
    base_price: &Money<'_, Currency>,
    discount_percent: u8,
) -> Result<(), InvalidInputError> {
    if discount_percent > MAX_DISCOUNT_PERCENT {
        return Err(InvalidInputError::DiscountPercentOutOfRange(i64::from(
            discount_percent,
        )));
    }

    let minor = base_price.to_minor_units();
    if minor < 0 {
        return Err(InvalidInputError::NegativeBasePrice(minor));
    }

    Ok(())
}

/// `minor * (100 - percent) / 100`, rounded half away from zero.
fn remaining_minor(minor: i64, discount_percent: u8) -> Result<i64, InvalidInputError> {
    let remaining_percent = Decimal::from(MAX_DISCOUNT_PERCENT - discount_percent);

    Decimal::from(minor)
        .checked_mul(remaining_percent)
        .and_then(|scaled| scaled.checked_div(Decimal::ONE_HUNDRED))
        .map(|exact| exact.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
        .and_then(|rounded| rounded.to_i64())
        .ok_or(InvalidInputError::BasePriceOutOfRange(minor))
}

/// Prices products against a [`Clock`].
#[derive(Debug, Clone, Default)]
pub struct PricingCalculator<C: Clock = SystemClock> {
    clock: C,
}

impl<C: Clock> PricingCalculator<C> {
    /// Creates a calculator reading time from `clock`.
    pub fn new(clock: C) -> Self {
        Self { clock }
    }

    /// Current instant according to the calculator's clock.
    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    /// Effective price of `product` at the clock's current instant.
    ///
    /// # Errors
    ///
    /// Returns an [`InvalidInputError`] if the product's pricing fields are out of range.
    pub fn price<'a>(
        &self,
        product: &Product<'a>,
    ) -> Result<Money<'a, Currency>, InvalidInputError> {
        product.price_after_discount(self.now())
    }

    /// Whether `product` is currently sold at a discount.
    pub fn is_discounted(&self, product: &Product<'_>) -> bool {
        product.has_active_discount(self.now())
    }
}
