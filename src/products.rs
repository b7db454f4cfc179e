//! Products

use jiff::Timestamp;
use rusty_money::{Money, iso::Currency};
use slotmap::new_key_type;

use crate::pricing::{
    InvalidInputError, discount_active, discount_percent_display, effective_price,
    validate_inputs,
};

new_key_type! {
    /// Product Key
    pub struct ProductKey;
}

/// Catalog product, reduced to its listing and pricing fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Product<'a> {
    /// Display name
    pub name: String,

    /// Unique, URL-safe identifier
    pub slug: String,

    /// Category slug
    pub category: Option<String>,

    /// Brand name
    pub brand: Option<String>,

    /// Base price before any discount
    pub price: Money<'a, Currency>,

    /// Discount percentage, 0 to 100
    pub discount_percent: u8,

    /// Instant the discount stops applying
    pub discount_expiry: Option<Timestamp>,

    /// Whether the product can currently be ordered
    pub available: bool,
}

impl<'a> Product<'a> {
    /// Creates an available product with no discount.
    pub fn new(
        name: impl Into<String>,
        slug: impl Into<String>,
        price: Money<'a, Currency>,
    ) -> Self {
        Self {
            name: name.into(),
            slug: slug.into(),
            category: None,
            brand: None,
            price,
            discount_percent: 0,
            discount_expiry: None,
            available: true,
        }
    }

    /// Sets a discount running until `expiry`.
    #[must_use]
    pub fn with_discount(mut self, percent: u8, expiry: Timestamp) -> Self {
        self.discount_percent = percent;
        self.discount_expiry = Some(expiry);
        self
    }

    /// Sets the category slug.
    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Checks the pricing fields are within range.
    ///
    /// # Errors
    ///
    /// Returns an [`InvalidInputError`] for a negative price or a discount above 100%.
    pub fn validate(&self) -> Result<(), InvalidInputError> {
        validate_inputs(&self.price, self.discount_percent)
    }

    /// Price after any discount active at `now`.
    ///
    /// # Errors
    ///
    /// Returns an [`InvalidInputError`] if the pricing fields are out of range.
    pub fn price_after_discount(
        &self,
        now: Timestamp,
    ) -> Result<Money<'a, Currency>, InvalidInputError> {
        effective_price(self.price, self.discount_percent, self.discount_expiry, now)
    }

    /// Discount percentage for display.
    pub fn discount(&self) -> f64 {
        discount_percent_display(self.discount_percent)
    }

    /// Whether a non-zero discount applies at `now`.
    pub fn has_active_discount(&self, now: Timestamp) -> bool {
        self.discount_percent > 0 && discount_active(self.discount_expiry, now)
    }

    /// Currency the product is priced in.
    pub fn currency(&self) -> &'a Currency {
        self.price.currency()
    }
}

#[cfg(test)]
mod tests {
    use jiff::SignedDuration;
    use rusty_money::iso::USD;
    use testresult::TestResult;

    use super::*;

    fn discounted(now: Timestamp, offset_hours: i64) -> TestResult<Product<'static>> {
        let expiry = now.checked_add(SignedDuration::from_hours(offset_hours))?;

        Ok(Product::new("Test Product", "test-product", Money::from_minor(100, USD))
            .with_discount(10, expiry))
    }

    #[test]
    fn price_after_discount_before_expiry() -> TestResult {
        let now = Timestamp::now();

        assert_eq!(discounted(now, 24)?.price_after_discount(now)?, Money::from_minor(90, USD));

        Ok(())
    }

    #[test]
    fn price_after_discount_after_expiry() -> TestResult {
        let now = Timestamp::now();

        assert_eq!(discounted(now, -24)?.price_after_discount(now)?, Money::from_minor(100, USD));

        Ok(())
    }

    #[test]
    fn discount_reports_percent_regardless_of_expiry() -> TestResult {
        let now = Timestamp::now();
        let mut product = discounted(now, -24)?;
        product.discount_percent = 20;

        assert!((product.discount() - 20.0).abs() < f64::EPSILON);

        Ok(())
    }

    #[test]
    fn zero_percent_is_never_an_active_discount() -> TestResult {
        let now = Timestamp::now();
        let mut product = discounted(now, 24)?;

        assert!(product.has_active_discount(now));

        product.discount_percent = 0;
        assert!(!product.has_active_discount(now));

        Ok(())
    }

    #[test]
    fn validate_rejects_out_of_range_fields() {
        let mut product = Product::new("Broken", "broken", Money::from_minor(-5, USD));
        assert_eq!(product.validate(), Err(InvalidInputError::NegativeBasePrice(-5)));

        product.price = Money::from_minor(5, USD);
        product.discount_percent = 150;
        assert_eq!(
            product.validate(),
            Err(InvalidInputError::DiscountPercentOutOfRange(150))
        );
    }

    #[test]
    fn new_product_defaults() {
        let product = Product::new("Kettle", "kettle", Money::from_minor(2_500, USD));

        assert!(product.available);
        assert_eq!(product.discount_percent, 0);
        assert_eq!(product.discount_expiry, None);
        assert_eq!(product.currency(), USD);
        assert_eq!(product.validate(), Ok(()));
    }
}
