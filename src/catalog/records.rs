//! Catalog Records

use jiff::Timestamp;
use rust_decimal::{Decimal, prelude::ToPrimitive};
use rusty_money::{Money, iso, iso::Currency};
use serde::Deserialize;

use crate::{catalog::CatalogError, pricing::InvalidInputError, products::Product};

/// Wrapper for products in YAML
#[derive(Debug, Deserialize)]
pub struct CatalogRecord {
    /// Product entries, in listing order
    pub products: Vec<ProductRecord>,
}

/// Product Record
#[derive(Debug, Deserialize)]
pub struct ProductRecord {
    /// Product name
    pub name: String,

    /// Product slug
    pub slug: String,

    /// Category slug
    #[serde(default)]
    pub category: Option<String>,

    /// Brand name
    #[serde(default)]
    pub brand: Option<String>,

    /// Product price (e.g., "100.00 USD")
    pub price: String,

    /// Discount percentage, range-checked on conversion
    #[serde(default)]
    pub discount_percent: i64,

    /// Discount expiry, RFC 3339
    #[serde(default)]
    pub discount_expiry: Option<Timestamp>,

    /// Whether the product can be ordered
    #[serde(default = "default_available")]
    pub available: bool,
}

fn default_available() -> bool {
    true
}

impl TryFrom<ProductRecord> for Product<'_> {
    type Error = CatalogError;

    fn try_from(record: ProductRecord) -> Result<Self, Self::Error> {
        let (minor_units, currency) = parse_price(&record.price)?;

        let discount_percent = u8::try_from(record.discount_percent).map_err(|_err| {
            CatalogError::InvalidPricing {
                slug: record.slug.clone(),
                source: InvalidInputError::DiscountPercentOutOfRange(record.discount_percent),
            }
        })?;

        Ok(Product {
            name: record.name,
            slug: record.slug,
            category: record.category,
            brand: record.brand,
            price: Money::from_minor(minor_units, currency),
            discount_percent,
            discount_expiry: record.discount_expiry,
            available: record.available,
        })
    }
}

/// Parse price string (e.g., "2.99 USD") into minor units and currency
///
/// # Errors
///
/// Returns an error if the string is not in the format "AMOUNT CURRENCY", if
/// the amount is not a decimal with at most the currency's number of minor
/// digits, or if the currency code is not a known ISO 4217 code.
pub fn parse_price(s: &str) -> Result<(i64, &'static Currency), CatalogError> {
    let mut parts = s.split_whitespace();

    let (Some(amount), Some(code), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(CatalogError::InvalidPrice(format!(
            "Expected format 'AMOUNT CURRENCY', got: {s}"
        )));
    };

    let currency = iso::find(code).ok_or_else(|| CatalogError::UnknownCurrency(code.to_string()))?;

    let amount = amount
        .parse::<Decimal>()
        .map_err(|_err| CatalogError::InvalidPrice(s.to_string()))?;

    if amount.scale() > currency.exponent {
        return Err(CatalogError::InvalidPrice(s.to_string()));
    }

    let minor_units = 10_i64
        .checked_pow(currency.exponent)
        .and_then(|factor| amount.checked_mul(Decimal::from(factor)))
        .and_then(|value| value.to_i64())
        .ok_or_else(|| CatalogError::InvalidPrice(s.to_string()))?;

    Ok((minor_units, currency))
}
