//! Receipt
//!
//! Plain-text tables for price lists and priced orders.

use std::io;

use jiff::Timestamp;
use rusty_money::{Money, MoneyError, iso::Currency};
use smallvec::SmallVec;
use tabled::{
    builder::Builder,
    settings::{Alignment, Style, object::Columns},
};
use thiserror::Error;
use uuid::Uuid;

use crate::{
    catalog::Catalog,
    orders::{Order, OrderError, OrderItem, ShippingStatus},
    pricing::InvalidInputError,
    products::{Product, ProductKey},
};

/// Errors that can occur when building or writing a receipt.
#[derive(Debug, Error)]
pub enum ReceiptError {
    /// Error computing order totals.
    #[error(transparent)]
    Order(#[from] OrderError),

    /// Error pricing a product.
    #[error(transparent)]
    Pricing(#[from] InvalidInputError),

    /// Wrapper for money errors.
    #[error(transparent)]
    Money(#[from] MoneyError),

    /// An order line refers to a product missing from the catalog.
    #[error("Missing product")]
    MissingProduct(ProductKey),

    /// Output could not be written.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Lines and totals of a priced order, captured when the receipt is built.
#[derive(Debug, Clone)]
pub struct Receipt<'a> {
    /// Order code
    code: Uuid,

    /// Order status when the receipt was built
    shipping_status: ShippingStatus,

    /// Order lines
    items: SmallVec<[OrderItem<'a>; 4]>,

    /// Total cost before discounts
    subtotal: Money<'a, Currency>,

    /// Amount charged
    total: Money<'a, Currency>,
}

impl<'a> Receipt<'a> {
    /// Builds a receipt for `order`.
    ///
    /// # Errors
    ///
    /// Returns an error if the order totals cannot be computed.
    pub fn from_order(order: &Order<'a>) -> Result<Self, ReceiptError> {
        Ok(Self {
            code: order.code(),
            shipping_status: order.shipping_status(),
            items: order.items().iter().cloned().collect(),
            subtotal: order.total_price()?,
            total: order.total_price_after_discount()?,
        })
    }

    /// Code of the order this receipt was built from
    pub fn code(&self) -> Uuid {
        self.code
    }

    /// Order lines
    pub fn items(&self) -> &[OrderItem<'a>] {
        &self.items
    }

    /// Total cost before discounts
    pub fn subtotal(&self) -> Money<'a, Currency> {
        self.subtotal
    }

    /// Amount charged
    pub fn total(&self) -> Money<'a, Currency> {
        self.total
    }

    /// Amount saved through discounts.
    ///
    /// # Errors
    ///
    /// Returns a [`MoneyError`] if the subtraction operation fails.
    pub fn savings(&self) -> Result<Money<'a, Currency>, MoneyError> {
        self.subtotal.sub(self.total)
    }

    /// Writes the order lines and totals to `out`, naming products from `catalog`.
    ///
    /// # Errors
    ///
    /// Returns an error if a line's product is missing from `catalog`, a line total
    /// overflows, or writing fails.
    pub fn write_to(
        &self,
        mut out: impl io::Write,
        catalog: &Catalog<'_>,
    ) -> Result<(), ReceiptError> {
        let mut builder = Builder::default();

        builder.push_record(["", "Item", "Qty", "Unit Price", "Discounted", "Line Total"]);

        for (idx, item) in self.items.iter().enumerate() {
            let product = catalog
                .get(item.product())
                .ok_or(ReceiptError::MissingProduct(item.product()))?;

            let discounted = if item.price_after_discount() == item.price() {
                String::new()
            } else {
                item.price_after_discount().to_string()
            };

            builder.push_record([
                format!("#{:<3}", idx + 1),
                product.name.clone(),
                item.quantity().to_string(),
                item.price().to_string(),
                discounted,
                item.cost()?.to_string(),
            ]);
        }

        let mut table = builder.build();
        table.with(Style::modern_rounded());
        table.modify(Columns::new(2..), Alignment::right());

        writeln!(out, "Order {} ({})", self.code, self.shipping_status)?;
        writeln!(out, "{table}")?;

        let savings = self.savings()?;
        let lines = [
            ("Subtotal:", self.subtotal.to_string()),
            ("Savings:", savings.to_string()),
            ("Total:", self.total.to_string()),
        ];
        let value_width = lines.iter().map(|(_, value)| value.len()).max().unwrap_or(0);

        for (label, value) in lines {
            writeln!(out, " {label:<10}{value:>value_width$}")?;
        }

        Ok(())
    }
}

/// Writes a price list of `products` as priced at `now`.
///
/// # Errors
///
/// Returns an error if a product's pricing fields are out of range or writing fails.
pub fn write_price_list<'p, 'a: 'p>(
    mut out: impl io::Write,
    products: impl IntoIterator<Item = &'p Product<'a>>,
    now: Timestamp,
) -> Result<(), ReceiptError> {
    let mut builder = Builder::default();

    builder.push_record(["Item", "Slug", "Price", "Discount", "Now", "Until"]);

    for product in products {
        let (discount, until) = if product.has_active_discount(now) {
            (
                format!("{}%", product.discount()),
                product
                    .discount_expiry
                    .map(|expiry| expiry.to_string())
                    .unwrap_or_default(),
            )
        } else {
            (String::new(), String::new())
        };

        builder.push_record([
            product.name.clone(),
            product.slug.clone(),
            product.price.to_string(),
            discount,
            product.price_after_discount(now)?.to_string(),
            until,
        ]);
    }

    let mut table = builder.build();
    table.with(Style::modern_rounded());
    table.modify(Columns::new(2..5), Alignment::right());

    writeln!(out, "{table}")?;

    Ok(())
}
