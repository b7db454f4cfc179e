//! Storefront
//!
//! Catalog pricing for a storefront: discount-expiry aware effective prices,
//! an in-memory product catalog, orders that snapshot prices at purchase time,
//! and plain-text receipts.

pub mod catalog;
pub mod config;
pub mod observability;
pub mod orders;
pub mod pricing;
pub mod products;
pub mod receipt;
