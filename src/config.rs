//! Command-line and environment configuration

use std::{path::PathBuf, str::FromStr};

use clap::{Args, Parser, Subcommand};
use jiff::Timestamp;
use thiserror::Error;

use crate::orders::PaymentType;

/// Storefront CLI configuration
#[derive(Debug, Parser)]
#[command(name = "storefront", about = "Storefront pricing CLI", long_about = None)]
pub struct Config {
    /// Catalog YAML file
    #[arg(long, env = "STOREFRONT_CATALOG", default_value = "./fixtures/catalog.yml")]
    pub catalog: PathBuf,

    /// Price as of this instant (RFC 3339) instead of the wall clock
    #[arg(long, env = "STOREFRONT_NOW")]
    pub now: Option<Timestamp>,

    /// Logging output settings.
    #[command(flatten)]
    pub logging: LoggingConfig,

    /// Action to run
    #[command(subcommand)]
    pub command: Command,
}

impl Config {
    /// Load configuration from environment and CLI arguments
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be parsed
    pub fn load() -> Result<Self, clap::Error> {
        // Load .env file if present (ignore if missing)
        _ = dotenvy::dotenv();

        Self::try_parse()
    }
}

/// CLI actions
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show the current price of one product
    Quote {
        /// Product slug
        slug: String,
    },

    /// List products with an active discount
    Offers,

    /// Price an order and print its receipt
    Order(OrderArgs),
}

/// Arguments for pricing an order
#[derive(Debug, Args)]
pub struct OrderArgs {
    /// Payment method
    #[arg(long, value_enum, default_value_t = PaymentType::Internet)]
    pub payment: PaymentType,

    /// Order lines as `slug` or `slug:quantity`
    #[arg(required = true)]
    pub lines: Vec<OrderLine>,
}

/// Log output format.
#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum LogFormat {
    /// Compact, human-readable logs.
    Compact,

    /// Structured JSON logs.
    Json,
}

/// Logging settings.
#[derive(Debug, Args)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "RUST_LOG", default_value = "warn")]
    pub log_level: String,

    /// Log format (compact, json)
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Compact)]
    pub log_format: LogFormat,
}

/// Errors parsing an order line argument.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OrderLineError {
    /// Slug part was empty.
    #[error("order line '{0}' has no product slug")]
    MissingSlug(String),

    /// Quantity part was not a positive integer.
    #[error("order line '{0}' has an invalid quantity")]
    InvalidQuantity(String),
}

/// One `slug[:quantity]` order line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderLine {
    /// Product slug
    pub slug: String,

    /// Number of units
    pub quantity: u32,
}

impl FromStr for OrderLine {
    type Err = OrderLineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (slug, quantity) = match s.split_once(':') {
            Some((slug, quantity)) => (
                slug,
                quantity
                    .parse::<u32>()
                    .ok()
                    .filter(|&quantity| quantity > 0)
                    .ok_or_else(|| OrderLineError::InvalidQuantity(s.to_string()))?,
            ),
            None => (s, 1),
        };

        if slug.is_empty() {
            return Err(OrderLineError::MissingSlug(s.to_string()));
        }

        Ok(Self {
            slug: slug.to_string(),
            quantity,
        })
    }
}
