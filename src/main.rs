//! Storefront CLI

use std::{io, process::ExitCode};

use jiff::Timestamp;
use thiserror::Error;
use tracing::debug;

use storefront::{
    catalog::{Catalog, CatalogError},
    config::{Command, Config, OrderArgs},
    observability::init_logging,
    orders::{Order, OrderError, OrderItem},
    pricing::{Clock, FixedClock, PricingCalculator, SystemClock},
    receipt::{Receipt, ReceiptError, write_price_list},
};

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Order(#[from] OrderError),

    #[error(transparent)]
    Receipt(#[from] ReceiptError),

    #[error(transparent)]
    Pricing(#[from] storefront::pricing::InvalidInputError),

    #[error("catalog has no products")]
    EmptyCatalog,

    #[error(transparent)]
    Io(#[from] io::Error),
}

fn main() -> ExitCode {
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            // clap renders help/version through the same path
            _ = e.print();
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    if let Err(e) = init_logging(&config.logging) {
        #[expect(
            clippy::print_stderr,
            reason = "logging not initialized, must use eprintln for setup errors"
        )]
        {
            eprintln!("Logging error: {e}");
        }

        return ExitCode::FAILURE;
    }

    let result = match config.now {
        Some(now) => run(&config, &PricingCalculator::new(FixedClock(now))),
        None => run(&config, &PricingCalculator::new(SystemClock)),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            #[expect(clippy::print_stderr, reason = "user-facing error report")]
            {
                eprintln!("Error: {e}");
            }

            ExitCode::FAILURE
        }
    }
}

fn run<C: Clock>(config: &Config, pricing: &PricingCalculator<C>) -> Result<(), CliError> {
    let catalog = Catalog::load(&config.catalog)?;
    let now = pricing.now();

    debug!(%now, "pricing");

    let stdout = io::stdout().lock();

    match &config.command {
        Command::Quote { slug } => quote(stdout, &catalog, pricing, slug),
        Command::Offers => {
            write_price_list(stdout, catalog.offers(now).map(|(_, product)| product), now)?;
            Ok(())
        }
        Command::Order(args) => order(stdout, &catalog, args, now),
    }
}

fn quote<C: Clock>(
    mut out: impl io::Write,
    catalog: &Catalog<'_>,
    pricing: &PricingCalculator<C>,
    slug: &str,
) -> Result<(), CliError> {
    let (_, product) = catalog.find(slug)?;
    let price = pricing.price(product)?;

    if pricing.is_discounted(product) {
        writeln!(
            out,
            "{}: {price} ({}% off {})",
            product.name,
            product.discount(),
            product.price
        )?;
    } else {
        writeln!(out, "{}: {price}", product.name)?;
    }

    Ok(())
}

fn order(
    out: impl io::Write,
    catalog: &Catalog<'_>,
    args: &OrderArgs,
    now: Timestamp,
) -> Result<(), CliError> {
    let currency = catalog.currency().ok_or(CliError::EmptyCatalog)?;
    let mut order = Order::new(currency, args.payment, now);

    for line in &args.lines {
        let (key, product) = catalog.find(&line.slug)?;
        order.add_item(OrderItem::from_product(key, product, line.quantity, now)?)?;
    }

    Receipt::from_order(&order)?.write_to(out, catalog)?;

    Ok(())
}
