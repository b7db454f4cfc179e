//! Catalog
//!
//! In-memory product catalog. Products are stored in a slot map and indexed by
//! slug; every product in a catalog shares one currency.

use std::{fs, path::Path};

use jiff::Timestamp;
use rustc_hash::FxHashMap;
use rusty_money::iso::Currency;
use slotmap::SlotMap;
use thiserror::Error;
use tracing::{debug, info};

use crate::{
    pricing::InvalidInputError,
    products::{Product, ProductKey},
};

pub mod records;

/// Catalog Errors
#[derive(Debug, Error)]
pub enum CatalogError {
    /// IO error reading the catalog file
    #[error("Failed to read catalog file: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_norway::Error),

    /// Invalid price format
    #[error("Invalid price format: {0}")]
    InvalidPrice(String),

    /// Unknown currency code
    #[error("Unknown currency code: {0}")]
    UnknownCurrency(String),

    /// Currency mismatch between products
    #[error("Currency mismatch: expected {0}, found {1}")]
    CurrencyMismatch(String, String),

    /// Two products share a slug
    #[error("Duplicate product slug: {0}")]
    DuplicateSlug(String),

    /// Product not found
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Product pricing fields out of range
    #[error("Invalid pricing for product {slug}: {source}")]
    InvalidPricing {
        /// Slug of the rejected product
        slug: String,

        /// Underlying validation failure
        source: InvalidInputError,
    },
}

/// Catalog
#[derive(Debug, Default)]
pub struct Catalog<'a> {
    products: SlotMap<ProductKey, Product<'a>>,
    slugs: FxHashMap<String, ProductKey>,
    currency: Option<&'a Currency>,
}

impl<'a> Catalog<'a> {
    /// Create a new empty catalog
    pub fn new() -> Self {
        Self {
            products: SlotMap::with_key(),
            slugs: FxHashMap::default(),
            currency: None,
        }
    }

    /// Parse a catalog from a YAML document
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be parsed or any product is rejected by
    /// [`Catalog::insert`].
    pub fn from_yaml_str(contents: &str) -> Result<Self, CatalogError> {
        let record: records::CatalogRecord = serde_norway::from_str(contents)?;
        let mut catalog = Self::new();

        for product_record in record.products {
            let product: Product<'a> = product_record.try_into()?;
            catalog.insert(product)?;
        }

        Ok(catalog)
    }

    /// Load a catalog from a YAML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if any product is rejected.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        let catalog = Self::from_yaml_str(&contents)?;

        info!(path = %path.display(), products = catalog.len(), "loaded catalog");

        Ok(catalog)
    }

    /// Add a product to the catalog
    ///
    /// # Errors
    ///
    /// Returns an error if the product's pricing is out of range, its slug is already taken,
    /// or it is priced in a different currency from the rest of the catalog.
    pub fn insert(&mut self, product: Product<'a>) -> Result<ProductKey, CatalogError> {
        product
            .validate()
            .map_err(|source| CatalogError::InvalidPricing {
                slug: product.slug.clone(),
                source,
            })?;

        if self.slugs.contains_key(&product.slug) {
            return Err(CatalogError::DuplicateSlug(product.slug));
        }

        let currency = product.currency();

        match self.currency {
            Some(existing) if existing != currency => {
                return Err(CatalogError::CurrencyMismatch(
                    existing.iso_alpha_code.to_string(),
                    currency.iso_alpha_code.to_string(),
                ));
            }
            Some(_) => {}
            None => self.currency = Some(currency),
        }

        debug!(slug = %product.slug, price = %product.price, "inserting product");

        let slug = product.slug.clone();
        let key = self.products.insert(product);
        self.slugs.insert(slug, key);

        Ok(key)
    }

    /// Lookup a product by key
    pub fn get(&self, key: ProductKey) -> Option<&Product<'a>> {
        self.products.get(key)
    }

    /// Lookup a product by slug
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::ProductNotFound`] if no product has this slug.
    pub fn find(&self, slug: &str) -> Result<(ProductKey, &Product<'a>), CatalogError> {
        self.slugs
            .get(slug)
            .and_then(|&key| self.products.get(key).map(|product| (key, product)))
            .ok_or_else(|| CatalogError::ProductNotFound(slug.to_string()))
    }

    /// Iterate over all products
    pub fn iter(&self) -> impl Iterator<Item = (ProductKey, &Product<'a>)> {
        self.products.iter()
    }

    /// Number of products
    pub fn len(&self) -> usize {
        self.products.len()
    }

    /// Whether the catalog has no products
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// Currency shared by all products, if any have been added
    pub fn currency(&self) -> Option<&'a Currency> {
        self.currency
    }

    /// Products in the given category
    pub fn in_category<'s>(
        &'s self,
        category: &'s str,
    ) -> impl Iterator<Item = (ProductKey, &'s Product<'a>)> + 's {
        self.iter()
            .filter(move |(_, product)| product.category.as_deref() == Some(category))
    }

    /// Available products with a discount active at `now`
    pub fn offers(&self, now: Timestamp) -> impl Iterator<Item = (ProductKey, &Product<'a>)> {
        self.iter()
            .filter(move |(_, product)| product.available && product.has_active_discount(now))
    }

    /// Products whose name, slug or brand contains `query`, ignoring case
    pub fn search(&self, query: &str) -> Vec<(ProductKey, &Product<'a>)> {
        let needle = query.trim().to_lowercase();

        if needle.is_empty() {
            return Vec::new();
        }

        self.iter()
            .filter(|(_, product)| {
                [Some(&product.name), Some(&product.slug), product.brand.as_ref()]
                    .into_iter()
                    .flatten()
                    .any(|field| field.to_lowercase().contains(&needle))
            })
            .collect()
    }
}
