//! HTML parsing infrastructure
//!
//! Trait-based product page extraction built on ordered selector strategies,
//! with locale-aware price normalization.

pub mod config;
pub mod error;
pub mod price;
pub mod product_page_parser;
pub mod strategy;

// Re-export public types
pub use config::{ParsingConfig, ProductPageSelectors};
pub use error::{ExtractionError, ParseError, ParseResult};
pub use price::{normalize_currency, normalize_discount, normalize_price};
pub use product_page_parser::ProductPageParser;
pub use strategy::{DefaultedChain, ExtractionStrategy, StrategyChain};

use crate::domain::product::ProductReading;

/// Turns a fetched product page into a reading.
///
/// Implementations must be pure: no I/O and no shared mutable state, so one
/// parser can serve any number of concurrent scrapes.
pub trait ProductParser: Send + Sync {
    fn parse_product(&self, html: &str, url: &str) -> Result<ProductReading, ExtractionError>;
}
