//! Error types for product page extraction
//!
//! `ExtractionError` aborts a scrape. `ParseError` only ever means "this
//! strategy did not match" and is swallowed by the strategy chain.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExtractionError {
    /// No title strategy matched. The page was blocked, redirected or has an
    /// unrecognized layout.
    #[error("Product title not found (title-missing): page may be blocked or layout changed")]
    TitleMissing { tried_selectors: Vec<String> },

    #[error("No price found (price-missing) after trying {} selectors", .tried_selectors.len())]
    PriceMissing { tried_selectors: Vec<String> },
}

impl ExtractionError {
    pub const TITLE_MISSING: &'static str = "title-missing";
    pub const PRICE_MISSING: &'static str = "price-missing";

    /// Short machine-readable reason
    pub fn reason(&self) -> &'static str {
        match self {
            Self::TitleMissing { .. } => Self::TITLE_MISSING,
            Self::PriceMissing { .. } => Self::PRICE_MISSING,
        }
    }

    /// Selectors that were tried before giving up
    pub fn tried_selectors(&self) -> &[String] {
        match self {
            Self::TitleMissing { tried_selectors } | Self::PriceMissing { tried_selectors } => {
                tried_selectors
            }
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("no numeric value in '{raw}'")]
    NoNumber { raw: String },

    #[error("invalid number '{normalized}' (from '{raw}')")]
    InvalidNumber { raw: String, normalized: String },

    #[error("price must be positive, got {value} (from '{raw}')")]
    NotPositive { raw: String, value: f64 },

    #[error("no currency glyph in '{raw}'")]
    NoCurrency { raw: String },

    #[error("invalid image map: {reason}")]
    InvalidImageMap { reason: String },
}

pub type ParseResult<T> = Result<T, ParseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reasons_are_stable() {
        let title = ExtractionError::TitleMissing { tried_selectors: vec!["#productTitle".into()] };
        let price = ExtractionError::PriceMissing { tried_selectors: Vec::new() };

        assert_eq!(title.reason(), "title-missing");
        assert_eq!(price.reason(), "price-missing");
        assert!(title.to_string().contains("title-missing"));
        assert_eq!(title.tried_selectors(), ["#productTitle".to_string()]);
    }
}
