//! Parsing configuration for product page extraction
//!
//! Centralized, ordered CSS selector lists. Earlier entries win, so the most
//! reliable selector for a field goes first.

use serde::{Deserialize, Serialize};

/// Main parsing configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParsingConfig {
    /// Product page selectors, each list in priority order
    pub selectors: ProductPageSelectors,

    /// Availability text that marks a product as out of stock (case-insensitive)
    pub unavailable_phrase: String,

    /// Currency used when no currency strategy matches
    pub default_currency: String,
}

impl Default for ParsingConfig {
    fn default() -> Self {
        Self {
            selectors: ProductPageSelectors::default(),
            unavailable_phrase: "currently unavailable".to_string(),
            default_currency: "$".to_string(),
        }
    }
}

/// CSS selectors for product detail pages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductPageSelectors {
    pub title: Vec<String>,

    /// Pay-now block, then deal price, then selected variant
    pub current_price: Vec<String>,

    /// Our-price block, strikethrough, list price, deal price
    pub original_price: Vec<String>,

    pub currency: Vec<String>,
    pub availability: Vec<String>,

    /// Containers carrying a JSON image map
    pub image: Vec<String>,

    /// Attribute holding the JSON image map on the image containers
    pub image_attribute: String,

    /// Each entry selects a list whose items are joined into the description
    pub description: Vec<String>,

    pub discount: Vec<String>,
}

impl Default for ProductPageSelectors {
    fn default() -> Self {
        Self {
            title: vec!["#productTitle".to_string(), "#title".to_string()],
            current_price: vec![
                ".priceToPay span.a-price-whole".to_string(),
                "#priceblock_dealprice".to_string(),
                ".a-button-selected .a-color-base".to_string(),
            ],
            original_price: vec![
                "#priceblock_ourprice".to_string(),
                ".a-price.a-text-price span.a-offscreen".to_string(),
                "#listPrice".to_string(),
                "#priceblock_dealprice".to_string(),
                ".a-size-base.a-color-price".to_string(),
            ],
            currency: vec![".a-price-symbol".to_string()],
            availability: vec!["#availability span".to_string()],
            image: vec!["#imgBlkFront".to_string(), "#landingImage".to_string()],
            image_attribute: "data-a-dynamic-image".to_string(),
            description: vec![
                "#feature-bullets .a-list-item".to_string(),
                ".a-unordered-list .a-list-item".to_string(),
                ".a-expander-content p".to_string(),
            ],
            discount: vec![".savingsPercentage".to_string()],
        }
    }
}
