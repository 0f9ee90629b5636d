//! Product page parser
//!
//! Extracts a [`ProductReading`] from a retailer product page. Every field is
//! read through an ordered [`StrategyChain`]; the title is mandatory and at
//! least one of the two price chains must produce a value.

#![allow(clippy::uninlined_format_args)]

use anyhow::Result;
use scraper::Html;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::config::ParsingConfig;
use super::error::{ExtractionError, ParseError, ParseResult};
use super::price::{normalize_currency, normalize_discount, normalize_price};
use super::strategy::{DefaultedChain, ExtractionStrategy, StrategyChain};
use super::ProductParser;
use crate::domain::product::ProductReading;

/// Parser for retailer product detail pages
#[derive(Debug, Clone)]
pub struct ProductPageParser {
    title: StrategyChain,
    current_price: StrategyChain,
    original_price: StrategyChain,
    currency: DefaultedChain,
    availability: StrategyChain,
    image: StrategyChain,
    description: StrategyChain,
    discount: StrategyChain,
    unavailable_phrase: String,
}

impl ProductPageParser {
    /// Create a new product page parser with default configuration
    pub fn new() -> Result<Self> {
        Self::with_config(&ParsingConfig::default())
    }

    /// Create parser with custom selector configuration
    pub fn with_config(config: &ParsingConfig) -> Result<Self> {
        let selectors = &config.selectors;
        let image_attribute = selectors.image_attribute.as_str();

        Ok(Self {
            title: StrategyChain::from_selectors("title", &selectors.title, ExtractionStrategy::text)?,
            current_price: StrategyChain::from_selectors(
                "current_price",
                &selectors.current_price,
                ExtractionStrategy::text,
            )?,
            original_price: StrategyChain::from_selectors(
                "original_price",
                &selectors.original_price,
                ExtractionStrategy::text,
            )?,
            currency: StrategyChain::from_selectors("currency", &selectors.currency, ExtractionStrategy::text)?
                .with_default(&config.default_currency)?,
            availability: StrategyChain::from_selectors(
                "availability",
                &selectors.availability,
                ExtractionStrategy::text,
            )?,
            image: StrategyChain::from_selectors("image", &selectors.image, |selector| {
                ExtractionStrategy::attribute(selector, image_attribute)
            })?,
            description: StrategyChain::from_selectors(
                "description",
                &selectors.description,
                ExtractionStrategy::text_list,
            )?,
            discount: StrategyChain::from_selectors("discount", &selectors.discount, ExtractionStrategy::text)?,
            unavailable_phrase: config.unavailable_phrase.trim().to_lowercase(),
        })
    }

    /// Parse a raw HTML string
    pub fn parse(&self, html: &str, url: &str) -> Result<ProductReading, ExtractionError> {
        let document = Html::parse_document(html);
        self.parse_document(&document, url)
    }

    /// Parse an already-built document
    pub fn parse_document(&self, document: &Html, url: &str) -> Result<ProductReading, ExtractionError> {
        debug!("Parsing product page: {}", url);

        let title = self.title.first_text(document).ok_or_else(|| {
            warn!("No product title on {}; page may be blocked or layout changed", url);
            ExtractionError::TitleMissing {
                tried_selectors: self.title.describe(),
            }
        })?;

        let current = self.current_price.first_parsed(document, normalize_price);
        let original = self.original_price.first_parsed(document, normalize_price);

        let (current_price, original_price) = match (current, original) {
            (Some(current), Some(original)) => (current, original),
            // No discount assumed when only one side is visible
            (Some(current), None) => (current, current),
            (None, Some(original)) => (original, original),
            (None, None) => {
                warn!("No price strategy matched on {}", url);
                let mut tried_selectors = self.current_price.describe();
                tried_selectors.extend(self.original_price.describe());
                return Err(ExtractionError::PriceMissing { tried_selectors });
            }
        };

        let currency = self.currency.resolve(document, normalize_currency);

        let is_out_of_stock = self
            .availability
            .first_text(document)
            .is_some_and(|text| text.trim().to_lowercase() == self.unavailable_phrase);

        let image = self.image.first_parsed(document, first_image_url);

        let description = self.description.first_text(document).unwrap_or_default();

        let discount_rate = self
            .discount
            .first_parsed(document, normalize_discount)
            .unwrap_or(0.0);

        let reading = ProductReading {
            url: url.to_string(),
            title,
            current_price,
            original_price,
            currency,
            discount_rate,
            is_out_of_stock,
            image,
            description,
            // Not reliably present on the page; filled in elsewhere
            category: None,
            reviews_count: 0,
            stars: 0.0,
        };

        debug!(
            "Extracted '{}' at {}{} (original {}{}, out of stock: {})",
            reading.title,
            reading.currency,
            reading.current_price,
            reading.currency,
            reading.original_price,
            reading.is_out_of_stock
        );
        Ok(reading)
    }
}

impl ProductParser for ProductPageParser {
    fn parse_product(&self, html: &str, url: &str) -> Result<ProductReading, ExtractionError> {
        self.parse(html, url)
    }
}

/// First key of a JSON image map such as
/// `{"https://…/large.jpg":[500,500],"https://…/small.jpg":[300,300]}`.
fn first_image_url(raw: &str) -> ParseResult<String> {
    let map: Map<String, Value> = serde_json::from_str(raw).map_err(|e| ParseError::InvalidImageMap {
        reason: e.to_string(),
    })?;

    map.keys()
        .next()
        .cloned()
        .ok_or_else(|| ParseError::InvalidImageMap {
            reason: "empty image map".to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::ProductPageFixture;

    const URL: &str = "https://shop.example/dp/B000TEST";

    fn parser() -> ProductPageParser {
        ProductPageParser::new().unwrap()
    }

    #[test]
    fn test_parser_creation() {
        assert!(ProductPageParser::new().is_ok());
    }

    #[test]
    fn extracts_full_page() {
        let html = ProductPageFixture::new("  Stainless Kettle 1.7L  ")
            .price_to_pay("1,299.")
            .list_price("$1,499.00")
            .currency_symbol("$")
            .availability("In Stock")
            .image_map(r#"{"https://img.example/large.jpg":[500,500],"https://img.example/small.jpg":[100,100]}"#)
            .bullets(&["Boils fast", "  ", "Auto shut-off"])
            .savings("-13%")
            .build();

        let reading = parser().parse(&html, URL).unwrap();

        assert_eq!(reading.url, URL);
        assert_eq!(reading.title, "Stainless Kettle 1.7L");
        assert_eq!(reading.current_price, 1299.0);
        assert_eq!(reading.original_price, 1499.0);
        assert_eq!(reading.currency, "$");
        assert!(!reading.is_out_of_stock);
        assert_eq!(reading.image.as_deref(), Some("https://img.example/large.jpg"));
        assert_eq!(reading.description, "Boils fast\nAuto shut-off");
        assert_eq!(reading.discount_rate, 13.0);
        assert_eq!(reading.category, None);
        assert_eq!(reading.reviews_count, 0);
        assert_eq!(reading.stars, 0.0);
    }

    #[test]
    fn second_priority_current_price_is_used_when_first_is_absent() {
        let html = r#"<html><body>
            <span id="productTitle">Deal Item</span>
            <span id="priceblock_dealprice">$24.99</span>
        </body></html>"#;

        let reading = parser().parse(html, URL).unwrap();
        assert_eq!(reading.current_price, 24.99);
    }

    #[test]
    fn unparseable_first_price_falls_through() {
        let html = r#"<html><body>
            <span id="productTitle">Item</span>
            <div class="priceToPay"><span class="a-price-whole">Currently unavailable</span></div>
            <div class="a-button-selected"><span class="a-color-base">$8.50</span></div>
        </body></html>"#;

        let reading = parser().parse(html, URL).unwrap();
        assert_eq!(reading.current_price, 8.5);
    }

    #[test]
    fn only_current_price_defaults_original() {
        let html = ProductPageFixture::new("Item").price_to_pay("42.").build();
        let reading = parser().parse(&html, URL).unwrap();

        assert_eq!(reading.current_price, 42.0);
        assert_eq!(reading.original_price, reading.current_price);
    }

    #[test]
    fn only_original_price_defaults_current() {
        let html = ProductPageFixture::new("Item").list_price("$60.00").build();
        let reading = parser().parse(&html, URL).unwrap();

        assert_eq!(reading.original_price, 60.0);
        assert_eq!(reading.current_price, reading.original_price);
    }

    #[test]
    fn missing_title_is_title_missing() {
        let html = r#"<html><body><div class="priceToPay"><span class="a-price-whole">10.</span></div></body></html>"#;

        let error = parser().parse(html, URL).unwrap_err();
        assert_eq!(error.reason(), "title-missing");
        assert!(matches!(error, ExtractionError::TitleMissing { .. }));
    }

    #[test]
    fn missing_prices_is_price_missing() {
        let html = ProductPageFixture::new("Item").build();

        let error = parser().parse(&html, URL).unwrap_err();
        assert_eq!(error.reason(), "price-missing");
    }

    #[test]
    fn stock_status_is_exact_case_insensitive_match() {
        let unavailable = ProductPageFixture::new("Item")
            .price_to_pay("5.")
            .availability("  Currently Unavailable.  ")
            .build();
        // trailing period is not the known phrase
        assert!(!parser().parse(&unavailable, URL).unwrap().is_out_of_stock);

        let unavailable = ProductPageFixture::new("Item")
            .price_to_pay("5.")
            .availability("  CURRENTLY UNAVAILABLE  ")
            .build();
        assert!(parser().parse(&unavailable, URL).unwrap().is_out_of_stock);

        let no_marker = ProductPageFixture::new("Item").price_to_pay("5.").build();
        assert!(!parser().parse(&no_marker, URL).unwrap().is_out_of_stock);
    }

    #[test]
    fn currency_defaults_to_dollar() {
        let html = ProductPageFixture::new("Item").price_to_pay("5.").build();
        assert_eq!(parser().parse(&html, URL).unwrap().currency, "$");
    }

    #[test]
    fn configured_default_currency_is_used_verbatim() {
        let config = ParsingConfig {
            default_currency: "US$".to_string(),
            ..ParsingConfig::default()
        };
        let parser = ProductPageParser::with_config(&config).unwrap();

        let html = ProductPageFixture::new("Item").price_to_pay("5.").build();
        assert_eq!(parser.parse(&html, URL).unwrap().currency, "US$");
    }

    #[test]
    fn blank_default_currency_is_rejected() {
        let config = ParsingConfig {
            default_currency: " ".to_string(),
            ..ParsingConfig::default()
        };
        assert!(ProductPageParser::with_config(&config).is_err());
    }

    #[test]
    fn currency_can_be_iso_code() {
        let html = ProductPageFixture::new("Item")
            .price_to_pay("5,")
            .currency_symbol("EUR")
            .build();
        assert_eq!(parser().parse(&html, URL).unwrap().currency, "EUR");
    }

    #[test]
    fn broken_image_map_falls_through_to_next_container() {
        let html = r#"<html><body>
            <span id="productTitle">Item</span>
            <span id="listPrice">$5.00</span>
            <img id="imgBlkFront" data-a-dynamic-image="not json">
            <img id="landingImage" data-a-dynamic-image='{"https://img.example/landing.jpg":[1,1]}'>
        </body></html>"#;

        let reading = parser().parse(html, URL).unwrap();
        assert_eq!(reading.image.as_deref(), Some("https://img.example/landing.jpg"));
    }

    #[test]
    fn non_numeric_savings_badge_means_no_discount() {
        for badge in ["NaN%", "inf%", "-inf%"] {
            let html = ProductPageFixture::new("Item").price_to_pay("5.").savings(badge).build();
            assert_eq!(parser().parse(&html, URL).unwrap().discount_rate, 0.0, "{badge}");
        }
    }

    #[test]
    fn empty_image_map_means_no_image() {
        let html = ProductPageFixture::new("Item").price_to_pay("5.").image_map("{}").build();
        assert_eq!(parser().parse(&html, URL).unwrap().image, None);
    }

    #[test]
    fn custom_unavailable_phrase() {
        let mut config = ParsingConfig::default();
        config.unavailable_phrase = "Temporarily out of stock".to_string();
        let parser = ProductPageParser::with_config(&config).unwrap();

        let html = ProductPageFixture::new("Item")
            .price_to_pay("5.")
            .availability("temporarily out of stock")
            .build();
        assert!(parser.parse(&html, URL).unwrap().is_out_of_stock);
    }
}
