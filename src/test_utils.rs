//! Test utilities for price-tracker
//!
//! Fixture builders and in-process collaborators shared by unit tests,
//! integration tests and benchmarks.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::Utc;

use crate::domain::aggregates::PriceAggregates;
use crate::domain::notification::EmailContent;
use crate::domain::product::{PriceHistoryEntry, ProductReading, TrackedProduct};
use crate::domain::services::{FetchedPage, Notifier, PageFetcher};

/// A complete reading with `$` prices and no discount
pub fn sample_reading(url: &str, price: f64) -> ProductReading {
    ProductReading {
        url: url.to_string(),
        title: "Sample Product".to_string(),
        current_price: price,
        original_price: price,
        currency: "$".to_string(),
        discount_rate: 0.0,
        is_out_of_stock: false,
        image: Some("https://img.example/sample.jpg".to_string()),
        description: "A product used in tests".to_string(),
        category: None,
        reviews_count: 0,
        stars: 0.0,
    }
}

/// A product observed once at `price`, with no watchers
pub fn sample_tracked_product(url: &str, price: f64) -> TrackedProduct {
    let reading = sample_reading(url, price);
    let now = Utc::now();
    let stats = PriceAggregates::single(price);

    TrackedProduct {
        id: uuid::Uuid::new_v4().to_string(),
        url: reading.url,
        title: reading.title,
        current_price: price,
        original_price: price,
        currency: reading.currency,
        discount_rate: 0.0,
        is_out_of_stock: false,
        image: reading.image,
        description: reading.description,
        category: None,
        reviews_count: 0,
        stars: 0.0,
        price_history: vec![PriceHistoryEntry::new(price, now)],
        lowest_price: stats.lowest,
        highest_price: stats.highest,
        average_price: stats.average,
        watchers: Vec::new(),
        created_at: now,
        updated_at: now,
    }
}

/// Builds product pages shaped like the retailer's markup
#[derive(Debug, Clone, Default)]
pub struct ProductPageFixture {
    title: String,
    price_to_pay: Option<String>,
    list_price: Option<String>,
    currency_symbol: Option<String>,
    availability: Option<String>,
    image_map: Option<String>,
    bullets: Vec<String>,
    savings: Option<String>,
}

impl ProductPageFixture {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            ..Self::default()
        }
    }

    /// Whole-number part shown in the pay-now block, e.g. `1,299.`
    #[must_use]
    pub fn price_to_pay(mut self, whole: &str) -> Self {
        self.price_to_pay = Some(whole.to_string());
        self
    }

    #[must_use]
    pub fn list_price(mut self, price: &str) -> Self {
        self.list_price = Some(price.to_string());
        self
    }

    #[must_use]
    pub fn currency_symbol(mut self, symbol: &str) -> Self {
        self.currency_symbol = Some(symbol.to_string());
        self
    }

    #[must_use]
    pub fn availability(mut self, text: &str) -> Self {
        self.availability = Some(text.to_string());
        self
    }

    /// Raw `data-a-dynamic-image` value. Must not contain single quotes.
    #[must_use]
    pub fn image_map(mut self, json: &str) -> Self {
        self.image_map = Some(json.to_string());
        self
    }

    #[must_use]
    pub fn bullets(mut self, items: &[&str]) -> Self {
        self.bullets = items.iter().map(|item| (*item).to_string()).collect();
        self
    }

    #[must_use]
    pub fn savings(mut self, badge: &str) -> Self {
        self.savings = Some(badge.to_string());
        self
    }

    pub fn build(&self) -> String {
        let mut body = format!(r#"<span id="productTitle">{}</span>"#, self.title);

        if let Some(symbol) = &self.currency_symbol {
            body.push_str(&format!(r#"<span class="a-price-symbol">{symbol}</span>"#));
        }
        if let Some(whole) = &self.price_to_pay {
            body.push_str(&format!(
                r#"<div class="priceToPay"><span class="a-price-whole">{whole}</span></div>"#
            ));
        }
        if let Some(price) = &self.list_price {
            body.push_str(&format!(r#"<span id="listPrice">{price}</span>"#));
        }
        if let Some(badge) = &self.savings {
            body.push_str(&format!(r#"<span class="savingsPercentage">{badge}</span>"#));
        }
        if let Some(text) = &self.availability {
            body.push_str(&format!(r#"<div id="availability"><span>{text}</span></div>"#));
        }
        if let Some(json) = &self.image_map {
            body.push_str(&format!(r#"<img id="imgBlkFront" data-a-dynamic-image='{json}'>"#));
        }
        if !self.bullets.is_empty() {
            body.push_str(r#"<div id="feature-bullets"><ul>"#);
            for item in &self.bullets {
                body.push_str(&format!(r#"<li><span class="a-list-item">{item}</span></li>"#));
            }
            body.push_str("</ul></div>");
        }

        format!("<!DOCTYPE html><html><head><title>Shop</title></head><body>{body}</body></html>")
    }
}

/// Serves the same page for every URL and counts fetches
pub struct StaticPageFetcher {
    body: String,
    content_type: Option<String>,
    fetches: AtomicUsize,
}

impl StaticPageFetcher {
    pub fn html(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            content_type: Some("text/html; charset=utf-8".to_string()),
            fetches: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn with_content_type(mut self, content_type: &str) -> Self {
        self.content_type = Some(content_type.to_string());
        self
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageFetcher for StaticPageFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(FetchedPage {
            url: url.to_string(),
            status: 200,
            content_type: self.content_type.clone(),
            body: self.body.clone(),
        })
    }
}

/// Always fails with a transport error
#[derive(Debug, Default)]
pub struct FailingFetcher;

#[async_trait]
impl PageFetcher for FailingFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage> {
        Err(anyhow!("connection refused while fetching {url}"))
    }
}

/// Records every notification instead of delivering it
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(EmailContent, Vec<String>)>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<(EmailContent, Vec<String>)> {
        self.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, content: &EmailContent, recipients: &[String]) {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push((content.clone(), recipients.to_vec()));
        }
    }
}
