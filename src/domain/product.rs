use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One extraction result from a single scrape of a product page.
///
/// Both prices are always populated: when the page only exposes one of them
/// the extractor copies it into the other field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductReading {
    pub url: String,
    pub title: String,
    pub current_price: f64,
    pub original_price: f64,
    /// Currency symbol (`$`, `€`) or ISO code (`EUR`)
    pub currency: String,
    /// Advertised saving in percent, 0 when the page shows none
    pub discount_rate: f64,
    pub is_out_of_stock: bool,
    pub image: Option<String>,
    pub description: String,
    pub category: Option<String>,
    pub reviews_count: i64,
    pub stars: f64,
}

/// A single observed price. History entries are append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceHistoryEntry {
    pub price: f64,
    pub observed_at: DateTime<Utc>,
}

impl PriceHistoryEntry {
    pub fn new(price: f64, observed_at: DateTime<Utc>) -> Self {
        Self { price, observed_at }
    }
}

/// A user identity that receives notifications for a product
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Watcher {
    pub email: String,
}

/// The persisted, continuously-updated record for one product URL.
///
/// `lowest_price`, `highest_price` and `average_price` are derived from
/// `price_history` by the aggregator on every merge and are never written
/// on their own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackedProduct {
    pub id: String,
    pub url: String,
    pub title: String,
    pub current_price: f64,
    pub original_price: f64,
    pub currency: String,
    pub discount_rate: f64,
    pub is_out_of_stock: bool,
    pub image: Option<String>,
    pub description: String,
    pub category: Option<String>,
    pub reviews_count: i64,
    pub stars: f64,
    pub price_history: Vec<PriceHistoryEntry>,
    pub lowest_price: f64,
    pub highest_price: f64,
    pub average_price: f64,
    pub watchers: Vec<Watcher>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TrackedProduct {
    /// Exact-match membership test against the watcher set
    pub fn is_watched_by(&self, email: &str) -> bool {
        self.watchers.iter().any(|watcher| watcher.email == email)
    }

    /// Adds a watcher unless the email is already present.
    /// Returns `true` when the set changed.
    pub fn add_watcher(&mut self, email: &str) -> bool {
        if self.is_watched_by(email) {
            return false;
        }
        self.watchers.push(Watcher {
            email: email.to_string(),
        });
        true
    }

    /// A product is trending once it has been observed more than once.
    pub fn is_trending(&self) -> bool {
        self.price_history.len() > 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::sample_tracked_product;

    #[test]
    fn add_watcher_keeps_set_semantics() {
        let mut product = sample_tracked_product("https://shop.example/dp/1", 10.0);

        assert!(product.add_watcher("a@example.com"));
        assert!(!product.add_watcher("a@example.com"));
        assert!(product.add_watcher("b@example.com"));

        assert_eq!(product.watchers.len(), 2);
        assert!(product.is_watched_by("a@example.com"));
        // membership is an exact match
        assert!(!product.is_watched_by("A@example.com"));
    }

    #[test]
    fn trending_requires_more_than_one_observation() {
        let mut product = sample_tracked_product("https://shop.example/dp/1", 10.0);
        assert!(!product.is_trending());

        product
            .price_history
            .push(PriceHistoryEntry::new(9.0, Utc::now()));
        assert!(product.is_trending());
    }

    #[test]
    fn serializes_with_camel_case_keys() {
        let product = sample_tracked_product("https://shop.example/dp/1", 10.0);
        let json = serde_json::to_value(&product).unwrap();

        assert!(json.get("currentPrice").is_some());
        assert!(json.get("priceHistory").is_some());
        assert!(json.get("isOutOfStock").is_some());
    }
}
