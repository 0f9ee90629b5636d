//! Reconciles a fresh reading against the persisted state of the same URL.
//!
//! The merge is a pure function over `(existing, reading)`. Stores call it
//! from inside their atomic upsert so that two concurrent scrapes of one URL
//! both land in the same history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::aggregates::{PriceAggregates, aggregate};
use super::product::{PriceHistoryEntry, ProductReading, TrackedProduct};

/// Which transition a merge performed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MergeOutcome {
    /// Absent -> Tracked: first successful scrape of the URL
    Created,
    /// Tracked -> Tracked: re-scrape appended to the history
    Updated,
}

/// Result of an atomic upsert
#[derive(Debug, Clone)]
pub struct UpsertResult {
    pub product: TrackedProduct,
    pub outcome: MergeOutcome,
}

/// Merges `reading` into `existing`, or seeds a new product when there is none.
///
/// On update the current price is appended (adjacent equal prices are kept),
/// aggregates are recomputed over the whole history and every scalar field is
/// overwritten with the fresh values. Identity, creation time, watchers and
/// earlier history entries are carried over untouched.
pub fn merge_reading(
    existing: Option<TrackedProduct>,
    reading: &ProductReading,
    observed_at: DateTime<Utc>,
) -> (TrackedProduct, MergeOutcome) {
    let entry = PriceHistoryEntry::new(reading.current_price, observed_at);

    match existing {
        None => {
            let stats = PriceAggregates::single(reading.current_price);
            let product = TrackedProduct {
                id: Uuid::new_v4().to_string(),
                url: reading.url.clone(),
                title: reading.title.clone(),
                current_price: reading.current_price,
                original_price: reading.original_price,
                currency: reading.currency.clone(),
                discount_rate: reading.discount_rate,
                is_out_of_stock: reading.is_out_of_stock,
                image: reading.image.clone(),
                description: reading.description.clone(),
                category: reading.category.clone(),
                reviews_count: reading.reviews_count,
                stars: reading.stars,
                price_history: vec![entry],
                lowest_price: stats.lowest,
                highest_price: stats.highest,
                average_price: stats.average,
                watchers: Vec::new(),
                created_at: observed_at,
                updated_at: observed_at,
            };
            (product, MergeOutcome::Created)
        }
        Some(mut product) => {
            debug_assert_eq!(product.url, reading.url, "merge keyed by url");

            product.price_history.push(entry);
            let stats = aggregate(&product.price_history)
                .unwrap_or_else(|| PriceAggregates::single(reading.current_price));

            product.title = reading.title.clone();
            product.current_price = reading.current_price;
            product.original_price = reading.original_price;
            product.currency = reading.currency.clone();
            product.discount_rate = reading.discount_rate;
            product.is_out_of_stock = reading.is_out_of_stock;
            product.image = reading.image.clone();
            product.description = reading.description.clone();
            product.category = reading.category.clone();
            product.reviews_count = reading.reviews_count;
            product.stars = reading.stars;
            product.lowest_price = stats.lowest;
            product.highest_price = stats.highest;
            product.average_price = stats.average;
            product.updated_at = observed_at;

            (product, MergeOutcome::Updated)
        }
    }
}
