//! Read-side product queries
//!
//! Listing, counting and lookup operations over tracked products. Missing
//! identities yield empty results rather than errors.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::product::TrackedProduct;
use crate::domain::repositories::ProductStore;

/// Number of products returned by [`ProductQueryService::recent_products`]
pub const RECENT_PRODUCTS_LIMIT: u32 = 50;

/// Number of products returned by [`ProductQueryService::similar_products`]
pub const SIMILAR_PRODUCTS_LIMIT: u32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProductFilter {
    /// Observed more than once
    Trending,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProductSort {
    /// Highest stored price first
    PriceDrop,
    PriceLowHigh,
    PriceHighLow,
    /// Most recently created first
    #[default]
    Newest,
}

impl FromStr for ProductFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "trending" => Ok(Self::Trending),
            other => Err(format!("unknown filter '{other}' (expected: trending)")),
        }
    }
}

impl FromStr for ProductSort {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "price-drop" | "pricedrop" => Ok(Self::PriceDrop),
            "price-low-high" | "pricelowhigh" => Ok(Self::PriceLowHigh),
            "price-high-low" | "pricehighlow" => Ok(Self::PriceHighLow),
            "newest" => Ok(Self::Newest),
            other => Err(format!(
                "unknown sort '{other}' (expected: price-drop, price-low-high, price-high-low, newest)"
            )),
        }
    }
}

impl fmt::Display for ProductSort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::PriceDrop => "price-drop",
            Self::PriceLowHigh => "price-low-high",
            Self::PriceHighLow => "price-high-low",
            Self::Newest => "newest",
        };
        f.write_str(name)
    }
}

/// Options for listing a user's tracked products
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductQuery {
    pub filter: Option<ProductFilter>,
    /// Case-insensitive substring of the category
    pub category: Option<String>,
    /// Case-insensitive substring of the title or category
    pub search: Option<String>,
    pub sort: ProductSort,
}

/// Applies filter, category, search and sort to an already-loaded product set.
pub fn apply_query(products: Vec<TrackedProduct>, query: &ProductQuery) -> Vec<TrackedProduct> {
    let category = normalized(query.category.as_deref());
    let search = normalized(query.search.as_deref());

    let mut products: Vec<TrackedProduct> = products
        .into_iter()
        .filter(|p| match query.filter {
            Some(ProductFilter::Trending) => p.is_trending(),
            None => true,
        })
        .filter(|p| {
            category.as_deref().is_none_or(|needle| {
                p.category
                    .as_deref()
                    .is_some_and(|c| c.to_lowercase().contains(needle))
            })
        })
        .filter(|p| {
            search.as_deref().is_none_or(|needle| {
                p.title.to_lowercase().contains(needle)
                    || p.category
                        .as_deref()
                        .is_some_and(|c| c.to_lowercase().contains(needle))
            })
        })
        .collect();

    let by_price = |a: &TrackedProduct, b: &TrackedProduct| {
        a.current_price
            .partial_cmp(&b.current_price)
            .unwrap_or(Ordering::Equal)
    };

    match query.sort {
        ProductSort::PriceDrop => products.sort_by(|a, b| {
            b.highest_price
                .partial_cmp(&a.highest_price)
                .unwrap_or(Ordering::Equal)
        }),
        ProductSort::PriceLowHigh => products.sort_by(by_price),
        ProductSort::PriceHighLow => products.sort_by(|a, b| by_price(b, a)),
        ProductSort::Newest => products.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
    }

    products
}

fn normalized(value: Option<&str>) -> Option<String> {
    value
        .map(|v| v.trim().to_lowercase())
        .filter(|v| !v.is_empty())
}

fn identity(email: Option<&str>) -> Option<&str> {
    email.map(str::trim).filter(|email| !email.is_empty())
}

pub struct ProductQueryService {
    store: Arc<dyn ProductStore>,
}

impl ProductQueryService {
    pub fn new(store: Arc<dyn ProductStore>) -> Self {
        Self { store }
    }

    pub async fn get_product_by_id(&self, id: &str) -> Result<Option<TrackedProduct>> {
        self.store.find_by_id(id).await
    }

    /// Products watched by `email`, filtered and sorted by `query`
    pub async fn my_tracked_products(
        &self,
        email: Option<&str>,
        query: &ProductQuery,
    ) -> Result<Vec<TrackedProduct>> {
        let Some(email) = identity(email) else {
            debug!("No identity supplied; returning no tracked products");
            return Ok(Vec::new());
        };
        let products = self.store.find_watched_by(email).await?;
        Ok(apply_query(products, query))
    }

    pub async fn total_tracked_count(&self, email: Option<&str>) -> Result<usize> {
        match identity(email) {
            Some(email) => Ok(self.store.find_watched_by(email).await?.len()),
            None => Ok(0),
        }
    }

    pub async fn trending_tracked_count(&self, email: Option<&str>) -> Result<usize> {
        match identity(email) {
            Some(email) => Ok(self
                .store
                .find_watched_by(email)
                .await?
                .iter()
                .filter(|p| p.is_trending())
                .count()),
            None => Ok(0),
        }
    }

    /// Most recently updated products across all users
    pub async fn recent_products(&self) -> Result<Vec<TrackedProduct>> {
        self.store.find_recent(RECENT_PRODUCTS_LIMIT).await
    }

    /// Other products in the same category. `None` when `id` is unknown.
    pub async fn similar_products(&self, id: &str) -> Result<Option<Vec<TrackedProduct>>> {
        let Some(product) = self.store.find_by_id(id).await? else {
            return Ok(None);
        };
        let Some(category) = product.category.as_deref() else {
            return Ok(Some(Vec::new()));
        };
        let similar = self
            .store
            .find_in_category(category, &product.id, SIMILAR_PRODUCTS_LIMIT)
            .await?;
        Ok(Some(similar))
    }
}
