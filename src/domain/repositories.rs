//! Repository interface for tracked products
//!
//! The store owns uniqueness per URL. The core never checks uniqueness itself
//! and relies on `upsert_by_url` being atomic.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::merge::UpsertResult;
use super::product::{ProductReading, TrackedProduct};

#[async_trait]
pub trait ProductStore: Send + Sync {
    async fn find_by_url(&self, url: &str) -> Result<Option<TrackedProduct>>;

    async fn find_by_id(&self, id: &str) -> Result<Option<TrackedProduct>>;

    /// Atomically merges `reading` into the product keyed by `reading.url`.
    ///
    /// Implementations must run [`merge_reading`](super::merge::merge_reading)
    /// against the state they hold inside their own atomic section, so that at
    /// most one product exists per URL and concurrent callers never lose a
    /// history entry.
    async fn upsert_by_url(
        &self,
        reading: &ProductReading,
        observed_at: DateTime<Utc>,
    ) -> Result<UpsertResult>;

    /// Inserts `(product_id, email)` unless present.
    /// Returns `true` when a watcher row was actually created.
    async fn add_watcher(&self, product_id: &str, email: &str) -> Result<bool>;

    // Read side used by product queries
    async fn find_watched_by(&self, email: &str) -> Result<Vec<TrackedProduct>>;
    async fn find_recent(&self, limit: u32) -> Result<Vec<TrackedProduct>>;
    async fn find_in_category(
        &self,
        category: &str,
        exclude_id: &str,
        limit: u32,
    ) -> Result<Vec<TrackedProduct>>;
}
