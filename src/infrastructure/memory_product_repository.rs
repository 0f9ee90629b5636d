//! In-memory product store
//!
//! Used by tests and by one-off CLI runs that should not touch disk. All
//! mutation happens under a single mutex that is never held across an await.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::merge::{UpsertResult, merge_reading};
use crate::domain::product::{ProductReading, TrackedProduct};
use crate::domain::repositories::ProductStore;

#[derive(Default)]
struct State {
    by_id: HashMap<String, TrackedProduct>,
    id_by_url: HashMap<String, String>,
}

#[derive(Default)]
pub struct InMemoryProductStore {
    state: Mutex<State>,
    writes: AtomicUsize,
}

impl InMemoryProductStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful mutating calls so far
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.lock().map(|state| state.by_id.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|_| anyhow!("In-memory product store lock poisoned"))
    }

    fn select<F>(&self, filter: F) -> Result<Vec<TrackedProduct>>
    where
        F: Fn(&TrackedProduct) -> bool,
    {
        let state = self.lock()?;
        Ok(state.by_id.values().filter(|p| filter(p)).cloned().collect())
    }
}

#[async_trait]
impl ProductStore for InMemoryProductStore {
    async fn find_by_url(&self, url: &str) -> Result<Option<TrackedProduct>> {
        let state = self.lock()?;
        Ok(state
            .id_by_url
            .get(url)
            .and_then(|id| state.by_id.get(id))
            .cloned())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<TrackedProduct>> {
        Ok(self.lock()?.by_id.get(id).cloned())
    }

    async fn upsert_by_url(
        &self,
        reading: &ProductReading,
        observed_at: DateTime<Utc>,
    ) -> Result<UpsertResult> {
        let mut state = self.lock()?;

        let existing = state
            .id_by_url
            .get(&reading.url)
            .and_then(|id| state.by_id.get(id))
            .cloned();
        let (product, outcome) = merge_reading(existing, reading, observed_at);

        state.id_by_url.insert(product.url.clone(), product.id.clone());
        state.by_id.insert(product.id.clone(), product.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);

        Ok(UpsertResult { product, outcome })
    }

    async fn add_watcher(&self, product_id: &str, email: &str) -> Result<bool> {
        let mut state = self.lock()?;
        let product = state
            .by_id
            .get_mut(product_id)
            .ok_or_else(|| anyhow!("Unknown product {product_id}"))?;

        let added = product.add_watcher(email);
        if added {
            self.writes.fetch_add(1, Ordering::SeqCst);
        }
        Ok(added)
    }

    async fn find_watched_by(&self, email: &str) -> Result<Vec<TrackedProduct>> {
        let mut products = self.select(|p| p.is_watched_by(email))?;
        products.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(products)
    }

    async fn find_recent(&self, limit: u32) -> Result<Vec<TrackedProduct>> {
        let mut products = self.select(|_| true)?;
        products.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        products.truncate(limit as usize);
        Ok(products)
    }

    async fn find_in_category(
        &self,
        category: &str,
        exclude_id: &str,
        limit: u32,
    ) -> Result<Vec<TrackedProduct>> {
        let mut products =
            self.select(|p| p.id != exclude_id && p.category.as_deref() == Some(category))?;
        products.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        products.truncate(limit as usize);
        Ok(products)
    }
}
