//! SQLite-backed product store
//!
//! One row per product URL in `products`, history rows in `price_history`
//! ordered by an autoincrement sequence, and the watcher set in
//! `product_watchers`.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::domain::merge::{MergeOutcome, UpsertResult, merge_reading};
use crate::domain::product::{PriceHistoryEntry, ProductReading, TrackedProduct, Watcher};
use crate::domain::repositories::ProductStore;

const PRODUCT_COLUMNS: &str = "id, url, title, current_price, original_price, currency, discount_rate, \
     is_out_of_stock, image, description, category, reviews_count, stars, lowest_price, \
     highest_price, average_price, created_at, updated_at";

#[derive(Clone)]
pub struct SqliteProductStore {
    pool: Arc<SqlitePool>,
}

impl SqliteProductStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool: Arc::new(pool) }
    }

    async fn insert_history(
        conn: &mut SqliteConnection,
        product_id: &str,
        entry: &PriceHistoryEntry,
    ) -> Result<()> {
        sqlx::query("INSERT INTO price_history (product_id, price, observed_at) VALUES (?, ?, ?)")
            .bind(product_id)
            .bind(entry.price)
            .bind(entry.observed_at)
            .execute(conn)
            .await?;
        Ok(())
    }

    async fn fetch_products(&self, sql: &str, binds: &[&str], limit: Option<u32>) -> Result<Vec<TrackedProduct>> {
        let mut conn = self.pool.acquire().await?;

        let mut query = sqlx::query(sql);
        for value in binds {
            query = query.bind(*value);
        }
        if let Some(limit) = limit {
            query = query.bind(i64::from(limit));
        }

        let rows = query.fetch_all(&mut *conn).await?;
        let mut products = Vec::with_capacity(rows.len());
        for row in rows {
            products.push(hydrate(&mut *conn, &row).await?);
        }
        Ok(products)
    }
}

#[async_trait]
impl ProductStore for SqliteProductStore {
    async fn find_by_url(&self, url: &str) -> Result<Option<TrackedProduct>> {
        let mut conn = self.pool.acquire().await?;
        load_by_url(&mut *conn, url).await
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<TrackedProduct>> {
        let mut conn = self.pool.acquire().await?;
        let row = sqlx::query(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?"))
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        match row {
            Some(row) => Ok(Some(hydrate(&mut *conn, &row).await?)),
            None => Ok(None),
        }
    }

    async fn upsert_by_url(
        &self,
        reading: &ProductReading,
        observed_at: DateTime<Utc>,
    ) -> Result<UpsertResult> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin upsert transaction")?;

        // Writing first takes the database write lock, so the read below sees
        // every history entry committed by a concurrent scrape of this URL.
        let (seeded, _) = merge_reading(None, reading, observed_at);
        let inserted = sqlx::query(
            r#"
            INSERT INTO products
            (id, url, title, current_price, original_price, currency, discount_rate,
             is_out_of_stock, image, description, category, reviews_count, stars,
             lowest_price, highest_price, average_price, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(url) DO NOTHING
            "#,
        )
        .bind(&seeded.id)
        .bind(&seeded.url)
        .bind(&seeded.title)
        .bind(seeded.current_price)
        .bind(seeded.original_price)
        .bind(&seeded.currency)
        .bind(seeded.discount_rate)
        .bind(seeded.is_out_of_stock)
        .bind(&seeded.image)
        .bind(&seeded.description)
        .bind(&seeded.category)
        .bind(seeded.reviews_count)
        .bind(seeded.stars)
        .bind(seeded.lowest_price)
        .bind(seeded.highest_price)
        .bind(seeded.average_price)
        .bind(seeded.created_at)
        .bind(seeded.updated_at)
        .execute(&mut *tx)
        .await?
        .rows_affected()
        == 1;

        if inserted {
            for entry in &seeded.price_history {
                Self::insert_history(&mut *tx, &seeded.id, entry).await?;
            }
            tx.commit().await.context("Failed to commit new product")?;

            info!("🆕 Tracking new product {} ({})", seeded.id, seeded.url);
            return Ok(UpsertResult {
                product: seeded,
                outcome: MergeOutcome::Created,
            });
        }

        let existing = load_by_url(&mut *tx, &reading.url)
            .await?
            .with_context(|| format!("Product row for {} vanished during upsert", reading.url))?;
        let (product, outcome) = merge_reading(Some(existing), reading, observed_at);

        sqlx::query(
            r#"
            UPDATE products SET
                title = ?, current_price = ?, original_price = ?, currency = ?,
                discount_rate = ?, is_out_of_stock = ?, image = ?, description = ?,
                category = ?, reviews_count = ?, stars = ?, lowest_price = ?,
                highest_price = ?, average_price = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&product.title)
        .bind(product.current_price)
        .bind(product.original_price)
        .bind(&product.currency)
        .bind(product.discount_rate)
        .bind(product.is_out_of_stock)
        .bind(&product.image)
        .bind(&product.description)
        .bind(&product.category)
        .bind(product.reviews_count)
        .bind(product.stars)
        .bind(product.lowest_price)
        .bind(product.highest_price)
        .bind(product.average_price)
        .bind(product.updated_at)
        .bind(&product.id)
        .execute(&mut *tx)
        .await?;

        if let Some(entry) = product.price_history.last() {
            Self::insert_history(&mut *tx, &product.id, entry).await?;
        }
        tx.commit().await.context("Failed to commit product update")?;

        debug!(
            "Updated product {} with {} history entries",
            product.id,
            product.price_history.len()
        );
        Ok(UpsertResult { product, outcome })
    }

    async fn add_watcher(&self, product_id: &str, email: &str) -> Result<bool> {
        let result = sqlx::query(
            "INSERT INTO product_watchers (product_id, email) VALUES (?, ?) ON CONFLICT DO NOTHING",
        )
        .bind(product_id)
        .bind(email)
        .execute(&*self.pool)
        .await
        .with_context(|| format!("Failed to add watcher to product {product_id}"))?;

        Ok(result.rows_affected() == 1)
    }

    async fn find_watched_by(&self, email: &str) -> Result<Vec<TrackedProduct>> {
        let sql = format!(
            "SELECT {} FROM products WHERE id IN \
             (SELECT product_id FROM product_watchers WHERE email = ?) \
             ORDER BY created_at DESC",
            PRODUCT_COLUMNS
        );
        self.fetch_products(&sql, &[email], None).await
    }

    async fn find_recent(&self, limit: u32) -> Result<Vec<TrackedProduct>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products ORDER BY updated_at DESC LIMIT ?");
        self.fetch_products(&sql, &[], Some(limit)).await
    }

    async fn find_in_category(
        &self,
        category: &str,
        exclude_id: &str,
        limit: u32,
    ) -> Result<Vec<TrackedProduct>> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE category = ? AND id != ? \
             ORDER BY updated_at DESC LIMIT ?"
        );
        self.fetch_products(&sql, &[category, exclude_id], Some(limit)).await
    }
}

async fn load_by_url(conn: &mut SqliteConnection, url: &str) -> Result<Option<TrackedProduct>> {
    let row = sqlx::query(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE url = ?"))
        .bind(url)
        .fetch_optional(&mut *conn)
        .await?;

    match row {
        Some(row) => Ok(Some(hydrate(conn, &row).await?)),
        None => Ok(None),
    }
}

/// Builds a product from its row plus its history and watcher rows
async fn hydrate(conn: &mut SqliteConnection, row: &SqliteRow) -> Result<TrackedProduct> {
    let id: String = row.try_get("id")?;

    let price_history = sqlx::query("SELECT price, observed_at FROM price_history WHERE product_id = ? ORDER BY seq")
        .bind(&id)
        .fetch_all(&mut *conn)
        .await?
        .iter()
        .map(|row| -> Result<PriceHistoryEntry> {
            Ok(PriceHistoryEntry::new(row.try_get("price")?, row.try_get("observed_at")?))
        })
        .collect::<Result<Vec<_>>>()?;

    let watchers = sqlx::query("SELECT email FROM product_watchers WHERE product_id = ? ORDER BY rowid")
        .bind(&id)
        .fetch_all(&mut *conn)
        .await?
        .iter()
        .map(|row| -> Result<Watcher> { Ok(Watcher { email: row.try_get("email")? }) })
        .collect::<Result<Vec<_>>>()?;

    Ok(TrackedProduct {
        id,
        url: row.try_get("url")?,
        title: row.try_get("title")?,
        current_price: row.try_get("current_price")?,
        original_price: row.try_get("original_price")?,
        currency: row.try_get("currency")?,
        discount_rate: row.try_get("discount_rate")?,
        is_out_of_stock: row.try_get("is_out_of_stock")?,
        image: row.try_get("image")?,
        description: row.try_get("description")?,
        category: row.try_get("category")?,
        reviews_count: row.try_get("reviews_count")?,
        stars: row.try_get("stars")?,
        price_history,
        lowest_price: row.try_get("lowest_price")?,
        highest_price: row.try_get("highest_price")?,
        average_price: row.try_get("average_price")?,
        watchers,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}
