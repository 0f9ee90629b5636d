// Database connection and pool management
// This module handles SQLite database connections using sqlx

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use tracing::{debug, info};

pub struct DatabaseConnection {
    pool: SqlitePool,
}

impl DatabaseConnection {
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let db_path = database_url
            .trim_start_matches("sqlite://")
            .trim_start_matches("sqlite:");

        if let Some(parent) = Path::new(db_path).parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create database directory {}", parent.display()))?;
        }

        // WAL lets readers proceed while an upsert transaction holds the write lock
        let options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("Invalid database URL: {database_url}"))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5))
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to connect to {database_url}"))?;

        info!("🗄️ Connected to database: {}", database_url);
        Ok(Self { pool })
    }

    /// Private in-memory database.
    ///
    /// Every SQLite `:memory:` connection is a separate database, so the pool
    /// holds exactly one connection for its whole lifetime.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .context("Failed to open in-memory database")?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn migrate(&self) -> Result<()> {
        let create_products_sql = r#"
            CREATE TABLE IF NOT EXISTS products (
                id TEXT PRIMARY KEY,
                url TEXT NOT NULL UNIQUE,
                title TEXT NOT NULL,
                current_price REAL NOT NULL,
                original_price REAL NOT NULL,
                currency TEXT NOT NULL,
                discount_rate REAL NOT NULL DEFAULT 0,
                is_out_of_stock BOOLEAN NOT NULL DEFAULT 0,
                image TEXT,
                description TEXT NOT NULL DEFAULT '',
                category TEXT,
                reviews_count INTEGER NOT NULL DEFAULT 0,
                stars REAL NOT NULL DEFAULT 0,
                lowest_price REAL NOT NULL,
                highest_price REAL NOT NULL,
                average_price REAL NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
        "#;

        let create_history_sql = r#"
            CREATE TABLE IF NOT EXISTS price_history (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                product_id TEXT NOT NULL,
                price REAL NOT NULL,
                observed_at TEXT NOT NULL,
                FOREIGN KEY (product_id) REFERENCES products (id) ON DELETE CASCADE
            )
        "#;

        let create_watchers_sql = r#"
            CREATE TABLE IF NOT EXISTS product_watchers (
                product_id TEXT NOT NULL,
                email TEXT NOT NULL,
                PRIMARY KEY (product_id, email),
                FOREIGN KEY (product_id) REFERENCES products (id) ON DELETE CASCADE
            )
        "#;

        let create_outbox_sql = r#"
            CREATE TABLE IF NOT EXISTS email_outbox (
                id TEXT PRIMARY KEY,
                recipients TEXT NOT NULL,
                subject TEXT NOT NULL,
                body TEXT NOT NULL,
                created_at TEXT NOT NULL,
                sent_at TEXT
            )
        "#;

        let create_indexes_sql = [
            "CREATE INDEX IF NOT EXISTS idx_price_history_product ON price_history (product_id, seq)",
            "CREATE INDEX IF NOT EXISTS idx_watchers_email ON product_watchers (email)",
            "CREATE INDEX IF NOT EXISTS idx_products_updated_at ON products (updated_at)",
            "CREATE INDEX IF NOT EXISTS idx_products_category ON products (category)",
            "CREATE INDEX IF NOT EXISTS idx_outbox_pending ON email_outbox (sent_at)",
        ];

        for sql in [create_products_sql, create_history_sql, create_watchers_sql, create_outbox_sql] {
            sqlx::query(sql).execute(&self.pool).await?;
        }
        for sql in create_indexes_sql {
            sqlx::query(sql).execute(&self.pool).await?;
        }

        debug!("Database schema is up to date");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::Row;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_database_connection() -> Result<()> {
        let temp_dir = tempdir()?;
        let db_path = temp_dir.path().join("nested").join("test.db");
        let database_url = format!("sqlite:{}", db_path.display());

        let db = DatabaseConnection::new(&database_url, 4).await?;

        assert!(!db.pool().is_closed());
        assert!(db_path.exists());
        Ok(())
    }

    #[tokio::test]
    async fn test_database_migration() -> Result<()> {
        let db = DatabaseConnection::in_memory().await?;

        db.migrate().await?;
        // Idempotent
        db.migrate().await?;

        let tables: Vec<String> = sqlx::query(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )
        .fetch_all(db.pool())
        .await?
        .iter()
        .map(|row| row.get::<String, _>("name"))
        .collect();

        assert_eq!(tables, vec!["email_outbox", "price_history", "product_watchers", "products"]);
        Ok(())
    }
}
