use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{error, info};

use price_tracker_lib::application::{ProductFilter, ProductQuery, ProductQueryService, ProductSort, TrackingService};
use price_tracker_lib::domain::{Notifier, ProductStore};
use price_tracker_lib::infrastructure::{
    AppConfig, DatabaseConnection, InMemoryProductStore, LoggingNotifier, NotificationMode, OutboxNotifier,
    ProductPageParser, ScraperApiClient, SqliteProductStore, init_logging_with_config,
};

#[derive(Parser)]
#[command(name = "price-tracker", version)]
#[command(about = "Track product prices from retailer pages")]
struct Cli {
    /// Path to config file (TOML or JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Keep products in memory instead of the configured database
    #[arg(long, global = true)]
    in_memory: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape a product page and start watching it
    Track {
        url: String,

        /// Email address of the watching user
        #[arg(short, long, env = "PRICE_TRACKER_EMAIL")]
        email: Option<String>,
    },

    /// Show a tracked product
    Show { id: String },

    /// List products watched by a user
    List {
        #[arg(short, long, env = "PRICE_TRACKER_EMAIL")]
        email: Option<String>,

        /// Only "trending" is supported
        #[arg(short, long)]
        filter: Option<ProductFilter>,

        /// price-drop, price-low-high, price-high-low or newest
        #[arg(short, long, default_value_t = ProductSort::Newest)]
        sort: ProductSort,

        #[arg(long)]
        category: Option<String>,

        #[arg(long)]
        search: Option<String>,
    },

    /// Most recently updated products
    Recent,

    /// Products in the same category as a tracked product
    Similar { id: String },
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load(cli.config.as_deref())?;
    init_logging_with_config(&config.logging)?;

    let store: Arc<dyn ProductStore>;
    let notifier: Arc<dyn Notifier>;
    if cli.in_memory {
        info!("Using in-memory product store");
        store = Arc::new(InMemoryProductStore::new());
        notifier = Arc::new(LoggingNotifier);
    } else {
        let db = DatabaseConnection::new(&config.database.url, config.database.max_connections).await?;
        db.migrate().await.context("Failed to migrate database")?;

        store = Arc::new(SqliteProductStore::new(db.pool().clone()));
        notifier = match config.notifications.mode {
            NotificationMode::Log => Arc::new(LoggingNotifier),
            NotificationMode::Outbox => Arc::new(OutboxNotifier::new(db.pool().clone())),
        };
    }

    match cli.command {
        Commands::Track { url, email } => {
            let fetcher = Arc::new(ScraperApiClient::with_config(config.scraper.clone())?);
            let parser = Arc::new(ProductPageParser::with_config(&config.parsing)?);
            let service = TrackingService::new(fetcher, parser, store, notifier);

            match service.track_product(&url, email.as_deref()).await {
                Ok(product) => print_json(&product)?,
                Err(e) => {
                    error!("❌ Tracking failed ({}): {}", e.reason(), e);
                    return Err(e.into());
                }
            }
        }
        Commands::Show { id } => {
            let queries = ProductQueryService::new(store);
            let product = queries
                .get_product_by_id(&id)
                .await?
                .with_context(|| format!("No tracked product with id {id}"))?;
            print_json(&product)?;
        }
        Commands::List {
            email,
            filter,
            sort,
            category,
            search,
        } => {
            let queries = ProductQueryService::new(store);
            let query = ProductQuery {
                filter,
                category,
                search,
                sort,
            };
            let products = queries.my_tracked_products(email.as_deref(), &query).await?;
            info!(
                "{} of {} tracked products match ({} trending)",
                products.len(),
                queries.total_tracked_count(email.as_deref()).await?,
                queries.trending_tracked_count(email.as_deref()).await?
            );
            print_json(&products)?;
        }
        Commands::Recent => {
            let queries = ProductQueryService::new(store);
            print_json(&queries.recent_products().await?)?;
        }
        Commands::Similar { id } => {
            let queries = ProductQueryService::new(store);
            let similar = queries
                .similar_products(&id)
                .await?
                .with_context(|| format!("No tracked product with id {id}"))?;
            print_json(&similar)?;
        }
    }

    Ok(())
}
