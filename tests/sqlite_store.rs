//! SQLite store and product query tests against a file-backed database

use std::sync::Arc;

use anyhow::Result;
use chrono::{Duration, Utc};
use tempfile::{TempDir, tempdir};

use price_tracker_lib::application::{ProductFilter, ProductQuery, ProductQueryService, ProductSort, TrackingService};
use price_tracker_lib::domain::{MergeOutcome, ProductStore};
use price_tracker_lib::infrastructure::{DatabaseConnection, ProductPageParser, SqliteProductStore};
use price_tracker_lib::test_utils::{ProductPageFixture, RecordingNotifier, StaticPageFetcher, sample_reading};

async fn file_store() -> Result<(TempDir, DatabaseConnection, Arc<SqliteProductStore>)> {
    let dir = tempdir()?;
    let url = format!("sqlite:{}", dir.path().join("prices.db").display());
    let db = DatabaseConnection::new(&url, 4).await?;
    db.migrate().await?;
    let store = Arc::new(SqliteProductStore::new(db.pool().clone()));
    Ok((dir, db, store))
}

#[tokio::test]
async fn history_survives_reconnect() -> Result<()> {
    let (dir, db, store) = file_store().await?;
    let url = "https://shop.example/dp/1";
    let t0 = Utc::now();

    for (i, price) in [25.0, 20.0, 22.5].into_iter().enumerate() {
        store
            .upsert_by_url(&sample_reading(url, price), t0 + Duration::seconds(i as i64))
            .await?;
    }
    db.pool().close().await;

    let reopened = DatabaseConnection::new(&format!("sqlite:{}", dir.path().join("prices.db").display()), 2).await?;
    let store = SqliteProductStore::new(reopened.pool().clone());
    let product = store.find_by_url(url).await?.expect("product persisted");

    let prices: Vec<f64> = product.price_history.iter().map(|e| e.price).collect();
    assert_eq!(prices, vec![25.0, 20.0, 22.5]);
    assert_eq!(product.lowest_price, 20.0);
    assert_eq!(product.highest_price, 25.0);
    assert!((product.average_price - 22.5).abs() < 1e-9);
    Ok(())
}

#[tokio::test]
async fn garbled_savings_badge_still_persists() -> Result<()> {
    let (_dir, _db, store) = file_store().await?;
    let page = ProductPageFixture::new("Kettle").price_to_pay("44.").savings("NaN%").build();
    let service = TrackingService::new(
        Arc::new(StaticPageFetcher::html(page)),
        Arc::new(ProductPageParser::new()?),
        store.clone(),
        Arc::new(RecordingNotifier::default()),
    );

    let product = service.track_product("https://shop.example/dp/nan", Some("ann@example.com")).await?;

    assert_eq!(product.discount_rate, 0.0);
    let stored = store.find_by_url("https://shop.example/dp/nan").await?.expect("product persisted");
    assert_eq!(stored.discount_rate, 0.0);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_upserts_create_one_product() -> Result<()> {
    let (_dir, _db, store) = file_store().await?;
    let url = "https://shop.example/dp/race";

    let tasks: Vec<_> = [10.0, 12.0]
        .into_iter()
        .map(|price| {
            let store = store.clone();
            tokio::spawn(async move { store.upsert_by_url(&sample_reading(url, price), Utc::now()).await })
        })
        .collect();

    let mut outcomes = Vec::new();
    for task in tasks {
        outcomes.push(task.await??.outcome);
    }
    outcomes.sort_by_key(|outcome| *outcome == MergeOutcome::Updated);
    assert_eq!(outcomes, vec![MergeOutcome::Created, MergeOutcome::Updated]);

    let product = store.find_by_url(url).await?.expect("product exists");
    let mut prices: Vec<f64> = product.price_history.iter().map(|e| e.price).collect();
    prices.sort_by(f64::total_cmp);
    assert_eq!(prices, vec![10.0, 12.0]);
    assert_eq!(product.lowest_price, 10.0);
    assert_eq!(product.highest_price, 12.0);
    Ok(())
}

#[tokio::test]
async fn queries_over_tracked_products() -> Result<()> {
    let (_dir, _db, store) = file_store().await?;
    let parser = Arc::new(ProductPageParser::new()?);
    let notifier = Arc::new(RecordingNotifier::default());

    let track = |url: &'static str, whole: &'static str, email: &'static str| {
        let store = store.clone();
        let parser = parser.clone();
        let notifier = notifier.clone();
        async move {
            let page = ProductPageFixture::new(&format!("Product {url}")).price_to_pay(whole).build();
            let service = TrackingService::new(Arc::new(StaticPageFetcher::html(page)), parser, store, notifier);
            service.track_product(url, Some(email)).await
        }
    };

    let a = track("https://shop.example/a", "30.", "ann@example.com").await?;
    track("https://shop.example/b", "10.", "ann@example.com").await?;
    track("https://shop.example/b", "9.", "ann@example.com").await?;
    track("https://shop.example/c", "20.", "bob@example.com").await?;

    let queries = ProductQueryService::new(store.clone());

    assert_eq!(queries.total_tracked_count(Some("ann@example.com")).await?, 2);
    assert_eq!(queries.trending_tracked_count(Some("ann@example.com")).await?, 1);
    assert_eq!(queries.total_tracked_count(None).await?, 0);

    let cheapest_first = ProductQuery {
        sort: ProductSort::PriceLowHigh,
        ..ProductQuery::default()
    };
    let mine = queries.my_tracked_products(Some("ann@example.com"), &cheapest_first).await?;
    let urls: Vec<&str> = mine.iter().map(|p| p.url.as_str()).collect();
    assert_eq!(urls, vec!["https://shop.example/b", "https://shop.example/a"]);

    let trending = ProductQuery {
        filter: Some(ProductFilter::Trending),
        ..ProductQuery::default()
    };
    let mine = queries.my_tracked_products(Some("ann@example.com"), &trending).await?;
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].price_history.len(), 2);

    assert!(queries.my_tracked_products(None, &trending).await?.is_empty());
    assert_eq!(queries.recent_products().await?.len(), 3);

    let found = queries.get_product_by_id(&a.id).await?.expect("product exists");
    assert_eq!(found.url, "https://shop.example/a");
    assert!(queries.get_product_by_id("missing").await?.is_none());

    // Extracted products carry no category
    assert_eq!(queries.similar_products(&a.id).await?, Some(Vec::new()));
    assert_eq!(queries.similar_products("missing").await?, None);
    Ok(())
}
