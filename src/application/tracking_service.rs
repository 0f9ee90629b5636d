//! Track-product use case
//!
//! Composes fetch, extraction, the atomic merge and the watcher registry.
//! Nothing is written unless a complete reading was extracted.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};
use url::Url;

use super::error::TrackError;
use super::watcher_registry::{AttachOutcome, WatcherRegistry};
use crate::domain::product::{ProductReading, TrackedProduct};
use crate::domain::repositories::ProductStore;
use crate::domain::services::{Notifier, PageFetcher};
use crate::infrastructure::parsing::ProductParser;

pub struct TrackingService {
    fetcher: Arc<dyn PageFetcher>,
    parser: Arc<dyn ProductParser>,
    store: Arc<dyn ProductStore>,
    watchers: WatcherRegistry,
}

impl TrackingService {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        parser: Arc<dyn ProductParser>,
        store: Arc<dyn ProductStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let watchers = WatcherRegistry::new(store.clone(), notifier);
        Self {
            fetcher,
            parser,
            store,
            watchers,
        }
    }

    /// Scrapes `url`, merges the reading into the stored product and attaches
    /// the requesting user as a watcher.
    ///
    /// The identity check happens before any network or store access.
    pub async fn track_product(
        &self,
        url: &str,
        requesting_user_email: Option<&str>,
    ) -> Result<TrackedProduct, TrackError> {
        let email = requesting_user_email
            .map(str::trim)
            .filter(|email| !email.is_empty())
            .ok_or(TrackError::AuthRequired)?;
        debug!("Tracking request for {}", url);

        let reading = self.scrape_product(url).await?;
        let url = reading.url.clone();

        let result = self
            .store
            .upsert_by_url(&reading, Utc::now())
            .await
            .map_err(|source| TrackError::Persistence {
                url: url.clone(),
                source,
            })?;
        let mut product = result.product;

        let outcome = self
            .watchers
            .attach(&mut product, email)
            .await
            .map_err(|source| TrackError::Persistence { url, source })?;

        info!(
            "✅ Tracked {} ({:?}, {} observations, watcher {:?})",
            product.id,
            result.outcome,
            product.price_history.len(),
            outcome
        );
        if outcome == AttachOutcome::AlreadyWatching {
            info!("{} was already watching {}", email, product.id);
        }
        Ok(product)
    }

    /// Fetches and extracts `url` without touching the store.
    pub async fn scrape_product(&self, url: &str) -> Result<ProductReading, TrackError> {
        let url = validate_url(url)?;

        let page = self
            .fetcher
            .fetch(&url)
            .await
            .map_err(|source| TrackError::Fetch {
                url: url.clone(),
                source,
            })?;

        // An empty or non-HTML response has no title to find
        let html = if page.looks_like_html() {
            page.body.as_str()
        } else {
            warn!(
                "Response for {} is not an HTML page (status {}, content type {:?})",
                url, page.status, page.content_type
            );
            ""
        };

        self.parser
            .parse_product(html, &url)
            .map_err(|source| TrackError::Extraction { url, source })
    }
}

/// Accepts absolute http(s) URLs only. The trimmed input is kept verbatim as
/// the product key.
fn validate_url(url: &str) -> Result<String, TrackError> {
    let trimmed = url.trim();
    let invalid = |reason: String| TrackError::InvalidUrl {
        url: url.to_string(),
        reason,
    };

    if trimmed.is_empty() {
        return Err(invalid("empty URL".to_string()));
    }

    let parsed = Url::parse(trimmed).map_err(|e| invalid(e.to_string()))?;
    match parsed.scheme() {
        "http" | "https" if parsed.host_str().is_some() => Ok(trimmed.to_string()),
        scheme => Err(invalid(format!("unsupported scheme '{scheme}'"))),
    }
}
