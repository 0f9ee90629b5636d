//! HTTP page fetcher
//!
//! Retrieves product pages either directly or through the ScraperAPI proxy,
//! which handles anti-bot measures on retailer sites.

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::{Client, ClientBuilder, header::CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};
use url::Url;

use crate::domain::services::{FetchedPage, PageFetcher};

/// Configuration for the page fetcher
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    /// Proxy endpoint receiving `api_key` and `url` query parameters
    pub api_base_url: String,
    /// Proxy key. Pages are fetched directly when absent.
    pub api_key: Option<String>,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
    pub user_agent: String,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://api.scraperapi.com".to_string(),
            api_key: None,
            timeout_seconds: 60,
            user_agent: "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) \
                         Chrome/124.0 Safari/537.36"
                .to_string(),
        }
    }
}

/// Page fetcher backed by reqwest
#[derive(Clone)]
pub struct ScraperApiClient {
    client: Client,
    config: ScraperConfig,
}

impl ScraperApiClient {
    pub fn with_config(config: ScraperConfig) -> Result<Self> {
        let client = ClientBuilder::new()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(&config.user_agent)
            .cookie_store(true)
            .gzip(true)
            .brotli(true)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| anyhow!("Failed to create HTTP client: {}", e))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ScraperConfig {
        &self.config
    }

    /// Proxy key, unless blank
    fn api_key(&self) -> Option<&str> {
        self.config.api_key.as_deref().filter(|key| !key.trim().is_empty())
    }

    /// Whether requests go through the scraping proxy
    pub fn is_proxied(&self) -> bool {
        self.api_key().is_some()
    }

    /// URL actually requested for `target`
    pub fn request_url(&self, target: &str) -> Result<Url> {
        let target = Url::parse(target).with_context(|| format!("Invalid product URL: {target}"))?;

        match self.api_key() {
            Some(key) => Url::parse_with_params(
                &self.config.api_base_url,
                &[("api_key", key), ("url", target.as_str())],
            )
            .with_context(|| format!("Invalid proxy base URL: {}", self.config.api_base_url)),
            None => Ok(target),
        }
    }
}

#[async_trait]
impl PageFetcher for ScraperApiClient {
    async fn fetch(&self, url: &str) -> Result<FetchedPage> {
        let request_url = self.request_url(url)?;
        info!("🌐 HTTP GET {} (proxied: {})", url, self.is_proxied());

        let response = self
            .client
            .get(request_url)
            .send()
            .await
            // The request URL carries the proxy key; report the target only
            .map_err(|e| anyhow!("HTTP request failed for {}: {}", url, e.without_url()))?;

        let status = response.status();
        if !status.is_success() {
            error!("❌ HTTP error {}: {}", status, url);
            return Err(anyhow!("HTTP error {}: {}", status, url));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        let body = response
            .text()
            .await
            .map_err(|e| anyhow!("Failed to read response body from {}: {}", url, e.without_url()))?;

        debug!("Fetched {} bytes from {} ({:?})", body.len(), url, content_type);

        Ok(FetchedPage {
            url: url.to_string(),
            status: status.as_u16(),
            content_type,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direct_fetch_without_key() {
        let client = ScraperApiClient::with_config(ScraperConfig::default()).unwrap();
        let url = client.request_url("https://shop.example/dp/B0001").unwrap();
        assert_eq!(url.as_str(), "https://shop.example/dp/B0001");
    }

    #[test]
    fn proxied_fetch_encodes_target() {
        let config = ScraperConfig {
            api_key: Some("secret".to_string()),
            ..ScraperConfig::default()
        };
        let client = ScraperApiClient::with_config(config).unwrap();
        assert!(client.is_proxied());

        let url = client
            .request_url("https://shop.example/dp/B0001?ref=a&th=1")
            .unwrap();

        assert_eq!(url.host_str(), Some("api.scraperapi.com"));
        let params: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            params,
            vec![
                ("api_key".to_string(), "secret".to_string()),
                ("url".to_string(), "https://shop.example/dp/B0001?ref=a&th=1".to_string()),
            ]
        );
    }

    #[test]
    fn blank_key_means_direct() {
        let config = ScraperConfig {
            api_key: Some("  ".to_string()),
            ..ScraperConfig::default()
        };
        let client = ScraperApiClient::with_config(config).unwrap();
        assert!(!client.is_proxied());
        assert!(client.request_url("https://shop.example/x").unwrap().as_str().starts_with("https://shop.example"));
    }

    #[test]
    fn bare_host_without_key_is_direct() {
        let client = ScraperApiClient::with_config(ScraperConfig::default()).unwrap();
        // Url normalization appends a slash, which is not a proxy hop
        assert_eq!(client.request_url("https://shop.example").unwrap().as_str(), "https://shop.example/");
        assert!(!client.is_proxied());
    }

    #[tokio::test]
    async fn transport_errors_do_not_expose_the_key() {
        let config = ScraperConfig {
            api_base_url: "http://127.0.0.1:1".to_string(),
            api_key: Some("SUPERSECRETKEY".to_string()),
            timeout_seconds: 5,
            ..ScraperConfig::default()
        };
        let client = ScraperApiClient::with_config(config).unwrap();

        let error = client.fetch("https://shop.example/dp/1").await.unwrap_err();
        let message = format!("{error:#}");

        assert!(message.contains("https://shop.example/dp/1"));
        assert!(!message.contains("SUPERSECRETKEY"), "{message}");
        assert!(!message.contains("api_key"), "{message}");
    }

    #[test]
    fn rejects_malformed_target() {
        let client = ScraperApiClient::with_config(ScraperConfig::default()).unwrap();
        assert!(client.request_url("not a url").is_err());
    }
}
