//! Collaborator interfaces at the edge of the tracking core
//!
//! Page retrieval and mail dispatch are the two suspending boundaries of a
//! scrape. Neither is retried here; retry policy belongs to the collaborator.

use anyhow::Result;
use async_trait::async_trait;

use super::notification::EmailContent;

/// Raw response of a page fetch
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub url: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
}

impl FetchedPage {
    /// Empty bodies and non-HTML content types cannot contain a product title.
    pub fn looks_like_html(&self) -> bool {
        if self.body.trim().is_empty() {
            return false;
        }
        self.content_type
            .as_deref()
            .is_none_or(|content_type| content_type.to_ascii_lowercase().contains("html"))
    }
}

#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Retrieves the HTML of `url`. Transport failures are returned as errors.
    async fn fetch(&self, url: &str) -> Result<FetchedPage>;
}

/// Outbound mail collaborator.
///
/// Fire-and-forget from the caller's point of view: implementations log their
/// own failures and never report them back.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, content: &EmailContent, recipients: &[String]);
}
