//! Errors surfaced by `track_product`

use thiserror::Error;

use crate::infrastructure::parsing_error::ExtractionError;

/// Why a tracking request failed.
///
/// Every variant except `Persistence` guarantees that nothing was written.
#[derive(Error, Debug)]
pub enum TrackError {
    #[error("Sign in with an email address to track products")]
    AuthRequired,

    #[error("Invalid product URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Failed to fetch {url}: {source:#}")]
    Fetch {
        url: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Could not read product page {url}: {source}")]
    Extraction {
        url: String,
        #[source]
        source: ExtractionError,
    },

    #[error("Failed to save product {url}: {source:#}")]
    Persistence {
        url: String,
        #[source]
        source: anyhow::Error,
    },
}

impl TrackError {
    /// Short machine-readable reason
    pub fn reason(&self) -> &'static str {
        match self {
            Self::AuthRequired => "auth-required",
            Self::InvalidUrl { .. } => "invalid-url",
            Self::Fetch { .. } => "fetch-failed",
            Self::Extraction { source, .. } => source.reason(),
            Self::Persistence { .. } => "persistence-failed",
        }
    }

    /// True when the request failed before anything was persisted
    pub fn nothing_persisted(&self) -> bool {
        !matches!(self, Self::Persistence { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn messages_carry_cause() {
        let error = TrackError::Fetch {
            url: "https://shop.example/dp/1".to_string(),
            source: anyhow!("connection reset"),
        };
        assert_eq!(error.reason(), "fetch-failed");
        assert!(error.to_string().contains("connection reset"));
        assert!(error.nothing_persisted());
    }

    #[test]
    fn extraction_reason_is_forwarded() {
        let error = TrackError::Extraction {
            url: "https://shop.example/dp/1".to_string(),
            source: ExtractionError::TitleMissing {
                tried_selectors: Vec::new(),
            },
        };
        assert_eq!(error.reason(), "title-missing");
        assert!(error.to_string().contains("title-missing"));
    }
}
