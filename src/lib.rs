//! Price Tracker - e-commerce product price tracking
//!
//! Scrapes retailer product pages, merges every observation into a
//! per-URL price history with derived lowest/highest/average prices, and
//! notifies users when they start watching a product.

// Module declarations
pub mod application;
pub mod domain;
pub mod infrastructure;

// Fixtures and in-process collaborators for tests and benches
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

// Re-export the main entry points for easier access
pub use application::{ProductQueryService, TrackError, TrackingService};
pub use domain::{ProductReading, TrackedProduct};
