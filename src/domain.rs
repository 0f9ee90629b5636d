//! Domain module - Core tracking logic and entities
//!
//! Contains the product model, the aggregator and merge engine that keep a
//! product's price history consistent, and the collaborator interfaces the
//! core depends on.

pub mod aggregates;
pub mod merge;
pub mod notification;
pub mod product;
pub mod repositories;
pub mod services;

// Re-export commonly used items for convenience
pub use aggregates::{PriceAggregates, aggregate};
pub use merge::{MergeOutcome, UpsertResult, merge_reading};
pub use notification::{EmailContent, render_welcome};
pub use product::{PriceHistoryEntry, ProductReading, TrackedProduct, Watcher};
pub use repositories::ProductStore;
pub use services::{FetchedPage, Notifier, PageFetcher};
