//! Application layer module
//!
//! Use cases that orchestrate the domain logic: tracking a product, attaching
//! watchers and the read-side product queries.

pub mod error;
pub mod product_queries;
pub mod tracking_service;
pub mod watcher_registry;

pub use error::TrackError;
pub use product_queries::{ProductFilter, ProductQuery, ProductQueryService, ProductSort, apply_query};
pub use tracking_service::TrackingService;
pub use watcher_registry::{AttachOutcome, WatcherRegistry};
