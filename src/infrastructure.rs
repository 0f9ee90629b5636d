//! Infrastructure layer for database connections, parsing, and external integrations
//!
//! Concrete implementations of the domain collaborators: SQLite and
//! in-memory product stores, the HTTP page fetcher, notifiers, plus
//! configuration and logging.

pub mod config; // Layered application configuration
pub mod database_connection;
pub mod http_client;
pub mod logging; // Logging infrastructure
pub mod memory_product_repository;
pub mod notifier;
pub mod parsing; // Product page extraction
pub mod parsing_error;
pub mod product_repository;

// Re-export commonly used items
pub use config::{AppConfig, NotificationMode};
pub use database_connection::DatabaseConnection;
pub use http_client::{ScraperApiClient, ScraperConfig};
pub use logging::{get_log_directory, init_logging, init_logging_with_config};
pub use memory_product_repository::InMemoryProductStore;
pub use notifier::{LoggingNotifier, OutboxNotifier};
pub use parsing::{ParsingConfig, ProductPageParser, ProductParser};
pub use parsing_error::{ExtractionError, ParseError};
pub use product_repository::SqliteProductStore;
