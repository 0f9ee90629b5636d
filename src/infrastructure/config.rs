//! Configuration infrastructure
//!
//! Settings are layered: built-in defaults, then an optional config file
//! (TOML or JSON, chosen by extension), then `PRICE_TRACKER__*` environment
//! variables such as `PRICE_TRACKER__DATABASE__URL`. The ScraperAPI key may
//! also be supplied as plain `SCRAPERAPI_KEY`.

#![allow(clippy::uninlined_format_args)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::http_client::ScraperConfig;
use super::parsing::ParsingConfig;

const APP_DIR_NAME: &str = "price-tracker";

/// Complete application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Page fetching through the scraping proxy
    pub scraper: ScraperConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    /// Selector lists for product page extraction
    pub parsing: ParsingConfig,
    pub notifications: NotificationConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// sqlx SQLite URL, e.g. `sqlite:/var/lib/price-tracker/products.db`
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: defaults::database_url(),
            max_connections: defaults::MAX_CONNECTIONS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "error", "warn", "info", "debug", "trace"
    pub level: String,

    /// Enable JSON formatted file logs
    pub json_format: bool,

    pub console_output: bool,
    pub file_output: bool,

    /// Directory for log files; the platform data directory when unset
    pub log_dir: Option<PathBuf>,

    /// Module-specific log level filters (e.g., "sqlx": "warn", "reqwest": "info")
    pub module_filters: HashMap<String, String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::LOG_LEVEL.to_string(),
            json_format: false,
            console_output: true,
            file_output: false,
            log_dir: None,
            module_filters: HashMap::new(),
        }
    }
}

/// Where welcome mail goes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationMode {
    /// Log rendered mail only
    #[default]
    Log,
    /// Queue rendered mail in the `email_outbox` table
    Outbox,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    pub mode: NotificationMode,
    pub from_address: String,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            mode: NotificationMode::Log,
            from_address: defaults::FROM_ADDRESS.to_string(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from defaults, an optional file and the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
            info!("📄 Loading configuration from {:?}", path);
        } else if let Ok(default_path) = Self::default_config_path() {
            builder = builder.add_source(config::File::from(default_path).required(false));
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix("PRICE_TRACKER")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        let mut config: AppConfig = settings
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        if config.scraper.api_key.is_none() {
            config.scraper.api_key = std::env::var("SCRAPERAPI_KEY")
                .ok()
                .filter(|key| !key.trim().is_empty());
        }

        config.validate()?;
        Ok(config)
    }

    /// Rejects settings the application cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.database.max_connections == 0 {
            bail!("database.max_connections must be at least 1");
        }
        if !self.database.url.starts_with("sqlite:") {
            bail!("database.url must be a sqlite URL, got '{}'", self.database.url);
        }
        if self.scraper.timeout_seconds == 0 {
            bail!("scraper.timeout_seconds must be greater than 0");
        }
        if !defaults::LOG_LEVELS.contains(&self.logging.level.to_lowercase().as_str()) {
            bail!(
                "logging.level must be one of {:?}, got '{}'",
                defaults::LOG_LEVELS,
                self.logging.level
            );
        }
        if self.parsing.unavailable_phrase.trim().is_empty() {
            bail!("parsing.unavailable_phrase must not be empty");
        }
        if self.parsing.default_currency.trim().is_empty() {
            bail!("parsing.default_currency must not be empty");
        }
        if self.parsing.selectors.title.is_empty() {
            bail!("parsing.selectors.title needs at least one selector");
        }
        Ok(())
    }

    /// Get the application configuration directory
    pub fn get_config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get user config directory")?
            .join(APP_DIR_NAME);

        Ok(config_dir)
    }

    /// `<config dir>/price-tracker/config.toml`
    pub fn default_config_path() -> Result<PathBuf> {
        Ok(Self::get_config_dir()?.join("config.toml"))
    }

    /// Get application data directory
    pub fn get_app_data_dir() -> Result<PathBuf> {
        let data_dir = dirs::data_local_dir()
            .context("Failed to get user data directory")?
            .join(APP_DIR_NAME);

        Ok(data_dir)
    }
}

/// Default configuration values
pub mod defaults {
    use super::AppConfig;

    pub const MAX_CONNECTIONS: u32 = 5;

    pub const LOG_LEVEL: &str = "info";

    pub const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

    pub const FROM_ADDRESS: &str = "price-tracker@localhost";

    /// Database file under the platform data directory, or the working
    /// directory when none is known
    pub fn database_url() -> String {
        match AppConfig::get_app_data_dir() {
            Ok(dir) => format!("sqlite:{}", dir.join("price_tracker.db").display()),
            Err(_) => "sqlite:price_tracker.db".to_string(),
        }
    }
}
