//! Logging system configuration and initialization
//!
//! Console output plus an optional non-blocking log file (plain or JSON),
//! filtered through an `EnvFilter` that `RUST_LOG` can override.

#![allow(clippy::uninlined_format_args)]

use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Result, anyhow};
use lazy_static::lazy_static;
use tracing::info;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{
    EnvFilter, Layer, Registry,
    fmt::{self, time::ChronoUtc},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

// Re-export LoggingConfig from config module
pub use crate::infrastructure::config::LoggingConfig;

use crate::infrastructure::config::AppConfig;

const LOG_FILE_NAME: &str = "price-tracker.log";
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

// Global guard to keep the log file writer alive
lazy_static! {
    static ref LOG_GUARDS: Mutex<Vec<tracing_appender::non_blocking::WorkerGuard>> = Mutex::new(Vec::new());
}

/// Dependency targets that are only interesting when tracing
const NOISY_TARGETS: &[(&str, &str)] = &[
    ("sqlx::query", "warn"),
    ("sqlx::sqlite", "warn"),
    ("reqwest", "info"),
    ("hyper", "warn"),
    ("hyper_util", "warn"),
    ("h2", "warn"),
    ("rustls", "warn"),
    ("html5ever", "warn"),
    ("selectors", "warn"),
];

/// Log directory: the configured one, else `<data dir>/price-tracker/logs`,
/// else `./logs`.
pub fn get_log_directory(config: &LoggingConfig) -> PathBuf {
    if let Some(dir) = &config.log_dir {
        return dir.clone();
    }
    AppConfig::get_app_data_dir()
        .map(|dir| dir.join("logs"))
        .unwrap_or_else(|_| PathBuf::from("logs"))
}

/// Initialize the logging system with default configuration
pub fn init_logging() -> Result<()> {
    init_logging_with_config(&LoggingConfig::default())
}

/// Builds the filter used when `RUST_LOG` is not set.
///
/// Unless the level is `trace`, SQL statements, HTTP internals and HTML
/// parser chatter are held back to warnings.
pub fn build_env_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    let level = config.level.to_lowercase();
    let mut filter = EnvFilter::try_new(&level)
        .map_err(|e| anyhow!("Invalid log level '{}': {}", config.level, e))?;

    if level != "trace" {
        for (target, target_level) in NOISY_TARGETS {
            filter = filter.add_directive(format!("{target}={target_level}").parse()?);
        }
    }

    for (module, module_level) in &config.module_filters {
        filter = filter.add_directive(
            format!("{module}={module_level}")
                .parse()
                .map_err(|e| anyhow!("Invalid module filter {}={}: {}", module, module_level, e))?,
        );
    }

    // Keep our application logs at the requested level
    filter = filter.add_directive(format!("price_tracker_lib={level}").parse()?);
    filter = filter.add_directive(format!("price_tracker={level}").parse()?);

    Ok(filter)
}

/// Initialize logging with custom configuration
///
/// # Environment Variable Override
/// ```bash
/// # Show all SQL queries on DEBUG level
/// RUST_LOG="debug,sqlx::query=debug" price-tracker track <URL> --email me@example.com
/// ```
pub fn init_logging_with_config(config: &LoggingConfig) -> Result<()> {
    if !config.file_output && !config.console_output {
        return Err(anyhow!("No logging output configured"));
    }

    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => build_env_filter(config)?,
    };

    let console_layer = config.console_output.then(|| {
        fmt::Layer::new()
            .with_writer(std::io::stderr)
            .with_timer(ChronoUtc::new(TIME_FORMAT.to_string()))
            .with_target(false)
            .boxed()
    });

    let log_dir = get_log_directory(config);
    let file_layer = if config.file_output {
        std::fs::create_dir_all(&log_dir)
            .map_err(|e| anyhow!("Failed to create log directory {:?}: {}", log_dir, e))?;

        let file_appender = rolling::never(&log_dir, LOG_FILE_NAME);
        let (file_writer, file_guard) = non_blocking(file_appender);

        // Store the guard globally to prevent it from being dropped
        LOG_GUARDS
            .lock()
            .map_err(|_| anyhow!("Log guard registry poisoned"))?
            .push(file_guard);

        let layer = if config.json_format {
            fmt::Layer::new()
                .json()
                .with_writer(file_writer)
                .with_timer(ChronoUtc::rfc_3339())
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .with_ansi(false)
                .boxed()
        } else {
            fmt::Layer::new()
                .with_writer(file_writer)
                .with_timer(ChronoUtc::new(TIME_FORMAT.to_string()))
                .with_target(false)
                .with_ansi(false)
                .boxed()
        };
        Some(layer)
    } else {
        None
    };

    Registry::default()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow!("Failed to install tracing subscriber: {}", e))?;

    info!("Logging system initialized");
    info!("Log level: {}", config.level);
    if config.file_output {
        info!("Log file: {:?}", log_dir.join(LOG_FILE_NAME));
    }
    if config.level.to_lowercase() != "trace" {
        info!("SQL and HTTP internals suppressed (use TRACE level to see all logs)");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logging_config_default() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, "info");
        assert!(config.console_output);
        assert!(!config.file_output);
    }

    #[test]
    fn filter_includes_suppressed_targets() {
        let filter = build_env_filter(&LoggingConfig::default()).unwrap();
        let rendered = filter.to_string();
        assert!(rendered.contains("sqlx::query=warn"));
        assert!(rendered.contains("price_tracker_lib=info"));
    }

    #[test]
    fn trace_level_shows_everything() {
        let config = LoggingConfig {
            level: "TRACE".to_string(),
            ..LoggingConfig::default()
        };
        let rendered = build_env_filter(&config).unwrap().to_string();
        assert!(!rendered.contains("sqlx::query=warn"));
    }

    #[test]
    fn invalid_module_filter_is_rejected() {
        let mut config = LoggingConfig::default();
        config
            .module_filters
            .insert("sqlx".to_string(), "not-a-level".to_string());
        assert!(build_env_filter(&config).is_err());
    }

    #[test]
    fn configured_log_dir_wins() {
        let config = LoggingConfig {
            log_dir: Some(PathBuf::from("/tmp/price-tracker-logs")),
            ..LoggingConfig::default()
        };
        assert_eq!(get_log_directory(&config), PathBuf::from("/tmp/price-tracker-logs"));
    }

    #[test]
    fn no_outputs_is_an_error() {
        let config = LoggingConfig {
            console_output: false,
            file_output: false,
            ..LoggingConfig::default()
        };
        assert!(init_logging_with_config(&config).is_err());
    }
}
