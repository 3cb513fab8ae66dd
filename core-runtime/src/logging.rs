//! # Logging & Tracing Infrastructure
//!
//! Configures the `tracing-subscriber` stack for the story client core:
//! - Pretty, compact, or JSON output
//! - `RUST_LOG`-style module-level filtering
//! - A global default level when no filter is given
//!
//! Credentials never reach the log stream by construction: the session and
//! token types redact themselves in their `Debug` implementations, and call
//! sites log account emails or page numbers, not secrets.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
//!
//! let config = LoggingConfig::default()
//!     .with_format(LogFormat::Pretty)
//!     .with_filter("core_paging=debug,core_api=info");
//!
//! init_logging(config).expect("Failed to initialize logging");
//! tracing::info!("Application started");
//! ```

use crate::error::{Error, Result};
use tracing_subscriber::{filter::EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable pretty format with colors
    Pretty,
    /// Compact single-line format
    Compact,
    /// Structured JSON format for machine parsing
    Json,
}

impl Default for LogFormat {
    fn default() -> Self {
        #[cfg(debug_assertions)]
        return Self::Pretty;

        #[cfg(not(debug_assertions))]
        return Self::Json;
    }
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Output format
    pub format: LogFormat,
    /// Default level directive when `filter` is not set (e.g. "info")
    pub default_level: String,
    /// Custom filter string (e.g., "core_paging=debug,core_api=trace")
    pub filter: Option<String>,
    /// Display target module in logs
    pub display_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            default_level: "info".to_string(),
            filter: None,
            display_target: true,
        }
    }
}

impl LoggingConfig {
    /// Set log format
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Set the default level directive
    pub fn with_default_level(mut self, level: impl Into<String>) -> Self {
        self.default_level = level.into();
        self
    }

    /// Set a custom filter string
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Set whether the target module is displayed
    pub fn with_display_target(mut self, display: bool) -> Self {
        self.display_target = display;
        self
    }

    fn env_filter(&self) -> Result<EnvFilter> {
        let directives = self
            .filter
            .clone()
            .unwrap_or_else(|| self.default_level.clone());

        directives
            .parse::<EnvFilter>()
            .map_err(|e| Error::Config(format!("Invalid log filter '{}': {}", directives, e)))
    }
}

/// Initialize the global tracing subscriber.
///
/// Honors `RUST_LOG` when set, falling back to the configured filter or
/// default level. May be called once per process; a second call fails with
/// [`Error::Logging`].
pub fn init_logging(config: LoggingConfig) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(env) => env,
        Err(_) => config.env_filter()?,
    };

    let registry = tracing_subscriber::registry().with(filter);

    let result = match config.format {
        LogFormat::Pretty => registry
            .with(fmt::layer().pretty().with_target(config.display_target))
            .try_init(),
        LogFormat::Compact => registry
            .with(fmt::layer().compact().with_target(config.display_target))
            .try_init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_target(config.display_target))
            .try_init(),
    };

    result.map_err(|e| Error::Logging(e.to_string()))
}
