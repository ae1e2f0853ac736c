//! Configuration management for the ticketing services.
//!
//! Settings are layered: built-in defaults, then `config/default.*`, then
//! `config/{APP_ENV}.*`, then `TICKETING__*` environment variables.
//!
//! ## Example Configuration
//!
//! ```toml
//! [database]
//! url = "postgres://localhost:5432/ticketing"
//! max_connections = 20
//!
//! [telemetry]
//! json_logging = true
//!
//! [ticketing]
//! default_currency = "EUR"
//! qr_codes_enabled = true
//! max_tickets_per_order = 10
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    #[serde(default)]
    pub ticketing: TicketingConfig,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL
    pub url: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Timeout for acquiring a pooled connection, in seconds
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_seconds: u64,

    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_seconds: u64,
}

/// Telemetry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Service name attached to log records
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// Enable JSON logging format
    #[serde(default)]
    pub json_logging: bool,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            json_logging: false,
            log_level: default_log_level(),
        }
    }
}

/// Order lifecycle settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketingConfig {
    /// Currency used when a checkout does not name one
    #[serde(default = "default_currency")]
    pub default_currency: String,

    /// Attach QR payloads to tickets when a generator is wired in
    #[serde(default = "default_true")]
    pub qr_codes_enabled: bool,

    /// Upper bound on tickets in one order; unlimited when unset
    #[serde(default)]
    pub max_tickets_per_order: Option<u32>,
}

impl Default for TicketingConfig {
    fn default() -> Self {
        Self {
            default_currency: default_currency(),
            qr_codes_enabled: true,
            max_tickets_per_order: None,
        }
    }
}

fn default_max_connections() -> u32 {
    20
}

fn default_min_connections() -> u32 {
    2
}

fn default_acquire_timeout() -> u64 {
    30
}

fn default_idle_timeout() -> u64 {
    600
}

fn default_service_name() -> String {
    "ticketing".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_currency() -> String {
    "EUR".to_string()
}

fn default_true() -> bool {
    true
}

impl AppConfig {
    /// Load configuration from files and environment variables.
    ///
    /// Later sources override earlier ones:
    /// 1. config/default (if exists)
    /// 2. config/{environment} (if exists, where environment is from APP_ENV)
    /// 3. Environment variables prefixed with `TICKETING`, e.g.
    ///    `TICKETING__DATABASE__URL`
    ///
    /// ```no_run
    /// use ticketing_common::config::AppConfig;
    ///
    /// let config = AppConfig::load().expect("Failed to load configuration");
    /// println!("Default currency: {}", config.ticketing.default_currency);
    /// ```
    pub fn load() -> Result<Self> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{}", env)).required(false))
            .add_source(
                config::Environment::with_prefix("TICKETING")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        let app_config: AppConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        app_config.validate()?;

        Ok(app_config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.database.url.is_empty() {
            anyhow::bail!("Database URL is required");
        }

        if self.database.max_connections == 0 {
            anyhow::bail!("Database max_connections must be greater than 0");
        }

        if self.database.min_connections > self.database.max_connections {
            anyhow::bail!(
                "Database min_connections ({}) exceeds max_connections ({})",
                self.database.min_connections,
                self.database.max_connections
            );
        }

        if self.database.acquire_timeout_seconds == 0 {
            anyhow::bail!("Database acquire timeout must be greater than 0");
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.telemetry.log_level.as_str()) {
            anyhow::bail!(
                "Invalid log level '{}'. Must be one of: {}",
                self.telemetry.log_level,
                valid_log_levels.join(", ")
            );
        }

        let currency = &self.ticketing.default_currency;
        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_uppercase()) {
            anyhow::bail!(
                "Default currency '{}' must be a three-letter uppercase code",
                currency
            );
        }

        if self.ticketing.max_tickets_per_order == Some(0) {
            anyhow::bail!("max_tickets_per_order must be at least 1 when set");
        }

        Ok(())
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.database.acquire_timeout_seconds)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.database.idle_timeout_seconds)
    }

    /// Create a development configuration with sensible defaults
    pub fn development() -> Self {
        Self {
            database: DatabaseConfig {
                url: "postgres://localhost:5432/ticketing_dev".to_string(),
                max_connections: 5,
                min_connections: 1,
                acquire_timeout_seconds: 10,
                idle_timeout_seconds: 300,
            },
            telemetry: TelemetryConfig {
                service_name: "ticketing-dev".to_string(),
                json_logging: false,
                log_level: "debug".to_string(),
            },
            ticketing: TicketingConfig::default(),
        }
    }
}
