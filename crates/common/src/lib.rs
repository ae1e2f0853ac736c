//! Shared plumbing for the ticketing services.
//!
//! This crate provides the pieces every layer needs but none of them owns:
//! - Configuration management
//! - Telemetry (tracing subscriber setup)
//! - Clock abstraction and datetime formatting
//! - Order and ticket number generation

pub mod config;
pub mod datetime;
pub mod numbering;
pub mod telemetry;

// Re-export commonly used types
pub use config::{AppConfig, DatabaseConfig, TelemetryConfig, TicketingConfig};
pub use datetime::{format_datetime, Clock, SystemClock};
pub use numbering::{to_base36, NumberGenerator, RandomNumberGenerator};
pub use telemetry::{init_from_config, init_tracing};

/// Common error type used at configuration and startup boundaries
pub type Result<T> = std::result::Result<T, anyhow::Error>;
