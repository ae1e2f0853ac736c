//! Structured logging setup.
//!
//! Services log through `tracing`; this module installs the subscriber that
//! renders those events either as pretty text for local runs or as JSON lines
//! for log shipping.

use crate::config::TelemetryConfig;
use anyhow::{Context, Result};
use tracing::Subscriber;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over `log_level` when set. Fails if a subscriber is
/// already installed.
///
/// ```no_run
/// use ticketing_common::telemetry::init_tracing;
///
/// init_tracing("ticketing", false, "info").expect("Failed to initialize tracing");
/// ```
pub fn init_tracing(service_name: &str, json_format: bool, log_level: &str) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let registry = Registry::default().with(env_filter);

    if json_format {
        registry
            .with(json_layer())
            .try_init()
            .context("Failed to initialize tracing subscriber")?;
    } else {
        registry
            .with(pretty_layer())
            .try_init()
            .context("Failed to initialize tracing subscriber")?;
    }

    tracing::info!(service = service_name, json = json_format, "Tracing initialized");
    Ok(())
}

/// [`init_tracing`] driven by the telemetry section of the configuration
pub fn init_from_config(config: &TelemetryConfig) -> Result<()> {
    init_tracing(&config.service_name, config.json_logging, &config.log_level)
}

fn json_layer<S>() -> impl Layer<S>
where
    S: Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(false)
        .with_target(true)
        .with_level(true)
}

fn pretty_layer<S>() -> impl Layer<S>
where
    S: Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    fmt::layer()
        .pretty()
        .with_target(true)
        .with_level(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(FmtSpan::CLOSE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_fails() {
        // Only one global subscriber can exist per process; whichever call
        // runs second must report an error instead of panicking.
        let first = init_tracing("test-service", false, "info");
        let second = init_from_config(&TelemetryConfig::default());
        assert!(first.is_err() || second.is_err());
    }
}
