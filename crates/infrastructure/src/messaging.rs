//! Messaging module - lifecycle events written to the log
//!
//! Serializes every [`DomainEvent`] to JSON and emits it as a structured
//! `tracing` record on the `ticketing::events` target, where a log shipper can
//! pick it up.

use async_trait::async_trait;
use serde::Serialize;
use tracing::{info, instrument};

use ticketing_application::{ApplicationError, EventPublisher};
use ticketing_domain::DomainEvent;

use crate::{Error, Result};

/// Messaging configuration.
#[derive(Debug, Clone)]
pub struct MessagingConfig {
    /// Channel prefix, joined with the event type
    pub channel_prefix: String,
    /// Maximum serialized message size in bytes
    pub max_message_size: usize,
    /// Source service name stamped on every message
    pub source: String,
}

impl Default for MessagingConfig {
    fn default() -> Self {
        Self {
            channel_prefix: "ticketing:events:".to_string(),
            max_message_size: 64 * 1024,
            source: "ticketing".to_string(),
        }
    }
}

/// Event message wrapper.
#[derive(Debug, Clone, Serialize)]
pub struct EventMessage<'a> {
    pub channel: String,
    pub source: &'a str,
    #[serde(flatten)]
    pub event: &'a DomainEvent,
}

/// Event publisher that writes lifecycle events to the log
#[derive(Debug, Clone, Default)]
pub struct TracingEventPublisher {
    config: MessagingConfig,
}

impl TracingEventPublisher {
    pub fn new(config: MessagingConfig) -> Self {
        Self { config }
    }

    /// Channel name for an event, e.g. `ticketing:events:order.paid`
    pub fn channel(&self, event: &DomainEvent) -> String {
        format!("{}{}", self.config.channel_prefix, event.payload.event_type())
    }

    /// Serialize an event the way it is published
    pub fn encode(&self, event: &DomainEvent) -> Result<String> {
        let message = EventMessage {
            channel: self.channel(event),
            source: &self.config.source,
            event,
        };
        let json = serde_json::to_string(&message)?;
        if json.len() > self.config.max_message_size {
            return Err(Error::Configuration(format!(
                "event {} is {} bytes, limit is {}",
                event.id,
                json.len(),
                self.config.max_message_size
            )));
        }
        Ok(json)
    }
}

#[async_trait]
impl EventPublisher for TracingEventPublisher {
    #[instrument(skip(self, event), fields(event_id = %event.id))]
    async fn publish(&self, event: DomainEvent) -> std::result::Result<(), ApplicationError> {
        let json = self.encode(&event)?;
        info!(
            target: "ticketing::events",
            event_type = event.payload.event_type(),
            message = %json,
            "Lifecycle event"
        );
        Ok(())
    }
}
