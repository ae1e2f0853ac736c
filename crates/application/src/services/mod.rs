//! Application Services
//!
//! Lifecycle orchestration over the repository ports. Each service method is a
//! sequence of independently committed repository calls; a failure part way
//! through is returned to the caller and whatever was already written stays.

mod check_in;
mod order;
mod payment;
mod promo_code;
mod stats;

pub use check_in::*;
pub use order::*;
pub use payment::*;
pub use promo_code::*;
pub use stats::*;

use crate::ports::{
    EventPublisher, NoOpEventPublisher, OrderItemRepository, OrderRepository,
    PromoCodeRepository, QrCodeGenerator, TicketRepository, TicketTypeRepository,
};
use crate::ApplicationResult;
use std::sync::Arc;
use ticketing_common::{Clock, NumberGenerator, RandomNumberGenerator, SystemClock, TicketingConfig};
use ticketing_domain::{Currency, DomainEvent, LifecycleEvent};
use tracing::warn;

/// Service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub default_currency: Currency,
    /// Generate QR payloads when a generator is available
    pub qr_codes_enabled: bool,
    pub max_tickets_per_order: Option<u32>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            default_currency: Currency::eur(),
            qr_codes_enabled: true,
            max_tickets_per_order: None,
        }
    }
}

impl ServiceConfig {
    pub fn from_ticketing_config(config: &TicketingConfig) -> ApplicationResult<Self> {
        Ok(Self {
            default_currency: Currency::new(&config.default_currency)?,
            qr_codes_enabled: config.qr_codes_enabled,
            max_tickets_per_order: config.max_tickets_per_order,
        })
    }
}

/// The five record collections the lifecycle works on
#[derive(Clone)]
pub struct Repositories {
    pub ticket_types: Arc<dyn TicketTypeRepository>,
    pub orders: Arc<dyn OrderRepository>,
    pub order_items: Arc<dyn OrderItemRepository>,
    pub tickets: Arc<dyn TicketRepository>,
    pub promo_codes: Arc<dyn PromoCodeRepository>,
}

impl Repositories {
    /// Use one backend for every collection
    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: TicketTypeRepository
            + OrderRepository
            + OrderItemRepository
            + TicketRepository
            + PromoCodeRepository
            + 'static,
    {
        Self {
            ticket_types: store.clone(),
            orders: store.clone(),
            order_items: store.clone(),
            tickets: store.clone(),
            promo_codes: store,
        }
    }
}

/// Everything a service needs besides its own logic
#[derive(Clone)]
pub struct ServiceContext {
    pub repositories: Repositories,
    pub clock: Arc<dyn Clock>,
    pub numbers: Arc<dyn NumberGenerator>,
    pub events: Arc<dyn EventPublisher>,
    pub qr_generator: Option<Arc<dyn QrCodeGenerator>>,
    pub config: ServiceConfig,
}

impl ServiceContext {
    /// Wall clock, random numbering, no event subscribers, no QR codes
    pub fn new(repositories: Repositories) -> Self {
        Self {
            repositories,
            clock: Arc::new(SystemClock),
            numbers: Arc::new(RandomNumberGenerator),
            events: Arc::new(NoOpEventPublisher),
            qr_generator: None,
            config: ServiceConfig::default(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_numbers(mut self, numbers: Arc<dyn NumberGenerator>) -> Self {
        self.numbers = numbers;
        self
    }

    pub fn with_events(mut self, events: Arc<dyn EventPublisher>) -> Self {
        self.events = events;
        self
    }

    pub fn with_qr_generator(mut self, generator: Arc<dyn QrCodeGenerator>) -> Self {
        self.qr_generator = Some(generator);
        self
    }

    pub fn with_config(mut self, config: ServiceConfig) -> Self {
        self.config = config;
        self
    }

    /// Publish after a state change. Subscriber failures are logged and do not
    /// undo the change.
    pub(crate) async fn publish(&self, event: LifecycleEvent) {
        let event_type = event.event_type();
        let envelope = DomainEvent::new(event, self.clock.now());
        if let Err(e) = self.events.publish(envelope).await {
            warn!(event_type, error = %e, "Failed to publish lifecycle event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_ticketing_settings() {
        let settings = TicketingConfig {
            default_currency: "USD".to_string(),
            qr_codes_enabled: false,
            max_tickets_per_order: Some(6),
        };
        let config = ServiceConfig::from_ticketing_config(&settings).unwrap();
        assert_eq!(config.default_currency.as_str(), "USD");
        assert!(!config.qr_codes_enabled);
        assert_eq!(config.max_tickets_per_order, Some(6));

        let bad = TicketingConfig {
            default_currency: "dollars".to_string(),
            ..TicketingConfig::default()
        };
        assert!(ServiceConfig::from_ticketing_config(&bad).is_err());
    }
}
