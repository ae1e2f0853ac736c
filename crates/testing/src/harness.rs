//! Services wired over an in-memory store with deterministic collaborators.

use std::sync::Arc;

use ticketing_application::ports::PaymentProvider;
use ticketing_application::services::{
    CheckInService, OrderService, PaymentService, PromoCodeService, Repositories,
    ServiceConfig, ServiceContext, StatsService,
};
use ticketing_domain::{EditionId, PromoCode, TicketType};
use ticketing_infrastructure::InMemoryStore;

use crate::mocks::{
    FailingStore, FixedClock, RecordingEventPublisher, RecordingQrGenerator,
    SequentialNumberGenerator,
};

/// One edition's worth of services for a test
pub struct TestHarness {
    pub edition_id: EditionId,
    pub store: Arc<InMemoryStore>,
    pub clock: Arc<FixedClock>,
    pub events: Arc<RecordingEventPublisher>,
    pub qr: Arc<RecordingQrGenerator>,
    pub ctx: ServiceContext,
}

impl TestHarness {
    pub fn new() -> Self {
        let clock = Arc::new(FixedClock::default());
        let store = Arc::new(InMemoryStore::with_clock(clock.clone()));
        let repositories = Repositories::from_store(store.clone());
        Self::assemble(store, clock, repositories)
    }

    /// Route every repository call through `configure(FailingStore)`
    pub fn with_failing_store(configure: impl FnOnce(FailingStore) -> FailingStore) -> Self {
        let clock = Arc::new(FixedClock::default());
        let store = Arc::new(InMemoryStore::with_clock(clock.clone()));
        let failing = Arc::new(configure(FailingStore::new(store.clone())));
        let repositories = Repositories::from_store(failing);
        Self::assemble(store, clock, repositories)
    }

    fn assemble(
        store: Arc<InMemoryStore>,
        clock: Arc<FixedClock>,
        repositories: Repositories,
    ) -> Self {
        let events = Arc::new(RecordingEventPublisher::new());
        let qr = Arc::new(RecordingQrGenerator::new());
        let ctx = ServiceContext::new(repositories)
            .with_clock(clock.clone())
            .with_numbers(Arc::new(SequentialNumberGenerator::new()))
            .with_events(events.clone())
            .with_qr_generator(qr.clone());

        Self {
            edition_id: EditionId::new(),
            store,
            clock,
            events,
            qr,
            ctx,
        }
    }

    pub fn with_config(mut self, config: ServiceConfig) -> Self {
        self.ctx = self.ctx.with_config(config);
        self
    }

    pub fn repositories(&self) -> &Repositories {
        &self.ctx.repositories
    }

    pub fn seed_ticket_type(&self, ticket_type: TicketType) -> TicketType {
        self.store.insert_ticket_type(ticket_type.clone());
        ticket_type
    }

    pub fn seed_promo_code(&self, promo_code: PromoCode) -> PromoCode {
        self.store.insert_promo_code(promo_code.clone());
        promo_code
    }

    pub fn orders(&self) -> OrderService {
        OrderService::new(self.ctx.clone())
    }

    pub fn check_in(&self) -> CheckInService {
        CheckInService::new(self.ctx.clone())
    }

    pub fn promo_codes(&self) -> PromoCodeService {
        PromoCodeService::new(self.ctx.clone())
    }

    pub fn payments(&self, provider: Arc<dyn PaymentProvider>) -> PaymentService {
        PaymentService::new(self.ctx.clone(), provider)
    }

    pub fn stats(&self) -> StatsService {
        StatsService::new(self.ctx.clone())
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
