//! Mock implementations for repositories and external services.
//!
//! Deterministic stand-ins for the collaborators the services depend on, plus
//! a repository wrapper that injects failures part way through a workflow.

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use ticketing_application::ports::{
    CheckoutRequest, CheckoutSession, EventPublisher, OrderItemRepository, OrderRepository,
    PaymentEvent, PaymentProvider, PromoCodeRepository, QrCodeGenerator, RefundReceipt,
    RefundRequest, TicketRepository, TicketTypeRepository,
};
use ticketing_application::{ApplicationError, ApplicationResult};
use ticketing_common::{Clock, NumberGenerator};
use ticketing_domain::{
    Amount, DomainEvent, EditionId, NewOrder, NewPromoCode, NewTicket, NewTicketType, Order,
    OrderId, OrderItem, OrderStatus, PaymentInfo, PromoCode, PromoCodeId, PromoCodeUsage, Ticket,
    TicketId, TicketStatus, TicketType, TicketTypeId, UserId,
};
use ticketing_infrastructure::InMemoryStore;

// ============================================================================
// Clock and numbering
// ============================================================================

/// Clock that only moves when told to
#[derive(Debug)]
pub struct FixedClock {
    now: RwLock<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: RwLock::new(now),
        }
    }

    /// 2025-09-01 10:00 UTC
    pub fn default_start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 9, 1, 10, 0, 0)
            .single()
            .unwrap_or_else(Utc::now)
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.write() = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.write();
        *now += by;
    }
}

impl Default for FixedClock {
    fn default() -> Self {
        Self::new(Self::default_start())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.read()
    }
}

/// Predictable order and ticket numbers
#[derive(Debug, Default)]
pub struct SequentialNumberGenerator {
    orders: AtomicU64,
    tickets: AtomicU64,
}

impl SequentialNumberGenerator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl NumberGenerator for SequentialNumberGenerator {
    fn order_number(&self, _at: DateTime<Utc>) -> String {
        let n = self.orders.fetch_add(1, Ordering::SeqCst) + 1;
        format!("ORD-TEST-{:04}", n)
    }

    fn ticket_number(&self, _at: DateTime<Utc>) -> String {
        let n = self.tickets.fetch_add(1, Ordering::SeqCst) + 1;
        format!("TKT-TEST-{:06}", n)
    }
}

// ============================================================================
// Events and QR codes
// ============================================================================

/// Mock event publisher for testing lifecycle events
#[derive(Debug, Default)]
pub struct RecordingEventPublisher {
    events: RwLock<Vec<DomainEvent>>,
    failing: AtomicBool,
}

impl RecordingEventPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every publish fail from now on
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn events(&self) -> Vec<DomainEvent> {
        self.events.read().clone()
    }

    pub fn event_types(&self) -> Vec<&'static str> {
        self.events
            .read()
            .iter()
            .map(|e| e.payload.event_type())
            .collect()
    }

    pub fn event_count(&self) -> usize {
        self.events.read().len()
    }

    pub fn clear(&self) {
        self.events.write().clear();
    }
}

#[async_trait]
impl EventPublisher for RecordingEventPublisher {
    async fn publish(&self, event: DomainEvent) -> ApplicationResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(ApplicationError::Internal(
                "event subscriber unavailable".to_string(),
            ));
        }
        self.events.write().push(event);
        Ok(())
    }
}

/// QR generator returning `qr:<payload>`
#[derive(Debug, Default)]
pub struct RecordingQrGenerator {
    payloads: RwLock<Vec<String>>,
}

impl RecordingQrGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn payloads(&self) -> Vec<String> {
        self.payloads.read().clone()
    }
}

#[async_trait]
impl QrCodeGenerator for RecordingQrGenerator {
    async fn generate(&self, payload: &str) -> ApplicationResult<String> {
        self.payloads.write().push(payload.to_string());
        Ok(format!("qr:{}", payload))
    }
}

// ============================================================================
// Payment provider
// ============================================================================

/// Payment provider that records requests and decodes JSON webhooks
#[derive(Debug, Default)]
pub struct MockPaymentProvider {
    checkouts: RwLock<Vec<CheckoutRequest>>,
    refunds: RwLock<Vec<RefundRequest>>,
    fail_checkout: AtomicBool,
    sessions: AtomicU64,
}

impl MockPaymentProvider {
    /// The only signature the mock accepts
    pub const SIGNATURE: &'static str = "valid-signature";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_checkout(&self, fail: bool) {
        self.fail_checkout.store(fail, Ordering::SeqCst);
    }

    pub fn checkout_requests(&self) -> Vec<CheckoutRequest> {
        self.checkouts.read().clone()
    }

    pub fn refund_requests(&self) -> Vec<RefundRequest> {
        self.refunds.read().clone()
    }

    /// Encode an event the way [`PaymentProvider::parse_webhook_event`] expects it
    pub fn webhook_payload(event: &PaymentEvent) -> Vec<u8> {
        serde_json::to_vec(event).unwrap_or_default()
    }
}

#[async_trait]
impl PaymentProvider for MockPaymentProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn create_checkout(
        &self,
        request: &CheckoutRequest,
    ) -> ApplicationResult<CheckoutSession> {
        if self.fail_checkout.load(Ordering::SeqCst) {
            return Err(ApplicationError::PaymentProvider(
                "checkout unavailable".to_string(),
            ));
        }
        self.checkouts.write().push(request.clone());
        let n = self.sessions.fetch_add(1, Ordering::SeqCst) + 1;
        let session_id = format!("cs_test_{}", n);
        Ok(CheckoutSession {
            url: format!("https://pay.example.com/{}", session_id),
            session_id,
        })
    }

    async fn create_refund(&self, request: &RefundRequest) -> ApplicationResult<RefundReceipt> {
        let mut refunds = self.refunds.write();
        refunds.push(request.clone());
        Ok(RefundReceipt {
            refund_id: format!("re_test_{}", refunds.len()),
        })
    }

    fn parse_webhook_event(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> ApplicationResult<PaymentEvent> {
        if signature != Self::SIGNATURE {
            return Err(ApplicationError::PaymentProvider(
                "invalid webhook signature".to_string(),
            ));
        }
        serde_json::from_slice(payload)
            .map_err(|e| ApplicationError::PaymentProvider(format!("malformed webhook: {}", e)))
    }
}

// ============================================================================
// Failure injection
// ============================================================================

/// In-memory store that fails one chosen write.
///
/// Counts are 1-based: `fail_ticket_create_at(3)` lets two ticket inserts
/// through and fails the third. Everything already written stays written.
pub struct FailingStore {
    inner: Arc<InMemoryStore>,
    ticket_creates: AtomicUsize,
    item_creates: AtomicUsize,
    fail_ticket_at: Option<usize>,
    fail_item_at: Option<usize>,
}

impl FailingStore {
    pub fn new(inner: Arc<InMemoryStore>) -> Self {
        Self {
            inner,
            ticket_creates: AtomicUsize::new(0),
            item_creates: AtomicUsize::new(0),
            fail_ticket_at: None,
            fail_item_at: None,
        }
    }

    pub fn fail_ticket_create_at(mut self, n: usize) -> Self {
        self.fail_ticket_at = Some(n);
        self
    }

    pub fn fail_item_create_at(mut self, n: usize) -> Self {
        self.fail_item_at = Some(n);
        self
    }

    pub fn inner(&self) -> &Arc<InMemoryStore> {
        &self.inner
    }

    fn injected() -> ApplicationError {
        ApplicationError::Repository("injected failure".to_string())
    }
}

#[async_trait]
impl TicketTypeRepository for FailingStore {
    async fn find_by_id(&self, id: TicketTypeId) -> ApplicationResult<Option<TicketType>> {
        TicketTypeRepository::find_by_id(self.inner.as_ref(), id).await
    }

    async fn find_by_edition(&self, edition_id: EditionId) -> ApplicationResult<Vec<TicketType>> {
        TicketTypeRepository::find_by_edition(self.inner.as_ref(), edition_id).await
    }

    async fn find_active_by_edition(
        &self,
        edition_id: EditionId,
    ) -> ApplicationResult<Vec<TicketType>> {
        self.inner.find_active_by_edition(edition_id).await
    }

    async fn create(&self, ticket_type: NewTicketType) -> ApplicationResult<TicketType> {
        TicketTypeRepository::create(self.inner.as_ref(), ticket_type).await
    }

    async fn update(&self, ticket_type: &TicketType) -> ApplicationResult<TicketType> {
        self.inner.update(ticket_type).await
    }

    async fn delete(&self, id: TicketTypeId) -> ApplicationResult<()> {
        self.inner.delete(id).await
    }

    async fn increment_quantity_sold(
        &self,
        id: TicketTypeId,
        delta: i64,
    ) -> ApplicationResult<TicketType> {
        self.inner.increment_quantity_sold(id, delta).await
    }
}

#[async_trait]
impl OrderRepository for FailingStore {
    async fn find_by_id(&self, id: OrderId) -> ApplicationResult<Option<Order>> {
        OrderRepository::find_by_id(self.inner.as_ref(), id).await
    }

    async fn find_by_edition(&self, edition_id: EditionId) -> ApplicationResult<Vec<Order>> {
        OrderRepository::find_by_edition(self.inner.as_ref(), edition_id).await
    }

    async fn find_by_email(&self, email: &str) -> ApplicationResult<Vec<Order>> {
        self.inner.find_by_email(email).await
    }

    async fn find_by_payment_reference(&self, reference: &str) -> ApplicationResult<Option<Order>> {
        self.inner.find_by_payment_reference(reference).await
    }

    async fn create(&self, order: NewOrder) -> ApplicationResult<Order> {
        OrderRepository::create(self.inner.as_ref(), order).await
    }

    async fn update_status(&self, id: OrderId, status: OrderStatus) -> ApplicationResult<Order> {
        OrderRepository::update_status(self.inner.as_ref(), id, status).await
    }

    async fn update_payment_info(
        &self,
        id: OrderId,
        payment: PaymentInfo,
    ) -> ApplicationResult<Order> {
        self.inner.update_payment_info(id, payment).await
    }

    async fn update_discount(
        &self,
        id: OrderId,
        promo_code_id: Option<PromoCodeId>,
        discount_amount: Amount,
    ) -> ApplicationResult<Order> {
        self.inner
            .update_discount(id, promo_code_id, discount_amount)
            .await
    }

    async fn count_by_edition(&self, edition_id: EditionId) -> ApplicationResult<u64> {
        OrderRepository::count_by_edition(self.inner.as_ref(), edition_id).await
    }
}

#[async_trait]
impl OrderItemRepository for FailingStore {
    async fn find_by_order(&self, order_id: OrderId) -> ApplicationResult<Vec<OrderItem>> {
        OrderItemRepository::find_by_order(self.inner.as_ref(), order_id).await
    }

    async fn create(&self, item: OrderItem) -> ApplicationResult<OrderItem> {
        let n = self.item_creates.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_item_at == Some(n) {
            return Err(Self::injected());
        }
        OrderItemRepository::create(self.inner.as_ref(), item).await
    }
}

#[async_trait]
impl TicketRepository for FailingStore {
    async fn find_by_id(&self, id: TicketId) -> ApplicationResult<Option<Ticket>> {
        TicketRepository::find_by_id(self.inner.as_ref(), id).await
    }

    async fn find_by_order(&self, order_id: OrderId) -> ApplicationResult<Vec<Ticket>> {
        TicketRepository::find_by_order(self.inner.as_ref(), order_id).await
    }

    async fn find_by_edition(&self, edition_id: EditionId) -> ApplicationResult<Vec<Ticket>> {
        TicketRepository::find_by_edition(self.inner.as_ref(), edition_id).await
    }

    async fn find_by_ticket_number(
        &self,
        ticket_number: &str,
    ) -> ApplicationResult<Option<Ticket>> {
        self.inner.find_by_ticket_number(ticket_number).await
    }

    async fn create(&self, ticket: NewTicket) -> ApplicationResult<Ticket> {
        let n = self.ticket_creates.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_ticket_at == Some(n) {
            return Err(Self::injected());
        }
        TicketRepository::create(self.inner.as_ref(), ticket).await
    }

    async fn update_status(&self, id: TicketId, status: TicketStatus) -> ApplicationResult<Ticket> {
        TicketRepository::update_status(self.inner.as_ref(), id, status).await
    }

    async fn check_in(&self, id: TicketId, staff_id: UserId) -> ApplicationResult<Ticket> {
        self.inner.check_in(id, staff_id).await
    }

    async fn count_by_edition(&self, edition_id: EditionId) -> ApplicationResult<u64> {
        TicketRepository::count_by_edition(self.inner.as_ref(), edition_id).await
    }
}

#[async_trait]
impl PromoCodeRepository for FailingStore {
    async fn find_by_id(&self, id: PromoCodeId) -> ApplicationResult<Option<PromoCode>> {
        PromoCodeRepository::find_by_id(self.inner.as_ref(), id).await
    }

    async fn find_by_code(
        &self,
        edition_id: EditionId,
        code: &str,
    ) -> ApplicationResult<Option<PromoCode>> {
        self.inner.find_by_code(edition_id, code).await
    }

    async fn find_by_edition(&self, edition_id: EditionId) -> ApplicationResult<Vec<PromoCode>> {
        PromoCodeRepository::find_by_edition(self.inner.as_ref(), edition_id).await
    }

    async fn create(&self, promo_code: NewPromoCode) -> ApplicationResult<PromoCode> {
        PromoCodeRepository::create(self.inner.as_ref(), promo_code).await
    }

    async fn set_active(&self, id: PromoCodeId, is_active: bool) -> ApplicationResult<PromoCode> {
        self.inner.set_active(id, is_active).await
    }

    async fn increment_usage_count(&self, id: PromoCodeId) -> ApplicationResult<PromoCode> {
        self.inner.increment_usage_count(id).await
    }

    async fn create_usage(
        &self,
        promo_code_id: PromoCodeId,
        order_id: OrderId,
        email: &str,
        discount_amount: Amount,
    ) -> ApplicationResult<PromoCodeUsage> {
        self.inner
            .create_usage(promo_code_id, order_id, email, discount_amount)
            .await
    }

    async fn count_usages_by_email(
        &self,
        promo_code_id: PromoCodeId,
        email: &str,
    ) -> ApplicationResult<u32> {
        self.inner.count_usages_by_email(promo_code_id, email).await
    }

    async fn find_usages(
        &self,
        promo_code_id: PromoCodeId,
    ) -> ApplicationResult<Vec<PromoCodeUsage>> {
        self.inner.find_usages(promo_code_id).await
    }
}
