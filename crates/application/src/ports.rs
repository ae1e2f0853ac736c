//! Ports the lifecycle services depend on.
//!
//! Repositories offer single-record reads and writes only; no operation here
//! spans several records atomically. The two counter updates
//! ([`TicketTypeRepository::increment_quantity_sold`] and
//! [`PromoCodeRepository::increment_usage_count`]) are the exception: each must
//! be applied atomically by the implementation.

use crate::{ApplicationError, ApplicationResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use ticketing_domain::{
    Amount, Currency, DomainEvent, EditionId, NewOrder, NewPromoCode, NewTicket, NewTicketType,
    Order, OrderId, OrderItem, OrderStatus, PaymentInfo, PromoCode, PromoCodeId, PromoCodeUsage,
    Ticket, TicketId, TicketStatus, TicketType, TicketTypeId, UserId,
};

// ============================================================================
// Repositories
// ============================================================================

#[async_trait]
pub trait TicketTypeRepository: Send + Sync {
    async fn find_by_id(&self, id: TicketTypeId) -> ApplicationResult<Option<TicketType>>;

    /// All ticket types of an edition ordered by display order
    async fn find_by_edition(&self, edition_id: EditionId) -> ApplicationResult<Vec<TicketType>>;

    async fn find_active_by_edition(
        &self,
        edition_id: EditionId,
    ) -> ApplicationResult<Vec<TicketType>>;

    async fn create(&self, ticket_type: NewTicketType) -> ApplicationResult<TicketType>;

    /// Overwrite catalog fields; `quantity_sold` is left untouched
    async fn update(&self, ticket_type: &TicketType) -> ApplicationResult<TicketType>;

    async fn delete(&self, id: TicketTypeId) -> ApplicationResult<()>;

    /// Atomically add `delta` to `quantity_sold`.
    ///
    /// A positive delta that would push the counter past `quantity` fails with
    /// [`ApplicationError::InsufficientInventory`] and changes nothing. A
    /// negative delta saturates at zero.
    async fn increment_quantity_sold(
        &self,
        id: TicketTypeId,
        delta: i64,
    ) -> ApplicationResult<TicketType>;
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn find_by_id(&self, id: OrderId) -> ApplicationResult<Option<Order>>;
    async fn find_by_edition(&self, edition_id: EditionId) -> ApplicationResult<Vec<Order>>;
    /// Case-insensitive buyer email match
    async fn find_by_email(&self, email: &str) -> ApplicationResult<Vec<Order>>;
    async fn find_by_payment_reference(&self, reference: &str) -> ApplicationResult<Option<Order>>;
    async fn create(&self, order: NewOrder) -> ApplicationResult<Order>;

    /// Unconditional status write stamping the matching timestamp
    async fn update_status(&self, id: OrderId, status: OrderStatus) -> ApplicationResult<Order>;

    async fn update_payment_info(
        &self,
        id: OrderId,
        payment: PaymentInfo,
    ) -> ApplicationResult<Order>;

    async fn update_discount(
        &self,
        id: OrderId,
        promo_code_id: Option<PromoCodeId>,
        discount_amount: Amount,
    ) -> ApplicationResult<Order>;

    async fn count_by_edition(&self, edition_id: EditionId) -> ApplicationResult<u64>;
}

#[async_trait]
pub trait OrderItemRepository: Send + Sync {
    /// Items in creation order
    async fn find_by_order(&self, order_id: OrderId) -> ApplicationResult<Vec<OrderItem>>;
    async fn create(&self, item: OrderItem) -> ApplicationResult<OrderItem>;
}

#[async_trait]
pub trait TicketRepository: Send + Sync {
    async fn find_by_id(&self, id: TicketId) -> ApplicationResult<Option<Ticket>>;
    async fn find_by_order(&self, order_id: OrderId) -> ApplicationResult<Vec<Ticket>>;
    async fn find_by_edition(&self, edition_id: EditionId) -> ApplicationResult<Vec<Ticket>>;
    async fn find_by_ticket_number(&self, ticket_number: &str)
        -> ApplicationResult<Option<Ticket>>;

    /// Fails with [`ApplicationError::Conflict`] on a duplicate ticket number
    async fn create(&self, ticket: NewTicket) -> ApplicationResult<Ticket>;

    async fn update_status(&self, id: TicketId, status: TicketStatus) -> ApplicationResult<Ticket>;

    /// Mark used, stamping check-in time and staff member
    async fn check_in(&self, id: TicketId, staff_id: UserId) -> ApplicationResult<Ticket>;

    async fn count_by_edition(&self, edition_id: EditionId) -> ApplicationResult<u64>;
}

#[async_trait]
pub trait PromoCodeRepository: Send + Sync {
    async fn find_by_id(&self, id: PromoCodeId) -> ApplicationResult<Option<PromoCode>>;

    /// Lookup by normalized code within an edition
    async fn find_by_code(
        &self,
        edition_id: EditionId,
        code: &str,
    ) -> ApplicationResult<Option<PromoCode>>;

    async fn find_by_edition(&self, edition_id: EditionId) -> ApplicationResult<Vec<PromoCode>>;

    /// Fails with [`ApplicationError::Conflict`] when the code already exists
    /// in the edition
    async fn create(&self, promo_code: NewPromoCode) -> ApplicationResult<PromoCode>;

    async fn set_active(&self, id: PromoCodeId, is_active: bool) -> ApplicationResult<PromoCode>;

    /// Atomically add one to `current_usage_count`
    async fn increment_usage_count(&self, id: PromoCodeId) -> ApplicationResult<PromoCode>;

    async fn create_usage(
        &self,
        promo_code_id: PromoCodeId,
        order_id: OrderId,
        email: &str,
        discount_amount: Amount,
    ) -> ApplicationResult<PromoCodeUsage>;

    /// Redemptions of a code by one buyer, email compared case-insensitively
    async fn count_usages_by_email(
        &self,
        promo_code_id: PromoCodeId,
        email: &str,
    ) -> ApplicationResult<u32>;

    async fn find_usages(&self, promo_code_id: PromoCodeId)
        -> ApplicationResult<Vec<PromoCodeUsage>>;
}

// ============================================================================
// Collaborators
// ============================================================================

/// Renders a QR code image (as a data URL or storage key) from a payload
#[async_trait]
pub trait QrCodeGenerator: Send + Sync {
    async fn generate(&self, payload: &str) -> ApplicationResult<String>;
}

/// Checkout parameters sent to the payment provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub order_id: OrderId,
    pub order_number: String,
    pub amount: Amount,
    pub currency: Currency,
    pub buyer_email: String,
    pub success_url: String,
    pub cancel_url: String,
}

/// Hosted checkout created by the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSession {
    /// Provider session id, stored as the order's payment reference
    pub session_id: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundRequest {
    pub payment_reference: String,
    pub payment_intent_id: Option<String>,
    pub amount: Amount,
    pub currency: Currency,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundReceipt {
    pub refund_id: String,
}

/// Provider notification decoded from a webhook delivery
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PaymentEvent {
    CheckoutCompleted {
        payment_reference: String,
        payment_intent_id: Option<String>,
    },
    RefundSucceeded {
        payment_reference: String,
    },
    /// Anything the lifecycle does not react to
    Other { event_type: String },
}

#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Short provider name stored on orders
    fn name(&self) -> &str;

    async fn create_checkout(&self, request: &CheckoutRequest)
        -> ApplicationResult<CheckoutSession>;

    async fn create_refund(&self, request: &RefundRequest) -> ApplicationResult<RefundReceipt>;

    /// Verify the signature and decode the event
    fn parse_webhook_event(&self, payload: &[u8], signature: &str)
        -> ApplicationResult<PaymentEvent>;
}

/// Event publisher for lifecycle events
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: DomainEvent) -> Result<(), ApplicationError>;
}

/// Event publisher that drops everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpEventPublisher;

#[async_trait]
impl EventPublisher for NoOpEventPublisher {
    async fn publish(&self, _event: DomainEvent) -> Result<(), ApplicationError> {
        Ok(())
    }
}
