//! In-memory implementation of every repository port.
//!
//! All collections sit behind one lock, so each method is a single atomic
//! step, the two counter increments included. Used by the test suites and for
//! running the services without a database.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument};

use ticketing_application::ports::{
    OrderItemRepository, OrderRepository, PromoCodeRepository, TicketRepository,
    TicketTypeRepository,
};
use ticketing_application::{ApplicationError, ApplicationResult};
use ticketing_common::{Clock, SystemClock};
use ticketing_domain::{
    Amount, EditionId, NewOrder, NewPromoCode, NewTicket, NewTicketType, Order, OrderId,
    OrderItem, OrderStatus, PaymentInfo, PromoCode, PromoCodeId, PromoCodeUsage,
    PromoCodeUsageId, Ticket, TicketId, TicketStatus, TicketType, TicketTypeId, UserId,
};

#[derive(Default)]
struct State {
    ticket_types: HashMap<TicketTypeId, TicketType>,
    orders: HashMap<OrderId, Order>,
    // Vecs keep insertion order for the by-order listings
    order_items: Vec<OrderItem>,
    tickets: Vec<Ticket>,
    promo_codes: HashMap<PromoCodeId, PromoCode>,
    usages: Vec<PromoCodeUsage>,
}

/// Repository backend holding everything in process memory
pub struct InMemoryStore {
    state: RwLock<State>,
    clock: Arc<dyn Clock>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("InMemoryStore")
            .field("ticket_types", &state.ticket_types.len())
            .field("orders", &state.orders.len())
            .field("tickets", &state.tickets.len())
            .field("promo_codes", &state.promo_codes.len())
            .finish()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Stamp records with `clock` instead of the wall clock
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: RwLock::new(State::default()),
            clock,
        }
    }

    /// Insert a ticket type as is, keeping its id and counters
    pub fn insert_ticket_type(&self, ticket_type: TicketType) {
        self.state
            .write()
            .ticket_types
            .insert(ticket_type.id, ticket_type);
    }

    /// Insert a promo code as is, keeping its id and usage count
    pub fn insert_promo_code(&self, promo_code: PromoCode) {
        self.state
            .write()
            .promo_codes
            .insert(promo_code.id, promo_code);
    }
}

fn not_found(what: &str, id: impl std::fmt::Display) -> ApplicationError {
    ApplicationError::NotFound(format!("{} {}", what, id))
}

#[async_trait]
impl TicketTypeRepository for InMemoryStore {
    async fn find_by_id(&self, id: TicketTypeId) -> ApplicationResult<Option<TicketType>> {
        Ok(self.state.read().ticket_types.get(&id).cloned())
    }

    async fn find_by_edition(&self, edition_id: EditionId) -> ApplicationResult<Vec<TicketType>> {
        let mut found: Vec<TicketType> = self
            .state
            .read()
            .ticket_types
            .values()
            .filter(|tt| tt.edition_id == edition_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| {
            a.display_order
                .cmp(&b.display_order)
                .then(a.created_at.cmp(&b.created_at))
        });
        Ok(found)
    }

    async fn find_active_by_edition(
        &self,
        edition_id: EditionId,
    ) -> ApplicationResult<Vec<TicketType>> {
        let mut found = TicketTypeRepository::find_by_edition(self, edition_id).await?;
        found.retain(|tt| tt.is_active);
        Ok(found)
    }

    #[instrument(skip(self, ticket_type), fields(name = %ticket_type.name))]
    async fn create(&self, ticket_type: NewTicketType) -> ApplicationResult<TicketType> {
        let ticket_type = ticket_type.into_ticket_type(self.clock.now());
        self.state
            .write()
            .ticket_types
            .insert(ticket_type.id, ticket_type.clone());
        debug!(ticket_type_id = %ticket_type.id, "Ticket type stored");
        Ok(ticket_type)
    }

    async fn update(&self, ticket_type: &TicketType) -> ApplicationResult<TicketType> {
        let mut state = self.state.write();
        let stored = state
            .ticket_types
            .get_mut(&ticket_type.id)
            .ok_or_else(|| not_found("Ticket type", ticket_type.id))?;
        if ticket_type.quantity < stored.quantity_sold {
            return Err(ApplicationError::InvalidInput(format!(
                "Capacity {} is below the {} tickets already sold",
                ticket_type.quantity, stored.quantity_sold
            )));
        }
        *stored = TicketType {
            quantity_sold: stored.quantity_sold,
            created_at: stored.created_at,
            updated_at: self.clock.now(),
            ..ticket_type.clone()
        };
        Ok(stored.clone())
    }

    async fn delete(&self, id: TicketTypeId) -> ApplicationResult<()> {
        self.state
            .write()
            .ticket_types
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| not_found("Ticket type", id))
    }

    #[instrument(skip(self), fields(ticket_type_id = %id))]
    async fn increment_quantity_sold(
        &self,
        id: TicketTypeId,
        delta: i64,
    ) -> ApplicationResult<TicketType> {
        let now = self.clock.now();
        let mut state = self.state.write();
        let ticket_type = state
            .ticket_types
            .get_mut(&id)
            .ok_or_else(|| not_found("Ticket type", id))?;

        let sold = i64::from(ticket_type.quantity_sold) + delta;
        if delta > 0 && sold > i64::from(ticket_type.quantity) {
            return Err(ApplicationError::InsufficientInventory {
                ticket_type_id: id,
                requested: u32::try_from(delta).unwrap_or(u32::MAX),
                remaining: ticket_type.remaining(),
            });
        }

        // sold is within [0, quantity] here, so the conversion cannot fail
        ticket_type.quantity_sold = u32::try_from(sold.max(0)).unwrap_or(ticket_type.quantity);
        ticket_type.updated_at = now;
        debug!(quantity_sold = ticket_type.quantity_sold, "Inventory updated");
        Ok(ticket_type.clone())
    }
}

#[async_trait]
impl OrderRepository for InMemoryStore {
    async fn find_by_id(&self, id: OrderId) -> ApplicationResult<Option<Order>> {
        Ok(self.state.read().orders.get(&id).cloned())
    }

    async fn find_by_edition(&self, edition_id: EditionId) -> ApplicationResult<Vec<Order>> {
        let mut found: Vec<Order> = self
            .state
            .read()
            .orders
            .values()
            .filter(|o| o.edition_id == edition_id)
            .cloned()
            .collect();
        found.sort_by_key(|o| o.created_at);
        Ok(found)
    }

    async fn find_by_email(&self, email: &str) -> ApplicationResult<Vec<Order>> {
        let email = email.trim().to_lowercase();
        let mut found: Vec<Order> = self
            .state
            .read()
            .orders
            .values()
            .filter(|o| o.buyer_email.to_lowercase() == email)
            .cloned()
            .collect();
        found.sort_by_key(|o| o.created_at);
        Ok(found)
    }

    async fn find_by_payment_reference(&self, reference: &str) -> ApplicationResult<Option<Order>> {
        Ok(self
            .state
            .read()
            .orders
            .values()
            .find(|o| o.payment_reference.as_deref() == Some(reference))
            .cloned())
    }

    #[instrument(skip(self, order), fields(order_number = %order.order_number))]
    async fn create(&self, order: NewOrder) -> ApplicationResult<Order> {
        let order = order.into_order(self.clock.now());
        let mut state = self.state.write();
        if state
            .orders
            .values()
            .any(|o| o.order_number == order.order_number)
        {
            return Err(ApplicationError::Conflict(format!(
                "Order number {} already exists",
                order.order_number
            )));
        }
        state.orders.insert(order.id, order.clone());
        debug!(order_id = %order.id, "Order stored");
        Ok(order)
    }

    async fn update_status(&self, id: OrderId, status: OrderStatus) -> ApplicationResult<Order> {
        let now = self.clock.now();
        let mut state = self.state.write();
        let order = state
            .orders
            .get_mut(&id)
            .ok_or_else(|| not_found("Order", id))?;
        order.apply_status(status, now);
        debug!(order_id = %id, %status, "Order status stored");
        Ok(order.clone())
    }

    async fn update_payment_info(
        &self,
        id: OrderId,
        payment: PaymentInfo,
    ) -> ApplicationResult<Order> {
        let now = self.clock.now();
        let mut state = self.state.write();
        let order = state
            .orders
            .get_mut(&id)
            .ok_or_else(|| not_found("Order", id))?;
        order.payment_provider = Some(payment.provider);
        order.payment_reference = Some(payment.reference);
        if payment.payment_intent_id.is_some() {
            order.payment_intent_id = payment.payment_intent_id;
        }
        order.updated_at = now;
        Ok(order.clone())
    }

    async fn update_discount(
        &self,
        id: OrderId,
        promo_code_id: Option<PromoCodeId>,
        discount_amount: Amount,
    ) -> ApplicationResult<Order> {
        let now = self.clock.now();
        let mut state = self.state.write();
        let order = state
            .orders
            .get_mut(&id)
            .ok_or_else(|| not_found("Order", id))?;
        order.promo_code_id = promo_code_id;
        order.discount_amount = discount_amount;
        order.updated_at = now;
        Ok(order.clone())
    }

    async fn count_by_edition(&self, edition_id: EditionId) -> ApplicationResult<u64> {
        Ok(self
            .state
            .read()
            .orders
            .values()
            .filter(|o| o.edition_id == edition_id)
            .count() as u64)
    }
}

#[async_trait]
impl OrderItemRepository for InMemoryStore {
    async fn find_by_order(&self, order_id: OrderId) -> ApplicationResult<Vec<OrderItem>> {
        Ok(self
            .state
            .read()
            .order_items
            .iter()
            .filter(|i| i.order_id == order_id)
            .cloned()
            .collect())
    }

    async fn create(&self, item: OrderItem) -> ApplicationResult<OrderItem> {
        let mut state = self.state.write();
        if !state.orders.contains_key(&item.order_id) {
            return Err(not_found("Order", item.order_id));
        }
        state.order_items.push(item.clone());
        Ok(item)
    }
}

#[async_trait]
impl TicketRepository for InMemoryStore {
    async fn find_by_id(&self, id: TicketId) -> ApplicationResult<Option<Ticket>> {
        Ok(self.state.read().tickets.iter().find(|t| t.id == id).cloned())
    }

    async fn find_by_order(&self, order_id: OrderId) -> ApplicationResult<Vec<Ticket>> {
        Ok(self
            .state
            .read()
            .tickets
            .iter()
            .filter(|t| t.order_id == order_id)
            .cloned()
            .collect())
    }

    async fn find_by_edition(&self, edition_id: EditionId) -> ApplicationResult<Vec<Ticket>> {
        Ok(self
            .state
            .read()
            .tickets
            .iter()
            .filter(|t| t.edition_id == edition_id)
            .cloned()
            .collect())
    }

    async fn find_by_ticket_number(
        &self,
        ticket_number: &str,
    ) -> ApplicationResult<Option<Ticket>> {
        Ok(self
            .state
            .read()
            .tickets
            .iter()
            .find(|t| t.ticket_number == ticket_number)
            .cloned())
    }

    async fn create(&self, ticket: NewTicket) -> ApplicationResult<Ticket> {
        let ticket = ticket.into_ticket(self.clock.now());
        let mut state = self.state.write();
        if state
            .tickets
            .iter()
            .any(|t| t.ticket_number == ticket.ticket_number)
        {
            return Err(ApplicationError::Conflict(format!(
                "Ticket number {} already exists",
                ticket.ticket_number
            )));
        }
        state.tickets.push(ticket.clone());
        Ok(ticket)
    }

    async fn update_status(&self, id: TicketId, status: TicketStatus) -> ApplicationResult<Ticket> {
        let now = self.clock.now();
        let mut state = self.state.write();
        let ticket = state
            .tickets
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| not_found("Ticket", id))?;
        ticket.status = status;
        ticket.updated_at = now;
        Ok(ticket.clone())
    }

    async fn check_in(&self, id: TicketId, staff_id: UserId) -> ApplicationResult<Ticket> {
        let now = self.clock.now();
        let mut state = self.state.write();
        let ticket = state
            .tickets
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| not_found("Ticket", id))?;
        ticket.status.transition_to(TicketStatus::Used)?;
        ticket.apply_check_in(staff_id, now);
        Ok(ticket.clone())
    }

    async fn count_by_edition(&self, edition_id: EditionId) -> ApplicationResult<u64> {
        Ok(self
            .state
            .read()
            .tickets
            .iter()
            .filter(|t| t.edition_id == edition_id)
            .count() as u64)
    }
}

#[async_trait]
impl PromoCodeRepository for InMemoryStore {
    async fn find_by_id(&self, id: PromoCodeId) -> ApplicationResult<Option<PromoCode>> {
        Ok(self.state.read().promo_codes.get(&id).cloned())
    }

    async fn find_by_code(
        &self,
        edition_id: EditionId,
        code: &str,
    ) -> ApplicationResult<Option<PromoCode>> {
        Ok(self
            .state
            .read()
            .promo_codes
            .values()
            .find(|p| p.edition_id == edition_id && p.code == code)
            .cloned())
    }

    async fn find_by_edition(&self, edition_id: EditionId) -> ApplicationResult<Vec<PromoCode>> {
        let mut found: Vec<PromoCode> = self
            .state
            .read()
            .promo_codes
            .values()
            .filter(|p| p.edition_id == edition_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(found)
    }

    async fn create(&self, promo_code: NewPromoCode) -> ApplicationResult<PromoCode> {
        let promo_code = promo_code.into_promo_code(self.clock.now());
        let mut state = self.state.write();
        if state
            .promo_codes
            .values()
            .any(|p| p.edition_id == promo_code.edition_id && p.code == promo_code.code)
        {
            return Err(ApplicationError::Conflict(format!(
                "Promo code '{}' already exists",
                promo_code.code
            )));
        }
        state.promo_codes.insert(promo_code.id, promo_code.clone());
        Ok(promo_code)
    }

    async fn set_active(&self, id: PromoCodeId, is_active: bool) -> ApplicationResult<PromoCode> {
        let now = self.clock.now();
        let mut state = self.state.write();
        let promo_code = state
            .promo_codes
            .get_mut(&id)
            .ok_or_else(|| not_found("Promo code", id))?;
        promo_code.is_active = is_active;
        promo_code.updated_at = now;
        Ok(promo_code.clone())
    }

    async fn increment_usage_count(&self, id: PromoCodeId) -> ApplicationResult<PromoCode> {
        let now = self.clock.now();
        let mut state = self.state.write();
        let promo_code = state
            .promo_codes
            .get_mut(&id)
            .ok_or_else(|| not_found("Promo code", id))?;
        promo_code.current_usage_count = promo_code.current_usage_count.saturating_add(1);
        promo_code.updated_at = now;
        Ok(promo_code.clone())
    }

    async fn create_usage(
        &self,
        promo_code_id: PromoCodeId,
        order_id: OrderId,
        email: &str,
        discount_amount: Amount,
    ) -> ApplicationResult<PromoCodeUsage> {
        let usage = PromoCodeUsage {
            id: PromoCodeUsageId::new(),
            promo_code_id,
            order_id,
            email: email.to_string(),
            discount_amount,
            used_at: self.clock.now(),
        };
        let mut state = self.state.write();
        if !state.promo_codes.contains_key(&promo_code_id) {
            return Err(not_found("Promo code", promo_code_id));
        }
        state.usages.push(usage.clone());
        Ok(usage)
    }

    async fn count_usages_by_email(
        &self,
        promo_code_id: PromoCodeId,
        email: &str,
    ) -> ApplicationResult<u32> {
        let email = email.to_lowercase();
        let count = self
            .state
            .read()
            .usages
            .iter()
            .filter(|u| u.promo_code_id == promo_code_id && u.email.to_lowercase() == email)
            .count();
        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }

    async fn find_usages(&self, promo_code_id: PromoCodeId) -> ApplicationResult<Vec<PromoCodeUsage>> {
        Ok(self
            .state
            .read()
            .usages
            .iter()
            .filter(|u| u.promo_code_id == promo_code_id)
            .cloned()
            .collect())
    }
}
