//! Order Service
//!
//! Create, complete, cancel and refund orders.
//!
//! Inventory is not reserved at creation. `quantity_sold` moves only when an
//! order is completed (+n) or cancelled / refunded (-n), and always through
//! the repository's atomic increment. Two orders racing for the last units can
//! therefore both be created; the completion that loses the race fails with
//! `InsufficientInventory` after the order was already marked paid, leaving a
//! paid order with missing tickets for `StatsService::check_order_consistency`
//! to report.

use super::ServiceContext;
use crate::dto::{
    CompleteOrderResult, CreateOrderInput, CreateOrderResult, OrderDetails, OrderLineInput,
    RefundOrderResult,
};
use crate::validation::Validatable;
use crate::{ApplicationError, ApplicationResult};
use ticketing_domain::money::{line_total, sum_amounts};
use ticketing_domain::{
    Currency, LifecycleEvent, NewOrder, NewTicket, Order, OrderId, OrderItem, OrderStatus,
    TicketId, TicketQrPayload, TicketStatus, TicketType, TicketTypeId,
};
use tracing::{debug, error, info, instrument, warn};

/// Order lifecycle service
#[derive(Clone)]
pub struct OrderService {
    ctx: ServiceContext,
}

impl OrderService {
    pub fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    /// Price a checkout and persist it as a pending order.
    ///
    /// Every ticket type is checked before anything is written, so a rejected
    /// request leaves no trace. Once the order row exists, a failing item write
    /// is returned as is and the order stays behind without all its items.
    #[instrument(skip(self, input), fields(edition_id = %input.edition_id, buyer = %input.buyer_email))]
    pub async fn create_order(&self, input: CreateOrderInput) -> ApplicationResult<CreateOrderResult> {
        input.validate_all().ensure_valid()?;

        let currency = match &input.currency {
            Some(code) => Currency::new(code)?,
            None => self.ctx.config.default_currency.clone(),
        };

        let lines = merge_lines(&input.items)?;
        if let Some(max) = self.ctx.config.max_tickets_per_order {
            let requested: u64 = lines.iter().map(|l| u64::from(l.quantity)).sum();
            if requested > u64::from(max) {
                return Err(ApplicationError::InvalidInput(format!(
                    "An order may contain at most {} tickets, {} requested",
                    max, requested
                )));
            }
        }

        let now = self.ctx.clock.now();
        let mut resolved: Vec<(TicketType, u32)> = Vec::with_capacity(lines.len());
        let mut line_totals = Vec::with_capacity(lines.len());

        for line in &lines {
            let ticket_type = self
                .ctx
                .repositories
                .ticket_types
                .find_by_id(line.ticket_type_id)
                .await?
                .ok_or_else(|| {
                    ApplicationError::NotFound(format!("Ticket type {}", line.ticket_type_id))
                })?;

            if ticket_type.edition_id != input.edition_id {
                return Err(ApplicationError::InvalidInput(format!(
                    "Ticket type '{}' does not belong to edition {}",
                    ticket_type.name, input.edition_id
                )));
            }
            if !ticket_type.is_active {
                return Err(ApplicationError::InvalidState(format!(
                    "Ticket type '{}' is not available",
                    ticket_type.name
                )));
            }
            if !ticket_type.is_within_sale_window(now) {
                return Err(ApplicationError::InvalidState(format!(
                    "Ticket type '{}' is not on sale",
                    ticket_type.name
                )));
            }
            if ticket_type.currency != currency {
                return Err(ApplicationError::InvalidInput(format!(
                    "Ticket type '{}' is priced in {}, order currency is {}",
                    ticket_type.name, ticket_type.currency, currency
                )));
            }

            let remaining = ticket_type.remaining();
            if line.quantity > remaining {
                warn!(
                    ticket_type_id = %ticket_type.id,
                    requested = line.quantity,
                    remaining,
                    "Insufficient inventory"
                );
                return Err(ApplicationError::InsufficientInventory {
                    ticket_type_id: ticket_type.id,
                    requested: line.quantity,
                    remaining,
                });
            }

            line_totals.push(line_total(ticket_type.price, line.quantity)?);
            resolved.push((ticket_type, line.quantity));
        }

        let total_amount = sum_amounts(line_totals)?;
        let order_number = self.ctx.numbers.order_number(now);

        let order = self
            .ctx
            .repositories
            .orders
            .create(NewOrder {
                edition_id: input.edition_id,
                order_number,
                buyer_email: input.buyer_email,
                buyer_first_name: input.buyer_first_name,
                buyer_last_name: input.buyer_last_name,
                total_amount,
                currency: currency.clone(),
            })
            .await?;

        for (ticket_type, quantity) in &resolved {
            let item = OrderItem::from_ticket_type(order.id, ticket_type, *quantity, now)?;
            if let Err(e) = self.ctx.repositories.order_items.create(item).await {
                error!(
                    order_id = %order.id,
                    ticket_type_id = %ticket_type.id,
                    error = %e,
                    "Order item write failed after order was created"
                );
                return Err(e);
            }
        }

        info!(
            order_id = %order.id,
            order_number = %order.order_number,
            total_amount,
            "Order created"
        );

        self.ctx
            .publish(LifecycleEvent::OrderCreated {
                order_id: order.id,
                edition_id: order.edition_id,
                order_number: order.order_number.clone(),
                total_amount,
            })
            .await;

        Ok(CreateOrderResult {
            order_id: order.id,
            order_number: order.order_number,
            total_amount,
            currency,
            is_free: total_amount == 0,
        })
    }

    /// Mark a pending order paid and issue its tickets.
    ///
    /// Steps: flip status, then per item bump the sold counter and mint one
    /// ticket per unit.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn complete_order(&self, order_id: OrderId) -> ApplicationResult<CompleteOrderResult> {
        let order = self.load_order(order_id).await?;
        if order.status != OrderStatus::Pending {
            return Err(ApplicationError::invalid_state(
                format!("Order {}", order.order_number),
                "completed",
                order.status,
            ));
        }

        let repos = &self.ctx.repositories;
        repos.orders.update_status(order_id, OrderStatus::Paid).await?;

        let items = repos.order_items.find_by_order(order_id).await?;
        let mut ticket_ids: Vec<TicketId> = Vec::new();

        for item in &items {
            repos
                .ticket_types
                .increment_quantity_sold(item.ticket_type_id, i64::from(item.quantity))
                .await
                .map_err(|e| {
                    error!(
                        ticket_type_id = %item.ticket_type_id,
                        issued = ticket_ids.len(),
                        error = %e,
                        "Inventory update failed on a paid order"
                    );
                    e
                })?;

            for _ in 0..item.quantity {
                let ticket = self.issue_ticket(&order, item.ticket_type_id).await?;
                ticket_ids.push(ticket);
            }
        }

        info!(tickets = ticket_ids.len(), "Order completed");

        self.ctx
            .publish(LifecycleEvent::OrderPaid {
                order_id,
                edition_id: order.edition_id,
                ticket_ids: ticket_ids.clone(),
            })
            .await;

        Ok(CompleteOrderResult {
            order_id,
            ticket_ids,
        })
    }

    async fn issue_ticket(
        &self,
        order: &Order,
        ticket_type_id: TicketTypeId,
    ) -> ApplicationResult<TicketId> {
        let ticket_number = self.ctx.numbers.ticket_number(self.ctx.clock.now());

        let qr_code = match (&self.ctx.qr_generator, self.ctx.config.qr_codes_enabled) {
            (Some(generator), true) => {
                let payload = TicketQrPayload::new(ticket_number.clone(), order.edition_id)
                    .to_payload_string()
                    .map_err(|e| ApplicationError::Internal(format!("QR payload: {}", e)))?;
                Some(generator.generate(&payload).await?)
            }
            _ => None,
        };

        let ticket = self
            .ctx
            .repositories
            .tickets
            .create(NewTicket {
                order_id: order.id,
                ticket_type_id,
                edition_id: order.edition_id,
                attendee_email: order.buyer_email.clone(),
                attendee_first_name: order.buyer_first_name.clone(),
                attendee_last_name: order.buyer_last_name.clone(),
                ticket_number,
                qr_code,
            })
            .await?;

        debug!(ticket_id = %ticket.id, ticket_number = %ticket.ticket_number, "Ticket issued");
        Ok(ticket.id)
    }

    /// Cancel a pending order.
    ///
    /// Any valid ticket already linked to the order is cancelled and every
    /// item's quantity is given back to inventory, mirroring a refund. A
    /// pending order normally has neither tickets nor sold units, so the
    /// counter decrement saturates at zero.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn cancel_order(&self, order_id: OrderId) -> ApplicationResult<Order> {
        let order = self.load_order(order_id).await?;
        if order.status != OrderStatus::Pending {
            return Err(ApplicationError::invalid_state(
                format!("Order {}", order.order_number),
                "cancelled",
                order.status,
            ));
        }

        let repos = &self.ctx.repositories;
        for ticket in repos.tickets.find_by_order(order_id).await? {
            if ticket.status == TicketStatus::Valid {
                repos
                    .tickets
                    .update_status(ticket.id, TicketStatus::Cancelled)
                    .await?;
            }
        }

        self.release_inventory(order_id).await?;

        let cancelled = repos
            .orders
            .update_status(order_id, OrderStatus::Cancelled)
            .await?;

        info!("Order cancelled");
        self.ctx
            .publish(LifecycleEvent::OrderCancelled {
                order_id,
                edition_id: order.edition_id,
            })
            .await;

        Ok(cancelled)
    }

    /// Refund a paid order: cancel its valid and used tickets, give the
    /// inventory back, mark the order refunded.
    ///
    /// Money movement is the caller's concern (see `PaymentService::refund`).
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn refund_order(&self, order_id: OrderId) -> ApplicationResult<RefundOrderResult> {
        let order = self.load_order(order_id).await?;
        if order.status != OrderStatus::Paid {
            return Err(ApplicationError::invalid_state(
                format!("Order {}", order.order_number),
                "refunded",
                order.status,
            ));
        }

        let repos = &self.ctx.repositories;
        let mut cancelled_ticket_ids = Vec::new();
        for ticket in repos.tickets.find_by_order(order_id).await? {
            if ticket.status.is_cancellable() {
                repos
                    .tickets
                    .update_status(ticket.id, TicketStatus::Cancelled)
                    .await?;
                cancelled_ticket_ids.push(ticket.id);
            }
        }

        self.release_inventory(order_id).await?;

        repos
            .orders
            .update_status(order_id, OrderStatus::Refunded)
            .await?;

        info!(cancelled_tickets = cancelled_ticket_ids.len(), "Order refunded");
        self.ctx
            .publish(LifecycleEvent::OrderRefunded {
                order_id,
                edition_id: order.edition_id,
                cancelled_tickets: cancelled_ticket_ids.len(),
            })
            .await;

        Ok(RefundOrderResult {
            order_id,
            cancelled_ticket_ids,
        })
    }

    async fn release_inventory(&self, order_id: OrderId) -> ApplicationResult<()> {
        let repos = &self.ctx.repositories;
        for item in repos.order_items.find_by_order(order_id).await? {
            repos
                .ticket_types
                .increment_quantity_sold(item.ticket_type_id, -i64::from(item.quantity))
                .await?;
        }
        Ok(())
    }

    /// Get an order
    #[instrument(skip(self))]
    pub async fn get_order(&self, order_id: OrderId) -> ApplicationResult<Option<Order>> {
        self.ctx.repositories.orders.find_by_id(order_id).await
    }

    /// Get an order together with its items and tickets
    #[instrument(skip(self))]
    pub async fn get_order_details(&self, order_id: OrderId) -> ApplicationResult<OrderDetails> {
        let order = self.load_order(order_id).await?;
        let items = self
            .ctx
            .repositories
            .order_items
            .find_by_order(order_id)
            .await?;
        let tickets = self.ctx.repositories.tickets.find_by_order(order_id).await?;
        Ok(OrderDetails {
            order,
            items,
            tickets,
        })
    }

    /// Orders placed with an email address, any edition
    #[instrument(skip(self))]
    pub async fn find_orders_by_email(&self, email: &str) -> ApplicationResult<Vec<Order>> {
        self.ctx.repositories.orders.find_by_email(email).await
    }

    async fn load_order(&self, order_id: OrderId) -> ApplicationResult<Order> {
        self.ctx
            .repositories
            .orders
            .find_by_id(order_id)
            .await?
            .ok_or_else(|| ApplicationError::NotFound(format!("Order {}", order_id)))
    }
}

/// Collapse repeated ticket types into one line each, keeping first-seen order
fn merge_lines(items: &[OrderLineInput]) -> ApplicationResult<Vec<OrderLineInput>> {
    let mut merged: Vec<OrderLineInput> = Vec::with_capacity(items.len());
    for item in items {
        match merged
            .iter_mut()
            .find(|line| line.ticket_type_id == item.ticket_type_id)
        {
            Some(line) => {
                line.quantity = line.quantity.checked_add(item.quantity).ok_or_else(|| {
                    ApplicationError::InvalidInput(format!(
                        "Quantity for ticket type {} is too large",
                        item.ticket_type_id
                    ))
                })?;
            }
            None => merged.push(item.clone()),
        }
    }
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_merge_lines_keeps_first_seen_order() {
        let a = TicketTypeId::new();
        let b = TicketTypeId::new();
        let merged = merge_lines(&[
            OrderLineInput::new(b, 1),
            OrderLineInput::new(a, 2),
            OrderLineInput::new(b, 3),
        ])
        .unwrap();

        assert_eq!(merged, vec![OrderLineInput::new(b, 4), OrderLineInput::new(a, 2)]);
    }

    #[test]
    fn test_merge_lines_overflow() {
        let a = TicketTypeId::new();
        let result = merge_lines(&[OrderLineInput::new(a, u32::MAX), OrderLineInput::new(a, 1)]);
        assert!(matches!(result, Err(ApplicationError::InvalidInput(_))));
    }

    proptest! {
        #[test]
        fn prop_merge_lines_preserves_quantity(
            lines in proptest::collection::vec((0usize..4, 1u32..50), 1..20)
        ) {
            let ids: Vec<TicketTypeId> = (0..4).map(|_| TicketTypeId::new()).collect();
            let items: Vec<OrderLineInput> = lines
                .iter()
                .map(|(idx, qty)| OrderLineInput::new(ids[*idx], *qty))
                .collect();

            let merged = merge_lines(&items).unwrap();
            let before: u32 = items.iter().map(|l| l.quantity).sum();
            let after: u32 = merged.iter().map(|l| l.quantity).sum();
            prop_assert_eq!(before, after);

            for (i, line) in merged.iter().enumerate() {
                prop_assert!(merged[i + 1..]
                    .iter()
                    .all(|other| other.ticket_type_id != line.ticket_type_id));
            }
        }
    }
}
