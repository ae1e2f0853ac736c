//! Stats Service
//!
//! Read-only reporting for organizers.

use super::ServiceContext;
use crate::dto::{EditionSummary, OrderConsistency, OrderCounts, TicketTypeAvailability};
use crate::{ApplicationError, ApplicationResult};
use ticketing_domain::{EditionId, OrderId, OrderStatus, TicketStatus};
use tracing::{instrument, warn};

#[derive(Clone)]
pub struct StatsService {
    ctx: ServiceContext,
}

impl StatsService {
    pub fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    /// Sales, attendance and availability of an edition
    #[instrument(skip(self))]
    pub async fn edition_summary(&self, edition_id: EditionId) -> ApplicationResult<EditionSummary> {
        let repos = &self.ctx.repositories;

        let mut orders = OrderCounts::default();
        let mut gross_revenue: i64 = 0;
        let mut refunded_amount: i64 = 0;
        let mut discount_total: i64 = 0;
        for order in repos.orders.find_by_edition(edition_id).await? {
            orders.record(order.status);
            match order.status {
                OrderStatus::Paid => {
                    gross_revenue = gross_revenue.saturating_add(order.amount_due());
                    discount_total = discount_total.saturating_add(order.discount_amount);
                }
                OrderStatus::Refunded => {
                    refunded_amount = refunded_amount.saturating_add(order.amount_due());
                }
                OrderStatus::Pending | OrderStatus::Cancelled => {}
            }
        }

        let tickets = repos.tickets.find_by_edition(edition_id).await?;
        let tickets_checked_in = tickets
            .iter()
            .filter(|t| t.checked_in_at.is_some())
            .count() as u64;
        let tickets_cancelled = tickets
            .iter()
            .filter(|t| t.status == TicketStatus::Cancelled)
            .count() as u64;

        let ticket_types = repos
            .ticket_types
            .find_by_edition(edition_id)
            .await?
            .into_iter()
            .map(|tt| TicketTypeAvailability {
                ticket_type_id: tt.id,
                remaining: tt.remaining(),
                name: tt.name,
                quantity: tt.quantity,
                sold: tt.quantity_sold,
                is_active: tt.is_active,
            })
            .collect();

        Ok(EditionSummary {
            edition_id,
            orders,
            gross_revenue,
            refunded_amount,
            discount_total,
            tickets_issued: tickets.len() as u64,
            tickets_checked_in,
            tickets_cancelled,
            ticket_types,
        })
    }

    /// Compare the tickets of an order with what its items call for.
    ///
    /// Paid and refunded orders should carry one ticket per unit; cancelled and
    /// refunded orders should have none left valid or used.
    #[instrument(skip(self))]
    pub async fn check_order_consistency(
        &self,
        order_id: OrderId,
    ) -> ApplicationResult<OrderConsistency> {
        let repos = &self.ctx.repositories;
        let order = repos
            .orders
            .find_by_id(order_id)
            .await?
            .ok_or_else(|| ApplicationError::NotFound(format!("Order {}", order_id)))?;

        let items = repos.order_items.find_by_order(order_id).await?;
        let tickets = repos.tickets.find_by_order(order_id).await?;

        let expected_tickets = match order.status {
            OrderStatus::Paid | OrderStatus::Refunded => {
                items.iter().map(|i| u64::from(i.quantity)).sum()
            }
            OrderStatus::Pending | OrderStatus::Cancelled => 0,
        };
        let issued_tickets = tickets.len() as u64;
        let uncancelled_tickets = match order.status {
            OrderStatus::Cancelled | OrderStatus::Refunded => tickets
                .iter()
                .filter(|t| t.status != TicketStatus::Cancelled)
                .count() as u64,
            OrderStatus::Pending | OrderStatus::Paid => 0,
        };

        let report = OrderConsistency {
            order_id,
            status: order.status,
            expected_tickets,
            issued_tickets,
            missing_tickets: expected_tickets.saturating_sub(issued_tickets),
            uncancelled_tickets,
        };

        if !report.is_consistent() {
            warn!(
                order_id = %order_id,
                status = %order.status,
                expected = report.expected_tickets,
                issued = report.issued_tickets,
                uncancelled = report.uncancelled_tickets,
                "Order tickets out of line with its items"
            );
        }
        Ok(report)
    }
}
