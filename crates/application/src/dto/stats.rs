//! Reporting DTOs

use serde::{Deserialize, Serialize};
use ticketing_domain::{Amount, EditionId, OrderId, OrderStatus, TicketTypeId};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCounts {
    pub pending: u64,
    pub paid: u64,
    pub cancelled: u64,
    pub refunded: u64,
}

impl OrderCounts {
    pub fn total(&self) -> u64 {
        self.pending + self.paid + self.cancelled + self.refunded
    }

    pub(crate) fn record(&mut self, status: OrderStatus) {
        match status {
            OrderStatus::Pending => self.pending += 1,
            OrderStatus::Paid => self.paid += 1,
            OrderStatus::Cancelled => self.cancelled += 1,
            OrderStatus::Refunded => self.refunded += 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketTypeAvailability {
    pub ticket_type_id: TicketTypeId,
    pub name: String,
    pub quantity: u32,
    pub sold: u32,
    pub remaining: u32,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditionSummary {
    pub edition_id: EditionId,
    pub orders: OrderCounts,
    /// Amount collected on paid orders, after discounts
    pub gross_revenue: Amount,
    pub refunded_amount: Amount,
    pub discount_total: Amount,
    pub tickets_issued: u64,
    pub tickets_checked_in: u64,
    pub tickets_cancelled: u64,
    pub ticket_types: Vec<TicketTypeAvailability>,
}

/// Ticket count of an order compared to what its items call for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderConsistency {
    pub order_id: OrderId,
    pub status: OrderStatus,
    pub expected_tickets: u64,
    pub issued_tickets: u64,
    pub missing_tickets: u64,
    /// Tickets that should have been cancelled but are still valid or used
    pub uncancelled_tickets: u64,
}

impl OrderConsistency {
    pub fn is_consistent(&self) -> bool {
        let over_issued = matches!(self.status, OrderStatus::Paid | OrderStatus::Refunded)
            && self.issued_tickets > self.expected_tickets;
        self.missing_tickets == 0 && self.uncancelled_tickets == 0 && !over_issued
    }
}
