//! Orders, order lines and the order status machine.

use crate::errors::{DomainError, DomainResult};
use crate::identifiers::{EditionId, OrderId, OrderItemId, PromoCodeId, TicketTypeId};
use crate::money::{line_total, Amount, Currency};
use crate::ticket_type::TicketType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use std::str::FromStr;

/// Order status.
///
/// `pending -> paid -> refunded` and `pending -> cancelled`; every other
/// transition is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Created, awaiting payment
    Pending,
    /// Payment collected, tickets issued
    Paid,
    /// Abandoned before payment
    Cancelled,
    /// Payment returned to the buyer
    Refunded,
}

impl OrderStatus {
    /// All statuses, in lifecycle order
    pub const ALL: [OrderStatus; 4] = [
        OrderStatus::Pending,
        OrderStatus::Paid,
        OrderStatus::Cancelled,
        OrderStatus::Refunded,
    ];

    /// Check if transition to another status is valid
    pub fn can_transition_to(&self, target: OrderStatus) -> bool {
        matches!(
            (self, target),
            (Self::Pending, Self::Paid) | (Self::Pending, Self::Cancelled) | (Self::Paid, Self::Refunded)
        )
    }

    /// Validate a transition, returning the target on success
    pub fn transition_to(self, target: OrderStatus) -> DomainResult<OrderStatus> {
        if self.can_transition_to(target) {
            Ok(target)
        } else {
            Err(DomainError::InvalidOrderTransition {
                from: self,
                to: target,
            })
        }
    }

    /// Whether this status can still be left.
    ///
    /// `paid` counts as terminal for completion and cancellation; the only
    /// way out is a refund.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Refunded)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Cancelled => "cancelled",
            Self::Refunded => "refunded",
        }
    }
}

impl Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            "cancelled" => Ok(Self::Cancelled),
            "refunded" => Ok(Self::Refunded),
            other => Err(DomainError::UnknownStatus {
                kind: "order",
                value: other.to_string(),
            }),
        }
    }
}

/// One checkout transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub edition_id: EditionId,
    /// Human readable, globally unique (`ORD-…`)
    pub order_number: String,
    pub buyer_email: String,
    pub buyer_first_name: String,
    pub buyer_last_name: String,
    pub status: OrderStatus,
    /// Sum of the item totals, fixed at creation
    pub total_amount: Amount,
    /// Promo discount applied before payment, 0 when none
    pub discount_amount: Amount,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub promo_code_id: Option<PromoCodeId>,
    pub currency: Currency,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_provider: Option<String>,
    /// Provider checkout session id used to correlate webhooks
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_intent_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancelled_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refunded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Amount the buyer has to pay after the promo discount
    pub fn amount_due(&self) -> Amount {
        (self.total_amount - self.discount_amount).max(0)
    }

    pub fn is_free(&self) -> bool {
        self.total_amount == 0
    }

    pub fn is_pending(&self) -> bool {
        self.status == OrderStatus::Pending
    }

    pub fn buyer_full_name(&self) -> String {
        format!("{} {}", self.buyer_first_name, self.buyer_last_name)
            .trim()
            .to_string()
    }

    /// Apply a status change to the in-memory record, stamping the timestamp
    /// that belongs to the target status.
    ///
    /// The state machine is not consulted here: storage adapters use this to
    /// persist whatever status the lifecycle decided on.
    pub fn apply_status(&mut self, status: OrderStatus, at: DateTime<Utc>) {
        self.status = status;
        self.updated_at = at;
        match status {
            OrderStatus::Paid => self.paid_at = Some(at),
            OrderStatus::Cancelled => self.cancelled_at = Some(at),
            OrderStatus::Refunded => self.refunded_at = Some(at),
            OrderStatus::Pending => {}
        }
    }
}

/// Fields required to persist a new order
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
    pub edition_id: EditionId,
    pub order_number: String,
    pub buyer_email: String,
    pub buyer_first_name: String,
    pub buyer_last_name: String,
    pub total_amount: Amount,
    pub currency: Currency,
}

impl NewOrder {
    /// Materialize as a pending order
    pub fn into_order(self, now: DateTime<Utc>) -> Order {
        Order {
            id: OrderId::new(),
            edition_id: self.edition_id,
            order_number: self.order_number,
            buyer_email: self.buyer_email,
            buyer_first_name: self.buyer_first_name,
            buyer_last_name: self.buyer_last_name,
            status: OrderStatus::Pending,
            total_amount: self.total_amount,
            discount_amount: 0,
            promo_code_id: None,
            currency: self.currency,
            payment_provider: None,
            payment_reference: None,
            payment_intent_id: None,
            paid_at: None,
            cancelled_at: None,
            refunded_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Payment provider correlation data stored on an order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInfo {
    pub provider: String,
    pub reference: String,
    pub payment_intent_id: Option<String>,
}

/// A priced line of an order.
///
/// The ticket type name and unit price are copied at order time and never
/// refreshed from the catalog afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub ticket_type_id: TicketTypeId,
    pub ticket_type_name: String,
    pub quantity: u32,
    pub unit_price: Amount,
    pub total_price: Amount,
    pub created_at: DateTime<Utc>,
}

impl OrderItem {
    /// Snapshot the catalog entry into an immutable order line
    pub fn from_ticket_type(
        order_id: OrderId,
        ticket_type: &TicketType,
        quantity: u32,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        Ok(Self {
            id: OrderItemId::new(),
            order_id,
            ticket_type_id: ticket_type.id,
            ticket_type_name: ticket_type.name.clone(),
            quantity,
            unit_price: ticket_type.price,
            total_price: line_total(ticket_type.price, quantity)?,
            created_at: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ticket_type::NewTicketType;

    fn pending_order(total: Amount) -> Order {
        NewOrder {
            edition_id: EditionId::new(),
            order_number: "ORD-TEST-0001".to_string(),
            buyer_email: "ada@example.com".to_string(),
            buyer_first_name: "Ada".to_string(),
            buyer_last_name: "Lovelace".to_string(),
            total_amount: total,
            currency: Currency::eur(),
        }
        .into_order(Utc::now())
    }

    #[test]
    fn test_new_order_is_pending() {
        let order = pending_order(10_000);
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.discount_amount, 0);
        assert_eq!(order.amount_due(), 10_000);
        assert!(!order.is_free());
        assert_eq!(order.buyer_full_name(), "Ada Lovelace");
    }

    #[test]
    fn test_amount_due_never_negative() {
        let mut order = pending_order(1_000);
        order.discount_amount = 5_000;
        assert_eq!(order.amount_due(), 0);
    }

    #[test]
    fn test_apply_status_stamps_timestamps() {
        let mut order = pending_order(0);
        assert!(order.is_free());
        let at = Utc::now();

        order.apply_status(OrderStatus::Paid, at);
        assert_eq!(order.paid_at, Some(at));
        assert!(order.cancelled_at.is_none());

        order.apply_status(OrderStatus::Refunded, at);
        assert_eq!(order.refunded_at, Some(at));
    }

    #[test]
    fn test_status_parse_round_trip() {
        for status in OrderStatus::ALL {
            assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), status);
        }
        assert!("shipped".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn test_order_item_snapshot() {
        let tt = NewTicketType {
            edition_id: EditionId::new(),
            name: "VIP".to_string(),
            description: None,
            price: 12_500,
            currency: Currency::eur(),
            quantity: 20,
            sales_start: None,
            sales_end: None,
            is_active: true,
            display_order: 1,
        }
        .into_ticket_type(Utc::now());

        let order_id = OrderId::new();
        let item = OrderItem::from_ticket_type(order_id, &tt, 3, Utc::now()).unwrap();
        assert_eq!(item.order_id, order_id);
        assert_eq!(item.ticket_type_name, "VIP");
        assert_eq!(item.unit_price, 12_500);
        assert_eq!(item.total_price, 37_500);
    }
}
