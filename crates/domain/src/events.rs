//! Domain events emitted after lifecycle state changes.
//!
//! Notification delivery, CRM tracking and email rendering subscribe to these;
//! the lifecycle itself never waits on a subscriber.

use crate::identifiers::{EditionId, OrderId, PromoCodeId, TicketId, UserId};
use crate::money::Amount;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Event envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainEvent {
    pub id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub payload: LifecycleEvent,
}

impl DomainEvent {
    pub fn new(payload: LifecycleEvent, occurred_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::now_v7(),
            occurred_at,
            payload,
        }
    }
}

/// Order, ticket and promo code lifecycle events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LifecycleEvent {
    OrderCreated {
        order_id: OrderId,
        edition_id: EditionId,
        order_number: String,
        total_amount: Amount,
    },
    OrderPaid {
        order_id: OrderId,
        edition_id: EditionId,
        ticket_ids: Vec<TicketId>,
    },
    OrderCancelled {
        order_id: OrderId,
        edition_id: EditionId,
    },
    OrderRefunded {
        order_id: OrderId,
        edition_id: EditionId,
        cancelled_tickets: usize,
    },
    TicketCheckedIn {
        ticket_id: TicketId,
        edition_id: EditionId,
        staff_id: UserId,
    },
    PromoCodeRedeemed {
        promo_code_id: PromoCodeId,
        order_id: OrderId,
        discount_amount: Amount,
    },
}

impl LifecycleEvent {
    /// Dotted event name used for routing
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::OrderCreated { .. } => "order.created",
            Self::OrderPaid { .. } => "order.paid",
            Self::OrderCancelled { .. } => "order.cancelled",
            Self::OrderRefunded { .. } => "order.refunded",
            Self::TicketCheckedIn { .. } => "ticket.checked_in",
            Self::PromoCodeRedeemed { .. } => "promo_code.redeemed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization_is_tagged() {
        let event = LifecycleEvent::OrderCancelled {
            order_id: OrderId::new(),
            edition_id: EditionId::new(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "order_cancelled");
        assert_eq!(event.event_type(), "order.cancelled");
    }
}
