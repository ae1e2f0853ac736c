//! Individually redeemable tickets and their status machine.

use crate::errors::{DomainError, DomainResult};
use crate::identifiers::{EditionId, OrderId, TicketId, TicketTypeId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use std::str::FromStr;

/// Ticket status.
///
/// `valid -> used` on check-in, `valid | used -> cancelled` when the order is
/// cancelled or refunded. `cancelled` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    Valid,
    Used,
    Cancelled,
}

impl TicketStatus {
    pub const ALL: [TicketStatus; 3] = [TicketStatus::Valid, TicketStatus::Used, TicketStatus::Cancelled];

    /// Check if transition to another status is valid
    pub fn can_transition_to(&self, target: TicketStatus) -> bool {
        matches!(
            (self, target),
            (Self::Valid, Self::Used) | (Self::Valid, Self::Cancelled) | (Self::Used, Self::Cancelled)
        )
    }

    /// Validate a transition, returning the target on success
    pub fn transition_to(self, target: TicketStatus) -> DomainResult<TicketStatus> {
        if self.can_transition_to(target) {
            Ok(target)
        } else {
            Err(DomainError::InvalidTicketTransition {
                from: self,
                to: target,
            })
        }
    }

    /// Whether a refund should cancel a ticket in this status
    pub fn is_cancellable(&self) -> bool {
        self.can_transition_to(Self::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Valid => "valid",
            Self::Used => "used",
            Self::Cancelled => "cancelled",
        }
    }
}

impl Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TicketStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "valid" => Ok(Self::Valid),
            "used" => Ok(Self::Used),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(DomainError::UnknownStatus {
                kind: "ticket",
                value: other.to_string(),
            }),
        }
    }
}

/// One admission unit minted from a paid order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub id: TicketId,
    pub order_id: OrderId,
    pub ticket_type_id: TicketTypeId,
    pub edition_id: EditionId,
    pub attendee_email: String,
    pub attendee_first_name: String,
    pub attendee_last_name: String,
    /// Globally unique (`TKT-…`)
    pub ticket_number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qr_code: Option<String>,
    pub status: TicketStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checked_in_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checked_in_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Ticket {
    pub fn is_valid(&self) -> bool {
        self.status == TicketStatus::Valid
    }

    /// Mark as used by `staff_id` at `at`
    pub fn apply_check_in(&mut self, staff_id: UserId, at: DateTime<Utc>) {
        self.status = TicketStatus::Used;
        self.checked_in_at = Some(at);
        self.checked_in_by = Some(staff_id);
        self.updated_at = at;
    }
}

/// Fields required to persist a new ticket
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTicket {
    pub order_id: OrderId,
    pub ticket_type_id: TicketTypeId,
    pub edition_id: EditionId,
    pub attendee_email: String,
    pub attendee_first_name: String,
    pub attendee_last_name: String,
    pub ticket_number: String,
    pub qr_code: Option<String>,
}

impl NewTicket {
    /// Materialize as a valid ticket
    pub fn into_ticket(self, now: DateTime<Utc>) -> Ticket {
        Ticket {
            id: TicketId::new(),
            order_id: self.order_id,
            ticket_type_id: self.ticket_type_id,
            edition_id: self.edition_id,
            attendee_email: self.attendee_email,
            attendee_first_name: self.attendee_first_name,
            attendee_last_name: self.attendee_last_name,
            ticket_number: self.ticket_number,
            qr_code: self.qr_code,
            status: TicketStatus::Valid,
            checked_in_at: None,
            checked_in_by: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Content encoded into a ticket's QR code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketQrPayload {
    pub ticket_number: String,
    pub edition_id: EditionId,
}

impl TicketQrPayload {
    pub fn new(ticket_number: impl Into<String>, edition_id: EditionId) -> Self {
        Self {
            ticket_number: ticket_number.into(),
            edition_id,
        }
    }

    /// JSON text handed to the QR generator
    pub fn to_payload_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parse() {
        for status in TicketStatus::ALL {
            assert_eq!(status.to_string().parse::<TicketStatus>().unwrap(), status);
        }
        assert!("lost".parse::<TicketStatus>().is_err());
    }

    #[test]
    fn test_check_in_stamps_staff_and_time() {
        let mut ticket = NewTicket {
            order_id: OrderId::new(),
            ticket_type_id: TicketTypeId::new(),
            edition_id: EditionId::new(),
            attendee_email: "grace@example.com".to_string(),
            attendee_first_name: "Grace".to_string(),
            attendee_last_name: "Hopper".to_string(),
            ticket_number: "TKT-ABC-123456".to_string(),
            qr_code: None,
        }
        .into_ticket(Utc::now());
        assert!(ticket.is_valid());

        let staff = UserId::new();
        let at = Utc::now();
        ticket.apply_check_in(staff, at);
        assert_eq!(ticket.status, TicketStatus::Used);
        assert_eq!(ticket.checked_in_at, Some(at));
        assert_eq!(ticket.checked_in_by, Some(staff));
    }

    #[test]
    fn test_qr_payload_shape() {
        let edition = EditionId::new();
        let payload = TicketQrPayload::new("TKT-1-ABCDEF", edition)
            .to_payload_string()
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&payload).unwrap();
        assert_eq!(value["ticketNumber"], "TKT-1-ABCDEF");
        assert_eq!(value["editionId"], edition.to_string());
    }
}
