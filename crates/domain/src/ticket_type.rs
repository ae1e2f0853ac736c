//! Ticket types: the sellable, capacity-limited categories of an edition.

use crate::identifiers::{EditionId, TicketTypeId};
use crate::money::{Amount, Currency};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A purchasable ticket category with its own price and inventory cap.
///
/// `quantity_sold` is only ever moved by the order lifecycle: completion adds
/// the purchased quantity, cancellation and refund take it back. Between two
/// completed lifecycle operations `0 <= quantity_sold <= quantity` holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketType {
    pub id: TicketTypeId,
    pub edition_id: EditionId,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Unit price in minor currency units
    pub price: Amount,
    pub currency: Currency,
    /// Total capacity
    pub quantity: u32,
    pub quantity_sold: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sales_start: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sales_end: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub display_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TicketType {
    /// Units still available for sale
    pub fn remaining(&self) -> u32 {
        self.quantity.saturating_sub(self.quantity_sold)
    }

    pub fn is_sold_out(&self) -> bool {
        self.remaining() == 0
    }

    /// Whether `now` falls inside the optional sale window
    pub fn is_within_sale_window(&self, now: DateTime<Utc>) -> bool {
        let started = self.sales_start.map_or(true, |start| now >= start);
        let not_ended = self.sales_end.map_or(true, |end| now <= end);
        started && not_ended
    }

    /// Active and inside its sale window
    pub fn is_on_sale(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.is_within_sale_window(now)
    }

    /// Whether `requested` units fit in the remaining capacity
    pub fn can_fulfil(&self, requested: u32) -> bool {
        requested <= self.remaining()
    }
}

/// Fields required to create a ticket type
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTicketType {
    pub edition_id: EditionId,
    pub name: String,
    pub description: Option<String>,
    pub price: Amount,
    pub currency: Currency,
    pub quantity: u32,
    pub sales_start: Option<DateTime<Utc>>,
    pub sales_end: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub display_order: i32,
}

impl NewTicketType {
    /// Materialize the record with a fresh id and zero sold units
    pub fn into_ticket_type(self, now: DateTime<Utc>) -> TicketType {
        TicketType {
            id: TicketTypeId::new(),
            edition_id: self.edition_id,
            name: self.name,
            description: self.description,
            price: self.price,
            currency: self.currency,
            quantity: self.quantity,
            quantity_sold: 0,
            sales_start: self.sales_start,
            sales_end: self.sales_end,
            is_active: self.is_active,
            display_order: self.display_order,
            created_at: now,
            updated_at: now,
        }
    }
}
