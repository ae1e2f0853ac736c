//! Order lifecycle DTOs

use crate::validation::{Validatable, ValidationResult, ValidatorExt};
use serde::{Deserialize, Serialize};
use ticketing_domain::{
    Amount, Currency, EditionId, Order, OrderId, OrderItem, Ticket, TicketId, TicketTypeId,
};
use validator::Validate;

/// One requested line of a checkout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineInput {
    pub ticket_type_id: TicketTypeId,
    pub quantity: u32,
}

impl OrderLineInput {
    pub fn new(ticket_type_id: TicketTypeId, quantity: u32) -> Self {
        Self {
            ticket_type_id,
            quantity,
        }
    }
}

/// Checkout request
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderInput {
    pub edition_id: EditionId,
    #[validate(email(message = "must be a valid email address"))]
    pub buyer_email: String,
    #[validate(length(min = 1, max = 100, message = "must be 1-100 characters"))]
    pub buyer_first_name: String,
    #[validate(length(min = 1, max = 100, message = "must be 1-100 characters"))]
    pub buyer_last_name: String,
    /// Falls back to the configured default currency
    #[serde(default)]
    pub currency: Option<String>,
    #[validate(length(min = 1, message = "at least one item is required"))]
    pub items: Vec<OrderLineInput>,
}

impl Validatable for CreateOrderInput {
    fn validate_all(&self) -> ValidationResult {
        let mut result = self.to_validation_result();

        for (index, line) in self.items.iter().enumerate() {
            if line.quantity == 0 {
                result.add_field_error(format!("items[{}].quantity", index), "must be at least 1");
            }
        }

        if let Some(currency) = &self.currency {
            if Currency::new(currency).is_err() {
                result.add_field_error("currency", "must be a three-letter currency code");
            }
        }

        result
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderResult {
    pub order_id: OrderId,
    pub order_number: String,
    pub total_amount: Amount,
    pub currency: Currency,
    pub is_free: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteOrderResult {
    pub order_id: OrderId,
    pub ticket_ids: Vec<TicketId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundOrderResult {
    pub order_id: OrderId,
    pub cancelled_ticket_ids: Vec<TicketId>,
}

/// An order with its lines and tickets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetails {
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub tickets: Vec<Ticket>,
}
