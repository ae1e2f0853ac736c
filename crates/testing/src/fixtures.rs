//! Test fixtures for generating domain entities with realistic data.
//!
//! Randomized where the value does not matter to the test; use the builders
//! when it does.

use chrono::Utc;
use fake::{
    faker::{
        internet::en::SafeEmail,
        lorem::en::Word,
        name::en::{FirstName, LastName},
    },
    Fake,
};
use ticketing_application::dto::CreateOrderInput;
use ticketing_domain::{
    EditionId, NewOrder, Order, PromoCode, TicketType, TicketTypeId,
};

use crate::builders::{OrderInputBuilder, PromoCodeBuilder, TicketTypeBuilder};

/// A buyer with a fake name and address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestBuyer {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

pub fn create_test_buyer() -> TestBuyer {
    TestBuyer {
        email: SafeEmail().fake(),
        first_name: FirstName().fake(),
        last_name: LastName().fake(),
    }
}

/// On-sale ticket type with a random name, price and capacity
pub fn create_test_ticket_type(edition_id: EditionId) -> TicketType {
    let word: String = Word().fake();
    TicketTypeBuilder::new(edition_id)
        .with_name(format!("{} Pass", word))
        .with_price((10..500).fake::<i64>() * 100)
        .with_quantity((10..1000).fake::<u32>())
        .build()
}

/// Checkout request for `quantity` tickets of one type by a random buyer
pub fn create_test_order_input(
    edition_id: EditionId,
    ticket_type_id: TicketTypeId,
    quantity: u32,
) -> CreateOrderInput {
    let buyer = create_test_buyer();
    OrderInputBuilder::new(edition_id)
        .with_buyer_email(buyer.email)
        .with_buyer_name(buyer.first_name, buyer.last_name)
        .with_item(ticket_type_id, quantity)
        .build()
}

/// Pending order record, not tied to any stored ticket type
pub fn create_test_order(edition_id: EditionId) -> Order {
    let buyer = create_test_buyer();
    NewOrder {
        edition_id,
        order_number: format!("ORD-{}", (1000..9999).fake::<u32>()),
        buyer_email: buyer.email,
        buyer_first_name: buyer.first_name,
        buyer_last_name: buyer.last_name,
        total_amount: (1..100).fake::<i64>() * 1000,
        currency: ticketing_domain::Currency::eur(),
    }
    .into_order(Utc::now())
}

/// Active percentage code with a random uppercase name
pub fn create_test_promo_code(edition_id: EditionId) -> PromoCode {
    let word: String = Word().fake();
    PromoCodeBuilder::new(edition_id)
        .with_code(format!("{}{}", word, (10..99).fake::<u32>()))
        .percentage((5..50).fake::<i64>())
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ticketing_domain::OrderStatus;

    #[test]
    fn test_ticket_type_fixture_is_on_sale() {
        let ticket_type = create_test_ticket_type(EditionId::new());
        assert!(ticket_type.is_on_sale(Utc::now()));
        assert!(ticket_type.price > 0);
        assert_eq!(ticket_type.quantity_sold, 0);
    }

    #[test]
    fn test_order_fixture_is_pending() {
        let order = create_test_order(EditionId::new());
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.discount_amount, 0);
        assert!(order.buyer_email.contains('@'));
    }

    #[test]
    fn test_promo_code_fixture_is_normalized() {
        let promo = create_test_promo_code(EditionId::new());
        assert_eq!(promo.code, promo.code.to_uppercase());
        assert!(promo.discount_value >= 5 && promo.discount_value < 50);
    }

    #[test]
    fn test_order_input_fixture_validates() {
        use ticketing_application::validation::Validatable;

        let input = create_test_order_input(EditionId::new(), TicketTypeId::new(), 2);
        assert!(input.validate_all().valid);
        assert_eq!(input.items.len(), 1);
    }
}
