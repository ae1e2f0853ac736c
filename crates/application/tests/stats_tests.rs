//! Edition reporting tests

use ticketing_domain::{OrderStatus, UserId};
use ticketing_testing::{
    OrderInputBuilder, PromoCodeBuilder, TestHarness, TicketTypeBuilder,
};

#[tokio::test]
async fn test_edition_summary() {
    let harness = TestHarness::new();
    let standard = harness.seed_ticket_type(
        TicketTypeBuilder::new(harness.edition_id)
            .with_name("Standard")
            .with_price(5000)
            .with_quantity(100)
            .with_display_order(0)
            .build(),
    );
    let vip = harness.seed_ticket_type(
        TicketTypeBuilder::new(harness.edition_id)
            .with_name("VIP")
            .with_price(20000)
            .with_quantity(10)
            .with_display_order(1)
            .build(),
    );
    harness.seed_promo_code(PromoCodeBuilder::new(harness.edition_id).percentage(10).build());
    let orders = harness.orders();

    let order = |ticket_type_id, quantity, email: &str| {
        OrderInputBuilder::new(harness.edition_id)
            .with_buyer_email(email)
            .with_item(ticket_type_id, quantity)
            .build()
    };

    // cancelled and still pending
    let cancelled = orders
        .create_order(order(standard.id, 1, "linus@example.com"))
        .await
        .unwrap();
    orders.cancel_order(cancelled.order_id).await.unwrap();
    orders
        .create_order(order(vip.id, 3, "barbara@example.com"))
        .await
        .unwrap();

    // paid with a discount: 2 x 5000 - 10%
    let discounted = orders
        .create_order(order(standard.id, 2, "ada@example.com"))
        .await
        .unwrap();
    harness
        .promo_codes()
        .apply_to_order(discounted.order_id, "SAVE20")
        .await
        .unwrap();
    let completed = orders.complete_order(discounted.order_id).await.unwrap();

    // paid then refunded
    let refunded = orders
        .create_order(order(vip.id, 1, "grace@example.com"))
        .await
        .unwrap();
    orders.complete_order(refunded.order_id).await.unwrap();
    orders.refund_order(refunded.order_id).await.unwrap();

    let first_ticket = harness
        .repositories()
        .tickets
        .find_by_id(completed.ticket_ids[0])
        .await
        .unwrap()
        .unwrap();
    harness
        .check_in()
        .check_in_ticket(&first_ticket.ticket_number, UserId::new())
        .await
        .unwrap();

    let summary = harness.stats().edition_summary(harness.edition_id).await.unwrap();
    assert_eq!(summary.orders.pending, 1);
    assert_eq!(summary.orders.paid, 1);
    assert_eq!(summary.orders.cancelled, 1);
    assert_eq!(summary.orders.refunded, 1);
    assert_eq!(summary.orders.total(), 4);

    assert_eq!(summary.gross_revenue, 9000);
    assert_eq!(summary.discount_total, 1000);
    assert_eq!(summary.refunded_amount, 20000);

    assert_eq!(summary.tickets_issued, 3);
    assert_eq!(summary.tickets_checked_in, 1);
    assert_eq!(summary.tickets_cancelled, 1);

    assert_eq!(summary.ticket_types.len(), 2);
    assert_eq!(summary.ticket_types[0].name, "Standard");
    assert_eq!(summary.ticket_types[0].sold, 2);
    assert_eq!(summary.ticket_types[0].remaining, 98);
    assert_eq!(summary.ticket_types[1].sold, 0);
    assert_eq!(summary.ticket_types[1].remaining, 10);
}

#[tokio::test]
async fn test_consistency_of_healthy_orders() {
    let harness = TestHarness::new();
    let tt = harness.seed_ticket_type(TicketTypeBuilder::new(harness.edition_id).build());
    let orders = harness.orders();
    let stats = harness.stats();

    let input = OrderInputBuilder::new(harness.edition_id)
        .with_item(tt.id, 3)
        .build();
    let created = orders.create_order(input).await.unwrap();

    let pending = stats.check_order_consistency(created.order_id).await.unwrap();
    assert_eq!(pending.status, OrderStatus::Pending);
    assert_eq!(pending.expected_tickets, 0);
    assert!(pending.is_consistent());

    orders.complete_order(created.order_id).await.unwrap();
    let paid = stats.check_order_consistency(created.order_id).await.unwrap();
    assert_eq!(paid.expected_tickets, 3);
    assert_eq!(paid.issued_tickets, 3);
    assert!(paid.is_consistent());

    orders.refund_order(created.order_id).await.unwrap();
    let refunded = stats.check_order_consistency(created.order_id).await.unwrap();
    assert_eq!(refunded.uncancelled_tickets, 0);
    assert!(refunded.is_consistent());

    assert!(stats
        .check_order_consistency(ticketing_domain::OrderId::new())
        .await
        .is_err());
}
