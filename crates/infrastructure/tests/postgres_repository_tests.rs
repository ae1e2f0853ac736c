//! Integration tests for the PostgreSQL repositories
//!
//! These tests require a PostgreSQL database and are marked with #[ignore] for CI.
//! Run with: DATABASE_URL=... cargo test --test postgres_repository_tests -- --ignored --test-threads=1

use ticketing_application::{ApplicationError, Repositories};
use ticketing_domain::{
    Currency, EditionId, NewOrder, NewTicket, Order, OrderItem, OrderStatus, TicketStatus,
    TicketType, UserId,
};
use ticketing_testing::{database::TestDatabase, create_test_buyer, PromoCodeBuilder, TicketTypeBuilder};

async fn setup() -> (TestDatabase, Repositories) {
    let db = TestDatabase::from_env().await.unwrap();
    db.clean().await.unwrap();
    let repos = db.repositories();
    (db, repos)
}

async fn seed_ticket_type(repos: &Repositories, quantity: u32) -> TicketType {
    repos
        .ticket_types
        .create(
            TicketTypeBuilder::new(EditionId::new())
                .with_quantity(quantity)
                .build_new(),
        )
        .await
        .unwrap()
}

async fn seed_order(repos: &Repositories, edition_id: EditionId, number: &str) -> Order {
    let buyer = create_test_buyer();
    repos
        .orders
        .create(NewOrder {
            edition_id,
            order_number: number.to_string(),
            buyer_email: buyer.email,
            buyer_first_name: buyer.first_name,
            buyer_last_name: buyer.last_name,
            total_amount: 5000,
            currency: Currency::eur(),
        })
        .await
        .unwrap()
}

#[tokio::test]
#[ignore]
async fn test_ticket_type_round_trip() {
    let (_db, repos) = setup().await;
    let created = seed_ticket_type(&repos, 40).await;

    let found = repos.ticket_types.find_by_id(created.id).await.unwrap().unwrap();
    assert_eq!(found.name, created.name);
    assert_eq!(found.currency, created.currency);
    assert_eq!(found.quantity, 40);
    assert_eq!(found.quantity_sold, 0);
}

#[tokio::test]
#[ignore]
async fn test_guarded_increment() {
    let (_db, repos) = setup().await;
    let tt = seed_ticket_type(&repos, 3).await;

    let updated = repos.ticket_types.increment_quantity_sold(tt.id, 3).await.unwrap();
    assert_eq!(updated.quantity_sold, 3);

    let err = repos
        .ticket_types
        .increment_quantity_sold(tt.id, 1)
        .await
        .unwrap_err();
    assert!(matches!(err, ApplicationError::InsufficientInventory { .. }));

    let released = repos.ticket_types.increment_quantity_sold(tt.id, -10).await.unwrap();
    assert_eq!(released.quantity_sold, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore]
async fn test_concurrent_increment_on_last_unit() {
    let (_db, repos) = setup().await;
    let tt = seed_ticket_type(&repos, 1).await;

    let (a, b) = tokio::join!(
        repos.ticket_types.increment_quantity_sold(tt.id, 1),
        repos.ticket_types.increment_quantity_sold(tt.id, 1),
    );
    assert_eq!([a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count(), 1);
}

#[tokio::test]
#[ignore]
async fn test_order_lifecycle_columns() {
    let (_db, repos) = setup().await;
    let tt = seed_ticket_type(&repos, 10).await;
    let order = seed_order(&repos, tt.edition_id, "ORD-PG-1").await;
    assert_eq!(order.status, OrderStatus::Pending);

    let item = OrderItem::from_ticket_type(order.id, &tt, 2, order.created_at).unwrap();
    repos.order_items.create(item).await.unwrap();
    let items = repos.order_items.find_by_order(order.id).await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].total_price, tt.price * 2);

    let paid = repos.orders.update_status(order.id, OrderStatus::Paid).await.unwrap();
    assert!(paid.paid_at.is_some());

    let duplicate = repos
        .orders
        .create(NewOrder {
            edition_id: tt.edition_id,
            order_number: "ORD-PG-1".to_string(),
            buyer_email: "dup@example.com".to_string(),
            buyer_first_name: "Dup".to_string(),
            buyer_last_name: "Licate".to_string(),
            total_amount: 0,
            currency: Currency::eur(),
        })
        .await
        .unwrap_err();
    assert!(matches!(duplicate, ApplicationError::Conflict(_)));
}

#[tokio::test]
#[ignore]
async fn test_conditional_check_in() {
    let (_db, repos) = setup().await;
    let tt = seed_ticket_type(&repos, 10).await;
    let order = seed_order(&repos, tt.edition_id, "ORD-PG-2").await;
    let ticket = repos
        .tickets
        .create(NewTicket {
            order_id: order.id,
            ticket_type_id: tt.id,
            edition_id: tt.edition_id,
            attendee_email: order.buyer_email.clone(),
            attendee_first_name: order.buyer_first_name.clone(),
            attendee_last_name: order.buyer_last_name.clone(),
            ticket_number: "TKT-PG-1".to_string(),
            qr_code: None,
        })
        .await
        .unwrap();

    let staff = UserId::new();
    let used = repos.tickets.check_in(ticket.id, staff).await.unwrap();
    assert_eq!(used.status, TicketStatus::Used);
    assert_eq!(used.checked_in_by, Some(staff));

    let err = repos.tickets.check_in(ticket.id, staff).await.unwrap_err();
    assert!(matches!(err, ApplicationError::InvalidState(_)));
}

#[tokio::test]
#[ignore]
async fn test_promo_code_usage_tracking() {
    let (_db, repos) = setup().await;
    let tt = seed_ticket_type(&repos, 10).await;
    let order = seed_order(&repos, tt.edition_id, "ORD-PG-3").await;
    let promo = repos
        .promo_codes
        .create(
            PromoCodeBuilder::new(tt.edition_id)
                .with_code("launch")
                .restricted_to(vec![tt.id])
                .build_input()
                .into(),
        )
        .await
        .unwrap();

    let found = repos
        .promo_codes
        .find_by_code(tt.edition_id, &promo.code)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.applicable_ticket_type_ids, vec![tt.id]);

    repos
        .promo_codes
        .create_usage(promo.id, order.id, "Buyer@Example.com", 1000)
        .await
        .unwrap();
    let updated = repos.promo_codes.increment_usage_count(promo.id).await.unwrap();
    assert_eq!(updated.current_usage_count, 1);
    assert_eq!(
        repos
            .promo_codes
            .count_usages_by_email(promo.id, "buyer@example.com")
            .await
            .unwrap(),
        1
    );
}
