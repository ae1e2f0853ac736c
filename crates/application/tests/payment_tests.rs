//! Payment flow tests against the recording payment provider

use std::sync::Arc;

use ticketing_application::dto::{CheckoutOutcome, CheckoutUrls, WebhookOutcome};
use ticketing_application::ports::PaymentEvent;
use ticketing_application::{ApplicationError, PaymentService};
use ticketing_domain::{OrderId, OrderStatus, TicketStatus, TicketType};
use ticketing_testing::{
    MockPaymentProvider, OrderInputBuilder, PromoCodeBuilder, TestHarness, TicketTypeBuilder,
};

struct Setup {
    harness: TestHarness,
    provider: Arc<MockPaymentProvider>,
    payments: PaymentService,
    ticket_type: TicketType,
}

fn setup(price: i64) -> Setup {
    let harness = TestHarness::new();
    let ticket_type = harness.seed_ticket_type(
        TicketTypeBuilder::new(harness.edition_id)
            .with_price(price)
            .with_quantity(20)
            .build(),
    );
    let provider = Arc::new(MockPaymentProvider::new());
    let payments = harness.payments(provider.clone());
    Setup {
        harness,
        provider,
        payments,
        ticket_type,
    }
}

fn urls() -> CheckoutUrls {
    CheckoutUrls {
        success_url: "https://tickets.example.com/thanks".to_string(),
        cancel_url: "https://tickets.example.com/cart".to_string(),
    }
}

async fn pending_order(s: &Setup, quantity: u32) -> OrderId {
    let input = OrderInputBuilder::new(s.harness.edition_id)
        .with_buyer_email("ada@example.com")
        .with_item(s.ticket_type.id, quantity)
        .build();
    s.harness.orders().create_order(input).await.unwrap().order_id
}

async fn checkout(s: &Setup, order_id: OrderId) -> String {
    match s.payments.start_checkout(order_id, urls()).await.unwrap() {
        CheckoutOutcome::Redirect { session_id, .. } => session_id,
        other => panic!("expected a redirect, got {:?}", other),
    }
}

async fn deliver(s: &Setup, event: &PaymentEvent) -> Result<WebhookOutcome, ApplicationError> {
    s.payments
        .handle_webhook(
            &MockPaymentProvider::webhook_payload(event),
            MockPaymentProvider::SIGNATURE,
        )
        .await
}

fn completed(reference: &str, intent: Option<&str>) -> PaymentEvent {
    PaymentEvent::CheckoutCompleted {
        payment_reference: reference.to_string(),
        payment_intent_id: intent.map(str::to_string),
    }
}

#[tokio::test]
async fn test_checkout_stores_session_reference() {
    let s = setup(5000);
    let order_id = pending_order(&s, 2).await;

    let session_id = checkout(&s, order_id).await;

    let requests = s.provider.checkout_requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].amount, 10000);
    assert_eq!(requests[0].buyer_email, "ada@example.com");

    let order = s.harness.orders().get_order(order_id).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.payment_provider.as_deref(), Some("mock"));
    assert_eq!(order.payment_reference.as_deref(), Some(session_id.as_str()));
}

#[tokio::test]
async fn test_checkout_rejects_bad_urls_and_closed_orders() {
    let s = setup(5000);
    let order_id = pending_order(&s, 1).await;

    let bad = CheckoutUrls {
        success_url: "not a url".to_string(),
        cancel_url: "https://tickets.example.com/cart".to_string(),
    };
    let err = s.payments.start_checkout(order_id, bad).await.unwrap_err();
    assert!(matches!(err, ApplicationError::ValidationFailed(_)));

    s.harness.orders().cancel_order(order_id).await.unwrap();
    let err = s.payments.start_checkout(order_id, urls()).await.unwrap_err();
    assert!(matches!(err, ApplicationError::InvalidState(_)));
    assert!(s.provider.checkout_requests().is_empty());
}

#[tokio::test]
async fn test_provider_failure_leaves_order_pending() {
    let s = setup(5000);
    let order_id = pending_order(&s, 1).await;
    s.provider.set_fail_checkout(true);

    let err = s.payments.start_checkout(order_id, urls()).await.unwrap_err();
    assert!(err.is_retryable());

    let order = s.harness.orders().get_order(order_id).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::Pending);
    assert!(order.payment_reference.is_none());
}

#[tokio::test]
async fn test_free_order_completes_without_provider() {
    let s = setup(0);
    let order_id = pending_order(&s, 2).await;

    let outcome = s.payments.start_checkout(order_id, urls()).await.unwrap();
    let CheckoutOutcome::Completed(result) = outcome else {
        panic!("free order should complete immediately");
    };
    assert_eq!(result.ticket_ids.len(), 2);
    assert!(s.provider.checkout_requests().is_empty());

    let order = s.harness.orders().get_order(order_id).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::Paid);
}

#[tokio::test]
async fn test_fully_discounted_order_records_usage() {
    let s = setup(5000);
    let promo = s.harness.seed_promo_code(
        PromoCodeBuilder::new(s.harness.edition_id)
            .with_code("COMP")
            .free()
            .build(),
    );
    let order_id = pending_order(&s, 1).await;
    s.harness
        .promo_codes()
        .apply_to_order(order_id, "comp")
        .await
        .unwrap();

    let outcome = s.payments.start_checkout(order_id, urls()).await.unwrap();
    assert!(matches!(outcome, CheckoutOutcome::Completed(_)));

    let usages = s.harness.promo_codes().list_usages(promo.id).await.unwrap();
    assert_eq!(usages.len(), 1);
    assert_eq!(usages[0].order_id, order_id);
    assert_eq!(usages[0].discount_amount, 5000);
}

#[tokio::test]
async fn test_checkout_webhook_completes_order_once() {
    let s = setup(5000);
    let promo = s
        .harness
        .seed_promo_code(PromoCodeBuilder::new(s.harness.edition_id).percentage(10).build());
    let order_id = pending_order(&s, 2).await;
    s.harness
        .promo_codes()
        .apply_to_order(order_id, "SAVE20")
        .await
        .unwrap();
    let session_id = checkout(&s, order_id).await;
    assert_eq!(s.provider.checkout_requests()[0].amount, 9000);

    let event = completed(&session_id, Some("pi_123"));
    let outcome = deliver(&s, &event).await.unwrap();
    let WebhookOutcome::OrderCompleted(result) = outcome else {
        panic!("expected the order to complete");
    };
    assert_eq!(result.order_id, order_id);
    assert_eq!(result.ticket_ids.len(), 2);

    let order = s.harness.orders().get_order(order_id).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::Paid);
    assert_eq!(order.payment_intent_id.as_deref(), Some("pi_123"));

    // redelivery
    let outcome = deliver(&s, &event).await.unwrap();
    assert_eq!(outcome, WebhookOutcome::AlreadyProcessed { order_id });

    let details = s.harness.orders().get_order_details(order_id).await.unwrap();
    assert_eq!(details.tickets.len(), 2);
    let usages = s.harness.promo_codes().list_usages(promo.id).await.unwrap();
    assert_eq!(usages.len(), 1);
    assert_eq!(usages[0].discount_amount, 1000);
    let stored = s
        .harness
        .promo_codes()
        .get_by_code(s.harness.edition_id, "SAVE20")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.current_usage_count, 1);
}

#[tokio::test]
async fn test_webhook_rejections() {
    let s = setup(5000);

    let payload = MockPaymentProvider::webhook_payload(&completed("cs_x", None));
    let err = s
        .payments
        .handle_webhook(&payload, "forged")
        .await
        .unwrap_err();
    assert!(matches!(err, ApplicationError::PaymentProvider(_)));

    let err = deliver(&s, &completed("cs_unknown", None)).await.unwrap_err();
    assert!(matches!(err, ApplicationError::NotFound(_)));

    let outcome = deliver(
        &s,
        &PaymentEvent::Other {
            event_type: "customer.created".to_string(),
        },
    )
    .await
    .unwrap();
    assert!(matches!(outcome, WebhookOutcome::Ignored { .. }));
}

#[tokio::test]
async fn test_checkout_webhook_for_cancelled_order_is_ignored() {
    let s = setup(5000);
    let order_id = pending_order(&s, 1).await;
    let session_id = checkout(&s, order_id).await;
    s.harness.orders().cancel_order(order_id).await.unwrap();

    let outcome = deliver(&s, &completed(&session_id, None)).await.unwrap();
    assert!(matches!(outcome, WebhookOutcome::Ignored { .. }));

    let order = s.harness.orders().get_order(order_id).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::Cancelled);
}

#[tokio::test]
async fn test_refund_calls_provider_then_refunds_tickets() {
    let s = setup(5000);
    let order_id = pending_order(&s, 2).await;
    let session_id = checkout(&s, order_id).await;
    deliver(&s, &completed(&session_id, Some("pi_9"))).await.unwrap();

    let refunded = s.payments.refund(order_id).await.unwrap();
    assert_eq!(refunded.cancelled_ticket_ids.len(), 2);

    let requests = s.provider.refund_requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].payment_reference, session_id);
    assert_eq!(requests[0].payment_intent_id.as_deref(), Some("pi_9"));
    assert_eq!(requests[0].amount, 10000);

    let details = s.harness.orders().get_order_details(order_id).await.unwrap();
    assert_eq!(details.order.status, OrderStatus::Refunded);
    assert!(details
        .tickets
        .iter()
        .all(|t| t.status == TicketStatus::Cancelled));

    let err = s.payments.refund(order_id).await.unwrap_err();
    assert!(matches!(err, ApplicationError::InvalidState(_)));

    // the provider's own notification arrives afterwards
    let outcome = deliver(
        &s,
        &PaymentEvent::RefundSucceeded {
            payment_reference: session_id,
        },
    )
    .await
    .unwrap();
    assert_eq!(outcome, WebhookOutcome::AlreadyProcessed { order_id });
}

#[tokio::test]
async fn test_refund_webhook_refunds_paid_order() {
    let s = setup(5000);
    let order_id = pending_order(&s, 1).await;
    let session_id = checkout(&s, order_id).await;
    deliver(&s, &completed(&session_id, None)).await.unwrap();

    let outcome = deliver(
        &s,
        &PaymentEvent::RefundSucceeded {
            payment_reference: session_id,
        },
    )
    .await
    .unwrap();
    assert!(matches!(outcome, WebhookOutcome::OrderRefunded(_)));
    assert!(s.provider.refund_requests().is_empty());

    let order = s.harness.orders().get_order(order_id).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::Refunded);
}
