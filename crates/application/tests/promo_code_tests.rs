//! Promo code service tests

use chrono::Duration;
use ticketing_application::ApplicationError;
use ticketing_common::Clock;
use ticketing_domain::{
    OrderId, PromoCodeErrorCode, PromoCodeStatus, TicketType, TicketTypeId,
};
use ticketing_testing::{
    OrderInputBuilder, PromoCodeBuilder, TestHarness, TicketTypeBuilder,
};

fn harness_with_ticket_type() -> (TestHarness, TicketType) {
    let harness = TestHarness::new();
    let tt = harness.seed_ticket_type(
        TicketTypeBuilder::new(harness.edition_id)
            .with_price(5000)
            .build(),
    );
    (harness, tt)
}

/// Pending order for two tickets, 10000 in total
async fn pending_order(harness: &TestHarness, tt: &TicketType, email: &str) -> OrderId {
    let input = OrderInputBuilder::new(harness.edition_id)
        .with_buyer_email(email)
        .with_item(tt.id, 2)
        .build();
    harness.orders().create_order(input).await.unwrap().order_id
}

#[tokio::test]
async fn test_create_normalizes_and_rejects_duplicates() {
    let harness = TestHarness::new();
    let service = harness.promo_codes();

    let created = service
        .create_promo_code(
            PromoCodeBuilder::new(harness.edition_id)
                .with_code("  summer-25 ")
                .build_input(),
        )
        .await
        .unwrap();
    assert_eq!(created.code, "SUMMER-25");
    assert_eq!(created.current_usage_count, 0);

    let err = service
        .create_promo_code(
            PromoCodeBuilder::new(harness.edition_id)
                .with_code("Summer-25")
                .build_input(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ApplicationError::Conflict(_)));

    let found = service
        .get_by_code(harness.edition_id, "summer-25")
        .await
        .unwrap();
    assert_eq!(found.map(|p| p.id), Some(created.id));
}

#[tokio::test]
async fn test_create_rejects_bad_definitions() {
    let harness = TestHarness::new();
    let service = harness.promo_codes();

    let err = service
        .create_promo_code(
            PromoCodeBuilder::new(harness.edition_id)
                .percentage(120)
                .build_input(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ApplicationError::InvalidInput(_)));

    let err = service
        .create_promo_code(
            PromoCodeBuilder::new(harness.edition_id)
                .with_code("NO SPACES")
                .build_input(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ApplicationError::InvalidInput(_)));

    let err = service
        .create_promo_code(
            PromoCodeBuilder::new(harness.edition_id)
                .with_code("AB")
                .build_input(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ApplicationError::ValidationFailed(_)));
}

#[tokio::test]
async fn test_percentage_code_on_order() {
    let (harness, tt) = harness_with_ticket_type();
    harness.seed_promo_code(PromoCodeBuilder::new(harness.edition_id).percentage(20).build());
    let order_id = pending_order(&harness, &tt, "ada@example.com").await;

    let applied = harness
        .promo_codes()
        .apply_to_order(order_id, "save20")
        .await
        .unwrap();
    assert_eq!(applied.code, "SAVE20");
    assert_eq!(applied.discount.discount_amount, 2000);
    assert_eq!(applied.discount.final_amount, 8000);

    let order = harness.orders().get_order(order_id).await.unwrap().unwrap();
    assert_eq!(order.discount_amount, 2000);
    assert_eq!(order.promo_code_id, Some(applied.promo_code_id));
    assert_eq!(order.amount_due(), 8000);
    // no usage until paid
    assert!(harness
        .promo_codes()
        .list_usages(applied.promo_code_id)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_fixed_code_is_capped_at_order_amount() {
    let (harness, tt) = harness_with_ticket_type();
    harness.seed_promo_code(
        PromoCodeBuilder::new(harness.edition_id)
            .with_code("BIGGIFT")
            .fixed(15000)
            .build(),
    );
    let order_id = pending_order(&harness, &tt, "ada@example.com").await;

    let applied = harness
        .promo_codes()
        .apply_to_order(order_id, "BIGGIFT")
        .await
        .unwrap();
    assert_eq!(applied.discount.discount_amount, 10000);
    assert_eq!(applied.discount.final_amount, 0);
}

#[tokio::test]
async fn test_reapply_replaces_and_remove_clears() {
    let (harness, tt) = harness_with_ticket_type();
    harness.seed_promo_code(PromoCodeBuilder::new(harness.edition_id).percentage(20).build());
    harness.seed_promo_code(
        PromoCodeBuilder::new(harness.edition_id)
            .with_code("TENOFF")
            .fixed(1000)
            .build(),
    );
    let order_id = pending_order(&harness, &tt, "ada@example.com").await;
    let service = harness.promo_codes();

    service.apply_to_order(order_id, "SAVE20").await.unwrap();
    let applied = service.apply_to_order(order_id, "TENOFF").await.unwrap();
    let order = harness.orders().get_order(order_id).await.unwrap().unwrap();
    assert_eq!(order.discount_amount, 1000);
    assert_eq!(order.promo_code_id, Some(applied.promo_code_id));

    let cleared = service.remove_from_order(order_id).await.unwrap();
    assert_eq!(cleared.discount_amount, 0);
    assert!(cleared.promo_code_id.is_none());
}

#[tokio::test]
async fn test_rejected_code_leaves_order_untouched() {
    let (harness, tt) = harness_with_ticket_type();
    harness.seed_promo_code(
        PromoCodeBuilder::new(harness.edition_id)
            .with_min_order_amount(20000)
            .build(),
    );
    let order_id = pending_order(&harness, &tt, "ada@example.com").await;

    let err = harness
        .promo_codes()
        .apply_to_order(order_id, "SAVE20")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ApplicationError::PromoCode {
            code: PromoCodeErrorCode::MinOrderNotMet,
            ..
        }
    ));

    let err = harness
        .promo_codes()
        .apply_to_order(order_id, "MISSING")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ApplicationError::PromoCode {
            code: PromoCodeErrorCode::NotFound,
            ..
        }
    ));

    let order = harness.orders().get_order(order_id).await.unwrap().unwrap();
    assert_eq!(order.discount_amount, 0);
}

#[tokio::test]
async fn test_apply_requires_pending_order() {
    let (harness, tt) = harness_with_ticket_type();
    harness.seed_promo_code(PromoCodeBuilder::new(harness.edition_id).build());
    let order_id = pending_order(&harness, &tt, "ada@example.com").await;
    harness.orders().cancel_order(order_id).await.unwrap();

    let err = harness
        .promo_codes()
        .apply_to_order(order_id, "SAVE20")
        .await
        .unwrap_err();
    assert!(matches!(err, ApplicationError::InvalidState(_)));
}

#[tokio::test]
async fn test_first_failing_rule_wins() {
    let harness = TestHarness::new();
    let now = harness.clock.now();
    harness.seed_promo_code(
        PromoCodeBuilder::new(harness.edition_id)
            .with_code("OLDNEWS")
            .inactive()
            .with_window(None, Some(now - Duration::days(3)))
            .build(),
    );

    let validation = harness
        .promo_codes()
        .validate_for_order(harness.edition_id, "oldnews", 10000, "ada@example.com", &[])
        .await
        .unwrap();
    assert!(!validation.valid);
    assert_eq!(validation.error_code, Some(PromoCodeErrorCode::Inactive));
    assert!(validation.promo_code.is_some());
}

#[tokio::test]
async fn test_validation_follows_clock() {
    let harness = TestHarness::new();
    let now = harness.clock.now();
    harness.seed_promo_code(
        PromoCodeBuilder::new(harness.edition_id)
            .with_code("WEEKEND")
            .with_window(Some(now + Duration::days(1)), Some(now + Duration::days(3)))
            .build(),
    );
    let service = harness.promo_codes();
    let check = || service.validate_for_order(harness.edition_id, "WEEKEND", 5000, "a@b.io", &[]);

    assert_eq!(check().await.unwrap().error_code, Some(PromoCodeErrorCode::NotStarted));
    harness.clock.advance(Duration::days(2));
    assert!(check().await.unwrap().valid);
    harness.clock.advance(Duration::days(2));
    assert_eq!(check().await.unwrap().error_code, Some(PromoCodeErrorCode::Expired));
}

#[tokio::test]
async fn test_restricted_code_needs_an_applicable_ticket_type() {
    let (harness, tt) = harness_with_ticket_type();
    let vip = harness.seed_ticket_type(
        TicketTypeBuilder::new(harness.edition_id)
            .with_name("VIP")
            .with_price(20000)
            .build(),
    );
    harness.seed_promo_code(
        PromoCodeBuilder::new(harness.edition_id)
            .with_code("VIPHALF")
            .percentage(50)
            .restricted_to(vec![vip.id])
            .build(),
    );

    let service = harness.promo_codes();
    let validation = service
        .validate_for_order(harness.edition_id, "VIPHALF", 10000, "a@b.io", &[tt.id])
        .await
        .unwrap();
    assert_eq!(
        validation.error_code,
        Some(PromoCodeErrorCode::TicketTypeNotApplicable)
    );

    // mixed order: only the VIP line is discounted
    let input = OrderInputBuilder::new(harness.edition_id)
        .with_item(tt.id, 1)
        .with_item(vip.id, 1)
        .build();
    let order_id = harness.orders().create_order(input).await.unwrap().order_id;
    let applied = service.apply_to_order(order_id, "VIPHALF").await.unwrap();
    assert_eq!(applied.discount.applicable_amount, 20000);
    assert_eq!(applied.discount.discount_amount, 10000);
    assert_eq!(applied.discount.final_amount, 15000);

    let unknown = service
        .validate_for_order(harness.edition_id, "VIPHALF", 10000, "a@b.io", &[TicketTypeId::new()])
        .await
        .unwrap();
    assert!(!unknown.valid);
}

#[tokio::test]
async fn test_usage_limits() {
    let (harness, _tt) = harness_with_ticket_type();
    let promo = harness.seed_promo_code(
        PromoCodeBuilder::new(harness.edition_id)
            .with_code("ONCEEACH")
            .with_max_usage_count(2)
            .with_max_usage_per_person(1)
            .build(),
    );
    let service = harness.promo_codes();

    service
        .record_usage(promo.id, OrderId::new(), "Ada@Example.com", 1000)
        .await
        .unwrap();
    assert_eq!(
        service
            .get_user_usage_count(promo.id, "ada@example.com")
            .await
            .unwrap(),
        1
    );

    let again = service
        .validate_for_order(harness.edition_id, "ONCEEACH", 10000, "ADA@example.com", &[])
        .await
        .unwrap();
    assert_eq!(again.error_code, Some(PromoCodeErrorCode::MaxPerPersonReached));

    service
        .record_usage(promo.id, OrderId::new(), "grace@example.com", 1000)
        .await
        .unwrap();
    let exhausted = service
        .validate_for_order(harness.edition_id, "ONCEEACH", 10000, "linus@example.com", &[])
        .await
        .unwrap();
    assert_eq!(exhausted.error_code, Some(PromoCodeErrorCode::Exhausted));

    let summaries = service.list_by_edition(harness.edition_id).await.unwrap();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].status, PromoCodeStatus::Exhausted);
    assert_eq!(summaries[0].remaining_uses, Some(0));

    let usages = service.list_usages(promo.id).await.unwrap();
    assert_eq!(usages.len(), 2);
    assert_eq!(usages[0].email, "ada@example.com");
    assert_eq!(
        harness
            .events
            .event_types()
            .iter()
            .filter(|t| **t == "promo_code.redeemed")
            .count(),
        2
    );
}

#[tokio::test]
async fn test_deactivate() {
    let harness = TestHarness::new();
    let promo = harness.seed_promo_code(PromoCodeBuilder::new(harness.edition_id).build());
    let service = harness.promo_codes();

    let deactivated = service.deactivate(promo.id).await.unwrap();
    assert!(!deactivated.is_active);

    let validation = service
        .validate_for_order(harness.edition_id, "SAVE20", 10000, "a@b.io", &[])
        .await
        .unwrap();
    assert_eq!(validation.error_code, Some(PromoCodeErrorCode::Inactive));

    let err = service
        .deactivate(ticketing_domain::PromoCodeId::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ApplicationError::NotFound(_)));
}
