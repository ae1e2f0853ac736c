//! Tests for order and ticket status machines
//!
//! Covers OrderStatus and TicketStatus transitions and their errors.

use proptest::prelude::*;
use ticketing_domain::{DomainError, OrderStatus, TicketStatus};

// ============================================================================
// OrderStatus Tests
// ============================================================================

#[test]
fn test_order_status_pending_transitions() {
    let pending = OrderStatus::Pending;

    assert!(pending.can_transition_to(OrderStatus::Paid));
    assert!(pending.can_transition_to(OrderStatus::Cancelled));

    assert!(!pending.can_transition_to(OrderStatus::Refunded));
    assert!(!pending.can_transition_to(OrderStatus::Pending));
}

#[test]
fn test_order_status_paid_transitions() {
    let paid = OrderStatus::Paid;

    // Refund is the only way out
    assert!(paid.can_transition_to(OrderStatus::Refunded));

    assert!(!paid.can_transition_to(OrderStatus::Pending));
    assert!(!paid.can_transition_to(OrderStatus::Cancelled));
    assert!(!paid.can_transition_to(OrderStatus::Paid));
}

#[test]
fn test_order_status_terminal_states() {
    for terminal in [OrderStatus::Cancelled, OrderStatus::Refunded] {
        assert!(terminal.is_terminal());
        for target in OrderStatus::ALL {
            assert!(
                !terminal.can_transition_to(target),
                "{} -> {} should be rejected",
                terminal,
                target
            );
        }
    }
    assert!(!OrderStatus::Pending.is_terminal());
}

#[test]
fn test_order_transition_error_names_both_states() {
    let err = OrderStatus::Cancelled
        .transition_to(OrderStatus::Paid)
        .unwrap_err();

    assert_eq!(
        err,
        DomainError::InvalidOrderTransition {
            from: OrderStatus::Cancelled,
            to: OrderStatus::Paid,
        }
    );
    assert!(err.to_string().contains("cancelled -> paid"));
}

#[test]
fn test_order_status_serialization() {
    assert_eq!(serde_json::to_string(&OrderStatus::Refunded).unwrap(), "\"refunded\"");
    let status: OrderStatus = serde_json::from_str("\"paid\"").unwrap();
    assert_eq!(status, OrderStatus::Paid);
}

// ============================================================================
// TicketStatus Tests
// ============================================================================

#[test]
fn test_ticket_status_valid_transitions() {
    let valid = TicketStatus::Valid;

    assert!(valid.can_transition_to(TicketStatus::Used));
    assert!(valid.can_transition_to(TicketStatus::Cancelled));
    assert!(!valid.can_transition_to(TicketStatus::Valid));
}

#[test]
fn test_ticket_status_used_only_cancellable() {
    let used = TicketStatus::Used;

    assert!(used.can_transition_to(TicketStatus::Cancelled));
    assert!(!used.can_transition_to(TicketStatus::Valid));
    assert!(!used.can_transition_to(TicketStatus::Used));
    assert!(used.is_cancellable());
}

#[test]
fn test_ticket_status_cancelled_is_terminal() {
    let cancelled = TicketStatus::Cancelled;

    assert!(!cancelled.is_cancellable());
    for target in TicketStatus::ALL {
        assert!(!cancelled.can_transition_to(target));
    }
    assert!(matches!(
        cancelled.transition_to(TicketStatus::Used),
        Err(DomainError::InvalidTicketTransition { .. })
    ));
}

fn order_status() -> impl Strategy<Value = OrderStatus> {
    prop::sample::select(OrderStatus::ALL.to_vec())
}

fn ticket_status() -> impl Strategy<Value = TicketStatus> {
    prop::sample::select(TicketStatus::ALL.to_vec())
}

proptest! {
    #[test]
    fn prop_order_transition_matches_predicate(from in order_status(), to in order_status()) {
        let result = from.transition_to(to);
        prop_assert_eq!(result.is_ok(), from.can_transition_to(to));
        if let Ok(next) = result {
            prop_assert_eq!(next, to);
        }
    }

    #[test]
    fn prop_no_order_self_transitions(status in order_status()) {
        prop_assert!(!status.can_transition_to(status));
    }

    #[test]
    fn prop_terminal_orders_never_move(from in order_status(), to in order_status()) {
        if from.is_terminal() {
            prop_assert!(!from.can_transition_to(to));
        }
    }

    #[test]
    fn prop_ticket_never_returns_to_valid(from in ticket_status()) {
        prop_assert!(!from.can_transition_to(TicketStatus::Valid));
    }

    #[test]
    fn prop_status_strings_parse_back(status in order_status(), ticket in ticket_status()) {
        prop_assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), status);
        prop_assert_eq!(ticket.as_str().parse::<TicketStatus>().unwrap(), ticket);
    }
}
