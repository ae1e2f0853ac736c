//! Error types raised by pure domain operations.
//!
//! Lifecycle failures (missing records, wrong status, sold-out inventory) are
//! reported by the application layer; this module only covers what can go wrong
//! while constructing or transitioning a value in isolation.

use crate::order::OrderStatus;
use crate::ticket::TicketStatus;

/// Domain-level error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    /// Order status change not permitted by the state machine
    #[error("Order status transition not allowed: {from} -> {to}")]
    InvalidOrderTransition { from: OrderStatus, to: OrderStatus },

    /// Ticket status change not permitted by the state machine
    #[error("Ticket status transition not allowed: {from} -> {to}")]
    InvalidTicketTransition { from: TicketStatus, to: TicketStatus },

    /// Currency code is not a three-letter uppercase ISO code
    #[error("Invalid currency code: {0}")]
    InvalidCurrency(String),

    /// Promo code text does not satisfy the code format
    #[error("Invalid promo code: {0}")]
    InvalidPromoCode(String),

    /// Promo code definition is inconsistent
    #[error("Invalid promo code definition: {field} - {message}")]
    InvalidPromoDefinition { field: String, message: String },

    /// Integer amount arithmetic left the representable range
    #[error("Amount overflow while computing {0}")]
    AmountOverflow(String),

    /// Unknown status literal
    #[error("Unknown {kind} status: {value}")]
    UnknownStatus { kind: &'static str, value: String },
}

impl DomainError {
    /// Machine-readable code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidOrderTransition { .. } | Self::InvalidTicketTransition { .. } => {
                "INVALID_TRANSITION"
            }
            Self::InvalidCurrency(_) => "INVALID_CURRENCY",
            Self::InvalidPromoCode(_) | Self::InvalidPromoDefinition { .. } => "INVALID_PROMO_CODE",
            Self::AmountOverflow(_) => "AMOUNT_OVERFLOW",
            Self::UnknownStatus { .. } => "UNKNOWN_STATUS",
        }
    }
}

/// Result alias for domain operations
pub type DomainResult<T> = Result<T, DomainError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = DomainError::InvalidOrderTransition {
            from: OrderStatus::Paid,
            to: OrderStatus::Cancelled,
        };
        assert_eq!(err.error_code(), "INVALID_TRANSITION");
        assert_eq!(
            err.to_string(),
            "Order status transition not allowed: paid -> cancelled"
        );

        let err = DomainError::InvalidCurrency("eu".to_string());
        assert_eq!(err.error_code(), "INVALID_CURRENCY");
    }
}
