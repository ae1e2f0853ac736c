//! Application layer for the ticketing back office
//!
//! This crate runs the order and ticket lifecycle on top of the repository
//! ports it declares. Storage, payment providers and QR rendering are plugged
//! in from outside.
//!
//! ## Modules
//!
//! - `ports` - Repository and collaborator traits
//! - `services` - Order lifecycle, check-in, promo codes, payments, stats
//! - `dto` - Inputs and results of the services
//! - `validation` - Input validation helpers built on `validator`

pub mod dto;
pub mod ports;
pub mod services;
pub mod validation;

pub use ports::{
    EventPublisher, NoOpEventPublisher, OrderItemRepository, OrderRepository, PaymentProvider,
    PromoCodeRepository, QrCodeGenerator, TicketRepository, TicketTypeRepository,
};
pub use services::{
    CheckInService, OrderService, PaymentService, PromoCodeService, Repositories, ServiceConfig,
    ServiceContext, StatsService,
};
pub use validation::{Validatable, ValidationResult, ValidatorExt};

use thiserror::Error;
use ticketing_domain::{DomainError, PromoCodeErrorCode, TicketTypeId};

/// Application-level errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApplicationError {
    /// Referenced record does not exist
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Operation not permitted from the record's current status
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Requested quantity exceeds what is left to sell
    #[error(
        "Insufficient inventory for ticket type {ticket_type_id}: requested {requested}, remaining {remaining}"
    )]
    InsufficientInventory {
        ticket_type_id: TicketTypeId,
        requested: u32,
        remaining: u32,
    },

    /// Promo code rejected by one of the eligibility checks
    #[error("Promo code rejected ({code}): {message}")]
    PromoCode {
        code: PromoCodeErrorCode,
        message: String,
    },

    /// Invalid input data
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Validation errors
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    /// Resource conflict (e.g., duplicate)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Storage backend failure
    #[error("Repository error: {0}")]
    Repository(String),

    /// Payment provider failure
    #[error("Payment provider error: {0}")]
    PaymentProvider(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApplicationError {
    /// Status-guard failure naming the current status
    pub fn invalid_state(
        what: impl std::fmt::Display,
        action: &str,
        status: impl std::fmt::Display,
    ) -> Self {
        Self::InvalidState(format!("{} cannot be {}: status is {}", what, action, status))
    }

    pub fn promo_code(code: PromoCodeErrorCode) -> Self {
        Self::PromoCode {
            code,
            message: code.message().to_string(),
        }
    }

    /// Get HTTP status code for this error
    pub fn http_status(&self) -> u16 {
        match self {
            ApplicationError::NotFound(_) => 404,
            ApplicationError::InvalidState(_) => 409,
            ApplicationError::InsufficientInventory { .. } => 409,
            ApplicationError::PromoCode { .. } => 422,
            ApplicationError::InvalidInput(_) => 400,
            ApplicationError::ValidationFailed(_) => 422,
            ApplicationError::Conflict(_) => 409,
            ApplicationError::Repository(_) => 503,
            ApplicationError::PaymentProvider(_) => 502,
            ApplicationError::Internal(_) => 500,
        }
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ApplicationError::Repository(_) | ApplicationError::PaymentProvider(_)
        )
    }

    /// Get error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            ApplicationError::NotFound(_) => "NOT_FOUND",
            ApplicationError::InvalidState(_) => "INVALID_STATE",
            ApplicationError::InsufficientInventory { .. } => "INSUFFICIENT_INVENTORY",
            ApplicationError::PromoCode { .. } => "PROMO_CODE_REJECTED",
            ApplicationError::InvalidInput(_) => "INVALID_INPUT",
            ApplicationError::ValidationFailed(_) => "VALIDATION_FAILED",
            ApplicationError::Conflict(_) => "CONFLICT",
            ApplicationError::Repository(_) => "REPOSITORY_ERROR",
            ApplicationError::PaymentProvider(_) => "PAYMENT_PROVIDER_ERROR",
            ApplicationError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<DomainError> for ApplicationError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::InvalidOrderTransition { .. }
            | DomainError::InvalidTicketTransition { .. } => Self::InvalidState(err.to_string()),
            DomainError::InvalidCurrency(_)
            | DomainError::InvalidPromoCode(_)
            | DomainError::InvalidPromoDefinition { .. }
            | DomainError::AmountOverflow(_) => Self::InvalidInput(err.to_string()),
            DomainError::UnknownStatus { .. } => Self::Internal(err.to_string()),
        }
    }
}

pub type ApplicationResult<T> = Result<T, ApplicationError>;

#[cfg(test)]
mod tests {
    use super::*;
    use ticketing_domain::OrderStatus;

    #[test]
    fn test_error_http_status() {
        assert_eq!(ApplicationError::NotFound("order".to_string()).http_status(), 404);
        assert_eq!(ApplicationError::InvalidState("paid".to_string()).http_status(), 409);
        assert_eq!(
            ApplicationError::promo_code(PromoCodeErrorCode::Expired).http_status(),
            422
        );
        assert_eq!(ApplicationError::PaymentProvider("down".to_string()).http_status(), 502);
    }

    #[test]
    fn test_error_retryable() {
        assert!(ApplicationError::Repository("timeout".to_string()).is_retryable());
        assert!(!ApplicationError::NotFound("test".to_string()).is_retryable());
        assert!(!ApplicationError::InsufficientInventory {
            ticket_type_id: TicketTypeId::new(),
            requested: 3,
            remaining: 2,
        }
        .is_retryable());
    }

    #[test]
    fn test_invalid_state_names_current_status() {
        let err = ApplicationError::invalid_state("Order ORD-1", "completed", OrderStatus::Paid);
        assert_eq!(
            err.to_string(),
            "Invalid state: Order ORD-1 cannot be completed: status is paid"
        );
        assert_eq!(err.error_code(), "INVALID_STATE");
    }

    #[test]
    fn test_domain_error_mapping() {
        let err: ApplicationError = DomainError::InvalidCurrency("xx".to_string()).into();
        assert_eq!(err.error_code(), "INVALID_INPUT");

        let err: ApplicationError = OrderStatus::Refunded
            .transition_to(OrderStatus::Paid)
            .unwrap_err()
            .into();
        assert!(matches!(err, ApplicationError::InvalidState(_)));
    }

    #[test]
    fn test_promo_error_carries_message() {
        let err = ApplicationError::promo_code(PromoCodeErrorCode::MinOrderNotMet);
        assert!(err.to_string().contains("min_order_not_met"));
        match err {
            ApplicationError::PromoCode { code, message } => {
                assert_eq!(code, PromoCodeErrorCode::MinOrderNotMet);
                assert_eq!(message, PromoCodeErrorCode::MinOrderNotMet.message());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
