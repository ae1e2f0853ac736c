//! Event Ticketing Domain Types
//!
//! This crate holds the ticketing model: ticket types with their inventory,
//! orders and order lines, individually numbered tickets, and promotional codes
//! together with the pure engine that validates them and computes discounts.
//!
//! ## Modules
//!
//! - **identifiers**: Strongly-typed UUID-based identifiers
//! - **money**: Currency codes and minor-unit amount arithmetic
//! - **ticket_type**: Sellable categories and their capacity
//! - **order**: Orders, order lines and the order status machine
//! - **ticket**: Tickets and the ticket status machine
//! - **promo_code**: Promo code records, derived status and usage records
//! - **discount**: Eligibility checks and discount calculation
//! - **events**: Lifecycle events
//! - **errors**: Domain error types
//!
//! ## Usage
//!
//! ```rust
//! use ticketing_domain::order::OrderStatus;
//!
//! assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Paid));
//! assert!(!OrderStatus::Paid.can_transition_to(OrderStatus::Cancelled));
//! ```

#![warn(clippy::all)]

pub mod discount;
pub mod errors;
pub mod events;
pub mod identifiers;
pub mod money;
pub mod order;
pub mod promo_code;
pub mod ticket;
pub mod ticket_type;

// Re-export commonly used types
pub use discount::{
    calculate_discount, calculate_order_discount, validate_promo_code, OrderDiscount,
    PromoCodeErrorCode, PromoValidationInput,
};
pub use errors::{DomainError, DomainResult};
pub use events::{DomainEvent, LifecycleEvent};
pub use identifiers::*;
pub use money::{Amount, Currency};
pub use order::{NewOrder, Order, OrderItem, OrderStatus, PaymentInfo};
pub use promo_code::{DiscountType, NewPromoCode, PromoCode, PromoCodeStatus, PromoCodeUsage};
pub use ticket::{NewTicket, Ticket, TicketQrPayload, TicketStatus};
pub use ticket_type::{NewTicketType, TicketType};
