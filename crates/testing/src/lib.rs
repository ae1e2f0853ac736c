//! Testing utilities for the ticketing back office
//!
//! This crate provides:
//! - Test fixtures with realistic fake data
//! - Builders for ticket types, checkout requests and promo codes
//! - Deterministic collaborators (clock, numbering, QR codes, payments)
//!   and recording event publisher
//! - A failure-injecting repository wrapper for partial-failure tests
//! - [`TestHarness`], wiring all services over an in-memory store
//! - PostgreSQL test database setup
//!
//! # Examples
//!
//! ```
//! use ticketing_testing::{builders::*, TestHarness};
//!
//! let harness = TestHarness::new();
//! let ticket_type = TicketTypeBuilder::new(harness.edition_id)
//!     .with_name("Early Bird")
//!     .with_price(4500)
//!     .with_quantity(50)
//!     .build();
//! harness.seed_ticket_type(ticket_type);
//! ```

pub mod builders;
pub mod database;
pub mod fixtures;
pub mod harness;
pub mod mocks;

// Re-export commonly used types
pub use builders::*;
pub use fixtures::*;
pub use harness::TestHarness;
pub use mocks::*;

// Re-export testing dependencies for convenience
pub use fake;
pub use proptest;
