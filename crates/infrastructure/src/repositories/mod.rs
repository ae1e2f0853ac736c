//! Repository implementations for data persistence.
//!
//! PostgreSQL-backed implementations of the repository ports declared by the
//! application layer. Every method is one statement; the counter updates are
//! guarded `UPDATE ... RETURNING` statements so they stay atomic under
//! concurrent writers.

mod order_item_repository;
mod order_repository;
mod promo_code_repository;
mod ticket_repository;
mod ticket_type_repository;

pub use order_item_repository::*;
pub use order_repository::*;
pub use promo_code_repository::*;
pub use ticket_repository::*;
pub use ticket_type_repository::*;

use sqlx::PgPool;
use std::sync::Arc;
use ticketing_application::Repositories;
use ticketing_domain::Currency;

use crate::{Error, Result};

/// All PostgreSQL repositories over one pool
#[derive(Clone)]
pub struct PgRepositories {
    pub ticket_types: PgTicketTypeRepository,
    pub orders: PgOrderRepository,
    pub order_items: PgOrderItemRepository,
    pub tickets: PgTicketRepository,
    pub promo_codes: PgPromoCodeRepository,
}

impl PgRepositories {
    pub fn new(pool: PgPool) -> Self {
        Self {
            ticket_types: PgTicketTypeRepository::new(pool.clone()),
            orders: PgOrderRepository::new(pool.clone()),
            order_items: PgOrderItemRepository::new(pool.clone()),
            tickets: PgTicketRepository::new(pool.clone()),
            promo_codes: PgPromoCodeRepository::new(pool),
        }
    }

    /// Bundle for the application services
    pub fn into_repositories(self) -> Repositories {
        Repositories {
            ticket_types: Arc::new(self.ticket_types),
            orders: Arc::new(self.orders),
            order_items: Arc::new(self.order_items),
            tickets: Arc::new(self.tickets),
            promo_codes: Arc::new(self.promo_codes),
        }
    }
}

/// Read a non-negative BIGINT column into a `u32`
pub(crate) fn to_u32(value: i64, column: &str) -> Result<u32> {
    u32::try_from(value)
        .map_err(|_| Error::InvalidData(format!("{} out of range: {}", column, value)))
}

pub(crate) fn parse_currency(code: &str) -> Result<Currency> {
    // CHAR(3) columns come back blank padded
    Currency::new(code.trim()).map_err(|e| Error::InvalidData(e.to_string()))
}
