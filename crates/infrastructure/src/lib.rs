//! Infrastructure layer for the ticketing back office
//!
//! This crate provides implementations of the application ports:
//! - Database access (PostgreSQL with sqlx)
//! - PostgreSQL repositories for ticket types, orders, order items, tickets
//!   and promo codes
//! - An in-memory store implementing every repository, for tests and local runs
//! - An event publisher that writes lifecycle events to the log
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use ticketing_application::{Repositories, ServiceContext};
//! use ticketing_common::AppConfig;
//! use ticketing_infrastructure::{DatabaseConfig, DatabasePool, PgRepositories};
//!
//! let app_config = AppConfig::load()?;
//! let pool = DatabasePool::new(&DatabaseConfig::from(&app_config.database)).await?;
//! pool.run_migrations().await?;
//!
//! let ctx = ServiceContext::new(PgRepositories::new(pool.pool().clone()).into_repositories());
//! ```

pub mod database;
pub mod memory;
pub mod messaging;
pub mod repositories;

pub use database::{DatabaseConfig, DatabasePool};
pub use memory::InMemoryStore;
pub use messaging::TracingEventPublisher;
pub use repositories::{
    PgOrderItemRepository, PgOrderRepository, PgPromoCodeRepository, PgRepositories,
    PgTicketRepository, PgTicketTypeRepository,
};

use sqlx::error::ErrorKind;
use ticketing_application::ApplicationError;

pub type Result<T> = std::result::Result<T, Error>;

/// Infrastructure-level errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Database errors from sqlx
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Stored value that does not map onto the domain model
    #[error("Invalid stored data: {0}")]
    InvalidData(String),

    /// Resource not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Connection errors
    #[error("Connection error: {0}")]
    Connection(String),
}

impl Error {
    /// Check if the error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Database(e) => !matches!(
                e,
                sqlx::Error::RowNotFound | sqlx::Error::ColumnDecode { .. }
            ) && db_error_kind(e).is_none(),
            Error::Connection(_) => true,
            _ => false,
        }
    }

    /// Get HTTP status code for this error
    pub fn http_status(&self) -> u16 {
        match self {
            Error::NotFound(_) => 404,
            Error::Configuration(_) => 400,
            Error::Serialization(_) | Error::InvalidData(_) => 500,
            Error::Database(e) => match db_error_kind(e) {
                Some(ErrorKind::UniqueViolation) => 409,
                Some(_) => 400,
                None => 503,
            },
            Error::Connection(_) => 503,
        }
    }
}

/// Constraint class of a database error, `None` for anything else
fn db_error_kind(err: &sqlx::Error) -> Option<ErrorKind> {
    match err {
        sqlx::Error::Database(db_err) => match db_err.kind() {
            ErrorKind::Other => None,
            kind => Some(kind),
        },
        _ => None,
    }
}

impl From<Error> for ApplicationError {
    fn from(err: Error) -> Self {
        match err {
            Error::NotFound(what) => ApplicationError::NotFound(what),
            Error::Database(ref e) => match db_error_kind(e) {
                Some(ErrorKind::UniqueViolation) => ApplicationError::Conflict(err.to_string()),
                Some(_) => ApplicationError::InvalidInput(err.to_string()),
                None => ApplicationError::Repository(err.to_string()),
            },
            Error::Serialization(_) | Error::InvalidData(_) => {
                ApplicationError::Internal(err.to_string())
            }
            Error::Configuration(_) | Error::Connection(_) => {
                ApplicationError::Repository(err.to_string())
            }
        }
    }
}
