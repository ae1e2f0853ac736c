//! Test database setup.
//!
//! Provides a migrated PostgreSQL database for the repository integration
//! tests. Those tests are `#[ignore]`d and need `DATABASE_URL` to point at a
//! disposable database.

use sqlx::PgPool;
use ticketing_application::services::Repositories;
use ticketing_infrastructure::{DatabaseConfig, DatabasePool, PgRepositories};

const TABLES: &str =
    "promo_code_usages, tickets, order_items, orders, promo_codes, ticket_types";

/// Test database wrapper with migrations applied
pub struct TestDatabase {
    pool: DatabasePool,
}

impl TestDatabase {
    /// Connect to `connection_string` and run the migrations
    pub async fn new_with_url(connection_string: &str) -> anyhow::Result<Self> {
        let config = DatabaseConfig::test_config(connection_string.to_string());
        let pool = DatabasePool::new(&config).await?;
        pool.run_migrations().await?;
        Ok(Self { pool })
    }

    /// Connect using `DATABASE_URL`
    pub async fn from_env() -> anyhow::Result<Self> {
        let url = std::env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set for database tests"))?;
        Self::new_with_url(&url).await
    }

    /// Get a reference to the database pool
    pub fn pool(&self) -> &PgPool {
        self.pool.pool()
    }

    /// PostgreSQL repositories over this database
    pub fn repositories(&self) -> Repositories {
        PgRepositories::new(self.pool().clone()).into_repositories()
    }

    /// Clean all tables for test isolation
    pub async fn clean(&self) -> anyhow::Result<()> {
        sqlx::query(&format!("TRUNCATE TABLE {} CASCADE", TABLES))
            .execute(self.pool())
            .await?;
        Ok(())
    }
}
