//! PostgreSQL pool setup and schema migrations

use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;
use tracing::{info, instrument};

use crate::{Error, Result};

/// Pool settings, usually built from the `database` section of the
/// application config
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: Duration,
    pub idle_timeout: Duration,
    pub max_lifetime: Duration,
}

impl From<&ticketing_common::DatabaseConfig> for DatabaseConfig {
    fn from(config: &ticketing_common::DatabaseConfig) -> Self {
        Self {
            url: config.url.clone(),
            max_connections: config.max_connections,
            min_connections: config.min_connections,
            acquire_timeout: Duration::from_secs(config.acquire_timeout_seconds),
            idle_timeout: Duration::from_secs(config.idle_timeout_seconds),
            max_lifetime: Duration::from_secs(30 * 60),
        }
    }
}

impl DatabaseConfig {
    /// Small pool with short timeouts for integration tests
    pub fn test_config(url: String) -> Self {
        Self {
            url,
            max_connections: 5,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(60),
            max_lifetime: Duration::from_secs(300),
        }
    }
}

/// Shared connection pool for the repositories
#[derive(Clone)]
pub struct DatabasePool {
    pool: PgPool,
}

impl DatabasePool {
    /// Connect, pinning every session to UTC.
    #[instrument(skip(config), fields(max_connections = config.max_connections))]
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        if config.url.is_empty() {
            return Err(Error::Configuration("database url is empty".to_string()));
        }

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.acquire_timeout)
            .idle_timeout(Some(config.idle_timeout))
            .max_lifetime(Some(config.max_lifetime))
            .after_connect(|conn, _meta| {
                Box::pin(async move {
                    sqlx::query("SET timezone = 'UTC'")
                        .execute(&mut *conn)
                        .await?;
                    Ok(())
                })
            })
            .connect(&config.url)
            .await
            .map_err(|e| Error::Connection(e.to_string()))?;

        info!("Connected to ticketing database");
        Ok(Self { pool })
    }

    #[inline]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Bring the schema up to date with `migrations/`.
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(e.into()))?;
        info!("Ticketing schema migrated");
        Ok(())
    }
}

impl std::fmt::Debug for DatabasePool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabasePool")
            .field("size", &self.pool.size())
            .finish()
    }
}
