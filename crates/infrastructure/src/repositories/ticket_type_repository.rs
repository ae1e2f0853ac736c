//! Ticket type repository implementation.
//!
//! PostgreSQL-backed catalog and inventory counter.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{postgres::PgRow, PgPool, Row};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use ticketing_application::ports::TicketTypeRepository;
use ticketing_application::{ApplicationError, ApplicationResult};
use ticketing_domain::{EditionId, NewTicketType, TicketType, TicketTypeId};

use super::{parse_currency, to_u32};
use crate::{Error, Result};

const COLUMNS: &str = "id, edition_id, name, description, price, currency, quantity, \
    quantity_sold, sales_start, sales_end, is_active, display_order, created_at, updated_at";

/// PostgreSQL implementation of TicketTypeRepository.
#[derive(Clone)]
pub struct PgTicketTypeRepository {
    pool: PgPool,
}

impl PgTicketTypeRepository {
    /// Create a new PostgreSQL ticket type repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Convert a database row to a TicketType.
fn row_to_ticket_type(row: &PgRow) -> Result<TicketType> {
    let id: Uuid = row.try_get("id")?;
    let edition_id: Uuid = row.try_get("edition_id")?;
    let currency: String = row.try_get("currency")?;

    Ok(TicketType {
        id: TicketTypeId::from(id),
        edition_id: EditionId::from(edition_id),
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        price: row.try_get("price")?,
        currency: parse_currency(&currency)?,
        quantity: to_u32(row.try_get("quantity")?, "quantity")?,
        quantity_sold: to_u32(row.try_get("quantity_sold")?, "quantity_sold")?,
        sales_start: row.try_get("sales_start")?,
        sales_end: row.try_get("sales_end")?,
        is_active: row.try_get("is_active")?,
        display_order: row.try_get("display_order")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl TicketTypeRepository for PgTicketTypeRepository {
    #[instrument(skip(self))]
    async fn find_by_id(&self, id: TicketTypeId) -> ApplicationResult<Option<TicketType>> {
        let row = sqlx::query(&format!("SELECT {} FROM ticket_types WHERE id = $1", COLUMNS))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(row.as_ref().map(row_to_ticket_type).transpose()?)
    }

    #[instrument(skip(self))]
    async fn find_by_edition(&self, edition_id: EditionId) -> ApplicationResult<Vec<TicketType>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM ticket_types WHERE edition_id = $1 ORDER BY display_order, created_at",
            COLUMNS
        ))
        .bind(edition_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.iter().map(row_to_ticket_type).collect::<Result<Vec<_>>>()?)
    }

    #[instrument(skip(self))]
    async fn find_active_by_edition(
        &self,
        edition_id: EditionId,
    ) -> ApplicationResult<Vec<TicketType>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM ticket_types WHERE edition_id = $1 AND is_active \
             ORDER BY display_order, created_at",
            COLUMNS
        ))
        .bind(edition_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.iter().map(row_to_ticket_type).collect::<Result<Vec<_>>>()?)
    }

    #[instrument(skip(self, ticket_type), fields(name = %ticket_type.name))]
    async fn create(&self, ticket_type: NewTicketType) -> ApplicationResult<TicketType> {
        let ticket_type = ticket_type.into_ticket_type(Utc::now());

        let row = sqlx::query(&format!(
            r#"
            INSERT INTO ticket_types (
                id, edition_id, name, description, price, currency, quantity,
                quantity_sold, sales_start, sales_end, is_active, display_order,
                created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, 0, $8, $9, $10, $11, $12, $12)
            RETURNING {}
            "#,
            COLUMNS
        ))
        .bind(ticket_type.id.as_uuid())
        .bind(ticket_type.edition_id.as_uuid())
        .bind(&ticket_type.name)
        .bind(&ticket_type.description)
        .bind(ticket_type.price)
        .bind(ticket_type.currency.as_str())
        .bind(i64::from(ticket_type.quantity))
        .bind(ticket_type.sales_start)
        .bind(ticket_type.sales_end)
        .bind(ticket_type.is_active)
        .bind(ticket_type.display_order)
        .bind(ticket_type.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        debug!(ticket_type_id = %ticket_type.id, "Ticket type created");
        Ok(row_to_ticket_type(&row)?)
    }

    #[instrument(skip(self, ticket_type), fields(ticket_type_id = %ticket_type.id))]
    async fn update(&self, ticket_type: &TicketType) -> ApplicationResult<TicketType> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE ticket_types SET
                name = $2, description = $3, price = $4, currency = $5, quantity = $6,
                sales_start = $7, sales_end = $8, is_active = $9, display_order = $10,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            COLUMNS
        ))
        .bind(ticket_type.id.as_uuid())
        .bind(&ticket_type.name)
        .bind(&ticket_type.description)
        .bind(ticket_type.price)
        .bind(ticket_type.currency.as_str())
        .bind(i64::from(ticket_type.quantity))
        .bind(ticket_type.sales_start)
        .bind(ticket_type.sales_end)
        .bind(ticket_type.is_active)
        .bind(ticket_type.display_order)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?
        .ok_or_else(|| Error::NotFound(format!("Ticket type {}", ticket_type.id)))?;

        debug!("Ticket type updated");
        Ok(row_to_ticket_type(&row)?)
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: TicketTypeId) -> ApplicationResult<()> {
        let result = sqlx::query("DELETE FROM ticket_types WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("Ticket type {}", id)).into());
        }
        debug!(ticket_type_id = %id, "Ticket type deleted");
        Ok(())
    }

    #[instrument(skip(self), fields(ticket_type_id = %id))]
    async fn increment_quantity_sold(
        &self,
        id: TicketTypeId,
        delta: i64,
    ) -> ApplicationResult<TicketType> {
        // Capacity check and write happen in the same statement; a decrement
        // clamps at zero instead of failing.
        let row = sqlx::query(&format!(
            r#"
            UPDATE ticket_types
            SET quantity_sold = GREATEST(quantity_sold + $2, 0), updated_at = NOW()
            WHERE id = $1 AND ($2 <= 0 OR quantity_sold + $2 <= quantity)
            RETURNING {}
            "#,
            COLUMNS
        ))
        .bind(id.as_uuid())
        .bind(delta)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        if let Some(row) = row {
            let ticket_type = row_to_ticket_type(&row)?;
            debug!(quantity_sold = ticket_type.quantity_sold, "Inventory updated");
            return Ok(ticket_type);
        }

        let current = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| ApplicationError::NotFound(format!("Ticket type {}", id)))?;
        warn!(
            delta,
            remaining = current.remaining(),
            "Inventory increment rejected"
        );
        Err(ApplicationError::InsufficientInventory {
            ticket_type_id: id,
            requested: u32::try_from(delta).unwrap_or(u32::MAX),
            remaining: current.remaining(),
        })
    }
}
