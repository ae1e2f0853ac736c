//! Ticket repository implementation.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{postgres::PgRow, PgPool, Row};
use tracing::{debug, instrument};
use uuid::Uuid;

use ticketing_application::ports::TicketRepository;
use ticketing_application::{ApplicationError, ApplicationResult};
use ticketing_domain::{
    EditionId, NewTicket, OrderId, Ticket, TicketId, TicketStatus, TicketTypeId, UserId,
};

use crate::{Error, Result};

const COLUMNS: &str = "id, order_id, ticket_type_id, edition_id, attendee_email, \
    attendee_first_name, attendee_last_name, ticket_number, qr_code, status, \
    checked_in_at, checked_in_by, created_at, updated_at";

/// PostgreSQL implementation of TicketRepository.
#[derive(Clone)]
pub struct PgTicketRepository {
    pool: PgPool,
}

impl PgTicketRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn row_to_ticket(row: &PgRow) -> Result<Ticket> {
    let id: Uuid = row.try_get("id")?;
    let order_id: Uuid = row.try_get("order_id")?;
    let ticket_type_id: Uuid = row.try_get("ticket_type_id")?;
    let edition_id: Uuid = row.try_get("edition_id")?;
    let status: String = row.try_get("status")?;
    let checked_in_by: Option<Uuid> = row.try_get("checked_in_by")?;

    Ok(Ticket {
        id: TicketId::from(id),
        order_id: OrderId::from(order_id),
        ticket_type_id: TicketTypeId::from(ticket_type_id),
        edition_id: EditionId::from(edition_id),
        attendee_email: row.try_get("attendee_email")?,
        attendee_first_name: row.try_get("attendee_first_name")?,
        attendee_last_name: row.try_get("attendee_last_name")?,
        ticket_number: row.try_get("ticket_number")?,
        qr_code: row.try_get("qr_code")?,
        status: status
            .parse::<TicketStatus>()
            .map_err(|e| Error::InvalidData(e.to_string()))?,
        checked_in_at: row.try_get("checked_in_at")?,
        checked_in_by: checked_in_by.map(UserId::from),
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl TicketRepository for PgTicketRepository {
    #[instrument(skip(self))]
    async fn find_by_id(&self, id: TicketId) -> ApplicationResult<Option<Ticket>> {
        let row = sqlx::query(&format!("SELECT {} FROM tickets WHERE id = $1", COLUMNS))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(row.as_ref().map(row_to_ticket).transpose()?)
    }

    #[instrument(skip(self))]
    async fn find_by_order(&self, order_id: OrderId) -> ApplicationResult<Vec<Ticket>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM tickets WHERE order_id = $1 ORDER BY created_at, id",
            COLUMNS
        ))
        .bind(order_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.iter().map(row_to_ticket).collect::<Result<Vec<_>>>()?)
    }

    #[instrument(skip(self))]
    async fn find_by_edition(&self, edition_id: EditionId) -> ApplicationResult<Vec<Ticket>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM tickets WHERE edition_id = $1 ORDER BY created_at, id",
            COLUMNS
        ))
        .bind(edition_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.iter().map(row_to_ticket).collect::<Result<Vec<_>>>()?)
    }

    #[instrument(skip(self))]
    async fn find_by_ticket_number(
        &self,
        ticket_number: &str,
    ) -> ApplicationResult<Option<Ticket>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM tickets WHERE ticket_number = $1",
            COLUMNS
        ))
        .bind(ticket_number)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.as_ref().map(row_to_ticket).transpose()?)
    }

    #[instrument(skip(self, ticket), fields(ticket_number = %ticket.ticket_number))]
    async fn create(&self, ticket: NewTicket) -> ApplicationResult<Ticket> {
        let ticket = ticket.into_ticket(Utc::now());

        sqlx::query(
            r#"
            INSERT INTO tickets (
                id, order_id, ticket_type_id, edition_id, attendee_email,
                attendee_first_name, attendee_last_name, ticket_number, qr_code,
                status, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $11)
            "#,
        )
        .bind(ticket.id.as_uuid())
        .bind(ticket.order_id.as_uuid())
        .bind(ticket.ticket_type_id.as_uuid())
        .bind(ticket.edition_id.as_uuid())
        .bind(&ticket.attendee_email)
        .bind(&ticket.attendee_first_name)
        .bind(&ticket.attendee_last_name)
        .bind(&ticket.ticket_number)
        .bind(&ticket.qr_code)
        .bind(ticket.status.as_str())
        .bind(ticket.created_at)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        debug!(ticket_id = %ticket.id, "Ticket created");
        Ok(ticket)
    }

    #[instrument(skip(self))]
    async fn update_status(&self, id: TicketId, status: TicketStatus) -> ApplicationResult<Ticket> {
        let row = sqlx::query(&format!(
            "UPDATE tickets SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING {}",
            COLUMNS
        ))
        .bind(id.as_uuid())
        .bind(status.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?
        .ok_or_else(|| Error::NotFound(format!("Ticket {}", id)))?;

        debug!(ticket_id = %id, %status, "Ticket status updated");
        Ok(row_to_ticket(&row)?)
    }

    #[instrument(skip(self))]
    async fn check_in(&self, id: TicketId, staff_id: UserId) -> ApplicationResult<Ticket> {
        // Only a valid ticket can be stamped; two scanners racing on the same
        // ticket see exactly one success.
        let row = sqlx::query(&format!(
            r#"
            UPDATE tickets
            SET status = 'used', checked_in_at = NOW(), checked_in_by = $2, updated_at = NOW()
            WHERE id = $1 AND status = 'valid'
            RETURNING {}
            "#,
            COLUMNS
        ))
        .bind(id.as_uuid())
        .bind(staff_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        match row {
            Some(row) => Ok(row_to_ticket(&row)?),
            None => {
                let current = self
                    .find_by_id(id)
                    .await?
                    .ok_or_else(|| ApplicationError::NotFound(format!("Ticket {}", id)))?;
                Err(ApplicationError::invalid_state(
                    format!("Ticket {}", current.ticket_number),
                    "checked in",
                    current.status,
                ))
            }
        }
    }

    #[instrument(skip(self))]
    async fn count_by_edition(&self, edition_id: EditionId) -> ApplicationResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tickets WHERE edition_id = $1")
            .bind(edition_id.as_uuid())
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(count as u64)
    }
}
