//! Order item repository implementation.

use async_trait::async_trait;
use sqlx::{postgres::PgRow, PgPool, Row};
use tracing::{debug, instrument};
use uuid::Uuid;

use ticketing_application::ports::OrderItemRepository;
use ticketing_application::ApplicationResult;
use ticketing_domain::{OrderId, OrderItem, OrderItemId, TicketTypeId};

use super::to_u32;
use crate::{Error, Result};

/// PostgreSQL implementation of OrderItemRepository.
#[derive(Clone)]
pub struct PgOrderItemRepository {
    pool: PgPool,
}

impl PgOrderItemRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn row_to_order_item(row: &PgRow) -> Result<OrderItem> {
    let id: Uuid = row.try_get("id")?;
    let order_id: Uuid = row.try_get("order_id")?;
    let ticket_type_id: Uuid = row.try_get("ticket_type_id")?;

    Ok(OrderItem {
        id: OrderItemId::from(id),
        order_id: OrderId::from(order_id),
        ticket_type_id: TicketTypeId::from(ticket_type_id),
        ticket_type_name: row.try_get("ticket_type_name")?,
        quantity: to_u32(row.try_get("quantity")?, "quantity")?,
        unit_price: row.try_get("unit_price")?,
        total_price: row.try_get("total_price")?,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl OrderItemRepository for PgOrderItemRepository {
    #[instrument(skip(self))]
    async fn find_by_order(&self, order_id: OrderId) -> ApplicationResult<Vec<OrderItem>> {
        let rows = sqlx::query(
            r#"
            SELECT id, order_id, ticket_type_id, ticket_type_name, quantity,
                   unit_price, total_price, created_at
            FROM order_items
            WHERE order_id = $1
            ORDER BY created_at, id
            "#,
        )
        .bind(order_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.iter().map(row_to_order_item).collect::<Result<Vec<_>>>()?)
    }

    #[instrument(skip(self, item), fields(order_id = %item.order_id, ticket_type_id = %item.ticket_type_id))]
    async fn create(&self, item: OrderItem) -> ApplicationResult<OrderItem> {
        sqlx::query(
            r#"
            INSERT INTO order_items (
                id, order_id, ticket_type_id, ticket_type_name, quantity,
                unit_price, total_price, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(item.id.as_uuid())
        .bind(item.order_id.as_uuid())
        .bind(item.ticket_type_id.as_uuid())
        .bind(&item.ticket_type_name)
        .bind(i64::from(item.quantity))
        .bind(item.unit_price)
        .bind(item.total_price)
        .bind(item.created_at)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        debug!(order_item_id = %item.id, "Order item created");
        Ok(item)
    }
}
