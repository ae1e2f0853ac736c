//! Order repository implementation.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{postgres::PgRow, PgPool, Row};
use tracing::{debug, instrument};
use uuid::Uuid;

use ticketing_application::ports::OrderRepository;
use ticketing_application::ApplicationResult;
use ticketing_domain::{
    Amount, EditionId, NewOrder, Order, OrderId, OrderStatus, PaymentInfo, PromoCodeId,
};

use super::parse_currency;
use crate::{Error, Result};

const COLUMNS: &str = "id, edition_id, order_number, buyer_email, buyer_first_name, \
    buyer_last_name, status, total_amount, discount_amount, promo_code_id, currency, \
    payment_provider, payment_reference, payment_intent_id, paid_at, cancelled_at, \
    refunded_at, created_at, updated_at";

/// PostgreSQL implementation of OrderRepository.
#[derive(Clone)]
pub struct PgOrderRepository {
    pool: PgPool,
}

impl PgOrderRepository {
    /// Create a new PostgreSQL order repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_one_where(&self, clause: &str, bind: &str) -> Result<Option<Order>> {
        let row = sqlx::query(&format!("SELECT {} FROM orders WHERE {}", COLUMNS, clause))
            .bind(bind)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_order).transpose()
    }
}

/// Convert a database row to an Order.
fn row_to_order(row: &PgRow) -> Result<Order> {
    let id: Uuid = row.try_get("id")?;
    let edition_id: Uuid = row.try_get("edition_id")?;
    let status: String = row.try_get("status")?;
    let promo_code_id: Option<Uuid> = row.try_get("promo_code_id")?;
    let currency: String = row.try_get("currency")?;

    Ok(Order {
        id: OrderId::from(id),
        edition_id: EditionId::from(edition_id),
        order_number: row.try_get("order_number")?,
        buyer_email: row.try_get("buyer_email")?,
        buyer_first_name: row.try_get("buyer_first_name")?,
        buyer_last_name: row.try_get("buyer_last_name")?,
        status: status
            .parse::<OrderStatus>()
            .map_err(|e| Error::InvalidData(e.to_string()))?,
        total_amount: row.try_get("total_amount")?,
        discount_amount: row.try_get("discount_amount")?,
        promo_code_id: promo_code_id.map(PromoCodeId::from),
        currency: parse_currency(&currency)?,
        payment_provider: row.try_get("payment_provider")?,
        payment_reference: row.try_get("payment_reference")?,
        payment_intent_id: row.try_get("payment_intent_id")?,
        paid_at: row.try_get("paid_at")?,
        cancelled_at: row.try_get("cancelled_at")?,
        refunded_at: row.try_get("refunded_at")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl OrderRepository for PgOrderRepository {
    #[instrument(skip(self))]
    async fn find_by_id(&self, id: OrderId) -> ApplicationResult<Option<Order>> {
        let row = sqlx::query(&format!("SELECT {} FROM orders WHERE id = $1", COLUMNS))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(row.as_ref().map(row_to_order).transpose()?)
    }

    #[instrument(skip(self))]
    async fn find_by_edition(&self, edition_id: EditionId) -> ApplicationResult<Vec<Order>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM orders WHERE edition_id = $1 ORDER BY created_at",
            COLUMNS
        ))
        .bind(edition_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.iter().map(row_to_order).collect::<Result<Vec<_>>>()?)
    }

    #[instrument(skip(self))]
    async fn find_by_email(&self, email: &str) -> ApplicationResult<Vec<Order>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM orders WHERE LOWER(buyer_email) = LOWER($1) ORDER BY created_at",
            COLUMNS
        ))
        .bind(email.trim())
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.iter().map(row_to_order).collect::<Result<Vec<_>>>()?)
    }

    #[instrument(skip(self))]
    async fn find_by_payment_reference(&self, reference: &str) -> ApplicationResult<Option<Order>> {
        Ok(self.fetch_one_where("payment_reference = $1", reference).await?)
    }

    #[instrument(skip(self, order), fields(order_number = %order.order_number))]
    async fn create(&self, order: NewOrder) -> ApplicationResult<Order> {
        let order = order.into_order(Utc::now());

        let row = sqlx::query(&format!(
            r#"
            INSERT INTO orders (
                id, edition_id, order_number, buyer_email, buyer_first_name,
                buyer_last_name, status, total_amount, discount_amount, currency,
                created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 0, $9, $10, $10)
            RETURNING {}
            "#,
            COLUMNS
        ))
        .bind(order.id.as_uuid())
        .bind(order.edition_id.as_uuid())
        .bind(&order.order_number)
        .bind(&order.buyer_email)
        .bind(&order.buyer_first_name)
        .bind(&order.buyer_last_name)
        .bind(order.status.as_str())
        .bind(order.total_amount)
        .bind(order.currency.as_str())
        .bind(order.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        debug!(order_id = %order.id, "Order created");
        Ok(row_to_order(&row)?)
    }

    #[instrument(skip(self))]
    async fn update_status(&self, id: OrderId, status: OrderStatus) -> ApplicationResult<Order> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE orders SET
                status = $2,
                paid_at = CASE WHEN $2 = 'paid' THEN NOW() ELSE paid_at END,
                cancelled_at = CASE WHEN $2 = 'cancelled' THEN NOW() ELSE cancelled_at END,
                refunded_at = CASE WHEN $2 = 'refunded' THEN NOW() ELSE refunded_at END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            COLUMNS
        ))
        .bind(id.as_uuid())
        .bind(status.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?
        .ok_or_else(|| Error::NotFound(format!("Order {}", id)))?;

        debug!(order_id = %id, %status, "Order status updated");
        Ok(row_to_order(&row)?)
    }

    #[instrument(skip(self, payment), fields(provider = %payment.provider))]
    async fn update_payment_info(
        &self,
        id: OrderId,
        payment: PaymentInfo,
    ) -> ApplicationResult<Order> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE orders SET
                payment_provider = $2,
                payment_reference = $3,
                payment_intent_id = COALESCE($4, payment_intent_id),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            COLUMNS
        ))
        .bind(id.as_uuid())
        .bind(&payment.provider)
        .bind(&payment.reference)
        .bind(&payment.payment_intent_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?
        .ok_or_else(|| Error::NotFound(format!("Order {}", id)))?;

        Ok(row_to_order(&row)?)
    }

    #[instrument(skip(self))]
    async fn update_discount(
        &self,
        id: OrderId,
        promo_code_id: Option<PromoCodeId>,
        discount_amount: Amount,
    ) -> ApplicationResult<Order> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE orders SET promo_code_id = $2, discount_amount = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            COLUMNS
        ))
        .bind(id.as_uuid())
        .bind(promo_code_id.map(Uuid::from))
        .bind(discount_amount)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?
        .ok_or_else(|| Error::NotFound(format!("Order {}", id)))?;

        Ok(row_to_order(&row)?)
    }

    #[instrument(skip(self))]
    async fn count_by_edition(&self, edition_id: EditionId) -> ApplicationResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE edition_id = $1")
            .bind(edition_id.as_uuid())
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(count as u64)
    }
}
