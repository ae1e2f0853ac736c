//! Promo code repository implementation.
//!
//! Codes are stored in their normalized (trimmed, uppercase) form; usage rows
//! keep the buyer email as given and are matched case-insensitively.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{postgres::PgRow, PgPool, Row};
use tracing::{debug, instrument};
use uuid::Uuid;

use ticketing_application::ports::PromoCodeRepository;
use ticketing_application::ApplicationResult;
use ticketing_domain::{
    Amount, DiscountType, EditionId, NewPromoCode, OrderId, PromoCode, PromoCodeId,
    PromoCodeUsage, PromoCodeUsageId, TicketTypeId, UserId,
};

use super::to_u32;
use crate::{Error, Result};

const COLUMNS: &str = "id, edition_id, code, description, discount_type, discount_value, \
    min_order_amount, max_usage_count, max_usage_per_person, applicable_ticket_type_ids, \
    starts_at, expires_at, current_usage_count, is_active, created_by, created_at, updated_at";

/// PostgreSQL implementation of PromoCodeRepository.
#[derive(Clone)]
pub struct PgPromoCodeRepository {
    pool: PgPool,
}

impl PgPromoCodeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn optional_u32(value: Option<i64>, column: &str) -> Result<Option<u32>> {
    value.map(|v| to_u32(v, column)).transpose()
}

fn row_to_promo_code(row: &PgRow) -> Result<PromoCode> {
    let id: Uuid = row.try_get("id")?;
    let edition_id: Uuid = row.try_get("edition_id")?;
    let discount_type: String = row.try_get("discount_type")?;
    let applicable: Vec<Uuid> = row.try_get("applicable_ticket_type_ids")?;
    let created_by: Uuid = row.try_get("created_by")?;

    Ok(PromoCode {
        id: PromoCodeId::from(id),
        edition_id: EditionId::from(edition_id),
        code: row.try_get("code")?,
        description: row.try_get("description")?,
        discount_type: discount_type
            .parse::<DiscountType>()
            .map_err(|e| Error::InvalidData(e.to_string()))?,
        discount_value: row.try_get("discount_value")?,
        min_order_amount: row.try_get("min_order_amount")?,
        max_usage_count: optional_u32(row.try_get("max_usage_count")?, "max_usage_count")?,
        max_usage_per_person: optional_u32(
            row.try_get("max_usage_per_person")?,
            "max_usage_per_person",
        )?,
        applicable_ticket_type_ids: applicable.into_iter().map(TicketTypeId::from).collect(),
        starts_at: row.try_get("starts_at")?,
        expires_at: row.try_get("expires_at")?,
        current_usage_count: to_u32(row.try_get("current_usage_count")?, "current_usage_count")?,
        is_active: row.try_get("is_active")?,
        created_by: UserId::from(created_by),
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_usage(row: &PgRow) -> Result<PromoCodeUsage> {
    let id: Uuid = row.try_get("id")?;
    let promo_code_id: Uuid = row.try_get("promo_code_id")?;
    let order_id: Uuid = row.try_get("order_id")?;

    Ok(PromoCodeUsage {
        id: PromoCodeUsageId::from(id),
        promo_code_id: PromoCodeId::from(promo_code_id),
        order_id: OrderId::from(order_id),
        email: row.try_get("email")?,
        discount_amount: row.try_get("discount_amount")?,
        used_at: row.try_get("used_at")?,
    })
}

#[async_trait]
impl PromoCodeRepository for PgPromoCodeRepository {
    #[instrument(skip(self))]
    async fn find_by_id(&self, id: PromoCodeId) -> ApplicationResult<Option<PromoCode>> {
        let row = sqlx::query(&format!("SELECT {} FROM promo_codes WHERE id = $1", COLUMNS))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(row.as_ref().map(row_to_promo_code).transpose()?)
    }

    #[instrument(skip(self))]
    async fn find_by_code(
        &self,
        edition_id: EditionId,
        code: &str,
    ) -> ApplicationResult<Option<PromoCode>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM promo_codes WHERE edition_id = $1 AND code = $2",
            COLUMNS
        ))
        .bind(edition_id.as_uuid())
        .bind(code)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.as_ref().map(row_to_promo_code).transpose()?)
    }

    #[instrument(skip(self))]
    async fn find_by_edition(&self, edition_id: EditionId) -> ApplicationResult<Vec<PromoCode>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM promo_codes WHERE edition_id = $1 ORDER BY code",
            COLUMNS
        ))
        .bind(edition_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.iter().map(row_to_promo_code).collect::<Result<Vec<_>>>()?)
    }

    #[instrument(skip(self, promo_code), fields(code = %promo_code.code))]
    async fn create(&self, promo_code: NewPromoCode) -> ApplicationResult<PromoCode> {
        let promo_code = promo_code.into_promo_code(Utc::now());
        let applicable: Vec<Uuid> = promo_code
            .applicable_ticket_type_ids
            .iter()
            .map(|id| *id.as_uuid())
            .collect();

        sqlx::query(
            r#"
            INSERT INTO promo_codes (
                id, edition_id, code, description, discount_type, discount_value,
                min_order_amount, max_usage_count, max_usage_per_person,
                applicable_ticket_type_ids, starts_at, expires_at, current_usage_count,
                is_active, created_by, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, 0, $13, $14, $15, $15)
            "#,
        )
        .bind(promo_code.id.as_uuid())
        .bind(promo_code.edition_id.as_uuid())
        .bind(&promo_code.code)
        .bind(&promo_code.description)
        .bind(promo_code.discount_type.as_str())
        .bind(promo_code.discount_value)
        .bind(promo_code.min_order_amount)
        .bind(promo_code.max_usage_count.map(i64::from))
        .bind(promo_code.max_usage_per_person.map(i64::from))
        .bind(&applicable)
        .bind(promo_code.starts_at)
        .bind(promo_code.expires_at)
        .bind(promo_code.is_active)
        .bind(promo_code.created_by.as_uuid())
        .bind(promo_code.created_at)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        debug!(promo_code_id = %promo_code.id, "Promo code created");
        Ok(promo_code)
    }

    #[instrument(skip(self))]
    async fn set_active(&self, id: PromoCodeId, is_active: bool) -> ApplicationResult<PromoCode> {
        let row = sqlx::query(&format!(
            "UPDATE promo_codes SET is_active = $2, updated_at = NOW() WHERE id = $1 RETURNING {}",
            COLUMNS
        ))
        .bind(id.as_uuid())
        .bind(is_active)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?
        .ok_or_else(|| Error::NotFound(format!("Promo code {}", id)))?;

        Ok(row_to_promo_code(&row)?)
    }

    #[instrument(skip(self))]
    async fn increment_usage_count(&self, id: PromoCodeId) -> ApplicationResult<PromoCode> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE promo_codes
            SET current_usage_count = current_usage_count + 1, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            COLUMNS
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?
        .ok_or_else(|| Error::NotFound(format!("Promo code {}", id)))?;

        let promo_code = row_to_promo_code(&row)?;
        debug!(usage_count = promo_code.current_usage_count, "Promo code usage counted");
        Ok(promo_code)
    }

    #[instrument(skip(self, email))]
    async fn create_usage(
        &self,
        promo_code_id: PromoCodeId,
        order_id: OrderId,
        email: &str,
        discount_amount: Amount,
    ) -> ApplicationResult<PromoCodeUsage> {
        let usage = PromoCodeUsage {
            id: PromoCodeUsageId::new(),
            promo_code_id,
            order_id,
            email: email.to_string(),
            discount_amount,
            used_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO promo_code_usages (id, promo_code_id, order_id, email, discount_amount, used_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(usage.id.as_uuid())
        .bind(usage.promo_code_id.as_uuid())
        .bind(usage.order_id.as_uuid())
        .bind(&usage.email)
        .bind(usage.discount_amount)
        .bind(usage.used_at)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(usage)
    }

    #[instrument(skip(self, email))]
    async fn count_usages_by_email(
        &self,
        promo_code_id: PromoCodeId,
        email: &str,
    ) -> ApplicationResult<u32> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM promo_code_usages WHERE promo_code_id = $1 AND LOWER(email) = LOWER($2)",
        )
        .bind(promo_code_id.as_uuid())
        .bind(email)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(to_u32(count, "usage count")?)
    }

    #[instrument(skip(self))]
    async fn find_usages(&self, promo_code_id: PromoCodeId) -> ApplicationResult<Vec<PromoCodeUsage>> {
        let rows = sqlx::query(
            r#"
            SELECT id, promo_code_id, order_id, email, discount_amount, used_at
            FROM promo_code_usages
            WHERE promo_code_id = $1
            ORDER BY used_at, id
            "#,
        )
        .bind(promo_code_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.iter().map(row_to_usage).collect::<Result<Vec<_>>>()?)
    }
}
