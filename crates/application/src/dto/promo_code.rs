//! Promo code DTOs

use crate::validation::{Validatable, ValidationResult, ValidatorExt};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ticketing_domain::{
    Amount, DiscountType, EditionId, NewPromoCode, OrderDiscount, OrderId, PromoCode,
    PromoCodeErrorCode, PromoCodeId, PromoCodeStatus, TicketTypeId, UserId,
};
use validator::Validate;

/// Organizer request to create a promo code
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreatePromoCodeInput {
    pub edition_id: EditionId,
    #[validate(length(min = 3, max = 50, message = "must be 3-50 characters"))]
    pub code: String,
    #[validate(length(max = 500))]
    pub description: Option<String>,
    pub discount_type: DiscountType,
    pub discount_value: i64,
    pub min_order_amount: Option<Amount>,
    pub max_usage_count: Option<u32>,
    pub max_usage_per_person: Option<u32>,
    #[serde(default)]
    pub applicable_ticket_type_ids: Vec<TicketTypeId>,
    pub starts_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    pub created_by: UserId,
}

fn default_active() -> bool {
    true
}

impl Validatable for CreatePromoCodeInput {
    fn validate_all(&self) -> ValidationResult {
        self.to_validation_result()
    }
}

impl From<CreatePromoCodeInput> for NewPromoCode {
    fn from(input: CreatePromoCodeInput) -> Self {
        NewPromoCode {
            edition_id: input.edition_id,
            code: input.code,
            description: input.description,
            discount_type: input.discount_type,
            discount_value: input.discount_value,
            min_order_amount: input.min_order_amount,
            max_usage_count: input.max_usage_count,
            max_usage_per_person: input.max_usage_per_person,
            applicable_ticket_type_ids: input.applicable_ticket_type_ids,
            starts_at: input.starts_at,
            expires_at: input.expires_at,
            is_active: input.is_active,
            created_by: input.created_by,
        }
    }
}

/// Answer to "can this buyer use this code on this order"
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromoCodeValidation {
    pub valid: bool,
    pub promo_code: Option<PromoCode>,
    pub error_code: Option<PromoCodeErrorCode>,
    pub message: Option<String>,
}

impl PromoCodeValidation {
    pub fn accepted(promo_code: PromoCode) -> Self {
        Self {
            valid: true,
            promo_code: Some(promo_code),
            error_code: None,
            message: None,
        }
    }

    pub fn rejected(error_code: PromoCodeErrorCode, promo_code: Option<PromoCode>) -> Self {
        Self {
            valid: false,
            promo_code,
            error_code: Some(error_code),
            message: Some(error_code.message().to_string()),
        }
    }
}

/// Discount stored on a pending order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedPromoCode {
    pub order_id: OrderId,
    pub promo_code_id: PromoCodeId,
    pub code: String,
    pub discount: OrderDiscount,
}

/// Promo code with its derived status, for listings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromoCodeSummary {
    pub promo_code: PromoCode,
    pub status: PromoCodeStatus,
    pub remaining_uses: Option<u32>,
}
