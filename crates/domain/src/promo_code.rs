//! Promotional codes, their derived status and usage records.

use crate::errors::{DomainError, DomainResult};
use crate::identifiers::{EditionId, OrderId, PromoCodeId, PromoCodeUsageId, TicketTypeId, UserId};
use crate::money::Amount;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

/// Minimum length of a normalized code
pub const MIN_CODE_LENGTH: usize = 3;
/// Maximum length of a normalized code
pub const MAX_CODE_LENGTH: usize = 50;

static CODE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z0-9_-]{3,50}$").unwrap());

/// Trim and uppercase a user supplied code.
///
/// Lookups and storage always use the normalized form.
pub fn normalize_code(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// Normalize and check the code format (3–50 chars of `A-Z 0-9 _ -`)
pub fn parse_code(raw: &str) -> DomainResult<String> {
    let code = normalize_code(raw);
    if CODE_REGEX.is_match(&code) {
        Ok(code)
    } else {
        Err(DomainError::InvalidPromoCode(format!(
            "'{}' must be {}-{} characters of A-Z, 0-9, '_' or '-'",
            raw, MIN_CODE_LENGTH, MAX_CODE_LENGTH
        )))
    }
}

/// How the discount value is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    /// `value` percent of the applicable amount
    Percentage,
    /// `value` minor units, capped at the applicable amount
    Fixed,
    /// The whole applicable amount
    Free,
}

impl DiscountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Percentage => "percentage",
            Self::Fixed => "fixed",
            Self::Free => "free",
        }
    }
}

impl Display for DiscountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DiscountType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "percentage" => Ok(Self::Percentage),
            "fixed" => Ok(Self::Fixed),
            "free" => Ok(Self::Free),
            other => Err(DomainError::InvalidPromoDefinition {
                field: "discount_type".to_string(),
                message: format!("unknown discount type '{}'", other),
            }),
        }
    }
}

/// Derived status of a promo code; never stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromoCodeStatus {
    Active,
    Inactive,
    Expired,
    Exhausted,
}

/// A discount rule scoped to an edition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromoCode {
    pub id: PromoCodeId,
    pub edition_id: EditionId,
    /// Normalized uppercase code
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub discount_type: DiscountType,
    pub discount_value: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_order_amount: Option<Amount>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_usage_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_usage_per_person: Option<u32>,
    /// Empty means every ticket type of the edition
    #[serde(default)]
    pub applicable_ticket_type_ids: Vec<TicketTypeId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub starts_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    pub current_usage_count: u32,
    pub is_active: bool,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PromoCode {
    /// inactive, then expired, then exhausted, otherwise active
    pub fn status(&self, now: DateTime<Utc>) -> PromoCodeStatus {
        if !self.is_active {
            PromoCodeStatus::Inactive
        } else if self.expires_at.is_some_and(|expires| now > expires) {
            PromoCodeStatus::Expired
        } else if self
            .max_usage_count
            .is_some_and(|max| self.current_usage_count >= max)
        {
            PromoCodeStatus::Exhausted
        } else {
            PromoCodeStatus::Active
        }
    }

    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        self.status(now) == PromoCodeStatus::Active
    }

    /// Whether the code is limited to a subset of ticket types
    pub fn is_restricted(&self) -> bool {
        !self.applicable_ticket_type_ids.is_empty()
    }

    pub fn applies_to(&self, ticket_type_id: &TicketTypeId) -> bool {
        !self.is_restricted() || self.applicable_ticket_type_ids.contains(ticket_type_id)
    }

    /// Remaining global redemptions, `None` when unlimited
    pub fn remaining_uses(&self) -> Option<u32> {
        self.max_usage_count
            .map(|max| max.saturating_sub(self.current_usage_count))
    }
}

/// Fields required to create a promo code
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPromoCode {
    pub edition_id: EditionId,
    pub code: String,
    pub description: Option<String>,
    pub discount_type: DiscountType,
    pub discount_value: i64,
    pub min_order_amount: Option<Amount>,
    pub max_usage_count: Option<u32>,
    pub max_usage_per_person: Option<u32>,
    pub applicable_ticket_type_ids: Vec<TicketTypeId>,
    pub starts_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_by: UserId,
}

impl NewPromoCode {
    /// Check the definition rules and normalize the code
    pub fn validate(mut self) -> DomainResult<Self> {
        self.code = parse_code(&self.code)?;

        match self.discount_type {
            DiscountType::Percentage if !(0..=100).contains(&self.discount_value) => {
                return Err(invalid_definition(
                    "discount_value",
                    "percentage must be between 0 and 100",
                ));
            }
            DiscountType::Fixed if self.discount_value < 0 => {
                return Err(invalid_definition(
                    "discount_value",
                    "fixed discount cannot be negative",
                ));
            }
            _ => {}
        }

        if self.min_order_amount.is_some_and(|min| min < 0) {
            return Err(invalid_definition(
                "min_order_amount",
                "minimum order amount cannot be negative",
            ));
        }
        if self.max_usage_count == Some(0) {
            return Err(invalid_definition("max_usage_count", "must be at least 1"));
        }
        if self.max_usage_per_person == Some(0) {
            return Err(invalid_definition("max_usage_per_person", "must be at least 1"));
        }
        if let (Some(starts), Some(expires)) = (self.starts_at, self.expires_at) {
            if starts >= expires {
                return Err(invalid_definition("expires_at", "must be after starts_at"));
            }
        }

        Ok(self)
    }

    /// Materialize with a zero usage count; call [`NewPromoCode::validate`] first
    pub fn into_promo_code(self, now: DateTime<Utc>) -> PromoCode {
        PromoCode {
            id: PromoCodeId::new(),
            edition_id: self.edition_id,
            code: self.code,
            description: self.description,
            discount_type: self.discount_type,
            discount_value: self.discount_value,
            min_order_amount: self.min_order_amount,
            max_usage_count: self.max_usage_count,
            max_usage_per_person: self.max_usage_per_person,
            applicable_ticket_type_ids: self.applicable_ticket_type_ids,
            starts_at: self.starts_at,
            expires_at: self.expires_at,
            current_usage_count: 0,
            is_active: self.is_active,
            created_by: self.created_by,
            created_at: now,
            updated_at: now,
        }
    }
}

fn invalid_definition(field: &str, message: &str) -> DomainError {
    DomainError::InvalidPromoDefinition {
        field: field.to_string(),
        message: message.to_string(),
    }
}

/// Immutable audit record of one redemption
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromoCodeUsage {
    pub id: PromoCodeUsageId,
    pub promo_code_id: PromoCodeId,
    pub order_id: OrderId,
    pub email: String,
    pub discount_amount: Amount,
    pub used_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn new_code(discount_type: DiscountType, value: i64) -> NewPromoCode {
        NewPromoCode {
            edition_id: EditionId::new(),
            code: " early-bird ".to_string(),
            description: None,
            discount_type,
            discount_value: value,
            min_order_amount: None,
            max_usage_count: None,
            max_usage_per_person: None,
            applicable_ticket_type_ids: vec![],
            starts_at: None,
            expires_at: None,
            is_active: true,
            created_by: UserId::new(),
        }
    }

    #[test]
    fn test_normalize_and_parse() {
        assert_eq!(normalize_code("  summer25 "), "SUMMER25");
        assert_eq!(parse_code("vip_2025").unwrap(), "VIP_2025");
        assert!(parse_code("ab").is_err());
        assert!(parse_code(&"x".repeat(51)).is_err());
        assert!(parse_code("has space").is_err());
    }

    #[test]
    fn test_definition_rules() {
        let validated = new_code(DiscountType::Percentage, 20).validate().unwrap();
        assert_eq!(validated.code, "EARLY-BIRD");

        assert!(new_code(DiscountType::Percentage, 101).validate().is_err());
        assert!(new_code(DiscountType::Fixed, -1).validate().is_err());
        assert!(new_code(DiscountType::Free, 0).validate().is_ok());

        let mut zero_cap = new_code(DiscountType::Fixed, 500);
        zero_cap.max_usage_count = Some(0);
        assert!(zero_cap.validate().is_err());

        let now = Utc::now();
        let mut inverted = new_code(DiscountType::Fixed, 500);
        inverted.starts_at = Some(now);
        inverted.expires_at = Some(now - Duration::days(1));
        assert!(inverted.validate().is_err());
    }

    #[test]
    fn test_status_precedence() {
        let now = Utc::now();
        let mut code = new_code(DiscountType::Fixed, 500)
            .validate()
            .unwrap()
            .into_promo_code(now);
        assert_eq!(code.status(now), PromoCodeStatus::Active);

        code.max_usage_count = Some(1);
        code.current_usage_count = 1;
        assert_eq!(code.status(now), PromoCodeStatus::Exhausted);
        assert_eq!(code.remaining_uses(), Some(0));

        code.expires_at = Some(now - Duration::seconds(1));
        assert_eq!(code.status(now), PromoCodeStatus::Expired);

        code.is_active = false;
        assert_eq!(code.status(now), PromoCodeStatus::Inactive);
        assert!(!code.is_valid(now));
    }

    #[test]
    fn test_expiry_is_exclusive_of_the_instant() {
        let now = Utc::now();
        let mut code = new_code(DiscountType::Free, 0)
            .validate()
            .unwrap()
            .into_promo_code(now);
        code.expires_at = Some(now);
        assert_eq!(code.status(now), PromoCodeStatus::Active);
    }
}
