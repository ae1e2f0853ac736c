//! Promo code eligibility checks and discount math.
//!
//! Everything here is pure: callers supply the clock reading and the buyer's
//! previous usage count, so the same inputs always give the same answer.

use crate::identifiers::TicketTypeId;
use crate::money::Amount;
use crate::promo_code::{DiscountType, PromoCode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt::{self, Display};

/// Why a promo code was rejected.
///
/// Variants are declared in the order the checks run; when several rules fail
/// at once the earliest one is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromoCodeErrorCode {
    NotFound,
    Inactive,
    NotStarted,
    Expired,
    Exhausted,
    MaxPerPersonReached,
    MinOrderNotMet,
    TicketTypeNotApplicable,
}

impl PromoCodeErrorCode {
    /// Stable machine-readable code for client branching
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::Inactive => "inactive",
            Self::NotStarted => "not_started",
            Self::Expired => "expired",
            Self::Exhausted => "exhausted",
            Self::MaxPerPersonReached => "max_per_person_reached",
            Self::MinOrderNotMet => "min_order_not_met",
            Self::TicketTypeNotApplicable => "ticket_type_not_applicable",
        }
    }

    /// Human-readable explanation shown to the buyer
    pub fn message(&self) -> &'static str {
        match self {
            Self::NotFound => "Promo code not found",
            Self::Inactive => "This promo code is no longer active",
            Self::NotStarted => "This promo code is not valid yet",
            Self::Expired => "This promo code has expired",
            Self::Exhausted => "This promo code has reached its usage limit",
            Self::MaxPerPersonReached => "You have already used this promo code the maximum number of times",
            Self::MinOrderNotMet => "Order amount is below the minimum required for this promo code",
            Self::TicketTypeNotApplicable => "This promo code does not apply to the selected tickets",
        }
    }
}

impl Display for PromoCodeErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Order context a promo code is checked against
#[derive(Debug, Clone)]
pub struct PromoValidationInput<'a> {
    pub order_amount: Amount,
    pub buyer_email: &'a str,
    pub ticket_type_ids: &'a [TicketTypeId],
    /// Redemptions already recorded for this buyer and code
    pub user_usage_count: u32,
    pub now: DateTime<Utc>,
}

/// Run the eligibility checks in their fixed order, stopping at the first failure:
///
/// 1. code exists
/// 2. code is active
/// 3. start date reached
/// 4. not past expiry
/// 5. global usage cap not reached
/// 6. per-person cap not reached
/// 7. minimum order amount met
/// 8. at least one requested ticket type is eligible
pub fn validate_promo_code<'c>(
    code: Option<&'c PromoCode>,
    input: &PromoValidationInput<'_>,
) -> Result<&'c PromoCode, PromoCodeErrorCode> {
    let code = code.ok_or(PromoCodeErrorCode::NotFound)?;

    if !code.is_active {
        return Err(PromoCodeErrorCode::Inactive);
    }
    if code.starts_at.is_some_and(|starts| input.now < starts) {
        return Err(PromoCodeErrorCode::NotStarted);
    }
    if code.expires_at.is_some_and(|expires| input.now > expires) {
        return Err(PromoCodeErrorCode::Expired);
    }
    if code
        .max_usage_count
        .is_some_and(|max| code.current_usage_count >= max)
    {
        return Err(PromoCodeErrorCode::Exhausted);
    }
    if code
        .max_usage_per_person
        .is_some_and(|max| input.user_usage_count >= max)
    {
        return Err(PromoCodeErrorCode::MaxPerPersonReached);
    }
    if code
        .min_order_amount
        .is_some_and(|min| input.order_amount < min)
    {
        return Err(PromoCodeErrorCode::MinOrderNotMet);
    }
    if code.is_restricted()
        && !input
            .ticket_type_ids
            .iter()
            .any(|id| code.applicable_ticket_type_ids.contains(id))
    {
        return Err(PromoCodeErrorCode::TicketTypeNotApplicable);
    }

    Ok(code)
}

/// Discount for `order_amount`, or for `applicable_amount` when the code only
/// covers part of the order.
///
/// The result always lies in `[0, base]`.
pub fn calculate_discount(
    code: &PromoCode,
    order_amount: Amount,
    applicable_amount: Option<Amount>,
) -> Amount {
    let base = applicable_amount.unwrap_or(order_amount).max(0);
    let discount = match code.discount_type {
        DiscountType::Percentage => percentage_of(base, code.discount_value),
        DiscountType::Fixed => code.discount_value.min(base),
        DiscountType::Free => base,
    };
    discount.clamp(0, base)
}

/// Half-up rounding of `base * percent / 100` without leaving integers
fn percentage_of(base: Amount, percent: i64) -> Amount {
    let scaled = i128::from(base) * i128::from(percent.max(0)) + 50;
    let rounded = scaled / 100;
    Amount::try_from(rounded).unwrap_or(Amount::MAX)
}

/// Outcome of pricing an order with a promo code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDiscount {
    /// Amount the discount was computed on
    pub applicable_amount: Amount,
    pub discount_amount: Amount,
    /// `max(0, order_amount - discount_amount)`
    pub final_amount: Amount,
}

/// Price a whole order.
///
/// A code restricted to some ticket types only discounts the amounts of those
/// types (zero when none of them is in the order).
pub fn calculate_order_discount(
    code: &PromoCode,
    order_amount: Amount,
    ticket_type_ids: &[TicketTypeId],
    ticket_amounts_by_type: &HashMap<TicketTypeId, Amount>,
) -> OrderDiscount {
    let applicable_amount = if code.is_restricted() {
        // each type counts once, however often it is listed
        let distinct: HashSet<&TicketTypeId> = ticket_type_ids.iter().collect();
        distinct
            .into_iter()
            .filter(|id| code.applicable_ticket_type_ids.contains(id))
            .filter_map(|id| ticket_amounts_by_type.get(id))
            .fold(0, |acc: Amount, amount| acc.saturating_add(*amount))
    } else {
        order_amount
    };

    let discount_amount = calculate_discount(code, order_amount, Some(applicable_amount))
        .min(order_amount.max(0));

    OrderDiscount {
        applicable_amount,
        discount_amount,
        final_amount: (order_amount - discount_amount).max(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifiers::{EditionId, PromoCodeId, UserId};

    fn code(discount_type: DiscountType, value: i64) -> PromoCode {
        let now = Utc::now();
        PromoCode {
            id: PromoCodeId::new(),
            edition_id: EditionId::new(),
            code: "TEST".to_string(),
            description: None,
            discount_type,
            discount_value: value,
            min_order_amount: None,
            max_usage_count: None,
            max_usage_per_person: None,
            applicable_ticket_type_ids: vec![],
            starts_at: None,
            expires_at: None,
            current_usage_count: 0,
            is_active: true,
            created_by: UserId::new(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_percentage_rounds_half_up() {
        let c = code(DiscountType::Percentage, 15);
        // 15% of 999 = 149.85
        assert_eq!(calculate_discount(&c, 999, None), 150);
        // 15% of 10 = 1.5
        assert_eq!(calculate_discount(&c, 10, None), 2);
        // 15% of 3 = 0.45
        assert_eq!(calculate_discount(&c, 3, None), 0);
    }

    #[test]
    fn test_applicable_amount_overrides_order_amount() {
        let c = code(DiscountType::Free, 0);
        assert_eq!(calculate_discount(&c, 10_000, Some(2_500)), 2_500);
        assert_eq!(calculate_discount(&c, 10_000, None), 10_000);
    }

    #[test]
    fn test_restricted_code_without_matching_types() {
        let mut c = code(DiscountType::Percentage, 50);
        c.applicable_ticket_type_ids = vec![TicketTypeId::new()];
        let other = TicketTypeId::new();
        let amounts = HashMap::from([(other, 8_000)]);

        let result = calculate_order_discount(&c, 8_000, &[other], &amounts);
        assert_eq!(result.applicable_amount, 0);
        assert_eq!(result.discount_amount, 0);
        assert_eq!(result.final_amount, 8_000);
    }

    #[test]
    fn test_error_code_strings() {
        assert_eq!(PromoCodeErrorCode::MaxPerPersonReached.as_str(), "max_per_person_reached");
        assert_eq!(
            serde_json::to_string(&PromoCodeErrorCode::TicketTypeNotApplicable).unwrap(),
            "\"ticket_type_not_applicable\""
        );
    }
}
