//! Promo Code Service
//!
//! Stateful side of the promo code engine: lookups, usage counting, applying a
//! code to a pending order and recording redemptions. Eligibility and discount
//! arithmetic live in `ticketing_domain::discount`.

use super::ServiceContext;
use crate::dto::{AppliedPromoCode, CreatePromoCodeInput, PromoCodeSummary, PromoCodeValidation};
use crate::validation::Validatable;
use crate::{ApplicationError, ApplicationResult};
use std::collections::HashMap;
use ticketing_domain::promo_code::normalize_code;
use ticketing_domain::{
    calculate_order_discount, validate_promo_code, Amount, EditionId, LifecycleEvent,
    NewPromoCode, Order, OrderId, OrderStatus, PromoCode, PromoCodeErrorCode, PromoCodeId,
    PromoCodeUsage, PromoValidationInput, TicketTypeId,
};
use tracing::{debug, info, instrument, warn};

/// Promo code service
#[derive(Clone)]
pub struct PromoCodeService {
    ctx: ServiceContext,
}

impl PromoCodeService {
    pub fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    /// Create a promo code after checking its definition
    #[instrument(skip(self, input), fields(edition_id = %input.edition_id, code = %input.code))]
    pub async fn create_promo_code(&self, input: CreatePromoCodeInput) -> ApplicationResult<PromoCode> {
        input.validate_all().ensure_valid()?;
        let new_code = NewPromoCode::from(input).validate()?;

        let repo = &self.ctx.repositories.promo_codes;
        if repo
            .find_by_code(new_code.edition_id, &new_code.code)
            .await?
            .is_some()
        {
            return Err(ApplicationError::Conflict(format!(
                "Promo code '{}' already exists for this edition",
                new_code.code
            )));
        }

        let promo_code = repo.create(new_code).await?;
        info!(promo_code_id = %promo_code.id, "Promo code created");
        Ok(promo_code)
    }

    /// Look a code up the way buyers type it
    #[instrument(skip(self))]
    pub async fn get_by_code(
        &self,
        edition_id: EditionId,
        code: &str,
    ) -> ApplicationResult<Option<PromoCode>> {
        self.ctx
            .repositories
            .promo_codes
            .find_by_code(edition_id, &normalize_code(code))
            .await
    }

    #[instrument(skip(self))]
    pub async fn get_user_usage_count(
        &self,
        promo_code_id: PromoCodeId,
        email: &str,
    ) -> ApplicationResult<u32> {
        self.ctx
            .repositories
            .promo_codes
            .count_usages_by_email(promo_code_id, &email.trim().to_lowercase())
            .await
    }

    /// Run the eligibility checks for an order that is still being put together
    #[instrument(skip(self, ticket_type_ids))]
    pub async fn validate_for_order(
        &self,
        edition_id: EditionId,
        code: &str,
        order_amount: Amount,
        email: &str,
        ticket_type_ids: &[TicketTypeId],
    ) -> ApplicationResult<PromoCodeValidation> {
        let promo_code = self.get_by_code(edition_id, code).await?;
        let user_usage_count = match &promo_code {
            Some(promo) => self.get_user_usage_count(promo.id, email).await?,
            None => 0,
        };

        let input = PromoValidationInput {
            order_amount,
            buyer_email: email,
            ticket_type_ids,
            user_usage_count,
            now: self.ctx.clock.now(),
        };

        let verdict = validate_promo_code(promo_code.as_ref(), &input).map(|_| ());
        match verdict {
            Ok(()) => {
                debug!("Promo code accepted");
                Ok(PromoCodeValidation {
                    valid: true,
                    promo_code,
                    error_code: None,
                    message: None,
                })
            }
            Err(error_code) => {
                warn!(error_code = %error_code, "Promo code rejected");
                Ok(PromoCodeValidation::rejected(error_code, promo_code))
            }
        }
    }

    /// Validate `code` against a pending order and store the discount on it.
    ///
    /// Applying another code replaces the previous one. Usage is only recorded
    /// once the order is paid.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn apply_to_order(
        &self,
        order_id: OrderId,
        code: &str,
    ) -> ApplicationResult<AppliedPromoCode> {
        let order = self.load_pending_order(order_id, "discounted").await?;

        let items = self
            .ctx
            .repositories
            .order_items
            .find_by_order(order_id)
            .await?;
        let mut ticket_type_ids: Vec<TicketTypeId> = Vec::with_capacity(items.len());
        let mut amounts_by_type: HashMap<TicketTypeId, Amount> = HashMap::new();
        for item in &items {
            if !ticket_type_ids.contains(&item.ticket_type_id) {
                ticket_type_ids.push(item.ticket_type_id);
            }
            let amount = amounts_by_type.entry(item.ticket_type_id).or_insert(0);
            *amount = amount.saturating_add(item.total_price);
        }

        let validation = self
            .validate_for_order(
                order.edition_id,
                code,
                order.total_amount,
                &order.buyer_email,
                &ticket_type_ids,
            )
            .await?;

        let promo_code = match (validation.valid, validation.promo_code) {
            (true, Some(promo_code)) => promo_code,
            _ => {
                let error_code = validation
                    .error_code
                    .unwrap_or(PromoCodeErrorCode::NotFound);
                return Err(ApplicationError::promo_code(error_code));
            }
        };

        let discount = calculate_order_discount(
            &promo_code,
            order.total_amount,
            &ticket_type_ids,
            &amounts_by_type,
        );

        self.ctx
            .repositories
            .orders
            .update_discount(order_id, Some(promo_code.id), discount.discount_amount)
            .await?;

        info!(
            promo_code_id = %promo_code.id,
            discount_amount = discount.discount_amount,
            final_amount = discount.final_amount,
            "Promo code applied"
        );

        Ok(AppliedPromoCode {
            order_id,
            promo_code_id: promo_code.id,
            code: promo_code.code,
            discount,
        })
    }

    /// Drop the discount from a pending order
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn remove_from_order(&self, order_id: OrderId) -> ApplicationResult<Order> {
        self.load_pending_order(order_id, "changed").await?;
        let order = self
            .ctx
            .repositories
            .orders
            .update_discount(order_id, None, 0)
            .await?;
        info!("Promo code removed");
        Ok(order)
    }

    /// Record one redemption: usage row first, then the counter
    #[instrument(skip(self, email), fields(promo_code_id = %promo_code_id, order_id = %order_id))]
    pub async fn record_usage(
        &self,
        promo_code_id: PromoCodeId,
        order_id: OrderId,
        email: &str,
        discount_amount: Amount,
    ) -> ApplicationResult<PromoCodeUsage> {
        let repo = &self.ctx.repositories.promo_codes;
        let usage = repo
            .create_usage(
                promo_code_id,
                order_id,
                &email.trim().to_lowercase(),
                discount_amount,
            )
            .await?;
        let promo_code = repo.increment_usage_count(promo_code_id).await?;

        info!(
            usage_count = promo_code.current_usage_count,
            discount_amount, "Promo code redeemed"
        );

        self.ctx
            .publish(LifecycleEvent::PromoCodeRedeemed {
                promo_code_id,
                order_id,
                discount_amount,
            })
            .await;

        Ok(usage)
    }

    #[instrument(skip(self))]
    pub async fn deactivate(&self, promo_code_id: PromoCodeId) -> ApplicationResult<PromoCode> {
        let repo = &self.ctx.repositories.promo_codes;
        if repo.find_by_id(promo_code_id).await?.is_none() {
            return Err(ApplicationError::NotFound(format!(
                "Promo code {}",
                promo_code_id
            )));
        }
        let promo_code = repo.set_active(promo_code_id, false).await?;
        info!(promo_code_id = %promo_code_id, "Promo code deactivated");
        Ok(promo_code)
    }

    #[instrument(skip(self))]
    pub async fn list_usages(
        &self,
        promo_code_id: PromoCodeId,
    ) -> ApplicationResult<Vec<PromoCodeUsage>> {
        self.ctx
            .repositories
            .promo_codes
            .find_usages(promo_code_id)
            .await
    }

    /// All codes of an edition with their status as of now
    #[instrument(skip(self))]
    pub async fn list_by_edition(
        &self,
        edition_id: EditionId,
    ) -> ApplicationResult<Vec<PromoCodeSummary>> {
        let now = self.ctx.clock.now();
        let codes = self
            .ctx
            .repositories
            .promo_codes
            .find_by_edition(edition_id)
            .await?;
        Ok(codes
            .into_iter()
            .map(|promo_code| PromoCodeSummary {
                status: promo_code.status(now),
                remaining_uses: promo_code.remaining_uses(),
                promo_code,
            })
            .collect())
    }

    async fn load_pending_order(&self, order_id: OrderId, action: &str) -> ApplicationResult<Order> {
        let order = self
            .ctx
            .repositories
            .orders
            .find_by_id(order_id)
            .await?
            .ok_or_else(|| ApplicationError::NotFound(format!("Order {}", order_id)))?;
        if order.status != OrderStatus::Pending {
            return Err(ApplicationError::invalid_state(
                format!("Order {}", order.order_number),
                action,
                order.status,
            ));
        }
        Ok(order)
    }
}
