//! Payment Service
//!
//! Connects a [`PaymentProvider`] to the order lifecycle. The provider only
//! moves money; every status change still goes through [`OrderService`].

use super::{OrderService, PromoCodeService, ServiceContext};
use crate::dto::{CheckoutOutcome, CheckoutUrls, CompleteOrderResult, RefundOrderResult, WebhookOutcome};
use crate::ports::{CheckoutRequest, PaymentEvent, PaymentProvider, RefundRequest};
use crate::validation::ValidatorExt;
use crate::{ApplicationError, ApplicationResult};
use std::sync::Arc;
use ticketing_domain::{Order, OrderId, OrderStatus, PaymentInfo};
use tracing::{info, instrument, warn};

/// Checkout, webhook and refund handling
#[derive(Clone)]
pub struct PaymentService {
    ctx: ServiceContext,
    provider: Arc<dyn PaymentProvider>,
    orders: OrderService,
    promo_codes: PromoCodeService,
}

impl PaymentService {
    pub fn new(ctx: ServiceContext, provider: Arc<dyn PaymentProvider>) -> Self {
        Self {
            orders: OrderService::new(ctx.clone()),
            promo_codes: PromoCodeService::new(ctx.clone()),
            ctx,
            provider,
        }
    }

    /// Start paying for a pending order.
    ///
    /// Orders with nothing left to pay are completed on the spot. Everything
    /// else gets a hosted checkout whose session id becomes the order's
    /// payment reference.
    #[instrument(skip(self, urls), fields(order_id = %order_id, provider = %self.provider.name()))]
    pub async fn start_checkout(
        &self,
        order_id: OrderId,
        urls: CheckoutUrls,
    ) -> ApplicationResult<CheckoutOutcome> {
        urls.to_validation_result().ensure_valid()?;

        let order = self.load_order(order_id).await?;
        if order.status != OrderStatus::Pending {
            return Err(ApplicationError::invalid_state(
                format!("Order {}", order.order_number),
                "checked out",
                order.status,
            ));
        }

        let amount = order.amount_due();
        if amount == 0 {
            info!("Nothing to pay, completing order");
            let completed = self.complete_paid_order(&order).await?;
            return Ok(CheckoutOutcome::Completed(completed));
        }

        let session = self
            .provider
            .create_checkout(&CheckoutRequest {
                order_id,
                order_number: order.order_number.clone(),
                amount,
                currency: order.currency.clone(),
                buyer_email: order.buyer_email.clone(),
                success_url: urls.success_url,
                cancel_url: urls.cancel_url,
            })
            .await?;

        self.ctx
            .repositories
            .orders
            .update_payment_info(
                order_id,
                PaymentInfo {
                    provider: self.provider.name().to_string(),
                    reference: session.session_id.clone(),
                    payment_intent_id: None,
                },
            )
            .await?;

        info!(session_id = %session.session_id, amount, "Checkout session created");
        Ok(CheckoutOutcome::Redirect {
            session_id: session.session_id,
            url: session.url,
        })
    }

    /// Apply a provider notification.
    ///
    /// Redelivered events are acknowledged without side effects.
    #[instrument(skip(self, payload, signature), fields(provider = %self.provider.name()))]
    pub async fn handle_webhook(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> ApplicationResult<WebhookOutcome> {
        let event = self.provider.parse_webhook_event(payload, signature)?;

        match event {
            PaymentEvent::CheckoutCompleted {
                payment_reference,
                payment_intent_id,
            } => {
                let order = self.load_order_by_reference(&payment_reference).await?;
                match order.status {
                    OrderStatus::Pending => {
                        if let Some(intent) = payment_intent_id {
                            self.ctx
                                .repositories
                                .orders
                                .update_payment_info(
                                    order.id,
                                    PaymentInfo {
                                        provider: order
                                            .payment_provider
                                            .clone()
                                            .unwrap_or_else(|| self.provider.name().to_string()),
                                        reference: payment_reference,
                                        payment_intent_id: Some(intent),
                                    },
                                )
                                .await?;
                        }
                        let completed = self.complete_paid_order(&order).await?;
                        Ok(WebhookOutcome::OrderCompleted(completed))
                    }
                    OrderStatus::Paid => {
                        info!(order_id = %order.id, "Checkout already applied");
                        Ok(WebhookOutcome::AlreadyProcessed { order_id: order.id })
                    }
                    status => {
                        warn!(order_id = %order.id, %status, "Checkout completed for a closed order");
                        Ok(WebhookOutcome::Ignored {
                            reason: format!("order {} is {}", order.order_number, status),
                        })
                    }
                }
            }
            PaymentEvent::RefundSucceeded { payment_reference } => {
                let order = self.load_order_by_reference(&payment_reference).await?;
                match order.status {
                    OrderStatus::Paid => {
                        let refunded = self.orders.refund_order(order.id).await?;
                        Ok(WebhookOutcome::OrderRefunded(refunded))
                    }
                    OrderStatus::Refunded => {
                        info!(order_id = %order.id, "Refund already applied");
                        Ok(WebhookOutcome::AlreadyProcessed { order_id: order.id })
                    }
                    status => {
                        warn!(order_id = %order.id, %status, "Refund notification for an unpaid order");
                        Ok(WebhookOutcome::Ignored {
                            reason: format!("order {} is {}", order.order_number, status),
                        })
                    }
                }
            }
            PaymentEvent::Other { event_type } => Ok(WebhookOutcome::Ignored {
                reason: format!("unhandled event type {}", event_type),
            }),
        }
    }

    /// Refund a paid order: money first, then tickets and inventory
    #[instrument(skip(self), fields(order_id = %order_id, provider = %self.provider.name()))]
    pub async fn refund(&self, order_id: OrderId) -> ApplicationResult<RefundOrderResult> {
        let order = self.load_order(order_id).await?;
        if order.status != OrderStatus::Paid {
            return Err(ApplicationError::invalid_state(
                format!("Order {}", order.order_number),
                "refunded",
                order.status,
            ));
        }

        let amount = order.amount_due();
        match (&order.payment_reference, amount > 0) {
            (Some(reference), true) => {
                let receipt = self
                    .provider
                    .create_refund(&RefundRequest {
                        payment_reference: reference.clone(),
                        payment_intent_id: order.payment_intent_id.clone(),
                        amount,
                        currency: order.currency.clone(),
                    })
                    .await?;
                info!(refund_id = %receipt.refund_id, amount, "Provider refund issued");
            }
            (None, true) => {
                warn!(amount, "Paid order has no payment reference, refunding tickets only");
            }
            _ => {}
        }

        self.orders.refund_order(order_id).await
    }

    /// Issue tickets, then count the promo redemption if one was applied
    async fn complete_paid_order(&self, order: &Order) -> ApplicationResult<CompleteOrderResult> {
        let completed = self.orders.complete_order(order.id).await?;
        if let Some(promo_code_id) = order.promo_code_id {
            self.promo_codes
                .record_usage(
                    promo_code_id,
                    order.id,
                    &order.buyer_email,
                    order.discount_amount,
                )
                .await?;
        }
        Ok(completed)
    }

    async fn load_order(&self, order_id: OrderId) -> ApplicationResult<Order> {
        self.ctx
            .repositories
            .orders
            .find_by_id(order_id)
            .await?
            .ok_or_else(|| ApplicationError::NotFound(format!("Order {}", order_id)))
    }

    async fn load_order_by_reference(&self, reference: &str) -> ApplicationResult<Order> {
        self.ctx
            .repositories
            .orders
            .find_by_payment_reference(reference)
            .await?
            .ok_or_else(|| {
                ApplicationError::NotFound(format!("Order with payment reference {}", reference))
            })
    }
}
