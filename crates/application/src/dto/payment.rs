//! Payment flow DTOs

use super::{CompleteOrderResult, RefundOrderResult};
use serde::{Deserialize, Serialize};
use ticketing_domain::OrderId;
use validator::Validate;

/// Where the provider sends the buyer after checkout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutUrls {
    #[validate(url)]
    pub success_url: String,
    #[validate(url)]
    pub cancel_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CheckoutOutcome {
    /// Nothing to pay; tickets were issued right away
    Completed(CompleteOrderResult),
    /// Buyer has to be sent to the provider
    Redirect { session_id: String, url: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum WebhookOutcome {
    OrderCompleted(CompleteOrderResult),
    OrderRefunded(RefundOrderResult),
    /// Redelivery of an event that was already applied
    AlreadyProcessed { order_id: OrderId },
    Ignored { reason: String },
}
