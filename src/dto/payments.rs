use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::CartLine;

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CheckoutRequest {
    /// Quantities keyed by product id.
    #[serde(default)]
    pub cart: BTreeMap<Uuid, CartLine>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CheckoutResponse {
    pub order_id: String,
    /// Public key the browser checkout widget is opened with.
    pub key_id: String,
    pub currency: String,
    /// Minor currency units.
    pub cart_total: i64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct VerifyPaymentRequest {
    #[serde(alias = "razorpay_order_id")]
    pub order_id: String,
    #[serde(alias = "razorpay_payment_id")]
    pub payment_id: String,
    #[serde(alias = "razorpay_signature")]
    pub signature: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct VerifyPaymentResponse {
    pub valid: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PaymentSuccessRequest {
    /// Gateway payment id.
    #[serde(alias = "transactionId")]
    pub transaction_id: String,
    #[serde(default)]
    pub details: BTreeMap<Uuid, CartLine>,
    #[schema(value_type = Option<Object>)]
    pub address: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct SavedCard {
    pub brand: String,
    pub expiry: Option<String>,
    pub last4: String,
    #[serde(rename = "type")]
    pub card_type: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct SavedCardList {
    #[schema(value_type = Vec<SavedCard>)]
    pub items: Vec<SavedCard>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    pub event: String,
    #[serde(default)]
    pub payload: WebhookPayload,
}

#[derive(Debug, Default, Deserialize)]
pub struct WebhookPayload {
    pub payment: Option<WebhookEntity>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookEntity {
    pub entity: WebhookPayment,
}

#[derive(Debug, Deserialize)]
pub struct WebhookPayment {
    pub id: String,
    pub status: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct WebhookAck {
    pub handled: bool,
}
