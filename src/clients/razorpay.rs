use async_trait::async_trait;
use serde_json::json;

use super::{
    ClientError, ClientResult, GatewayOrder, GatewayPayment, GatewayRefund, PaymentGateway,
    check_status, endpoint,
};
use crate::config::PaymentConfig;

const SERVICE: &str = "razorpay";

/// Razorpay REST client authenticated with the key id / secret pair.
#[derive(Clone)]
pub struct RazorpayClient {
    http: reqwest::Client,
    base_url: String,
    key_id: String,
    key_secret: String,
}

impl RazorpayClient {
    pub fn new(http: reqwest::Client, config: &PaymentConfig) -> Self {
        Self {
            http,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            key_id: config.key_id.clone(),
            key_secret: config.key_secret.clone(),
        }
    }

    fn url(&self, segments: &[&str]) -> ClientResult<reqwest::Url> {
        endpoint(SERVICE, &self.base_url, segments)
    }
}

fn transport(source: reqwest::Error) -> ClientError {
    ClientError::Transport {
        service: SERVICE,
        source,
    }
}

#[async_trait]
impl PaymentGateway for RazorpayClient {
    async fn create_order(&self, amount: i64, currency: &str) -> ClientResult<GatewayOrder> {
        let response = self
            .http
            .post(self.url(&["orders"])?)
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&json!({
                "amount": amount,
                "currency": currency,
                "payment_capture": true,
            }))
            .send()
            .await
            .map_err(transport)?;

        check_status(SERVICE, response)
            .await?
            .json::<GatewayOrder>()
            .await
            .map_err(transport)
    }

    async fn fetch_payment(&self, payment_id: &str) -> ClientResult<GatewayPayment> {
        let response = self
            .http
            .get(self.url(&["payments", payment_id])?)
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .send()
            .await
            .map_err(transport)?;

        check_status(SERVICE, response)
            .await?
            .json::<GatewayPayment>()
            .await
            .map_err(transport)
    }

    async fn refund(&self, payment_id: &str, amount: Option<i64>) -> ClientResult<GatewayRefund> {
        let body = match amount {
            Some(amount) => json!({ "amount": amount }),
            None => json!({}),
        };

        let response = self
            .http
            .post(self.url(&["payments", payment_id, "refund"])?)
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&body)
            .send()
            .await
            .map_err(transport)?;

        check_status(SERVICE, response)
            .await?
            .json::<GatewayRefund>()
            .await
            .map_err(transport)
    }
}
