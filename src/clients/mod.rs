//! Clients for the third-party services the storefront depends on: the image
//! CDN that hosts product photos and the payment gateway that takes orders.
//!
//! Both sit behind object-safe traits so the HTTP layer can be exercised
//! against in-process fakes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::ProductImage;

pub mod imagekit;
pub mod razorpay;
pub mod signature;

pub use imagekit::ImageKitClient;
pub use razorpay::RazorpayClient;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request to {service} failed: {source}")]
    Transport {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{service} returned {status}: {body}")]
    Status {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("{service} resource not found")]
    NotFound { service: &'static str },

    #[error("{service} base url `{url}` cannot take path segments")]
    InvalidUrl { service: &'static str, url: String },
}

pub type ClientResult<T> = Result<T, ClientError>;

/// A file received from a client, ready to be pushed to the CDN.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

#[async_trait]
pub trait ImageStore: Send + Sync {
    async fn upload(&self, file: UploadFile) -> ClientResult<ProductImage>;

    async fn delete(&self, file_id: &str) -> ClientResult<()>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayOrder {
    pub id: String,
    /// Minor currency units.
    pub amount: i64,
    pub currency: String,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardDetails {
    pub network: Option<String>,
    pub last4: Option<String>,
    #[serde(rename = "type")]
    pub card_type: Option<String>,
    pub expiry_month: Option<serde_json::Value>,
    pub expiry_year: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayPayment {
    pub id: String,
    /// Minor currency units.
    pub amount: i64,
    pub currency: String,
    pub status: String,
    pub order_id: Option<String>,
    pub method: Option<String>,
    pub card: Option<CardDetails>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayRefund {
    pub id: String,
    pub payment_id: String,
    /// Minor currency units.
    pub amount: i64,
    pub status: String,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_order(&self, amount: i64, currency: &str) -> ClientResult<GatewayOrder>;

    async fn fetch_payment(&self, payment_id: &str) -> ClientResult<GatewayPayment>;

    /// Refunds `amount` minor units, or the whole payment when `None`.
    async fn refund(&self, payment_id: &str, amount: Option<i64>) -> ClientResult<GatewayRefund>;
}

/// Appends `segments` to `base`, percent-encoding each one so ids taken from
/// requests can never add or climb path segments.
fn endpoint(service: &'static str, base: &str, segments: &[&str]) -> ClientResult<reqwest::Url> {
    let invalid = || ClientError::InvalidUrl {
        service,
        url: base.to_string(),
    };
    let mut url = reqwest::Url::parse(base).map_err(|_| invalid())?;
    url.path_segments_mut()
        .map_err(|_| invalid())?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

async fn check_status(
    service: &'static str,
    response: reqwest::Response,
) -> ClientResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(ClientError::NotFound { service });
    }
    let body = response.text().await.unwrap_or_default();
    Err(ClientError::Status {
        service,
        status: status.as_u16(),
        body,
    })
}
