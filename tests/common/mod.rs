#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use sea_orm::DatabaseConnection;
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use storefront_api::{
    clients::{
        CardDetails, ClientError, ClientResult, GatewayOrder, GatewayPayment, GatewayRefund,
        ImageStore, PaymentGateway, UploadFile,
    },
    config::{AppConfig, ImageConfig, PaymentConfig},
    db::OrmConn,
    models::ProductImage,
    services::auth_service::issue_token,
    state::AppState,
};

pub const KEY_SECRET: &str = "test-key-secret";
pub const WEBHOOK_SECRET: &str = "test-webhook-secret";
pub const BOUNDARY: &str = "storefront-test-boundary";

/// Keeps uploads in memory and remembers what was deleted.
#[derive(Default)]
pub struct FakeImageStore {
    pub deleted: Mutex<Vec<String>>,
}

#[async_trait]
impl ImageStore for FakeImageStore {
    async fn upload(&self, file: UploadFile) -> ClientResult<ProductImage> {
        let file_id = format!("file_{}", Uuid::new_v4().simple());
        Ok(ProductImage {
            url: format!("https://cdn.test/{}/{}", file_id, file.file_name),
            thumbnail_url: None,
            name: file.file_name,
            file_id,
        })
    }

    async fn delete(&self, file_id: &str) -> ClientResult<()> {
        self.deleted.lock().expect("lock").push(file_id.to_string());
        Ok(())
    }
}

/// Every payment id starting with `pay_` is a captured card payment of
/// `captured_amount`; anything else is unknown.
pub struct FakePaymentGateway {
    pub captured_amount: i64,
    pub refunds: Mutex<Vec<(String, Option<i64>)>>,
}

impl Default for FakePaymentGateway {
    fn default() -> Self {
        Self {
            captured_amount: 99_900,
            refunds: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl PaymentGateway for FakePaymentGateway {
    async fn create_order(&self, amount: i64, currency: &str) -> ClientResult<GatewayOrder> {
        Ok(GatewayOrder {
            id: format!("order_{}", Uuid::new_v4().simple()),
            amount,
            currency: currency.to_string(),
            status: "created".into(),
        })
    }

    async fn fetch_payment(&self, payment_id: &str) -> ClientResult<GatewayPayment> {
        if !payment_id.starts_with("pay_") {
            return Err(ClientError::NotFound { service: "fake" });
        }
        Ok(GatewayPayment {
            id: payment_id.to_string(),
            amount: self.captured_amount,
            currency: "INR".into(),
            status: "captured".into(),
            order_id: None,
            method: Some("card".into()),
            card: Some(CardDetails {
                network: Some("Visa".into()),
                last4: Some("4242".into()),
                card_type: Some("credit".into()),
                expiry_month: Some(serde_json::json!(12)),
                expiry_year: Some(serde_json::json!(2030)),
            }),
        })
    }

    async fn refund(&self, payment_id: &str, amount: Option<i64>) -> ClientResult<GatewayRefund> {
        self.refunds.lock().expect("lock").push((payment_id.to_string(), amount));
        Ok(GatewayRefund {
            id: format!("rfnd_{}", Uuid::new_v4().simple()),
            payment_id: payment_id.to_string(),
            amount: amount.unwrap_or(self.captured_amount),
            status: "processed".into(),
        })
    }
}

pub fn test_config() -> AppConfig {
    AppConfig {
        database_url: String::new(),
        host: "127.0.0.1".into(),
        port: 0,
        jwt_secret: "integration-secret".into(),
        jwt_ttl_hours: 1,
        public_base_url: None,
        max_body_bytes: 5 * 1024 * 1024,
        payment: PaymentConfig {
            key_id: "rzp_test_key".into(),
            key_secret: KEY_SECRET.into(),
            webhook_secret: WEBHOOK_SECRET.into(),
            api_url: "http://gateway.invalid".into(),
            currency: "INR".into(),
        },
        images: ImageConfig {
            private_key: "private".into(),
            upload_url: "http://cdn.invalid/upload".into(),
            api_url: "http://cdn.invalid".into(),
            folder: "/products".into(),
        },
    }
}

pub fn state_with(orm: OrmConn) -> AppState {
    AppState {
        orm,
        config: Arc::new(test_config()),
        images: Arc::new(FakeImageStore::default()),
        payments: Arc::new(FakePaymentGateway::default()),
    }
}

/// State whose database is never reachable; for paths that must fail
/// before touching it.
pub fn offline_state() -> AppState {
    state_with(DatabaseConnection::Disconnected)
}

pub fn token(state: &AppState, role: &str) -> String {
    token_for(state, Uuid::new_v4(), role)
}

pub fn token_for(state: &AppState, user_id: Uuid, role: &str) -> String {
    issue_token(&state.config, user_id, role).expect("token")
}

pub fn multipart_body(fields: &[(&str, &str)], files: &[(&str, &str, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    for (name, file_name, bytes) in files {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: image/png\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub fn multipart_content_type() -> String {
    format!("multipart/form-data; boundary={BOUNDARY}")
}

pub async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.expect("router response");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("response body")
        .to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

pub fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).expect("request")
}

pub fn empty_request(method: &str, uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder.body(Body::empty()).expect("request")
}

pub fn multipart_request(method: &str, uri: &str, token: &str, body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", multipart_content_type())
        .header("authorization", format!("Bearer {token}"))
        .body(Body::from(body))
        .expect("request")
}
