use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::{get, post},
};

use crate::{
    dto::payments::{
        CheckoutRequest, CheckoutResponse, PaymentSuccessRequest, SavedCardList,
        VerifyPaymentRequest, VerifyPaymentResponse, WebhookAck,
    },
    error::AppResult,
    middleware::auth::AuthUser,
    models::Transaction,
    response::ApiResponse,
    services::payment_service,
    state::AppState,
};

pub const SIGNATURE_HEADER: &str = "x-razorpay-signature";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/checkout", post(checkout))
        .route("/payments/verify", post(verify_payment))
        .route("/payments/success", post(payment_success))
        .route("/payments/cards", get(saved_cards))
        .route("/payments/webhook", post(webhook))
}

#[utoipa::path(
    post,
    path = "/api/checkout",
    request_body = CheckoutRequest,
    responses(
        (status = 200, description = "Gateway order created, or empty cart", body = ApiResponse<CheckoutResponse>),
        (status = 400, description = "Unknown product or not enough stock"),
        (status = 502, description = "Gateway unavailable")
    ),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn checkout(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CheckoutRequest>,
) -> AppResult<Json<ApiResponse<CheckoutResponse>>> {
    let resp = payment_service::checkout(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/payments/verify",
    request_body = VerifyPaymentRequest,
    responses(
        (status = 200, description = "Signature check result", body = ApiResponse<VerifyPaymentResponse>)
    ),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn verify_payment(
    State(state): State<AppState>,
    _user: AuthUser,
    Json(payload): Json<VerifyPaymentRequest>,
) -> Json<ApiResponse<VerifyPaymentResponse>> {
    Json(payment_service::verify_payment(&state, payload))
}

#[utoipa::path(
    post,
    path = "/api/payments/success",
    request_body = PaymentSuccessRequest,
    responses(
        (status = 201, description = "Transaction recorded", body = ApiResponse<Transaction>),
        (status = 400, description = "Unknown payment"),
        (status = 409, description = "Already recorded or out of stock")
    ),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn payment_success(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<PaymentSuccessRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Transaction>>)> {
    let resp = payment_service::payment_success(&state, &user, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    get,
    path = "/api/payments/cards",
    responses(
        (status = 200, description = "Cards used on successful payments", body = ApiResponse<SavedCardList>)
    ),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn saved_cards(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<SavedCardList>>> {
    let resp = payment_service::saved_cards(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/payments/webhook",
    request_body(
        content = String,
        content_type = "application/json",
        description = "Raw gateway event; the signature covers these exact bytes"
    ),
    params(
        ("X-Razorpay-Signature" = String, Header, description = "Hex HMAC-SHA256 of the raw body")
    ),
    responses(
        (status = 200, description = "Event acknowledged", body = ApiResponse<WebhookAck>),
        (status = 400, description = "Bad signature or payload")
    ),
    tag = "Payments"
)]
pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Json<ApiResponse<WebhookAck>>> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());
    let resp = payment_service::handle_webhook(&state, signature, &body).await?;
    Ok(Json(resp))
}
