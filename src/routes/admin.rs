use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, Query, State},
    routing::{get, patch, post},
};
use uuid::Uuid;

use crate::{
    dto::transactions::{
        RefundRequest, RefundResponse, TransactionList, UpdateOrderStatusRequest,
    },
    error::AppResult,
    middleware::auth::AuthUser,
    models::Transaction,
    response::ApiResponse,
    routes::{json_or_default, params::TransactionListQuery},
    services::transaction_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/transactions", get(list_all_transactions))
        .route("/transactions/{id}/status", patch(update_order_status))
        .route("/transactions/{id}/refund", post(refund_transaction))
}

#[utoipa::path(
    get,
    path = "/api/admin/transactions",
    params(TransactionListQuery),
    responses(
        (status = 200, description = "All transactions", body = ApiResponse<TransactionList>),
        (status = 403, description = "Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_all_transactions(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<TransactionListQuery>,
) -> AppResult<Json<ApiResponse<TransactionList>>> {
    let resp = transaction_service::list_all_transactions(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    patch,
    path = "/api/admin/transactions/{id}/status",
    params(
        ("id" = Uuid, Path, description = "Transaction ID")
    ),
    request_body = UpdateOrderStatusRequest,
    responses(
        (status = 200, description = "Order status updated", body = ApiResponse<Transaction>),
        (status = 404, description = "Transaction not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn update_order_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    user: AuthUser,
    Json(payload): Json<UpdateOrderStatusRequest>,
) -> AppResult<Json<ApiResponse<Transaction>>> {
    let resp = transaction_service::update_order_status(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/admin/transactions/{id}/refund",
    params(
        ("id" = Uuid, Path, description = "Transaction ID")
    ),
    request_body = RefundRequest,
    responses(
        (status = 200, description = "Refund issued", body = ApiResponse<RefundResponse>),
        (status = 400, description = "Not refundable or bad amount"),
        (status = 502, description = "Gateway refused the refund")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn refund_transaction(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    user: AuthUser,
    body: Bytes,
) -> AppResult<Json<ApiResponse<RefundResponse>>> {
    let payload: RefundRequest = json_or_default(&body)?;
    let resp = transaction_service::refund_transaction(&state, &user, id, payload).await?;
    Ok(Json(resp))
}
