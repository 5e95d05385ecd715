use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use uuid::Uuid;

use crate::{
    dto::transactions::TransactionList,
    error::AppResult,
    middleware::auth::AuthUser,
    models::Transaction,
    response::ApiResponse,
    routes::params::TransactionListQuery,
    services::transaction_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/transactions", get(list_transactions))
        .route("/transactions/{id}", get(get_transaction))
}

#[utoipa::path(
    get,
    path = "/api/transactions",
    params(TransactionListQuery),
    responses(
        (status = 200, description = "Own transactions, newest first", body = ApiResponse<TransactionList>)
    ),
    security(("bearer_auth" = [])),
    tag = "Transactions"
)]
pub async fn list_transactions(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<TransactionListQuery>,
) -> AppResult<Json<ApiResponse<TransactionList>>> {
    let resp = transaction_service::list_my_transactions(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/transactions/{id}",
    params(
        ("id" = Uuid, Path, description = "Transaction ID")
    ),
    responses(
        (status = 200, description = "Transaction", body = ApiResponse<Transaction>),
        (status = 404, description = "Transaction not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Transactions"
)]
pub async fn get_transaction(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<Transaction>>> {
    let resp = transaction_service::get_transaction(&state, &user, id).await?;
    Ok(Json(resp))
}
