use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::transactions::{RefundRequest, RefundResponse, TransactionList, UpdateOrderStatusRequest},
    entity::transactions::{
        ActiveModel as TxActive, Column as TxCol, Entity as Transactions, Model as TxModel,
    },
    error::{AppError, AppResult, FieldError},
    middleware::auth::{AuthUser, ensure_admin},
    models::{OrderStatus, PaymentStatus, Transaction},
    response::{ApiResponse, Meta},
    routes::params::TransactionListQuery,
    state::AppState,
    validation::{AmountError, format_amount, parse_amount},
};

pub async fn list_my_transactions(
    state: &AppState,
    user: &AuthUser,
    query: TransactionListQuery,
) -> AppResult<ApiResponse<TransactionList>> {
    list_transactions(state, Some(user.user_id), query).await
}

pub async fn list_all_transactions(
    state: &AppState,
    user: &AuthUser,
    query: TransactionListQuery,
) -> AppResult<ApiResponse<TransactionList>> {
    ensure_admin(user)?;
    list_transactions(state, None, query).await
}

async fn list_transactions(
    state: &AppState,
    owner: Option<Uuid>,
    query: TransactionListQuery,
) -> AppResult<ApiResponse<TransactionList>> {
    let (page, limit, offset) = query.pagination().normalize();

    let mut condition = Condition::all();
    if let Some(user_id) = owner {
        condition = condition.add(TxCol::UserId.eq(user_id));
    }
    if let Some(status) = query.status {
        condition = condition.add(TxCol::Status.eq(status));
    }

    let finder = Transactions::find()
        .filter(condition)
        .order_by_desc(TxCol::CreatedAt);

    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(transaction_from_entity)
        .collect();

    Ok(ApiResponse::success(
        "Transactions fetched.",
        TransactionList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn get_transaction(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Transaction>> {
    let transaction = find_transaction(state, id).await?;
    // Other users' transactions are reported as missing.
    if transaction.user_id != user.user_id && !user.is_admin() {
        return Err(AppError::not_found("Transaction not found."));
    }
    Ok(ApiResponse::success(
        "Transaction fetched.",
        transaction_from_entity(transaction),
        None,
    ))
}

pub async fn update_order_status(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateOrderStatusRequest,
) -> AppResult<ApiResponse<Transaction>> {
    ensure_admin(user)?;
    let existing = find_transaction(state, id).await?;
    let previous = existing.order_status;

    let mut active: TxActive = existing.into();
    active.order_status = Set(payload.order_status);
    active.updated_at = Set(Utc::now().fixed_offset());
    let transaction = active.update(&state.orm).await?;

    audit::record(
        &state.orm,
        Some(user.user_id),
        "order_status_update",
        "transactions",
        serde_json::json!({
            "transaction_id": transaction.id,
            "from": previous,
            "to": transaction.order_status,
        }),
    )
    .await;

    Ok(ApiResponse::success(
        "Order status updated.",
        transaction_from_entity(transaction),
        Some(Meta::empty()),
    ))
}

pub async fn refund_transaction(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: RefundRequest,
) -> AppResult<ApiResponse<RefundResponse>> {
    ensure_admin(user)?;
    let existing = find_transaction(state, id).await?;

    if existing.status != PaymentStatus::Success {
        return Err(AppError::bad_request(
            "Only successful payments can be refunded.",
        ));
    }

    let amount = refund_amount(payload.amount.as_deref(), existing.amount)?;
    let full_refund = amount.is_none_or(|value| value == existing.amount);

    let refund = state
        .payments
        .refund(&existing.transaction_id, amount)
        .await
        .map_err(|err| AppError::upstream("Refund failed", err))?;

    let transaction = if full_refund {
        let mut active: TxActive = existing.into();
        active.order_status = Set(OrderStatus::Cancelled);
        active.updated_at = Set(Utc::now().fixed_offset());
        active.update(&state.orm).await?
    } else {
        existing
    };

    tracing::info!(
        transaction_id = %transaction.transaction_id,
        refund_id = %refund.id,
        amount = refund.amount,
        "refund issued"
    );

    audit::record(
        &state.orm,
        Some(user.user_id),
        "transaction_refund",
        "transactions",
        serde_json::json!({
            "transaction_id": transaction.id,
            "refund_id": refund.id,
            "amount": format_amount(refund.amount),
        }),
    )
    .await;

    Ok(ApiResponse::success(
        "Refund initiated.",
        RefundResponse::new(refund, transaction_from_entity(transaction)),
        Some(Meta::empty()),
    ))
}

/// Parses an optional partial refund; `None` refunds the whole payment.
pub fn refund_amount(raw: Option<&str>, captured: i64) -> AppResult<Option<i64>> {
    let Some(raw) = raw.filter(|value| !value.trim().is_empty()) else {
        return Ok(None);
    };

    let invalid = |message: &str| AppError::Validation(vec![FieldError::new("amount", message)]);

    match parse_amount(raw) {
        Ok(0) => Err(invalid("Refund amount must be greater than zero.")),
        Ok(amount) if amount > captured => Err(invalid(
            "Refund amount cannot exceed the captured amount.",
        )),
        Ok(amount) => Ok(Some(amount)),
        Err(AmountError::TooPrecise) => Err(invalid(
            "Please enter valid amount. More than 2 decimal places are not allowed.",
        )),
        Err(_) => Err(invalid("Please enter valid amount.")),
    }
}

async fn find_transaction(state: &AppState, id: Uuid) -> AppResult<TxModel> {
    Transactions::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("Transaction not found."))
}

pub fn transaction_from_entity(model: TxModel) -> Transaction {
    Transaction {
        id: model.id,
        user_id: model.user_id,
        order_id: model.order_id,
        transaction_id: model.transaction_id,
        details: model.details.0,
        address: model.address,
        amount: model.amount,
        status: model.status,
        order_status: model.order_status,
        product_ids: model.product_ids.0,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}
