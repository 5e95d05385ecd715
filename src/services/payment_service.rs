use std::collections::HashSet;

use chrono::Utc;
use futures::future::join_all;
use sea_orm::sea_query::Expr;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit,
    clients::{ClientError, GatewayPayment, signature},
    dto::payments::{
        CheckoutRequest, CheckoutResponse, PaymentSuccessRequest, SavedCard, SavedCardList,
        VerifyPaymentRequest, VerifyPaymentResponse, WebhookAck, WebhookEvent,
    },
    entity::{
        json::{CartDetails, IdList},
        products::{Column as ProdCol, Entity as Products},
        transactions::{ActiveModel as TxActive, Column as TxCol, Entity as Transactions},
    },
    error::{AppError, AppResult, FieldError},
    middleware::auth::AuthUser,
    models::{OrderStatus, PaymentStatus, Transaction},
    response::{ApiResponse, Meta},
    services::transaction_service::transaction_from_entity,
    state::AppState,
    validation::Violations,
};

pub async fn checkout(
    state: &AppState,
    user: &AuthUser,
    payload: CheckoutRequest,
) -> AppResult<ApiResponse<CheckoutResponse>> {
    if payload.cart.is_empty() {
        return Ok(ApiResponse::message_only("Cart is empty."));
    }

    if payload.cart.values().any(|line| line.quantity < 1) {
        return Err(AppError::Validation(vec![FieldError::new(
            "cart",
            "Quantity must be at least 1.",
        )]));
    }

    let ids: Vec<Uuid> = payload.cart.keys().copied().collect();
    let products = Products::find()
        .filter(ProdCol::Id.is_in(ids))
        .all(&state.orm)
        .await?;

    let mut cart_total: i64 = 0;
    for (product_id, line) in &payload.cart {
        let product = products
            .iter()
            .find(|p| p.id == *product_id)
            .ok_or_else(|| AppError::bad_request(format!("Product {product_id} not found.")))?;

        if product.quantity < line.quantity {
            return Err(AppError::bad_request(format!(
                "Only {} left in stock for {}.",
                product.quantity, product.title
            )));
        }

        cart_total = product
            .price
            .checked_mul(i64::from(line.quantity))
            .and_then(|line_total| cart_total.checked_add(line_total))
            .ok_or_else(|| AppError::bad_request("Cart total is too large."))?;
    }

    let currency = state.config.payment.currency.clone();
    let order = state
        .payments
        .create_order(cart_total, &currency)
        .await
        .map_err(|err| AppError::upstream("Payment order creation failed", err))?;

    tracing::debug!(order_id = %order.id, amount = cart_total, user_id = %user.user_id, "gateway order created");

    Ok(ApiResponse::success(
        "Order created.",
        CheckoutResponse {
            order_id: order.id,
            key_id: state.config.payment.key_id.clone(),
            currency,
            cart_total,
        },
        None,
    ))
}

pub fn verify_payment(
    state: &AppState,
    payload: VerifyPaymentRequest,
) -> ApiResponse<VerifyPaymentResponse> {
    let valid = signature::verify_checkout(
        &state.config.payment.key_secret,
        &payload.order_id,
        &payload.payment_id,
        &payload.signature,
    );
    let message = if valid {
        "Payment verified."
    } else {
        "Payment verification failed."
    };
    ApiResponse::success(message, VerifyPaymentResponse { valid }, None)
}

pub async fn payment_success(
    state: &AppState,
    user: &AuthUser,
    payload: PaymentSuccessRequest,
) -> AppResult<ApiResponse<Transaction>> {
    let transaction_id = payload.transaction_id.trim().to_string();
    let mut violations = Violations::new();
    if transaction_id.is_empty() {
        violations.add("transaction_id", "Please provide transaction id.");
    } else if !is_gateway_id(&transaction_id) {
        violations.add("transaction_id", "Invalid transaction id.");
    }
    if payload.details.is_empty() {
        violations.add("details", "Please provide order details.");
    } else if payload.details.values().any(|line| line.quantity < 1) {
        violations.add("details", "Quantity must be at least 1.");
    }
    violations.into_result()?;

    let recorded = Transactions::find()
        .filter(TxCol::TransactionId.eq(transaction_id.as_str()))
        .one(&state.orm)
        .await?;
    if recorded.is_some() {
        return Err(AppError::Conflict("Payment already recorded.".to_string()));
    }

    let payment = match state.payments.fetch_payment(&transaction_id).await {
        Ok(payment) => payment,
        Err(ClientError::NotFound { .. }) => {
            return Err(AppError::bad_request("Invalid transaction id."));
        }
        Err(err) => return Err(AppError::upstream("Payment lookup failed", err)),
    };
    let status = PaymentStatus::from_gateway(&payment.status);

    let txn = state.orm.begin().await?;

    let product_ids: Vec<Uuid> = payload.details.keys().copied().collect();
    let transaction = TxActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user.user_id),
        order_id: Set(order_number(Uuid::new_v4())),
        transaction_id: Set(transaction_id.clone()),
        details: Set(CartDetails(payload.details.clone())),
        address: Set(payload.address),
        amount: Set(payment.amount),
        status: Set(status),
        order_status: Set(OrderStatus::InProcess),
        product_ids: Set(IdList(product_ids)),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await?;

    if status != PaymentStatus::Failed {
        for (product_id, line) in &payload.details {
            // Guarded so concurrent purchases can never push stock below zero.
            let result = Products::update_many()
                .col_expr(
                    ProdCol::Quantity,
                    Expr::col(ProdCol::Quantity).sub(line.quantity),
                )
                .col_expr(ProdCol::UpdatedAt, Expr::value(Utc::now().fixed_offset()))
                .filter(ProdCol::Id.eq(*product_id))
                .filter(ProdCol::Quantity.gte(line.quantity))
                .exec(&txn)
                .await?;

            if result.rows_affected == 0 {
                return Err(AppError::Conflict(format!(
                    "Insufficient stock for product {product_id}."
                )));
            }
        }
    }

    txn.commit().await?;

    tracing::info!(
        transaction_id = %transaction.transaction_id,
        status = ?status,
        amount = transaction.amount,
        "payment recorded"
    );

    audit::record(
        &state.orm,
        Some(user.user_id),
        "payment_success",
        "transactions",
        serde_json::json!({
            "transaction_id": transaction.id,
            "status": status,
        }),
    )
    .await;

    Ok(ApiResponse::success(
        "Payment recorded.",
        transaction_from_entity(transaction),
        Some(Meta::empty()),
    ))
}

pub async fn saved_cards(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<SavedCardList>> {
    let transactions = Transactions::find()
        .filter(TxCol::UserId.eq(user.user_id))
        .filter(TxCol::Status.eq(PaymentStatus::Success))
        .order_by_desc(TxCol::CreatedAt)
        .all(&state.orm)
        .await?;

    let lookups = join_all(
        transactions
            .iter()
            .map(|tx| state.payments.fetch_payment(&tx.transaction_id)),
    )
    .await;

    let payments = transactions
        .iter()
        .zip(lookups)
        .filter_map(|(tx, lookup)| match lookup {
            Ok(payment) => Some(payment),
            Err(err) => {
                tracing::warn!(error = %err, transaction_id = %tx.transaction_id, "card lookup failed");
                None
            }
        });

    Ok(ApiResponse::success(
        "Saved cards fetched.",
        SavedCardList {
            items: distinct_cards(payments),
        },
        None,
    ))
}

pub async fn handle_webhook(
    state: &AppState,
    signature_header: Option<&str>,
    body: &[u8],
) -> AppResult<ApiResponse<WebhookAck>> {
    let signature_header = signature_header.unwrap_or_default();
    if !signature::verify(&state.config.payment.webhook_secret, body, signature_header) {
        return Err(AppError::bad_request("Invalid webhook signature."));
    }

    let event: WebhookEvent = serde_json::from_slice(body)
        .map_err(|_| AppError::bad_request("Invalid webhook payload."))?;

    let payment = match (event.event.as_str(), event.payload.payment) {
        ("payment.captured" | "payment.failed", Some(payment)) => payment.entity,
        _ => {
            tracing::debug!(event = %event.event, "webhook event ignored");
            return Ok(ApiResponse::success(
                "Event ignored.",
                WebhookAck { handled: false },
                None,
            ));
        }
    };

    let status = PaymentStatus::from_gateway(&payment.status);
    let result = Transactions::update_many()
        .col_expr(TxCol::Status, Expr::value(status))
        .col_expr(TxCol::UpdatedAt, Expr::value(Utc::now().fixed_offset()))
        .filter(TxCol::TransactionId.eq(payment.id.as_str()))
        .exec(&state.orm)
        .await?;

    tracing::info!(
        event = %event.event,
        payment_id = %payment.id,
        updated = result.rows_affected,
        "webhook processed"
    );

    Ok(ApiResponse::success(
        "Event processed.",
        WebhookAck {
            handled: result.rows_affected > 0,
        },
        None,
    ))
}

/// Gateway ids look like `pay_29QQoUBi66xm2f`: ASCII letters, digits and
/// underscores only.
pub fn is_gateway_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= 64
        && id.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

/// Internal order number: `rp-` followed by twelve hex digits.
pub fn order_number(seed: Uuid) -> String {
    let simple = seed.simple().to_string();
    format!("rp-{}", &simple[2..14])
}

/// One entry per `network-last4`, in the order the payments are given.
pub fn distinct_cards(payments: impl IntoIterator<Item = GatewayPayment>) -> Vec<SavedCard> {
    let mut seen = HashSet::new();
    payments
        .into_iter()
        .filter_map(|payment| payment.card)
        .filter_map(|card| {
            let brand = card.network.clone().unwrap_or_else(|| "card".to_string());
            let last4 = card.last4.clone()?;
            if !seen.insert(format!("{brand}-{last4}")) {
                return None;
            }
            let expiry = match (&card.expiry_month, &card.expiry_year) {
                (Some(month), Some(year)) => {
                    Some(format!("{:0>2}/{}", json_text(month), json_text(year)))
                }
                _ => None,
            };
            Some(SavedCard {
                brand,
                expiry,
                last4,
                card_type: card.card_type,
            })
        })
        .collect()
}

fn json_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
