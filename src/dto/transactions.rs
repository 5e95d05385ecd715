use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    clients::GatewayRefund,
    models::{OrderStatus, Transaction},
};

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct TransactionList {
    #[schema(value_type = Vec<Transaction>)]
    pub items: Vec<Transaction>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOrderStatusRequest {
    #[serde(alias = "orderStatus")]
    pub order_status: OrderStatus,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct RefundRequest {
    /// Decimal amount; the whole payment is refunded when omitted.
    pub amount: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RefundResponse {
    pub refund_id: String,
    /// Minor currency units.
    pub amount: i64,
    pub status: String,
    pub transaction: Transaction,
}

impl RefundResponse {
    pub fn new(refund: GatewayRefund, transaction: Transaction) -> Self {
        Self {
            refund_id: refund.id,
            amount: refund.amount,
            status: refund.status,
            transaction,
        }
    }
}
