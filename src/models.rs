use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// A file hosted on the image CDN, as returned by its upload API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ProductImage {
    pub file_id: String,
    pub name: String,
    pub url: String,
    pub thumbnail_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Specification {
    pub label: String,
    pub value: String,
}

/// One colour swatch per product image, keyed by swatch name.
pub type SlideColor = BTreeMap<String, String>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Address {
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub line1: Option<String>,
    pub line2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    #[serde(default)]
    pub default: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CartLine {
    pub quantity: i32,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentStatus {
    #[sea_orm(string_value = "PENDING")]
    Pending,
    #[sea_orm(string_value = "FAILED")]
    Failed,
    #[sea_orm(string_value = "SUCCESS")]
    Success,
}

impl PaymentStatus {
    /// Maps a gateway payment status onto the stored status.
    pub fn from_gateway(status: &str) -> Self {
        match status {
            "captured" => PaymentStatus::Success,
            "failed" => PaymentStatus::Failed,
            _ => PaymentStatus::Pending,
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatus {
    #[sea_orm(string_value = "INPROCESS")]
    InProcess,
    #[sea_orm(string_value = "DELIVERED")]
    Delivered,
    #[sea_orm(string_value = "CANCELLED")]
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub fullname: Option<String>,
    pub profile: Option<String>,
    pub profile_image_id: Option<String>,
    pub bio: Option<String>,
    pub joining_reasons: Vec<String>,
    pub addresses: Vec<Address>,
    pub is_admin: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interests: Option<Vec<CategoryRef>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CategoryRef {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub parent_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Product {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    /// Minor currency units.
    pub price: i64,
    /// Percent, 0 to 100.
    pub discount: i32,
    pub quantity: i32,
    pub images: Vec<ProductImage>,
    pub sizes: Vec<String>,
    pub key_features: Vec<String>,
    pub specifications: Vec<Specification>,
    pub care_instructions: String,
    pub slide_colors: Vec<SlideColor>,
    #[schema(value_type = Option<Object>)]
    pub variants: Option<serde_json::Value>,
    pub is_featured: bool,
    pub category_ids: Vec<Uuid>,
    pub categories: Vec<CategoryRef>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Transaction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub order_id: String,
    pub transaction_id: String,
    pub details: BTreeMap<Uuid, CartLine>,
    #[schema(value_type = Option<Object>)]
    pub address: Option<serde_json::Value>,
    /// Minor currency units.
    pub amount: i64,
    pub status: PaymentStatus,
    pub order_status: OrderStatus,
    pub product_ids: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gateway_statuses_map_to_payment_status() {
        assert_eq!(PaymentStatus::from_gateway("captured"), PaymentStatus::Success);
        assert_eq!(PaymentStatus::from_gateway("failed"), PaymentStatus::Failed);
        assert_eq!(PaymentStatus::from_gateway("authorized"), PaymentStatus::Pending);
        assert_eq!(PaymentStatus::from_gateway("created"), PaymentStatus::Pending);
    }

    #[test]
    fn statuses_serialize_in_upper_case() {
        assert_eq!(
            serde_json::to_value(OrderStatus::InProcess).unwrap(),
            serde_json::json!("INPROCESS")
        );
        assert_eq!(
            serde_json::from_value::<PaymentStatus>(serde_json::json!("SUCCESS")).unwrap(),
            PaymentStatus::Success
        );
    }
}
