use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{Address, User};

#[derive(Deserialize, Debug, ToSchema)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub fullname: Option<String>,
    pub profile: Option<String>,
    #[serde(alias = "profileImageId")]
    pub profile_image_id: Option<String>,
    pub bio: Option<String>,
    #[serde(default)]
    pub joining_reasons: Vec<String>,
    #[serde(default)]
    pub addresses: Vec<Address>,
    #[serde(default, alias = "interestIds")]
    pub interest_ids: Vec<Uuid>,
    #[serde(default, alias = "favouriteProductIds")]
    pub favourite_product_ids: Vec<Uuid>,
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    /// Set by the admin panel; the account must then be an admin.
    #[serde(default, alias = "isAdmin")]
    pub is_admin: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuthPayload {
    pub token: String,
    pub user: User,
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct Claims {
    pub sub: String,
    pub role: String,
    pub exp: usize,
}
