use argon2::{
    Argon2, PasswordHasher,
    password_hash::{PasswordHash, PasswordVerifier, SaltString},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use password_hash::rand_core::OsRng;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, ModelTrait, PaginatorTrait, QueryFilter, Set,
    TransactionTrait,
};
use sea_orm::ActiveValue::NotSet;
use uuid::Uuid;

use crate::{
    audit,
    config::AppConfig,
    dto::auth::{AuthPayload, Claims, LoginRequest, RegisterRequest},
    entity::{
        categories::{Column as CategoryCol, Entity as Categories},
        json::{AddressList, StringList},
        products::{Column as ProdCol, Entity as Products},
        user_favourites::ActiveModel as FavouriteActive,
        user_interests::ActiveModel as InterestActive,
        users::{ActiveModel as UserActive, Column as UserCol, Entity as Users, Model as UserModel},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{CategoryRef, User},
    response::{ApiResponse, Meta},
    state::AppState,
    validation::{MIN_PASSWORD_LEN, Violations, is_valid_email},
};

pub async fn register_user(
    state: &AppState,
    payload: RegisterRequest,
) -> AppResult<ApiResponse<AuthPayload>> {
    let email = payload.email.trim().to_lowercase();

    let mut violations = Violations::new();
    if email.is_empty() {
        violations.add("email", "Please enter email address.");
    } else if !is_valid_email(&email) {
        violations.add("email", "Please enter a valid email address.");
    }
    if payload.password.chars().count() < MIN_PASSWORD_LEN {
        violations.add(
            "password",
            format!("Password must be at least {MIN_PASSWORD_LEN} characters."),
        );
    }
    violations.into_result()?;

    let exist = Users::find()
        .filter(UserCol::Email.eq(email.as_str()))
        .one(&state.orm)
        .await?;
    if exist.is_some() {
        return Err(AppError::Validation(vec![crate::error::FieldError::new(
            "email",
            "Email is already taken.",
        )]));
    }

    let interest_ids = dedup(payload.interest_ids);
    if !interest_ids.is_empty() {
        let found = Categories::find()
            .filter(CategoryCol::Id.is_in(interest_ids.clone()))
            .count(&state.orm)
            .await?;
        if found as usize != interest_ids.len() {
            return Err(AppError::bad_request("Unknown interest category."));
        }
    }

    let favourite_ids = dedup(payload.favourite_product_ids);
    if !favourite_ids.is_empty() {
        let found = Products::find()
            .filter(ProdCol::Id.is_in(favourite_ids.clone()))
            .count(&state.orm)
            .await?;
        if found as usize != favourite_ids.len() {
            return Err(AppError::bad_request("Unknown favourite product."));
        }
    }

    let password_hash = hash_password(&payload.password)?;
    let joining_reasons = payload
        .joining_reasons
        .into_iter()
        .map(|reason| reason.trim().to_string())
        .filter(|reason| !reason.is_empty())
        .collect();

    let txn = state.orm.begin().await?;

    let user = UserActive {
        id: Set(Uuid::new_v4()),
        email: Set(email),
        password_hash: Set(password_hash),
        fullname: Set(blank_to_none(payload.fullname)),
        profile: Set(blank_to_none(payload.profile)),
        profile_image_id: Set(blank_to_none(payload.profile_image_id)),
        bio: Set(blank_to_none(payload.bio)),
        joining_reasons: Set(StringList(joining_reasons)),
        addresses: Set(AddressList(payload.addresses)),
        // Admin accounts are provisioned out of band, never self-registered.
        is_admin: Set(false),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await?;

    for category_id in &interest_ids {
        InterestActive {
            user_id: Set(user.id),
            category_id: Set(*category_id),
        }
        .insert(&txn)
        .await?;
    }

    for product_id in &favourite_ids {
        FavouriteActive {
            user_id: Set(user.id),
            product_id: Set(*product_id),
        }
        .insert(&txn)
        .await?;
    }

    txn.commit().await?;

    audit::record(
        &state.orm,
        Some(user.id),
        "user_register",
        "users",
        serde_json::json!({ "user_id": user.id }),
    )
    .await;

    let token = issue_token(&state.config, user.id, role_of(&user))?;

    Ok(ApiResponse::success(
        "Your account is successfully created.",
        AuthPayload {
            token,
            user: user_from_entity(user, None),
        },
        Some(Meta::empty()),
    ))
}

pub async fn login_user(
    state: &AppState,
    payload: LoginRequest,
) -> AppResult<ApiResponse<AuthPayload>> {
    let LoginRequest {
        email,
        password,
        is_admin,
    } = payload;

    let mut violations = Violations::new();
    if email.trim().is_empty() {
        violations.add("email", "Please enter email address.");
    }
    if password.is_empty() {
        violations.add("password", "Please enter password.");
    }
    violations.into_result()?;

    let user = Users::find()
        .filter(UserCol::Email.eq(email.trim().to_lowercase()))
        .one(&state.orm)
        .await?;

    let user = match user {
        Some(u) => u,
        None => return Err(AppError::bad_request("Invalid email or password")),
    };

    if !verify_password(&password, &user.password_hash)? {
        return Err(AppError::bad_request("Invalid email or password"));
    }

    if is_admin && !user.is_admin {
        return Err(AppError::Forbidden);
    }

    let token = issue_token(&state.config, user.id, role_of(&user))?;

    audit::record(
        &state.orm,
        Some(user.id),
        "user_login",
        "users",
        serde_json::json!({ "user_id": user.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Logged in successfully.",
        AuthPayload {
            token,
            user: user_from_entity(user, None),
        },
        Some(Meta::empty()),
    ))
}

pub async fn current_user(state: &AppState, auth: &AuthUser) -> AppResult<ApiResponse<User>> {
    let user = Users::find_by_id(auth.user_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::Unauthorized)?;

    let interests = user
        .find_related(Categories)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(|category| CategoryRef {
            id: category.id,
            name: category.name,
        })
        .collect();

    Ok(ApiResponse::success(
        "User info fetched.",
        user_from_entity(user, Some(interests)),
        None,
    ))
}

pub fn issue_token(config: &AppConfig, user_id: Uuid, role: &str) -> AppResult<String> {
    let expiration = Utc::now()
        .checked_add_signed(Duration::hours(config.jwt_ttl_hours))
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to set expiration")))?;

    let claims = Claims {
        sub: user_id.to_string(),
        role: role.to_string(),
        exp: expiration.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
}

pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
}

pub fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("Invalid password hash")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

fn role_of(user: &UserModel) -> &'static str {
    if user.is_admin { "admin" } else { "user" }
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn dedup(ids: Vec<Uuid>) -> Vec<Uuid> {
    let mut seen = std::collections::HashSet::new();
    ids.into_iter().filter(|id| seen.insert(*id)).collect()
}

pub fn user_from_entity(model: UserModel, interests: Option<Vec<CategoryRef>>) -> User {
    User {
        id: model.id,
        email: model.email,
        fullname: model.fullname,
        profile: model.profile,
        profile_image_id: model.profile_image_id,
        bio: model.bio,
        joining_reasons: model.joining_reasons.0,
        addresses: model.addresses.0,
        is_admin: model.is_admin,
        interests,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        config::{ImageConfig, PaymentConfig},
        middleware::auth::decode_token,
    };

    fn config() -> AppConfig {
        AppConfig {
            database_url: String::new(),
            host: "127.0.0.1".into(),
            port: 0,
            jwt_secret: "test-secret".into(),
            jwt_ttl_hours: 1,
            public_base_url: None,
            max_body_bytes: 1024,
            payment: PaymentConfig {
                key_id: String::new(),
                key_secret: String::new(),
                webhook_secret: String::new(),
                api_url: String::new(),
                currency: "INR".into(),
            },
            images: ImageConfig {
                private_key: String::new(),
                upload_url: String::new(),
                api_url: String::new(),
                folder: String::new(),
            },
        }
    }

    #[test]
    fn issued_tokens_decode_with_same_secret() {
        let config = Arc::new(config());
        let user_id = Uuid::new_v4();
        let token = issue_token(&config, user_id, "admin").unwrap();

        let claims = decode_token(&token, &config.jwt_secret).unwrap();
        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.role, "admin");

        assert!(matches!(
            decode_token(&token, "another-secret"),
            Err(AppError::Unauthorized)
        ));
    }

    #[test]
    fn password_hashes_verify() {
        let hash = hash_password("correct horse").unwrap();
        assert!(verify_password("correct horse", &hash).unwrap());
        assert!(!verify_password("battery staple", &hash).unwrap());
    }
}
