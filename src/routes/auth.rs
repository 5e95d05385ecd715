use axum::{
    Json, Router,
    extract::State,
    http::{StatusCode, header},
    routing::{get, post},
};

use crate::{
    dto::auth::{AuthPayload, LoginRequest, RegisterRequest},
    error::AppResult,
    middleware::auth::{AuthUser, expired_session_cookie, session_cookie},
    models::User,
    response::ApiResponse,
    services::auth_service::{current_user, login_user, register_user},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/me", get(me))
}

#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Register user", body = ApiResponse<AuthPayload>),
        (status = 400, description = "Invalid input")
    ),
    tag = "Auth"
)]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<AuthPayload>>)> {
    let resp = register_user(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login user, also sets the `token` cookie", body = ApiResponse<AuthPayload>),
        (status = 400, description = "Invalid credentials"),
        (status = 403, description = "Not an admin account")
    ),
    tag = "Auth"
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<([(header::HeaderName, String); 1], Json<ApiResponse<AuthPayload>>)> {
    let resp = login_user(&state, payload).await?;
    let token = resp
        .data
        .as_ref()
        .map(|payload| payload.token.as_str())
        .unwrap_or_default();
    let cookie = session_cookie(token, state.config.jwt_ttl_hours * 3600);
    Ok(([(header::SET_COOKIE, cookie)], Json(resp)))
}

#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses(
        (status = 200, description = "Clears the session cookie")
    ),
    tag = "Auth"
)]
pub async fn logout() -> ([(header::HeaderName, String); 1], Json<ApiResponse<()>>) {
    (
        [(header::SET_COOKIE, expired_session_cookie())],
        Json(ApiResponse::message_only("Logged out successfully.")),
    )
}

#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Current user", body = ApiResponse<User>),
        (status = 401, description = "Not logged in")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn me(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<User>>> {
    let resp = current_user(&state, &user).await?;
    Ok(Json(resp))
}
