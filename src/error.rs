use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sea_orm::{DbErr, SqlErr};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::response::ApiResponse;

/// A single rejected input field, keyed the way the admin forms name them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct FieldError {
    pub key: String,
    pub message: String,
}

impl FieldError {
    pub fn new(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("Invalid input provided.")]
    Validation(Vec<FieldError>),

    #[error("Please login to continue.")]
    Unauthorized,

    #[error("Unauthorized access.")]
    Forbidden,

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Upstream(String),

    #[error("ORM error")]
    OrmError(#[from] DbErr),

    #[error("Internal Server Error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn not_found(message: impl Into<String>) -> Self {
        AppError::NotFound(message.into())
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        AppError::BadRequest(message.into())
    }

    /// Logs a third-party failure and hides its detail behind `message`.
    pub fn upstream(message: &str, err: impl std::fmt::Display) -> Self {
        tracing::error!(error = %err, "{message}");
        AppError::Upstream(message.to_string())
    }

    pub fn status(&self) -> StatusCode {
        self.classify().0
    }

    fn classify(&self) -> (StatusCode, String) {
        match self {
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            AppError::BadRequest(_) | AppError::Validation(_) => {
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string()),
            AppError::Forbidden => (StatusCode::FORBIDDEN, self.to_string()),
            AppError::Conflict(_) => (StatusCode::CONFLICT, self.to_string()),
            AppError::Upstream(_) => (StatusCode::BAD_GATEWAY, self.to_string()),
            AppError::OrmError(err) => classify_db_error(err),
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Server Error".to_string(),
            ),
        }
    }
}

fn classify_db_error(err: &DbErr) -> (StatusCode, String) {
    match err {
        DbErr::RecordNotFound(_) | DbErr::RecordNotUpdated => {
            return (StatusCode::NOT_FOUND, "Record not found.".to_string());
        }
        DbErr::Type(_) | DbErr::Json(_) | DbErr::TryIntoErr { .. } => {
            return (
                StatusCode::BAD_REQUEST,
                "Please check field types.".to_string(),
            );
        }
        _ => {}
    }

    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            (StatusCode::CONFLICT, "Record already exists.".to_string())
        }
        Some(SqlErr::ForeignKeyConstraintViolation(_)) => (
            StatusCode::BAD_REQUEST,
            "Referenced record does not exist.".to_string(),
        ),
        _ => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Server Error".to_string(),
        ),
    }
}

#[derive(Serialize, ToSchema)]
pub struct ErrorData {
    pub error: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<FieldError>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub redirect: bool,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = self.classify();

        if status.is_server_error() {
            tracing::error!(error = ?self, "request failed");
        }

        let errors = match self {
            AppError::Validation(errors) => errors,
            _ => Vec::new(),
        };

        let body = ApiResponse {
            message: message.clone(),
            data: Some(ErrorData {
                error: message,
                errors,
                // The admin UI signs out when it sees this flag.
                redirect: status == StatusCode::FORBIDDEN,
            }),
            meta: None,
        };

        (status, axum::Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_not_found_maps_to_404() {
        let err = AppError::from(DbErr::RecordNotFound("products".into()));
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.classify().1, "Record not found.");
    }

    #[test]
    fn type_errors_map_to_400() {
        let err = AppError::from(DbErr::Type("bad column".into()));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn generic_db_errors_hide_details() {
        let err = AppError::from(DbErr::Custom("connection refused".into()));
        assert_eq!(
            err.classify(),
            (StatusCode::INTERNAL_SERVER_ERROR, "Server Error".to_string())
        );
    }

    #[test]
    fn upstream_failures_are_bad_gateway() {
        assert_eq!(
            AppError::Upstream("Image upload failed".into()).status(),
            StatusCode::BAD_GATEWAY
        );
    }
}
