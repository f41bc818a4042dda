use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::fmt;

use super::ApiResponse;
use crate::services::{
    AdminError, AppError, AuthError, CardError, FeaturePermissionError, PermissionError,
};

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),

    DatabaseError(String),

    ValidationError(String),

    Conflict(String),

    InternalError(String),

    Unauthorized(String),

    Forbidden(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::DatabaseError(msg) => write!(f, "Database error: {}", msg),
            ApiError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            ApiError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ApiError::DatabaseError(msg) => {
                tracing::error!("Database error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "A database error occurred".to_string(),
                )
            }
            ApiError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            ApiError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal error occurred".to_string(),
                )
            }
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone()),
        };

        let body = ApiResponse::<()>::error(error_message);

        (status, Json(body)).into_response()
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials | AuthError::InvalidToken => {
                Self::Unauthorized(err.to_string())
            }
            AuthError::UserBanned | AuthError::AppDisabled => Self::Forbidden(err.to_string()),
            AuthError::UsernameTaken => Self::Conflict(err.to_string()),
            AuthError::AppNotFound => Self::NotFound(err.to_string()),
            AuthError::Validation(msg) => Self::ValidationError(msg),
            AuthError::Database(msg) => Self::DatabaseError(msg),
            AuthError::Internal(msg) => Self::InternalError(msg),
        }
    }
}

impl From<CardError> for ApiError {
    fn from(err: CardError) -> Self {
        match err {
            CardError::CardNotFound => Self::NotFound(err.to_string()),
            CardError::DeviceAlreadyBound => Self::Conflict(err.to_string()),
            CardError::WrongApp
            | CardError::CardDisabled
            | CardError::CardExpired
            | CardError::DeviceDisabled
            | CardError::DeviceLimitReached(_)
            | CardError::NotBound
            | CardError::BindingNotFound => Self::ValidationError(err.to_string()),
            CardError::Database(msg) => Self::DatabaseError(msg),
            CardError::Internal(msg) => Self::InternalError(msg),
        }
    }
}

impl From<PermissionError> for ApiError {
    fn from(err: PermissionError) -> Self {
        match err {
            PermissionError::Database(msg) => Self::DatabaseError(msg),
            PermissionError::Internal(msg) => Self::InternalError(msg),
        }
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::NotFound => Self::NotFound(err.to_string()),
            AppError::NameTaken => Self::Conflict(err.to_string()),
            AppError::Validation(msg) => Self::ValidationError(msg),
            AppError::Database(msg) => Self::DatabaseError(msg),
            AppError::Internal(msg) => Self::InternalError(msg),
        }
    }
}

impl From<AdminError> for ApiError {
    fn from(err: AdminError) -> Self {
        match err {
            AdminError::CardNotFound
            | AdminError::UserNotFound
            | AdminError::DeviceNotFound
            | AdminError::AppNotFound => Self::NotFound(err.to_string()),
            AdminError::UnknownPermission(_) => Self::ValidationError(err.to_string()),
            AdminError::Validation(msg) => Self::ValidationError(msg),
            AdminError::Database(msg) => Self::DatabaseError(msg),
            AdminError::Internal(msg) => Self::InternalError(msg),
        }
    }
}

impl From<FeaturePermissionError> for ApiError {
    fn from(err: FeaturePermissionError) -> Self {
        match err {
            FeaturePermissionError::NotFound => Self::NotFound(err.to_string()),
            FeaturePermissionError::KeyTaken => Self::Conflict(err.to_string()),
            FeaturePermissionError::Validation(msg) => Self::ValidationError(msg),
            FeaturePermissionError::Database(msg) => Self::DatabaseError(msg),
            FeaturePermissionError::Internal(msg) => Self::InternalError(msg),
        }
    }
}
