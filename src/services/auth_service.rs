//! Domain service for client authentication: registration, login with
//! token issue, logout, and server-side token verification.

use serde::Serialize;
use thiserror::Error;

use crate::entities::users::UserRole;
use crate::token::Claims;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("user banned")]
    UserBanned,

    #[error("username already taken")]
    UsernameTaken,

    #[error("app not found")]
    AppNotFound,

    #[error("app disabled")]
    AppDisabled,

    #[error("invalid or expired token")]
    InvalidToken,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for AuthError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterResult {
    pub user_id: i32,
    pub username: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginResult {
    pub token: String,
    pub user_id: i32,
    pub username: String,
    pub role: UserRole,
    /// Whether the user already holds an active card in this app, so
    /// clients can route straight to binding when they don't.
    pub has_card: bool,
    /// Unix timestamp when the token stops working.
    pub expires_at: i64,
}

/// Domain service trait for authentication.
#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    /// Creates a user account.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::UsernameTaken`] on a duplicate username and
    /// [`AuthError::Validation`] for malformed input.
    async fn register(&self, username: &str, password: &str) -> Result<RegisterResult, AuthError>;

    /// Verifies credentials within an app and issues a login token bound
    /// to the calling device. The token is persisted so logout can
    /// revoke it before its signed expiry.
    async fn login(
        &self,
        app_key: &str,
        username: &str,
        password: &str,
        device_id: &str,
    ) -> Result<LoginResult, AuthError>;

    /// Revokes a token. Returns whether it was still live.
    async fn logout(&self, token: &str) -> Result<bool, AuthError>;

    /// Verifies a token's signature, expiry, and server-side liveness,
    /// returning its claims. Banned users fail verification even with a
    /// valid token.
    async fn verify_token(&self, token: &str) -> Result<Claims, AuthError>;
}
