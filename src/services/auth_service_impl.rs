//! `SeaORM` implementation of the `AuthService` trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::task;
use tracing::info;

use crate::config::SecurityConfig;
use crate::db::Store;
use crate::db::repositories::user::hash_password;
use crate::entities::apps::AppStatus;
use crate::entities::users::UserStatus;
use crate::services::auth_service::{AuthError, AuthService, LoginResult, RegisterResult};
use crate::token::{Claims, TokenService};

pub struct SeaOrmAuthService {
    store: Store,
    tokens: TokenService,
    security: SecurityConfig,
}

impl SeaOrmAuthService {
    #[must_use]
    pub const fn new(store: Store, tokens: TokenService, security: SecurityConfig) -> Self {
        Self {
            store,
            tokens,
            security,
        }
    }
}

#[async_trait]
impl AuthService for SeaOrmAuthService {
    async fn register(&self, username: &str, password: &str) -> Result<RegisterResult, AuthError> {
        let username = username.trim();

        if username.len() < 3 || username.len() > 32 {
            return Err(AuthError::Validation(
                "Username must be 3-32 characters".to_string(),
            ));
        }

        if !username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(AuthError::Validation(
                "Username may only contain letters, digits, '_' and '-'".to_string(),
            ));
        }

        if password.len() < 6 {
            return Err(AuthError::Validation(
                "Password must be at least 6 characters".to_string(),
            ));
        }

        if self.store.get_user_by_username(username).await?.is_some() {
            return Err(AuthError::UsernameTaken);
        }

        // Argon2 hashing is CPU-bound; keep it off the async workers.
        let password = password.to_string();
        let security = self.security.clone();
        let hash = task::spawn_blocking(move || hash_password(&password, Some(&security)))
            .await
            .map_err(|e| AuthError::Internal(format!("hashing task panicked: {e}")))??;

        let user = self.store.create_user(username, &hash).await?;

        info!(user_id = user.id, username = %user.username, "user registered");

        Ok(RegisterResult {
            user_id: user.id,
            username: user.username,
        })
    }

    async fn login(
        &self,
        app_key: &str,
        username: &str,
        password: &str,
        device_id: &str,
    ) -> Result<LoginResult, AuthError> {
        let app = self
            .store
            .get_app_by_key(app_key)
            .await?
            .ok_or(AuthError::AppNotFound)?;

        if app.status == AppStatus::Disabled {
            return Err(AuthError::AppDisabled);
        }

        let is_valid = self.store.verify_user_password(username, password).await?;
        if !is_valid {
            return Err(AuthError::InvalidCredentials);
        }

        let user = self
            .store
            .get_user_by_username(username)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if user.status == UserStatus::Banned {
            return Err(AuthError::UserBanned);
        }

        let token = self
            .tokens
            .issue(user.id, &user.username, app.id, device_id, user.role)?;

        let expires_at_ts = Utc::now().timestamp() + self.tokens.expire_secs();
        let expires_at = DateTime::<Utc>::from_timestamp(expires_at_ts, 0)
            .ok_or_else(|| AuthError::Internal("token expiry out of range".to_string()))?;

        self.store
            .store_token(user.id, app.id, device_id, &token, expires_at)
            .await?;

        self.store.touch_user_login(user.id).await?;

        let has_card = self.store.user_has_active_card(user.id, app.id).await?;

        info!(user_id = user.id, app_id = app.id, device_id, "login succeeded");

        Ok(LoginResult {
            token,
            user_id: user.id,
            username: user.username,
            role: user.role,
            has_card,
            expires_at: expires_at_ts,
        })
    }

    async fn logout(&self, token: &str) -> Result<bool, AuthError> {
        let revoked = self.store.revoke_token(token).await?;
        Ok(revoked)
    }

    async fn verify_token(&self, token: &str) -> Result<Claims, AuthError> {
        let claims = self.tokens.decode(token).ok_or(AuthError::InvalidToken)?;

        // A decodable token that was logged out or superseded is dead.
        if self.store.find_live_token(token).await?.is_none() {
            return Err(AuthError::InvalidToken);
        }

        let user = self
            .store
            .get_user(claims.user_id)
            .await?
            .ok_or(AuthError::InvalidToken)?;

        if user.status == UserStatus::Banned {
            return Err(AuthError::UserBanned);
        }

        Ok(claims)
    }
}
