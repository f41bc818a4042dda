//! Domain service for app registration and lookup. Every card and
//! login is scoped to an app; the app key is the client credential
//! identifying which app is calling.

use thiserror::Error;

use crate::entities::apps;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("app not found")]
    NotFound,

    #[error("app name already taken")]
    NameTaken,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for AppError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Domain service trait for app management.
#[async_trait::async_trait]
pub trait AppService: Send + Sync {
    /// Registers an app and generates its key.
    async fn create_app(
        &self,
        name: &str,
        description: Option<&str>,
    ) -> Result<apps::Model, AppError>;

    async fn list_apps(&self) -> Result<Vec<apps::Model>, AppError>;

    async fn get_app(&self, app_id: i32) -> Result<apps::Model, AppError>;

    /// Resolves an app key to the app, enabled or not. Callers decide
    /// whether a disabled app is acceptable.
    async fn resolve_app_key(&self, app_key: &str) -> Result<apps::Model, AppError>;

    async fn set_app_enabled(&self, app_id: i32, enabled: bool) -> Result<(), AppError>;
}
