//! Domain service for the feature permission catalog.

use thiserror::Error;

use crate::db::NewFeaturePermission;
use crate::entities::feature_permissions;

#[derive(Debug, Error)]
pub enum FeaturePermissionError {
    #[error("permission not found")]
    NotFound,

    #[error("permission key already exists")]
    KeyTaken,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for FeaturePermissionError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for FeaturePermissionError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Domain service trait for the permission catalog.
#[async_trait::async_trait]
pub trait FeaturePermissionService: Send + Sync {
    async fn list(&self) -> Result<Vec<feature_permissions::Model>, FeaturePermissionError>;

    /// Keys clients can currently be granted.
    async fn enabled_keys(&self) -> Result<Vec<String>, FeaturePermissionError>;

    async fn create(
        &self,
        new: NewFeaturePermission,
    ) -> Result<feature_permissions::Model, FeaturePermissionError>;

    /// Disabling a key stops it from being granted on new cards;
    /// existing cards keep whatever they already grant.
    async fn set_enabled(&self, id: i32, enabled: bool) -> Result<(), FeaturePermissionError>;

    async fn delete(&self, id: i32) -> Result<(), FeaturePermissionError>;
}
