//! `SeaORM` implementation of the `FeaturePermissionService` trait.

use async_trait::async_trait;
use tracing::info;

use crate::db::{NewFeaturePermission, Store};
use crate::entities::feature_permissions::{self, FeaturePermissionStatus};
use crate::services::feature_permission_service::{
    FeaturePermissionError, FeaturePermissionService,
};

pub struct SeaOrmFeaturePermissionService {
    store: Store,
}

impl SeaOrmFeaturePermissionService {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }
}

#[async_trait]
impl FeaturePermissionService for SeaOrmFeaturePermissionService {
    async fn list(&self) -> Result<Vec<feature_permissions::Model>, FeaturePermissionError> {
        Ok(self.store.list_feature_permissions().await?)
    }

    async fn enabled_keys(&self) -> Result<Vec<String>, FeaturePermissionError> {
        Ok(self.store.enabled_feature_permission_keys().await?)
    }

    async fn create(
        &self,
        new: NewFeaturePermission,
    ) -> Result<feature_permissions::Model, FeaturePermissionError> {
        let key = new.permission_key.trim();

        if key.is_empty() || key.len() > 64 {
            return Err(FeaturePermissionError::Validation(
                "Permission key must be 1-64 characters".to_string(),
            ));
        }

        if !key
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        {
            return Err(FeaturePermissionError::Validation(
                "Permission key may only contain lowercase letters, digits and '_'".to_string(),
            ));
        }

        if self.store.get_feature_permission_by_key(key).await?.is_some() {
            return Err(FeaturePermissionError::KeyTaken);
        }

        let created = self
            .store
            .create_feature_permission(NewFeaturePermission {
                permission_key: key.to_string(),
                ..new
            })
            .await?;

        info!(key = %created.permission_key, "feature permission created");

        Ok(created)
    }

    async fn set_enabled(&self, id: i32, enabled: bool) -> Result<(), FeaturePermissionError> {
        let status = if enabled {
            FeaturePermissionStatus::Normal
        } else {
            FeaturePermissionStatus::Disabled
        };

        let updated = self.store.update_feature_permission_status(id, status).await?;
        if !updated {
            return Err(FeaturePermissionError::NotFound);
        }

        Ok(())
    }

    async fn delete(&self, id: i32) -> Result<(), FeaturePermissionError> {
        let deleted = self.store.delete_feature_permission(id).await?;
        if !deleted {
            return Err(FeaturePermissionError::NotFound);
        }

        Ok(())
    }
}
