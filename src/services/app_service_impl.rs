//! `SeaORM` implementation of the `AppService` trait.

use async_trait::async_trait;
use tracing::info;

use crate::db::Store;
use crate::entities::apps::{self, AppStatus};
use crate::services::app_service::{AppError, AppService};

pub struct SeaOrmAppService {
    store: Store,
}

impl SeaOrmAppService {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }
}

#[async_trait]
impl AppService for SeaOrmAppService {
    async fn create_app(
        &self,
        name: &str,
        description: Option<&str>,
    ) -> Result<apps::Model, AppError> {
        let name = name.trim();

        if name.is_empty() || name.len() > 64 {
            return Err(AppError::Validation(
                "App name must be 1-64 characters".to_string(),
            ));
        }

        if self.store.get_app_by_name(name).await?.is_some() {
            return Err(AppError::NameTaken);
        }

        let app = self.store.create_app(name, description).await?;

        info!(app_id = app.id, name = %app.app_name, "app created");

        Ok(app)
    }

    async fn list_apps(&self) -> Result<Vec<apps::Model>, AppError> {
        Ok(self.store.list_apps().await?)
    }

    async fn get_app(&self, app_id: i32) -> Result<apps::Model, AppError> {
        self.store
            .get_app(app_id)
            .await?
            .ok_or(AppError::NotFound)
    }

    async fn resolve_app_key(&self, app_key: &str) -> Result<apps::Model, AppError> {
        self.store
            .get_app_by_key(app_key)
            .await?
            .ok_or(AppError::NotFound)
    }

    async fn set_app_enabled(&self, app_id: i32, enabled: bool) -> Result<(), AppError> {
        let status = if enabled {
            AppStatus::Normal
        } else {
            AppStatus::Disabled
        };

        let updated = self.store.update_app_status(app_id, status).await?;
        if !updated {
            return Err(AppError::NotFound);
        }

        Ok(())
    }
}
