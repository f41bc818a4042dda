use anyhow::{Context, Result};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};

use crate::card_key;
use crate::entities::apps::{self, AppStatus};

pub struct AppRepository {
    conn: DatabaseConnection,
}

impl AppRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn get_by_id(&self, id: i32) -> Result<Option<apps::Model>> {
        let app = apps::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query app by ID")?;

        Ok(app)
    }

    pub async fn get_by_key(&self, app_key: &str) -> Result<Option<apps::Model>> {
        let app = apps::Entity::find()
            .filter(apps::Column::AppKey.eq(app_key))
            .one(&self.conn)
            .await
            .context("Failed to query app by key")?;

        Ok(app)
    }

    pub async fn get_by_name(&self, name: &str) -> Result<Option<apps::Model>> {
        let app = apps::Entity::find()
            .filter(apps::Column::AppName.eq(name))
            .one(&self.conn)
            .await
            .context("Failed to query app by name")?;

        Ok(app)
    }

    /// Register a new app with a generated key.
    pub async fn create(&self, name: &str, description: Option<&str>) -> Result<apps::Model> {
        let now = Utc::now();
        let model = apps::ActiveModel {
            app_name: Set(name.to_string()),
            app_key: Set(card_key::random_hex(16)),
            description: Set(description.map(ToString::to_string)),
            status: Set(AppStatus::Normal),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let inserted = model
            .insert(&self.conn)
            .await
            .context("Failed to insert app")?;

        Ok(inserted)
    }

    pub async fn list(&self) -> Result<Vec<apps::Model>> {
        let rows = apps::Entity::find()
            .order_by_asc(apps::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to list apps")?;

        Ok(rows)
    }

    pub async fn update_status(&self, app_id: i32, status: AppStatus) -> Result<bool> {
        let Some(app) = apps::Entity::find_by_id(app_id)
            .one(&self.conn)
            .await
            .context("Failed to query app for status update")?
        else {
            return Ok(false);
        };

        let mut active: apps::ActiveModel = app.into();
        active.status = Set(status);
        active.updated_at = Set(Utc::now());
        active.update(&self.conn).await?;

        Ok(true)
    }

    pub async fn count(&self) -> Result<u64> {
        Ok(apps::Entity::find().count(&self.conn).await?)
    }
}
