use anyhow::{Context, Result};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};

use crate::entities::feature_permissions::{self, FeaturePermissionStatus};

pub struct FeaturePermissionRepository {
    conn: DatabaseConnection,
}

pub struct NewFeaturePermission {
    pub permission_key: String,
    pub permission_name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub icon: Option<String>,
    pub sort_order: i32,
}

impl FeaturePermissionRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Full catalog ordered by sort order then key, for the admin console.
    pub async fn list(&self) -> Result<Vec<feature_permissions::Model>> {
        let rows = feature_permissions::Entity::find()
            .order_by_asc(feature_permissions::Column::SortOrder)
            .order_by_asc(feature_permissions::Column::PermissionKey)
            .all(&self.conn)
            .await
            .context("Failed to list feature permissions")?;

        Ok(rows)
    }

    /// Keys of enabled catalog entries, what clients may be granted.
    pub async fn enabled_keys(&self) -> Result<Vec<String>> {
        let rows = feature_permissions::Entity::find()
            .filter(feature_permissions::Column::Status.eq(FeaturePermissionStatus::Normal))
            .order_by_asc(feature_permissions::Column::SortOrder)
            .order_by_asc(feature_permissions::Column::PermissionKey)
            .all(&self.conn)
            .await
            .context("Failed to list enabled feature permissions")?;

        Ok(rows.into_iter().map(|p| p.permission_key).collect())
    }

    pub async fn get_by_key(&self, key: &str) -> Result<Option<feature_permissions::Model>> {
        let row = feature_permissions::Entity::find()
            .filter(feature_permissions::Column::PermissionKey.eq(key))
            .one(&self.conn)
            .await
            .context("Failed to query feature permission by key")?;

        Ok(row)
    }

    pub async fn create(&self, new: NewFeaturePermission) -> Result<feature_permissions::Model> {
        let now = Utc::now();
        let model = feature_permissions::ActiveModel {
            permission_key: Set(new.permission_key),
            permission_name: Set(new.permission_name),
            description: Set(new.description),
            category: Set(new.category),
            icon: Set(new.icon),
            sort_order: Set(new.sort_order),
            status: Set(FeaturePermissionStatus::Normal),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let inserted = model
            .insert(&self.conn)
            .await
            .context("Failed to insert feature permission")?;

        Ok(inserted)
    }

    pub async fn update_status(&self, id: i32, status: FeaturePermissionStatus) -> Result<bool> {
        let Some(perm) = feature_permissions::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query feature permission for status update")?
        else {
            return Ok(false);
        };

        let mut active: feature_permissions::ActiveModel = perm.into();
        active.status = Set(status);
        active.updated_at = Set(Utc::now());
        active.update(&self.conn).await?;

        Ok(true)
    }

    pub async fn delete(&self, id: i32) -> Result<bool> {
        let result = feature_permissions::Entity::delete_by_id(id)
            .exec(&self.conn)
            .await
            .context("Failed to delete feature permission")?;

        Ok(result.rows_affected > 0)
    }
}
