use anyhow::{Context, Result};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};

use crate::entities::card_devices::{self, CardDeviceStatus};

pub struct DeviceRepository {
    conn: DatabaseConnection,
}

impl DeviceRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn get_by_id(&self, id: i32) -> Result<Option<card_devices::Model>> {
        let device = card_devices::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query device by ID")?;

        Ok(device)
    }

    /// Paged admin listing, most recently active first.
    pub async fn list(
        &self,
        page: u64,
        size: u64,
        card_id: Option<i32>,
        status: Option<CardDeviceStatus>,
        device_id: Option<&str>,
    ) -> Result<(Vec<card_devices::Model>, u64)> {
        let mut query = card_devices::Entity::find();

        if let Some(card_id) = card_id {
            query = query.filter(card_devices::Column::CardId.eq(card_id));
        }

        if let Some(status) = status {
            query = query.filter(card_devices::Column::Status.eq(status));
        }

        if let Some(device_id) = device_id {
            query = query.filter(card_devices::Column::DeviceId.contains(device_id));
        }

        let total = query.clone().count(&self.conn).await?;

        let page = page.max(1);
        let rows = query
            .order_by_desc(card_devices::Column::LastActiveAt)
            .offset((page - 1) * size)
            .limit(size)
            .all(&self.conn)
            .await
            .context("Failed to list devices")?;

        Ok((rows, total))
    }

    /// Enable or disable a device binding from the admin console.
    /// A disabled binding keeps its row so the device slot stays occupied.
    pub async fn update_status(&self, id: i32, status: CardDeviceStatus) -> Result<bool> {
        let Some(device) = card_devices::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query device for status update")?
        else {
            return Ok(false);
        };

        let mut active: card_devices::ActiveModel = device.into();
        active.status = Set(status);
        active.updated_at = Set(Utc::now());
        active.update(&self.conn).await?;

        Ok(true)
    }

    pub async fn count(&self, status: Option<CardDeviceStatus>) -> Result<u64> {
        let mut query = card_devices::Entity::find();
        if let Some(status) = status {
            query = query.filter(card_devices::Column::Status.eq(status));
        }
        Ok(query.count(&self.conn).await?)
    }
}
