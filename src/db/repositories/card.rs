use std::collections::HashSet;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use serde_json::Value as JsonValue;

use crate::entities::card_devices::{self, CardDeviceStatus};
use crate::entities::cards::{self, CardStatus};
use crate::entities::user_cards::{self, UserCardStatus};

pub struct CardRepository {
    conn: DatabaseConnection,
}

impl CardRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn get_by_id(&self, id: i32) -> Result<Option<cards::Model>> {
        let card = cards::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query card by ID")?;

        Ok(card)
    }

    pub async fn get_by_key(&self, app_id: i32, card_key: &str) -> Result<Option<cards::Model>> {
        let card = cards::Entity::find()
            .filter(cards::Column::AppId.eq(app_id))
            .filter(cards::Column::CardKey.eq(card_key))
            .one(&self.conn)
            .await
            .context("Failed to query card by key")?;

        Ok(card)
    }

    /// All card keys currently in the table, used to keep generated
    /// batches collision-free.
    pub async fn existing_keys(&self) -> Result<HashSet<String>> {
        let keys: Vec<String> = cards::Entity::find()
            .select_only()
            .column(cards::Column::CardKey)
            .into_tuple()
            .all(&self.conn)
            .await
            .context("Failed to load existing card keys")?;

        Ok(keys.into_iter().collect())
    }

    /// Insert a freshly generated batch. All cards start unused.
    pub async fn insert_batch(
        &self,
        app_id: i32,
        keys: &[String],
        expire_time: DateTime<Utc>,
        max_device_count: i32,
        permissions: Option<JsonValue>,
        remark: Option<&str>,
    ) -> Result<Vec<cards::Model>> {
        let now = Utc::now();
        let mut inserted = Vec::with_capacity(keys.len());

        for key in keys {
            let model = cards::ActiveModel {
                app_id: Set(app_id),
                card_key: Set(key.clone()),
                status: Set(CardStatus::Unused),
                expire_time: Set(expire_time),
                max_device_count: Set(max_device_count),
                permissions: Set(permissions.clone()),
                remark: Set(remark.map(ToString::to_string)),
                created_at: Set(now),
                updated_at: Set(now),
                ..Default::default()
            };

            let card = model
                .insert(&self.conn)
                .await
                .context("Failed to insert generated card")?;
            inserted.push(card);
        }

        Ok(inserted)
    }

    pub async fn update_status(&self, card_id: i32, status: CardStatus) -> Result<bool> {
        let Some(card) = cards::Entity::find_by_id(card_id)
            .one(&self.conn)
            .await
            .context("Failed to query card for status update")?
        else {
            return Ok(false);
        };

        let mut active: cards::ActiveModel = card.into();
        active.status = Set(status);
        active.updated_at = Set(Utc::now());
        active.update(&self.conn).await?;

        Ok(true)
    }

    pub async fn update_permissions(
        &self,
        card_id: i32,
        permissions: Option<JsonValue>,
    ) -> Result<bool> {
        let Some(card) = cards::Entity::find_by_id(card_id)
            .one(&self.conn)
            .await
            .context("Failed to query card for permission update")?
        else {
            return Ok(false);
        };

        let mut active: cards::ActiveModel = card.into();
        active.permissions = Set(permissions);
        active.updated_at = Set(Utc::now());
        active.update(&self.conn).await?;

        Ok(true)
    }

    /// Paged admin listing, newest first.
    pub async fn list(
        &self,
        page: u64,
        size: u64,
        app_id: Option<i32>,
        status: Option<CardStatus>,
        keyword: Option<&str>,
    ) -> Result<(Vec<cards::Model>, u64)> {
        let mut query = cards::Entity::find();

        if let Some(app_id) = app_id {
            query = query.filter(cards::Column::AppId.eq(app_id));
        }

        if let Some(status) = status {
            query = query.filter(cards::Column::Status.eq(status));
        }

        if let Some(keyword) = keyword {
            query = query.filter(
                cards::Column::CardKey
                    .contains(keyword)
                    .or(cards::Column::Remark.contains(keyword)),
            );
        }

        let total = query.clone().count(&self.conn).await?;

        let page = page.max(1);
        let rows = query
            .order_by_desc(cards::Column::CreatedAt)
            .offset((page - 1) * size)
            .limit(size)
            .all(&self.conn)
            .await
            .context("Failed to list cards")?;

        Ok((rows, total))
    }

    /// Delete cards and their bindings. Only unused or disabled cards
    /// should be deleted; the service layer enforces that.
    pub async fn delete_by_ids(&self, card_ids: &[i32]) -> Result<u64> {
        if card_ids.is_empty() {
            return Ok(0);
        }

        user_cards::Entity::delete_many()
            .filter(user_cards::Column::CardId.is_in(card_ids.to_vec()))
            .exec(&self.conn)
            .await
            .context("Failed to delete user card bindings")?;

        card_devices::Entity::delete_many()
            .filter(card_devices::Column::CardId.is_in(card_ids.to_vec()))
            .exec(&self.conn)
            .await
            .context("Failed to delete card device bindings")?;

        let result = cards::Entity::delete_many()
            .filter(cards::Column::Id.is_in(card_ids.to_vec()))
            .exec(&self.conn)
            .await
            .context("Failed to delete cards")?;

        Ok(result.rows_affected)
    }

    pub async fn count(&self, app_id: Option<i32>, status: Option<CardStatus>) -> Result<u64> {
        let mut query = cards::Entity::find();
        if let Some(app_id) = app_id {
            query = query.filter(cards::Column::AppId.eq(app_id));
        }
        if let Some(status) = status {
            query = query.filter(cards::Column::Status.eq(status));
        }
        Ok(query.count(&self.conn).await?)
    }

    pub async fn active_device_count(&self, card_id: i32) -> Result<u64> {
        let count = card_devices::Entity::find()
            .filter(card_devices::Column::CardId.eq(card_id))
            .filter(card_devices::Column::Status.eq(CardDeviceStatus::Active))
            .count(&self.conn)
            .await?;

        Ok(count)
    }

    pub async fn active_user_count(&self, card_id: i32) -> Result<u64> {
        let count = user_cards::Entity::find()
            .filter(user_cards::Column::CardId.eq(card_id))
            .filter(user_cards::Column::Status.eq(UserCardStatus::Active))
            .count(&self.conn)
            .await?;

        Ok(count)
    }

    /// Whether the user holds at least one active card binding within
    /// the app.
    pub async fn user_has_active_card(&self, user_id: i32, app_id: i32) -> Result<bool> {
        let count = user_cards::Entity::find()
            .filter(user_cards::Column::UserId.eq(user_id))
            .filter(user_cards::Column::Status.eq(UserCardStatus::Active))
            .inner_join(cards::Entity)
            .filter(cards::Column::AppId.eq(app_id))
            .count(&self.conn)
            .await?;

        Ok(count > 0)
    }

    pub async fn devices_for_card(&self, card_id: i32) -> Result<Vec<card_devices::Model>> {
        let rows = card_devices::Entity::find()
            .filter(card_devices::Column::CardId.eq(card_id))
            .order_by_asc(card_devices::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to list card devices")?;

        Ok(rows)
    }
}
