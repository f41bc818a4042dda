//! `SeaORM` implementation of the `AdminService` trait.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde_json::Value as JsonValue;
use tracing::{info, warn};

use crate::card_key;
use crate::db::{Store, User};
use crate::entities::card_devices::{self, CardDeviceStatus};
use crate::entities::cards::{self, CardStatus};
use crate::entities::users::UserStatus;
use crate::models::permission::PermissionSpec;
use crate::services::admin_service::{
    AdminError, AdminService, CardRow, GenerateCardsRequest, Page, StatsSummary,
};

pub struct SeaOrmAdminService {
    store: Store,
}

impl SeaOrmAdminService {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }

    /// Reject permission keys that are not in the enabled catalog, so
    /// a typo in the console cannot mint cards granting nothing.
    async fn validate_permission_keys(&self, keys: &[String]) -> Result<(), AdminError> {
        let enabled: HashSet<String> = self
            .store
            .enabled_feature_permission_keys()
            .await?
            .into_iter()
            .collect();

        for key in keys {
            if !enabled.contains(key) {
                return Err(AdminError::UnknownPermission(key.clone()));
            }
        }

        Ok(())
    }

    async fn card_row(&self, card: cards::Model) -> Result<CardRow, AdminError> {
        let bound_users = self.store.card_active_user_count(card.id).await?;
        let bound_devices = self.store.card_active_device_count(card.id).await?;

        let permissions = card
            .permissions
            .as_ref()
            .and_then(PermissionSpec::from_value)
            .map(|spec| spec.granted_keys())
            .unwrap_or_default();

        Ok(CardRow {
            id: card.id,
            app_id: card.app_id,
            card_key: card.card_key,
            status: card.status,
            expire_time: card.expire_time,
            max_device_count: card.max_device_count,
            bound_users,
            bound_devices,
            permissions,
            remark: card.remark,
            created_at: card.created_at,
        })
    }
}

#[async_trait]
impl AdminService for SeaOrmAdminService {
    async fn generate_cards(
        &self,
        request: GenerateCardsRequest,
    ) -> Result<Vec<cards::Model>, AdminError> {
        if request.count == 0 || request.count > 1000 {
            return Err(AdminError::Validation(
                "Batch size must be 1-1000".to_string(),
            ));
        }

        if request.valid_days < 1 {
            return Err(AdminError::Validation(
                "Validity must be at least 1 day".to_string(),
            ));
        }

        if request.max_device_count < 1 {
            return Err(AdminError::Validation(
                "Device limit must be at least 1".to_string(),
            ));
        }

        if self.store.get_app(request.app_id).await?.is_none() {
            return Err(AdminError::AppNotFound);
        }

        self.validate_permission_keys(&request.permissions).await?;

        let existing = self.store.existing_card_keys().await?;
        let keys = card_key::generate_batch(request.count as usize, &existing)?;

        let expire_time = Utc::now() + Duration::days(request.valid_days);
        let permissions: Option<JsonValue> = if request.permissions.is_empty() {
            None
        } else {
            Some(JsonValue::from(request.permissions.clone()))
        };

        let cards = self
            .store
            .insert_card_batch(
                request.app_id,
                &keys,
                expire_time,
                request.max_device_count,
                permissions,
                request.remark.as_deref(),
            )
            .await?;

        info!(
            app_id = request.app_id,
            count = cards.len(),
            valid_days = request.valid_days,
            "card batch generated"
        );

        Ok(cards)
    }

    async fn list_cards(
        &self,
        page: u64,
        size: u64,
        app_id: Option<i32>,
        status: Option<CardStatus>,
        keyword: Option<&str>,
    ) -> Result<Page<CardRow>, AdminError> {
        let size = size.clamp(1, 100);
        let (cards, total) = self
            .store
            .list_cards(page, size, app_id, status, keyword)
            .await?;

        let mut items = Vec::with_capacity(cards.len());
        for card in cards {
            items.push(self.card_row(card).await?);
        }

        Ok(Page {
            items,
            total,
            page: page.max(1),
            size,
        })
    }

    async fn get_card(&self, card_id: i32) -> Result<CardRow, AdminError> {
        let card = self
            .store
            .get_card(card_id)
            .await?
            .ok_or(AdminError::CardNotFound)?;

        self.card_row(card).await
    }

    async fn set_card_enabled(&self, card_id: i32, enabled: bool) -> Result<(), AdminError> {
        let card = self
            .store
            .get_card(card_id)
            .await?
            .ok_or(AdminError::CardNotFound)?;

        let status = if enabled {
            // Re-enabling lands on used or unused depending on bindings.
            if self.store.card_active_user_count(card.id).await? > 0 {
                CardStatus::Used
            } else {
                CardStatus::Unused
            }
        } else {
            CardStatus::Disabled
        };

        self.store.update_card_status(card_id, status).await?;

        info!(card_id, enabled, "card status changed");

        Ok(())
    }

    async fn update_card_permissions(
        &self,
        card_id: i32,
        permissions: Vec<String>,
    ) -> Result<(), AdminError> {
        if self.store.get_card(card_id).await?.is_none() {
            return Err(AdminError::CardNotFound);
        }

        self.validate_permission_keys(&permissions).await?;

        let value: Option<JsonValue> = if permissions.is_empty() {
            None
        } else {
            Some(JsonValue::from(permissions))
        };

        self.store.update_card_permissions(card_id, value).await?;

        Ok(())
    }

    async fn delete_cards(&self, card_ids: &[i32]) -> Result<u64, AdminError> {
        if card_ids.is_empty() {
            return Ok(0);
        }

        // Bindings go with the card.
        let deleted = self.store.delete_cards(card_ids).await?;

        if deleted < card_ids.len() as u64 {
            warn!(
                requested = card_ids.len(),
                deleted, "some card IDs did not exist"
            );
        }

        info!(count = deleted, "cards deleted");

        Ok(deleted)
    }

    async fn list_users(
        &self,
        page: u64,
        size: u64,
        status: Option<UserStatus>,
        keyword: Option<&str>,
    ) -> Result<Page<User>, AdminError> {
        let size = size.clamp(1, 100);
        let (items, total) = self.store.list_users(page, size, status, keyword).await?;

        Ok(Page {
            items,
            total,
            page: page.max(1),
            size,
        })
    }

    async fn set_user_banned(&self, user_id: i32, banned: bool) -> Result<(), AdminError> {
        let status = if banned {
            UserStatus::Banned
        } else {
            UserStatus::Normal
        };

        let updated = self.store.update_user_status(user_id, status).await?;
        if !updated {
            return Err(AdminError::UserNotFound);
        }

        info!(user_id, banned, "user moderation status changed");

        Ok(())
    }

    async fn list_devices(
        &self,
        page: u64,
        size: u64,
        card_id: Option<i32>,
        device_id: Option<&str>,
    ) -> Result<Page<card_devices::Model>, AdminError> {
        let size = size.clamp(1, 100);
        let (items, total) = self
            .store
            .list_devices(page, size, card_id, None, device_id)
            .await?;

        Ok(Page {
            items,
            total,
            page: page.max(1),
            size,
        })
    }

    async fn set_device_enabled(
        &self,
        device_row_id: i32,
        enabled: bool,
    ) -> Result<(), AdminError> {
        let status = if enabled {
            CardDeviceStatus::Active
        } else {
            CardDeviceStatus::Disabled
        };

        let updated = self.store.update_device_status(device_row_id, status).await?;
        if !updated {
            return Err(AdminError::DeviceNotFound);
        }

        info!(device_row_id, enabled, "device binding status changed");

        Ok(())
    }

    async fn stats(&self) -> Result<StatsSummary, AdminError> {
        Ok(StatsSummary {
            total_apps: self.store.count_apps().await?,
            total_users: self.store.count_users(None).await?,
            banned_users: self.store.count_users(Some(UserStatus::Banned)).await?,
            total_cards: self.store.count_cards(None, None).await?,
            unused_cards: self
                .store
                .count_cards(None, Some(CardStatus::Unused))
                .await?,
            used_cards: self.store.count_cards(None, Some(CardStatus::Used)).await?,
            disabled_cards: self
                .store
                .count_cards(None, Some(CardStatus::Disabled))
                .await?,
            total_devices: self.store.count_devices(None).await?,
            active_devices: self
                .store
                .count_devices(Some(CardDeviceStatus::Active))
                .await?,
        })
    }
}
