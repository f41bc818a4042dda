//! `SeaORM` implementation of the `CardService` trait.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseTransaction, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use tracing::info;

use crate::card_key;
use crate::db::Store;
use crate::entities::card_devices::{self, CardDeviceStatus};
use crate::entities::cards::{self, CardStatus};
use crate::entities::user_cards::{self, UserCardStatus};
use crate::models::permission::PermissionSpec;
use crate::services::card_service::{
    BindResult, CardCheck, CardError, CardService, CardSummary,
};

pub struct SeaOrmCardService {
    store: Store,
}

impl SeaOrmCardService {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }

    /// Resolve a card key within an app, distinguishing an unknown key
    /// from a key that belongs to a different app.
    async fn resolve_card(
        &self,
        txn: &DatabaseTransaction,
        app_id: i32,
        card_key: &str,
    ) -> Result<cards::Model, CardError> {
        let key = card_key::normalize_card_key(card_key);

        let card = cards::Entity::find()
            .filter(cards::Column::CardKey.eq(key))
            .one(txn)
            .await?
            .ok_or(CardError::CardNotFound)?;

        if card.app_id != app_id {
            return Err(CardError::WrongApp);
        }

        Ok(card)
    }

    fn granted_keys(card: &cards::Model) -> Vec<String> {
        card.permissions
            .as_ref()
            .and_then(PermissionSpec::from_value)
            .map(|spec| spec.granted_keys())
            .unwrap_or_default()
    }
}

#[async_trait]
impl CardService for SeaOrmCardService {
    async fn bind_card(
        &self,
        app_id: i32,
        user_id: i32,
        card_key: &str,
        device_id: &str,
        device_name: Option<&str>,
    ) -> Result<BindResult, CardError> {
        let txn = self.store.conn.begin().await?;

        let card = self.resolve_card(&txn, app_id, card_key).await?;

        match card.status {
            CardStatus::Disabled => return Err(CardError::CardDisabled),
            CardStatus::Unused | CardStatus::Used => {}
        }

        let now = Utc::now();
        if card.expire_time <= now {
            return Err(CardError::CardExpired);
        }

        let existing_device = card_devices::Entity::find()
            .filter(card_devices::Column::CardId.eq(card.id))
            .filter(card_devices::Column::DeviceId.eq(device_id))
            .one(&txn)
            .await?;

        if let Some(device) = existing_device {
            return Err(match device.status {
                CardDeviceStatus::Disabled => CardError::DeviceDisabled,
                CardDeviceStatus::Active => CardError::DeviceAlreadyBound,
            });
        }

        let device_count = card_devices::Entity::find()
            .filter(card_devices::Column::CardId.eq(card.id))
            .filter(card_devices::Column::Status.eq(CardDeviceStatus::Active))
            .count(&txn)
            .await?;

        if device_count >= u64::try_from(card.max_device_count).unwrap_or(0) {
            return Err(CardError::DeviceLimitReached(card.max_device_count));
        }

        let user_card = user_cards::Entity::find()
            .filter(user_cards::Column::UserId.eq(user_id))
            .filter(user_cards::Column::CardId.eq(card.id))
            .one(&txn)
            .await?;

        match user_card {
            Some(uc) if uc.status == UserCardStatus::Active => {}
            Some(uc) => {
                let mut active: user_cards::ActiveModel = uc.into();
                active.status = Set(UserCardStatus::Active);
                active.bind_time = Set(now);
                active.updated_at = Set(now);
                active.update(&txn).await?;
            }
            None => {
                let model = user_cards::ActiveModel {
                    user_id: Set(user_id),
                    card_id: Set(card.id),
                    bind_time: Set(now),
                    status: Set(UserCardStatus::Active),
                    created_at: Set(now),
                    updated_at: Set(now),
                    ..Default::default()
                };
                model.insert(&txn).await?;
            }
        }

        let device = card_devices::ActiveModel {
            card_id: Set(card.id),
            device_id: Set(device_id.to_string()),
            device_name: Set(device_name.map(ToString::to_string)),
            bind_time: Set(now),
            last_active_at: Set(now),
            status: Set(CardDeviceStatus::Active),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        device.insert(&txn).await?;

        let permissions = Self::granted_keys(&card);
        let result = BindResult {
            card_id: card.id,
            card_key: card.card_key.clone(),
            expire_time: card.expire_time,
            max_device_count: card.max_device_count,
            permissions,
        };

        if card.status == CardStatus::Unused {
            let mut active: cards::ActiveModel = card.into();
            active.status = Set(CardStatus::Used);
            active.updated_at = Set(now);
            active.update(&txn).await?;
        }

        txn.commit().await?;

        info!(user_id, device_id, card_id = result.card_id, "card bound");

        Ok(result)
    }

    async fn unbind_card(
        &self,
        app_id: i32,
        user_id: i32,
        card_id: i32,
        device_id: &str,
    ) -> Result<(), CardError> {
        let txn = self.store.conn.begin().await?;

        let card = cards::Entity::find_by_id(card_id)
            .one(&txn)
            .await?
            .ok_or(CardError::CardNotFound)?;
        if card.app_id != app_id {
            return Err(CardError::WrongApp);
        }

        let user_card = user_cards::Entity::find()
            .filter(user_cards::Column::UserId.eq(user_id))
            .filter(user_cards::Column::CardId.eq(card.id))
            .filter(user_cards::Column::Status.eq(UserCardStatus::Active))
            .one(&txn)
            .await?
            .ok_or(CardError::NotBound)?;

        let device = card_devices::Entity::find()
            .filter(card_devices::Column::CardId.eq(card.id))
            .filter(card_devices::Column::DeviceId.eq(device_id))
            .one(&txn)
            .await?
            .ok_or(CardError::BindingNotFound)?;

        card_devices::Entity::delete_by_id(device.id)
            .exec(&txn)
            .await?;

        let remaining = card_devices::Entity::find()
            .filter(card_devices::Column::CardId.eq(card.id))
            .filter(card_devices::Column::Status.eq(CardDeviceStatus::Active))
            .count(&txn)
            .await?;

        if remaining == 0 {
            let now = Utc::now();

            let mut released: user_cards::ActiveModel = user_card.into();
            released.status = Set(UserCardStatus::Unbind);
            released.updated_at = Set(now);
            released.update(&txn).await?;

            let other_users = user_cards::Entity::find()
                .filter(user_cards::Column::CardId.eq(card.id))
                .filter(user_cards::Column::Status.eq(UserCardStatus::Active))
                .count(&txn)
                .await?;

            if other_users == 0 && card.status == CardStatus::Used {
                let card_id = card.id;
                let mut active: cards::ActiveModel = card.into();
                active.status = Set(CardStatus::Unused);
                active.updated_at = Set(now);
                active.update(&txn).await?;

                info!(card_id, "card fully released, reverted to unused");
            }
        }

        txn.commit().await?;

        info!(user_id, device_id, "device unbound");

        Ok(())
    }

    async fn my_cards(&self, app_id: i32, user_id: i32) -> Result<Vec<CardSummary>, CardError> {
        let rows = user_cards::Entity::find()
            .filter(user_cards::Column::UserId.eq(user_id))
            .filter(user_cards::Column::Status.eq(UserCardStatus::Active))
            .find_also_related(cards::Entity)
            .filter(cards::Column::AppId.eq(app_id))
            .order_by_asc(cards::Column::Id)
            .all(&self.store.conn)
            .await?;

        let mut summaries = Vec::with_capacity(rows.len());

        for (user_card, card) in rows {
            let Some(card) = card else { continue };

            let active_device_count = self
                .store
                .card_active_device_count(card.id)
                .await
                .map_err(CardError::from)?;

            summaries.push(CardSummary {
                card_id: card.id,
                card_key: card.card_key.clone(),
                status: card.status,
                expire_time: card.expire_time,
                bind_time: user_card.bind_time,
                max_device_count: card.max_device_count,
                active_device_count,
                permissions: Self::granted_keys(&card),
            });
        }

        Ok(summaries)
    }

    async fn verify_card(&self, app_id: i32, card_key: &str) -> Result<CardCheck, CardError> {
        let key = card_key::normalize_card_key(card_key);

        let card = cards::Entity::find()
            .filter(cards::Column::CardKey.eq(key))
            .one(&self.store.conn)
            .await?;

        let Some(card) = card else {
            return Ok(CardCheck {
                valid: false,
                status: None,
                expire_time: None,
                reason: Some("card not found".to_string()),
            });
        };

        if card.app_id != app_id {
            return Ok(CardCheck {
                valid: false,
                status: None,
                expire_time: None,
                reason: Some("card does not belong to this app".to_string()),
            });
        }

        let reason = if card.status == CardStatus::Disabled {
            Some("card disabled".to_string())
        } else if card.expire_time <= Utc::now() {
            Some("card expired".to_string())
        } else {
            None
        };

        Ok(CardCheck {
            valid: reason.is_none(),
            status: Some(card.status),
            expire_time: Some(card.expire_time),
            reason,
        })
    }
}
