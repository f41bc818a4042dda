//! Domain service for the admin console: card generation and
//! lifecycle, user moderation, device control, and dashboard stats.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::db::User;
use crate::entities::card_devices;
use crate::entities::cards::{self, CardStatus};
use crate::entities::users::UserStatus;

#[derive(Debug, Error)]
pub enum AdminError {
    #[error("card not found")]
    CardNotFound,

    #[error("user not found")]
    UserNotFound,

    #[error("device not found")]
    DeviceNotFound,

    #[error("app not found")]
    AppNotFound,

    #[error("unknown permission key: {0}")]
    UnknownPermission(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for AdminError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for AdminError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Parameters for generating a batch of cards.
#[derive(Debug, Clone)]
pub struct GenerateCardsRequest {
    pub app_id: i32,
    pub count: u32,
    pub valid_days: i64,
    pub max_device_count: i32,
    /// Permission keys the cards grant. Validated against the enabled
    /// catalog before any card is written.
    pub permissions: Vec<String>,
    pub remark: Option<String>,
}

/// One card in the admin listing, with live binding counts.
#[derive(Debug, Clone, Serialize)]
pub struct CardRow {
    pub id: i32,
    pub app_id: i32,
    pub card_key: String,
    pub status: CardStatus,
    pub expire_time: DateTime<Utc>,
    pub max_device_count: i32,
    pub bound_users: u64,
    pub bound_devices: u64,
    pub permissions: Vec<String>,
    pub remark: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Dashboard counters.
#[derive(Debug, Clone, Serialize)]
pub struct StatsSummary {
    pub total_apps: u64,
    pub total_users: u64,
    pub banned_users: u64,
    pub total_cards: u64,
    pub unused_cards: u64,
    pub used_cards: u64,
    pub disabled_cards: u64,
    pub total_devices: u64,
    pub active_devices: u64,
}

/// Paged listing wrapper.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub size: u64,
}

/// Domain service trait for administration.
#[async_trait::async_trait]
pub trait AdminService: Send + Sync {
    /// Generates a batch of unused cards with unique keys.
    ///
    /// # Errors
    ///
    /// Returns [`AdminError::UnknownPermission`] when a requested key is
    /// not in the enabled catalog; no cards are written in that case.
    async fn generate_cards(
        &self,
        request: GenerateCardsRequest,
    ) -> Result<Vec<cards::Model>, AdminError>;

    async fn list_cards(
        &self,
        page: u64,
        size: u64,
        app_id: Option<i32>,
        status: Option<CardStatus>,
        keyword: Option<&str>,
    ) -> Result<Page<CardRow>, AdminError>;

    async fn get_card(&self, card_id: i32) -> Result<CardRow, AdminError>;

    async fn set_card_enabled(&self, card_id: i32, enabled: bool) -> Result<(), AdminError>;

    /// Replaces a card's permission set.
    async fn update_card_permissions(
        &self,
        card_id: i32,
        permissions: Vec<String>,
    ) -> Result<(), AdminError>;

    /// Deletes cards along with their user and device bindings.
    async fn delete_cards(&self, card_ids: &[i32]) -> Result<u64, AdminError>;

    async fn list_users(
        &self,
        page: u64,
        size: u64,
        status: Option<UserStatus>,
        keyword: Option<&str>,
    ) -> Result<Page<User>, AdminError>;

    /// Bans or reinstates a user. Banning does not touch the user's
    /// bindings; every permission check fails while banned.
    async fn set_user_banned(&self, user_id: i32, banned: bool) -> Result<(), AdminError>;

    async fn list_devices(
        &self,
        page: u64,
        size: u64,
        card_id: Option<i32>,
        device_id: Option<&str>,
    ) -> Result<Page<card_devices::Model>, AdminError>;

    /// Disables or re-enables a device binding. A disabled binding
    /// frees its quota slot but blocks that device from rebinding.
    async fn set_device_enabled(&self, device_row_id: i32, enabled: bool)
    -> Result<(), AdminError>;

    async fn stats(&self) -> Result<StatsSummary, AdminError>;
}
