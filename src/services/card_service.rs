//! Domain service for card activation: binding, unbinding, and
//! client-facing card queries.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::entities::cards::CardStatus;

/// Errors specific to card operations. The messages are what clients
/// see, so they name the condition without leaking internals.
#[derive(Debug, Error)]
pub enum CardError {
    #[error("card not found")]
    CardNotFound,

    #[error("card does not belong to this app")]
    WrongApp,

    #[error("card disabled")]
    CardDisabled,

    #[error("card expired")]
    CardExpired,

    #[error("device disabled")]
    DeviceDisabled,

    #[error("device already bound to this card")]
    DeviceAlreadyBound,

    #[error("device limit reached ({0})")]
    DeviceLimitReached(i32),

    #[error("not bound")]
    NotBound,

    #[error("binding not found")]
    BindingNotFound,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for CardError {
    fn from(err: sea_orm::DbErr) -> Self {
        // Two clients racing to bind the same device hit the unique
        // index; the loser sees the same error as a repeat bind.
        if matches!(
            err.sql_err(),
            Some(sea_orm::SqlErr::UniqueConstraintViolation(_))
        ) {
            return Self::DeviceAlreadyBound;
        }
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for CardError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// What the client gets back after a successful bind.
#[derive(Debug, Clone, Serialize)]
pub struct BindResult {
    pub card_id: i32,
    pub card_key: String,
    pub expire_time: DateTime<Utc>,
    pub max_device_count: i32,
    pub permissions: Vec<String>,
}

/// One card as seen by the user who bound it.
#[derive(Debug, Clone, Serialize)]
pub struct CardSummary {
    pub card_id: i32,
    pub card_key: String,
    pub status: CardStatus,
    pub expire_time: DateTime<Utc>,
    pub bind_time: DateTime<Utc>,
    pub max_device_count: i32,
    pub active_device_count: u64,
    pub permissions: Vec<String>,
}

/// Pre-bind inspection of a card key.
#[derive(Debug, Clone, Serialize)]
pub struct CardCheck {
    pub valid: bool,
    pub status: Option<CardStatus>,
    pub expire_time: Option<DateTime<Utc>>,
    pub reason: Option<String>,
}

/// Domain service trait for card activation.
#[async_trait::async_trait]
pub trait CardService: Send + Sync {
    /// Binds a card to a user and device in one transaction.
    ///
    /// First bind flips an unused card to used. The card's device
    /// quota counts active bindings only; a device with a disabled
    /// binding still cannot rebind until an admin re-enables it.
    ///
    /// # Errors
    ///
    /// Returns the specific [`CardError`] naming what blocked the bind.
    async fn bind_card(
        &self,
        app_id: i32,
        user_id: i32,
        card_key: &str,
        device_id: &str,
        device_name: Option<&str>,
    ) -> Result<BindResult, CardError>;

    /// Removes a device from a card the user has bound.
    ///
    /// When the last active device goes, the caller's binding is
    /// released and a card with no remaining users reverts to unused.
    async fn unbind_card(
        &self,
        app_id: i32,
        user_id: i32,
        card_id: i32,
        device_id: &str,
    ) -> Result<(), CardError>;

    /// Cards the user has actively bound within the app.
    async fn my_cards(&self, app_id: i32, user_id: i32) -> Result<Vec<CardSummary>, CardError>;

    /// Inspects a card key without binding it.
    async fn verify_card(&self, app_id: i32, card_key: &str) -> Result<CardCheck, CardError>;
}
