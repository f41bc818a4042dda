//! Domain service for permission verification.
//!
//! Answers the question every client call ultimately asks: may this
//! user, on this device, use this feature right now?

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

/// Errors specific to permission checks. Declined checks are not
/// errors; they come back as a [`PermissionDecision`] with a reason.
#[derive(Debug, Error)]
pub enum PermissionError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for PermissionError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for PermissionError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Outcome of a single permission check. A grant carries the expiry of
/// the card that granted it.
#[derive(Debug, Clone, Serialize)]
pub struct PermissionDecision {
    pub allowed: bool,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expire_time: Option<DateTime<Utc>>,
}

impl PermissionDecision {
    pub(crate) fn allow(expire_time: DateTime<Utc>) -> Self {
        Self {
            allowed: true,
            reason: "permission granted".to_string(),
            expire_time: Some(expire_time),
        }
    }

    pub(crate) fn deny(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: reason.into(),
            expire_time: None,
        }
    }
}

/// All permissions currently effective for a user on a device, with the
/// latest expiry among the cards that contributed them.
#[derive(Debug, Clone, Serialize)]
pub struct UserPermissions {
    pub has_any: bool,
    pub permissions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_expiry: Option<DateTime<Utc>>,
}

/// Domain service trait for permission verification.
#[async_trait::async_trait]
pub trait PermissionService: Send + Sync {
    /// Checks one permission key for a user on a device within an app.
    ///
    /// Cards are tried in ascending ID order; the first card that is
    /// enabled, unexpired, bound to the device, and grants the key
    /// wins. A disabled device binding, when reached before any card
    /// has granted, terminates the check with a denial; cards earlier
    /// in the order are unaffected by it.
    async fn check_permission(
        &self,
        app_id: i32,
        user_id: i32,
        device_id: &str,
        permission_key: &str,
    ) -> Result<PermissionDecision, PermissionError>;

    /// Checks several permission keys in one pass. The user, card, and
    /// device lookups are shared; each key gets its own decision.
    async fn check_permissions(
        &self,
        app_id: i32,
        user_id: i32,
        device_id: &str,
        permission_keys: &[String],
    ) -> Result<HashMap<String, PermissionDecision>, PermissionError>;

    /// Aggregates every permission the user currently holds on the
    /// device, the union across all valid cards. Unlike a check, a
    /// disabled device binding only excludes that card's grants.
    async fn get_user_permissions(
        &self,
        app_id: i32,
        user_id: i32,
        device_id: &str,
    ) -> Result<UserPermissions, PermissionError>;
}
