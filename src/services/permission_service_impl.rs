//! `SeaORM` implementation of the `PermissionService` trait.

use std::collections::{BTreeSet, HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};
use tracing::debug;

use crate::db::Store;
use crate::entities::card_devices::{self, CardDeviceStatus};
use crate::entities::cards::{self, CardStatus};
use crate::entities::user_cards::{self, UserCardStatus};
use crate::entities::users::UserStatus;
use crate::models::permission::PermissionSpec;
use crate::services::permission_service::{
    PermissionDecision, PermissionError, PermissionService, UserPermissions,
};

pub struct SeaOrmPermissionService {
    store: Store,
}

/// A card that survived the shared filters, paired with the device
/// binding that admitted it and its normalized permission set. A
/// candidate whose binding is disabled stays in the list: reaching it
/// during a check is what makes the denial terminal.
struct Candidate {
    device: card_devices::Model,
    device_disabled: bool,
    expire_time: DateTime<Utc>,
    spec: Option<PermissionSpec>,
}

/// Result of the filters every check shares: either a terminal denial
/// or the cards left to try per key.
enum Prefilter {
    Denied(PermissionDecision),
    Candidates(Vec<Candidate>),
}

impl SeaOrmPermissionService {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }

    /// Runs the checks that do not depend on the permission key:
    /// user exists and is not banned, user has active cards in this
    /// app, each card is enabled, unexpired, and bound to the device.
    ///
    /// Cards are visited in ascending ID order so the outcome is
    /// deterministic when several cards grant the same key. Disabled
    /// device bindings are kept as candidates; how they are treated is
    /// up to the caller's walk.
    async fn prefilter(
        &self,
        app_id: i32,
        user_id: i32,
        device_id: &str,
    ) -> Result<Prefilter, PermissionError> {
        let Some(user) = self
            .store
            .get_user(user_id)
            .await
            .map_err(PermissionError::from)?
        else {
            return Ok(Prefilter::Denied(PermissionDecision::deny("user not found")));
        };

        if user.status == UserStatus::Banned {
            return Ok(Prefilter::Denied(PermissionDecision::deny("user banned")));
        }

        let rows = user_cards::Entity::find()
            .filter(user_cards::Column::UserId.eq(user_id))
            .filter(user_cards::Column::Status.eq(UserCardStatus::Active))
            .find_also_related(cards::Entity)
            .filter(cards::Column::AppId.eq(app_id))
            .order_by_asc(cards::Column::Id)
            .all(&self.store.conn)
            .await?;

        if rows.is_empty() {
            return Ok(Prefilter::Denied(PermissionDecision::deny("no card bound")));
        }

        let now = Utc::now();
        let mut candidates = Vec::new();

        for (_, card) in rows {
            let Some(card) = card else { continue };

            if card.status == CardStatus::Disabled {
                continue;
            }

            if card.expire_time <= now {
                continue;
            }

            let device = card_devices::Entity::find()
                .filter(card_devices::Column::CardId.eq(card.id))
                .filter(card_devices::Column::DeviceId.eq(device_id))
                .one(&self.store.conn)
                .await?;

            let Some(device) = device else { continue };

            let device_disabled = device.status == CardDeviceStatus::Disabled;

            let spec = card
                .permissions
                .as_ref()
                .and_then(PermissionSpec::from_value);

            candidates.push(Candidate {
                device,
                device_disabled,
                expire_time: card.expire_time,
                spec,
            });
        }

        Ok(Prefilter::Candidates(candidates))
    }

    /// Walks the candidates in card order for one key. The first card
    /// granting the key wins; a disabled device binding, when reached
    /// before any grant, terminates the walk with a denial.
    async fn evaluate_key(
        &self,
        candidates: &[Candidate],
        permission_key: &str,
        touched: &mut HashSet<i32>,
    ) -> Result<PermissionDecision, PermissionError> {
        for candidate in candidates {
            if candidate.device_disabled {
                return Ok(PermissionDecision::deny("device disabled"));
            }

            let grants = candidate
                .spec
                .as_ref()
                .is_some_and(|spec| spec.allows(permission_key));

            if grants {
                self.touch_device(&candidate.device, touched).await?;
                return Ok(PermissionDecision::allow(candidate.expire_time));
            }
        }

        Ok(PermissionDecision::deny(
            "no valid card or permission mismatch",
        ))
    }

    /// Record that the device just passed a check, at most once per call.
    async fn touch_device(
        &self,
        device: &card_devices::Model,
        touched: &mut HashSet<i32>,
    ) -> Result<(), PermissionError> {
        if !touched.insert(device.id) {
            return Ok(());
        }

        let now = Utc::now();
        let mut active: card_devices::ActiveModel = device.clone().into();
        active.last_active_at = Set(now);
        active.updated_at = Set(now);
        active.update(&self.store.conn).await?;

        Ok(())
    }
}

#[async_trait]
impl PermissionService for SeaOrmPermissionService {
    async fn check_permission(
        &self,
        app_id: i32,
        user_id: i32,
        device_id: &str,
        permission_key: &str,
    ) -> Result<PermissionDecision, PermissionError> {
        let candidates = match self.prefilter(app_id, user_id, device_id).await? {
            Prefilter::Denied(decision) => {
                debug!(
                    user_id,
                    device_id,
                    permission_key,
                    reason = %decision.reason,
                    "permission check declined before card evaluation"
                );
                return Ok(decision);
            }
            Prefilter::Candidates(candidates) => candidates,
        };

        let mut touched = HashSet::new();
        self.evaluate_key(&candidates, permission_key, &mut touched)
            .await
    }

    async fn check_permissions(
        &self,
        app_id: i32,
        user_id: i32,
        device_id: &str,
        permission_keys: &[String],
    ) -> Result<HashMap<String, PermissionDecision>, PermissionError> {
        let prefilter = self.prefilter(app_id, user_id, device_id).await?;

        let mut results = HashMap::with_capacity(permission_keys.len());

        match prefilter {
            Prefilter::Denied(decision) => {
                for key in permission_keys {
                    results.insert(key.clone(), decision.clone());
                }
            }
            Prefilter::Candidates(candidates) => {
                let mut touched = HashSet::new();

                for key in permission_keys {
                    let decision = self.evaluate_key(&candidates, key, &mut touched).await?;
                    results.insert(key.clone(), decision);
                }
            }
        }

        Ok(results)
    }

    async fn get_user_permissions(
        &self,
        app_id: i32,
        user_id: i32,
        device_id: &str,
    ) -> Result<UserPermissions, PermissionError> {
        let candidates = match self.prefilter(app_id, user_id, device_id).await? {
            Prefilter::Denied(_) => Vec::new(),
            Prefilter::Candidates(candidates) => candidates,
        };

        let mut keys = BTreeSet::new();
        let mut latest_expiry: Option<DateTime<Utc>> = None;

        for candidate in &candidates {
            // A disabled binding only excludes this card's grants here.
            if candidate.device_disabled {
                continue;
            }

            let Some(spec) = &candidate.spec else { continue };

            let granted = spec.granted_keys();
            if granted.is_empty() {
                continue;
            }

            keys.extend(granted);
            latest_expiry = Some(match latest_expiry {
                Some(current) => current.max(candidate.expire_time),
                None => candidate.expire_time,
            });
        }

        Ok(UserPermissions {
            has_any: !keys.is_empty(),
            permissions: keys.into_iter().collect(),
            latest_expiry,
        })
    }
}
