//! Integration tests for the card and permission services against an
//! in-memory database.

use chrono::{Duration, Utc};
use sea_orm::{ActiveModelTrait, Set};
use serde_json::json;

use cardgate::db::Store;
use cardgate::entities::cards::{self, CardStatus};
use cardgate::services::{
    AdminService, CardError, CardService, PermissionService, SeaOrmAdminService,
    SeaOrmCardService, SeaOrmPermissionService,
};

// A pooled in-memory SQLite gives each connection its own database, so
// the pool is pinned to a single connection.
async fn test_store() -> Store {
    Store::with_pool_options("sqlite::memory:", 1, 1)
        .await
        .expect("in-memory store should open")
}

struct Harness {
    store: Store,
    cards: SeaOrmCardService,
    permissions: SeaOrmPermissionService,
    admin: SeaOrmAdminService,
    app_id: i32,
    user_id: i32,
}

async fn harness() -> Harness {
    let store = test_store().await;

    let app = store
        .create_app("test-app", None)
        .await
        .expect("app should be created");

    let user = store
        .create_user("alice", "not-a-real-hash")
        .await
        .expect("user should be created");

    Harness {
        cards: SeaOrmCardService::new(store.clone()),
        permissions: SeaOrmPermissionService::new(store.clone()),
        admin: SeaOrmAdminService::new(store.clone()),
        store,
        app_id: app.id,
        user_id: user.id,
    }
}

impl Harness {
    async fn make_card(
        &self,
        permissions: serde_json::Value,
        max_devices: i32,
        valid_days: i64,
    ) -> cards::Model {
        let expire = Utc::now() + Duration::days(valid_days);
        let mut batch = self
            .store
            .insert_card_batch(
                self.app_id,
                &[cardgate::card_key::generate_card_key()],
                expire,
                max_devices,
                Some(permissions),
                None,
            )
            .await
            .expect("card should be inserted");
        batch.remove(0)
    }

    async fn check(&self, device: &str, key: &str) -> cardgate::services::PermissionDecision {
        self.permissions
            .check_permission(self.app_id, self.user_id, device, key)
            .await
            .expect("check should not error")
    }
}

#[tokio::test]
async fn bind_then_check_round_trip() {
    let h = harness().await;
    let card = h.make_card(json!(["wechat"]), 1, 30).await;

    let bound = h
        .cards
        .bind_card(h.app_id, h.user_id, &card.card_key, "dev-1", Some("Pixel"))
        .await
        .expect("bind should succeed");
    assert_eq!(bound.permissions, vec!["wechat".to_string()]);

    let decision = h.check("dev-1", "wechat").await;
    assert!(decision.allowed);
    assert_eq!(decision.reason, "permission granted");
    assert_eq!(decision.expire_time, Some(card.expire_time));

    let miss = h.check("dev-1", "ximalaya").await;
    assert!(!miss.allowed);
    assert_eq!(miss.reason, "no valid card or permission mismatch");
    assert_eq!(miss.expire_time, None);

    // First bind consumes the card.
    let card = h.store.get_card(card.id).await.unwrap().unwrap();
    assert_eq!(card.status, CardStatus::Used);
}

#[tokio::test]
async fn check_denies_before_any_card_is_consulted() {
    let h = harness().await;

    let decision = h
        .permissions
        .check_permission(h.app_id, 9999, "dev-1", "wechat")
        .await
        .unwrap();
    assert_eq!(decision.reason, "user not found");

    let decision = h.check("dev-1", "wechat").await;
    assert_eq!(decision.reason, "no card bound");

    let card = h.make_card(json!(["wechat"]), 1, 30).await;
    h.cards
        .bind_card(h.app_id, h.user_id, &card.card_key, "dev-1", None)
        .await
        .unwrap();

    h.admin.set_user_banned(h.user_id, true).await.unwrap();
    let decision = h.check("dev-1", "wechat").await;
    assert_eq!(decision.reason, "user banned");

    h.admin.set_user_banned(h.user_id, false).await.unwrap();
    assert!(h.check("dev-1", "wechat").await.allowed);
}

#[tokio::test]
async fn disabled_card_never_grants() {
    let h = harness().await;
    let card = h.make_card(json!(["wechat"]), 1, 30).await;

    h.cards
        .bind_card(h.app_id, h.user_id, &card.card_key, "dev-1", None)
        .await
        .unwrap();
    assert!(h.check("dev-1", "wechat").await.allowed);

    h.admin.set_card_enabled(card.id, false).await.unwrap();

    let decision = h.check("dev-1", "wechat").await;
    assert!(!decision.allowed);
    assert_eq!(decision.reason, "no valid card or permission mismatch");

    // Binding a disabled card is refused outright.
    let other = h.store.create_user("bob", "not-a-real-hash").await.unwrap();
    let err = h
        .cards
        .bind_card(h.app_id, other.id, &card.card_key, "dev-2", None)
        .await
        .unwrap_err();
    assert!(matches!(err, CardError::CardDisabled));
}

#[tokio::test]
async fn expired_card_is_excluded() {
    let h = harness().await;
    let card = h.make_card(json!(["wechat"]), 1, 30).await;

    h.cards
        .bind_card(h.app_id, h.user_id, &card.card_key, "dev-1", None)
        .await
        .unwrap();
    assert!(h.check("dev-1", "wechat").await.allowed);

    // Age the card past its expiry.
    let mut active: cards::ActiveModel = h.store.get_card(card.id).await.unwrap().unwrap().into();
    active.expire_time = Set(Utc::now() - Duration::days(1));
    active.update(&h.store.conn).await.unwrap();

    let decision = h.check("dev-1", "wechat").await;
    assert!(!decision.allowed);

    // And binding an already-expired card fails.
    let stale = h.make_card(json!(["wechat"]), 1, 30).await;
    let mut active: cards::ActiveModel = h.store.get_card(stale.id).await.unwrap().unwrap().into();
    active.expire_time = Set(Utc::now() - Duration::hours(1));
    active.update(&h.store.conn).await.unwrap();

    let err = h
        .cards
        .bind_card(h.app_id, h.user_id, &stale.card_key, "dev-9", None)
        .await
        .unwrap_err();
    assert!(matches!(err, CardError::CardExpired));
}

#[tokio::test]
async fn device_limit_is_enforced() {
    let h = harness().await;
    let card = h.make_card(json!(["wechat"]), 2, 30).await;

    h.cards
        .bind_card(h.app_id, h.user_id, &card.card_key, "dev-1", None)
        .await
        .unwrap();
    h.cards
        .bind_card(h.app_id, h.user_id, &card.card_key, "dev-2", None)
        .await
        .unwrap();

    let err = h
        .cards
        .bind_card(h.app_id, h.user_id, &card.card_key, "dev-3", None)
        .await
        .unwrap_err();
    assert!(matches!(err, CardError::DeviceLimitReached(2)));

    // Repeating an existing device does not consume another slot.
    let err = h
        .cards
        .bind_card(h.app_id, h.user_id, &card.card_key, "dev-1", None)
        .await
        .unwrap_err();
    assert!(matches!(err, CardError::DeviceAlreadyBound));
}

#[tokio::test]
async fn disabled_device_only_vetoes_from_its_card_onward() {
    let h = harness().await;

    // Two cards bound to the same device; the second (higher id)
    // card's binding gets disabled.
    let first = h.make_card(json!(["wechat"]), 1, 30).await;
    let second = h.make_card(json!(["ximalaya"]), 1, 30).await;

    h.cards
        .bind_card(h.app_id, h.user_id, &first.card_key, "dev-1", None)
        .await
        .unwrap();
    h.cards
        .bind_card(h.app_id, h.user_id, &second.card_key, "dev-1", None)
        .await
        .unwrap();

    let devices = h.store.card_devices(second.id).await.unwrap();
    h.admin
        .set_device_enabled(devices[0].id, false)
        .await
        .unwrap();

    // The first card grants before the walk reaches the disabled
    // binding, so the check succeeds.
    let decision = h.check("dev-1", "wechat").await;
    assert!(decision.allowed);
    assert_eq!(decision.expire_time, Some(first.expire_time));

    // A key the first card lacks runs into the disabled binding and
    // the check stops there.
    let decision = h.check("dev-1", "ximalaya").await;
    assert!(!decision.allowed);
    assert_eq!(decision.reason, "device disabled");

    // The aggregate view only drops the disabled card's grants.
    let mine = h
        .permissions
        .get_user_permissions(h.app_id, h.user_id, "dev-1")
        .await
        .unwrap();
    assert!(mine.has_any);
    assert_eq!(mine.permissions, vec!["wechat".to_string()]);
    assert_eq!(mine.latest_expiry, Some(first.expire_time));
}

#[tokio::test]
async fn disabled_binding_frees_its_quota_slot() {
    let h = harness().await;
    let card = h.make_card(json!(["wechat"]), 1, 30).await;

    h.cards
        .bind_card(h.app_id, h.user_id, &card.card_key, "dev-1", None)
        .await
        .unwrap();

    let devices = h.store.card_devices(card.id).await.unwrap();
    h.admin
        .set_device_enabled(devices[0].id, false)
        .await
        .unwrap();

    // The slot is free again for a fresh device.
    h.cards
        .bind_card(h.app_id, h.user_id, &card.card_key, "dev-2", None)
        .await
        .expect("disabled binding should not count against the quota");

    // But the disabled device itself stays locked out.
    let err = h
        .cards
        .bind_card(h.app_id, h.user_id, &card.card_key, "dev-1", None)
        .await
        .unwrap_err();
    assert!(matches!(err, CardError::DeviceDisabled));
}

#[tokio::test]
async fn unbind_ignores_disabled_bindings_when_releasing() {
    let h = harness().await;
    let card = h.make_card(json!(["wechat"]), 2, 30).await;

    h.cards
        .bind_card(h.app_id, h.user_id, &card.card_key, "dev-1", None)
        .await
        .unwrap();
    h.cards
        .bind_card(h.app_id, h.user_id, &card.card_key, "dev-2", None)
        .await
        .unwrap();

    let devices = h.store.card_devices(card.id).await.unwrap();
    let disabled_row = devices.iter().find(|d| d.device_id == "dev-2").unwrap();
    h.admin
        .set_device_enabled(disabled_row.id, false)
        .await
        .unwrap();

    // Removing the last active device releases the card even though a
    // disabled row is still on it.
    h.cards
        .unbind_card(h.app_id, h.user_id, card.id, "dev-1")
        .await
        .unwrap();

    let err = h
        .cards
        .unbind_card(h.app_id, h.user_id, card.id, "dev-2")
        .await
        .unwrap_err();
    assert!(matches!(err, CardError::NotBound));

    let card_row = h.store.get_card(card.id).await.unwrap().unwrap();
    assert_eq!(card_row.status, CardStatus::Unused);
}

#[tokio::test]
async fn unbind_releases_and_reverts_card() {
    let h = harness().await;
    let card = h.make_card(json!(["wechat"]), 2, 30).await;

    h.cards
        .bind_card(h.app_id, h.user_id, &card.card_key, "dev-1", None)
        .await
        .unwrap();
    h.cards
        .bind_card(h.app_id, h.user_id, &card.card_key, "dev-2", None)
        .await
        .unwrap();

    h.cards
        .unbind_card(h.app_id, h.user_id, card.id, "dev-1")
        .await
        .expect("first unbind should succeed");

    // Same device again: the binding row is gone but the user still
    // holds the card through dev-2.
    let err = h
        .cards
        .unbind_card(h.app_id, h.user_id, card.id, "dev-1")
        .await
        .unwrap_err();
    assert!(matches!(err, CardError::BindingNotFound));

    h.cards
        .unbind_card(h.app_id, h.user_id, card.id, "dev-2")
        .await
        .expect("last unbind should succeed");

    // Now the user's binding itself is released.
    let err = h
        .cards
        .unbind_card(h.app_id, h.user_id, card.id, "dev-2")
        .await
        .unwrap_err();
    assert!(matches!(err, CardError::NotBound));

    // Fully released card reverts to unused and can be bound again.
    let card_row = h.store.get_card(card.id).await.unwrap().unwrap();
    assert_eq!(card_row.status, CardStatus::Unused);

    h.cards
        .bind_card(h.app_id, h.user_id, &card.card_key, "dev-3", None)
        .await
        .expect("rebind after full release should succeed");
    assert!(h.check("dev-3", "wechat").await.allowed);
}

#[tokio::test]
async fn map_permissions_respect_explicit_false() {
    let h = harness().await;
    let card = h
        .make_card(json!({"wechat": true, "ximalaya": false}), 1, 30)
        .await;

    h.cards
        .bind_card(h.app_id, h.user_id, &card.card_key, "dev-1", None)
        .await
        .unwrap();

    assert!(h.check("dev-1", "wechat").await.allowed);
    assert!(!h.check("dev-1", "ximalaya").await.allowed);

    let mine = h
        .permissions
        .get_user_permissions(h.app_id, h.user_id, "dev-1")
        .await
        .unwrap();
    assert_eq!(mine.permissions, vec!["wechat".to_string()]);
}

#[tokio::test]
async fn aggregate_on_empty_state_has_nothing() {
    let h = harness().await;

    let mine = h
        .permissions
        .get_user_permissions(h.app_id, h.user_id, "dev-1")
        .await
        .unwrap();
    assert!(!mine.has_any);
    assert!(mine.permissions.is_empty());
    assert_eq!(mine.latest_expiry, None);
}

#[tokio::test]
async fn delete_cards_removes_bindings() {
    let h = harness().await;
    let card = h.make_card(json!(["wechat"]), 1, 30).await;

    h.cards
        .bind_card(h.app_id, h.user_id, &card.card_key, "dev-1", None)
        .await
        .unwrap();

    let deleted = h.admin.delete_cards(&[card.id]).await.unwrap();
    assert_eq!(deleted, 1);

    assert!(h.store.get_card(card.id).await.unwrap().is_none());
    assert!(h.store.card_devices(card.id).await.unwrap().is_empty());

    let decision = h.check("dev-1", "wechat").await;
    assert_eq!(decision.reason, "no card bound");
}

#[tokio::test]
async fn batch_check_shares_prefilter() {
    let h = harness().await;
    let card = h.make_card(json!(["wechat"]), 1, 30).await;

    h.cards
        .bind_card(h.app_id, h.user_id, &card.card_key, "dev-1", None)
        .await
        .unwrap();

    let keys = vec!["wechat".to_string(), "ximalaya".to_string()];
    let decisions = h
        .permissions
        .check_permissions(h.app_id, h.user_id, "dev-1", &keys)
        .await
        .unwrap();

    assert!(decisions["wechat"].allowed);
    assert!(!decisions["ximalaya"].allowed);

    // A terminal prefilter denial applies to every key.
    h.admin.set_user_banned(h.user_id, true).await.unwrap();
    let decisions = h
        .permissions
        .check_permissions(h.app_id, h.user_id, "dev-1", &keys)
        .await
        .unwrap();
    assert!(decisions.values().all(|d| d.reason == "user banned"));
}

#[tokio::test]
async fn successful_check_bumps_device_heartbeat() {
    let h = harness().await;
    let card = h.make_card(json!(["wechat"]), 1, 30).await;

    h.cards
        .bind_card(h.app_id, h.user_id, &card.card_key, "dev-1", None)
        .await
        .unwrap();

    let before = h.store.card_devices(card.id).await.unwrap()[0].last_active_at;

    tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    assert!(h.check("dev-1", "wechat").await.allowed);

    let after = h.store.card_devices(card.id).await.unwrap()[0].last_active_at;
    assert!(after > before);
}

#[tokio::test]
async fn wrong_app_cards_are_invisible() {
    let h = harness().await;
    let other_app = h.store.create_app("other-app", None).await.unwrap();

    let card = h.make_card(json!(["wechat"]), 1, 30).await;

    // Binding through the wrong app is refused.
    let err = h
        .cards
        .bind_card(other_app.id, h.user_id, &card.card_key, "dev-1", None)
        .await
        .unwrap_err();
    assert!(matches!(err, CardError::WrongApp));

    // A card bound in one app grants nothing in another.
    h.cards
        .bind_card(h.app_id, h.user_id, &card.card_key, "dev-1", None)
        .await
        .unwrap();

    let decision = h
        .permissions
        .check_permission(other_app.id, h.user_id, "dev-1", "wechat")
        .await
        .unwrap();
    assert!(!decision.allowed);
    assert_eq!(decision.reason, "no card bound");
}

#[tokio::test]
async fn card_keys_are_normalized_on_input() {
    let h = harness().await;
    let card = h.make_card(json!(["wechat"]), 1, 30).await;

    let sloppy = card.card_key.replace('-', "").to_lowercase();

    h.cards
        .bind_card(h.app_id, h.user_id, &sloppy, "dev-1", None)
        .await
        .expect("normalized key should bind");
}

#[tokio::test]
async fn generate_cards_validates_catalog_keys() {
    let h = harness().await;

    let err = h
        .admin
        .generate_cards(cardgate::services::GenerateCardsRequest {
            app_id: h.app_id,
            count: 2,
            valid_days: 30,
            max_device_count: 1,
            permissions: vec!["no_such_permission".to_string()],
            remark: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        cardgate::services::AdminError::UnknownPermission(_)
    ));

    // The seeded catalog keys pass.
    let generated = h
        .admin
        .generate_cards(cardgate::services::GenerateCardsRequest {
            app_id: h.app_id,
            count: 3,
            valid_days: 30,
            max_device_count: 1,
            permissions: vec!["wechat".to_string(), "ximalaya".to_string()],
            remark: Some("batch one".to_string()),
        })
        .await
        .unwrap();

    assert_eq!(generated.len(), 3);
    for card in &generated {
        assert_eq!(card.status, CardStatus::Unused);
        assert!(cardgate::card_key::validate_card_key_format(&card.card_key));
    }
}
