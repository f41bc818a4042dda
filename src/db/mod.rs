use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use serde_json::Value as JsonValue;
use tracing::info;

use crate::entities::apps::{self, AppStatus};
use crate::entities::card_devices::{self, CardDeviceStatus};
use crate::entities::cards::{self, CardStatus};
use crate::entities::feature_permissions::{self, FeaturePermissionStatus};
use crate::entities::user_tokens;
use crate::entities::users::UserStatus;

pub mod migrator;
pub mod repositories;

pub use repositories::feature_permission::NewFeaturePermission;
pub use repositories::user::User;

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        if !db_url.contains(":memory:") {
            let path_str = db_url.trim_start_matches("sqlite:");
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    fn app_repo(&self) -> repositories::app::AppRepository {
        repositories::app::AppRepository::new(self.conn.clone())
    }

    fn card_repo(&self) -> repositories::card::CardRepository {
        repositories::card::CardRepository::new(self.conn.clone())
    }

    fn device_repo(&self) -> repositories::device::DeviceRepository {
        repositories::device::DeviceRepository::new(self.conn.clone())
    }

    fn token_repo(&self) -> repositories::token::TokenRepository {
        repositories::token::TokenRepository::new(self.conn.clone())
    }

    fn feature_permission_repo(&self) -> repositories::feature_permission::FeaturePermissionRepository {
        repositories::feature_permission::FeaturePermissionRepository::new(self.conn.clone())
    }

    // ========== Users ==========

    pub async fn get_user(&self, id: i32) -> Result<Option<User>> {
        self.user_repo().get_by_id(id).await
    }

    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.user_repo().get_by_username(username).await
    }

    pub async fn create_user(&self, username: &str, password_hash: &str) -> Result<User> {
        self.user_repo().create(username, password_hash).await
    }

    pub async fn verify_user_password(&self, username: &str, password: &str) -> Result<bool> {
        self.user_repo().verify_password(username, password).await
    }

    pub async fn update_user_status(&self, user_id: i32, status: UserStatus) -> Result<bool> {
        self.user_repo().update_status(user_id, status).await
    }

    pub async fn touch_user_login(&self, user_id: i32) -> Result<()> {
        self.user_repo().touch_last_login(user_id).await
    }

    pub async fn list_users(
        &self,
        page: u64,
        size: u64,
        status: Option<UserStatus>,
        keyword: Option<&str>,
    ) -> Result<(Vec<User>, u64)> {
        self.user_repo().list(page, size, status, keyword).await
    }

    pub async fn count_users(&self, status: Option<UserStatus>) -> Result<u64> {
        self.user_repo().count(status).await
    }

    // ========== Apps ==========

    pub async fn get_app(&self, id: i32) -> Result<Option<apps::Model>> {
        self.app_repo().get_by_id(id).await
    }

    pub async fn get_app_by_key(&self, app_key: &str) -> Result<Option<apps::Model>> {
        self.app_repo().get_by_key(app_key).await
    }

    pub async fn get_app_by_name(&self, name: &str) -> Result<Option<apps::Model>> {
        self.app_repo().get_by_name(name).await
    }

    pub async fn create_app(&self, name: &str, description: Option<&str>) -> Result<apps::Model> {
        self.app_repo().create(name, description).await
    }

    pub async fn list_apps(&self) -> Result<Vec<apps::Model>> {
        self.app_repo().list().await
    }

    pub async fn update_app_status(&self, app_id: i32, status: AppStatus) -> Result<bool> {
        self.app_repo().update_status(app_id, status).await
    }

    pub async fn count_apps(&self) -> Result<u64> {
        self.app_repo().count().await
    }

    // ========== Cards ==========

    pub async fn get_card(&self, id: i32) -> Result<Option<cards::Model>> {
        self.card_repo().get_by_id(id).await
    }

    pub async fn get_card_by_key(&self, app_id: i32, card_key: &str) -> Result<Option<cards::Model>> {
        self.card_repo().get_by_key(app_id, card_key).await
    }

    pub async fn existing_card_keys(&self) -> Result<HashSet<String>> {
        self.card_repo().existing_keys().await
    }

    pub async fn insert_card_batch(
        &self,
        app_id: i32,
        keys: &[String],
        expire_time: DateTime<Utc>,
        max_device_count: i32,
        permissions: Option<JsonValue>,
        remark: Option<&str>,
    ) -> Result<Vec<cards::Model>> {
        self.card_repo()
            .insert_batch(app_id, keys, expire_time, max_device_count, permissions, remark)
            .await
    }

    pub async fn update_card_status(&self, card_id: i32, status: CardStatus) -> Result<bool> {
        self.card_repo().update_status(card_id, status).await
    }

    pub async fn update_card_permissions(
        &self,
        card_id: i32,
        permissions: Option<JsonValue>,
    ) -> Result<bool> {
        self.card_repo().update_permissions(card_id, permissions).await
    }

    pub async fn list_cards(
        &self,
        page: u64,
        size: u64,
        app_id: Option<i32>,
        status: Option<CardStatus>,
        keyword: Option<&str>,
    ) -> Result<(Vec<cards::Model>, u64)> {
        self.card_repo().list(page, size, app_id, status, keyword).await
    }

    pub async fn delete_cards(&self, card_ids: &[i32]) -> Result<u64> {
        self.card_repo().delete_by_ids(card_ids).await
    }

    pub async fn count_cards(&self, app_id: Option<i32>, status: Option<CardStatus>) -> Result<u64> {
        self.card_repo().count(app_id, status).await
    }

    pub async fn card_active_device_count(&self, card_id: i32) -> Result<u64> {
        self.card_repo().active_device_count(card_id).await
    }

    pub async fn card_active_user_count(&self, card_id: i32) -> Result<u64> {
        self.card_repo().active_user_count(card_id).await
    }

    pub async fn card_devices(&self, card_id: i32) -> Result<Vec<card_devices::Model>> {
        self.card_repo().devices_for_card(card_id).await
    }

    pub async fn user_has_active_card(&self, user_id: i32, app_id: i32) -> Result<bool> {
        self.card_repo().user_has_active_card(user_id, app_id).await
    }

    // ========== Devices ==========

    pub async fn get_device(&self, id: i32) -> Result<Option<card_devices::Model>> {
        self.device_repo().get_by_id(id).await
    }

    pub async fn list_devices(
        &self,
        page: u64,
        size: u64,
        card_id: Option<i32>,
        status: Option<CardDeviceStatus>,
        device_id: Option<&str>,
    ) -> Result<(Vec<card_devices::Model>, u64)> {
        self.device_repo()
            .list(page, size, card_id, status, device_id)
            .await
    }

    pub async fn update_device_status(&self, id: i32, status: CardDeviceStatus) -> Result<bool> {
        self.device_repo().update_status(id, status).await
    }

    pub async fn count_devices(&self, status: Option<CardDeviceStatus>) -> Result<u64> {
        self.device_repo().count(status).await
    }

    // ========== Tokens ==========

    pub async fn store_token(
        &self,
        user_id: i32,
        app_id: i32,
        device_id: &str,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        self.token_repo()
            .store(user_id, app_id, device_id, token, expires_at)
            .await
    }

    pub async fn find_live_token(&self, token: &str) -> Result<Option<user_tokens::Model>> {
        self.token_repo().find_live(token).await
    }

    pub async fn revoke_token(&self, token: &str) -> Result<bool> {
        self.token_repo().revoke(token).await
    }

    pub async fn purge_expired_tokens(&self) -> Result<u64> {
        self.token_repo().purge_expired().await
    }

    // ========== Feature permissions ==========

    pub async fn list_feature_permissions(&self) -> Result<Vec<feature_permissions::Model>> {
        self.feature_permission_repo().list().await
    }

    pub async fn enabled_feature_permission_keys(&self) -> Result<Vec<String>> {
        self.feature_permission_repo().enabled_keys().await
    }

    pub async fn get_feature_permission_by_key(
        &self,
        key: &str,
    ) -> Result<Option<feature_permissions::Model>> {
        self.feature_permission_repo().get_by_key(key).await
    }

    pub async fn create_feature_permission(
        &self,
        new: NewFeaturePermission,
    ) -> Result<feature_permissions::Model> {
        self.feature_permission_repo().create(new).await
    }

    pub async fn update_feature_permission_status(
        &self,
        id: i32,
        status: FeaturePermissionStatus,
    ) -> Result<bool> {
        self.feature_permission_repo().update_status(id, status).await
    }

    pub async fn delete_feature_permission(&self, id: i32) -> Result<bool> {
        self.feature_permission_repo().delete(id).await
    }
}
