use anyhow::{Context, Result};
use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use tokio::task;

use crate::config::SecurityConfig;
use crate::entities::users::{self, UserRole, UserStatus};

/// User data returned from the repository (without the password hash)
#[derive(Debug, Clone)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub status: UserStatus,
    pub role: UserRole,
    pub created_at: chrono::DateTime<Utc>,
    pub last_login_at: Option<chrono::DateTime<Utc>>,
}

impl From<users::Model> for User {
    fn from(model: users::Model) -> Self {
        Self {
            id: model.id,
            username: model.username,
            status: model.status,
            role: model.role,
            created_at: model.created_at,
            last_login_at: model.last_login_at,
        }
    }
}

pub struct UserRepository {
    conn: DatabaseConnection,
}

impl UserRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn get_by_id(&self, id: i32) -> Result<Option<User>> {
        let user = users::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query user by ID")?;

        Ok(user.map(User::from))
    }

    pub async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        let user = users::Entity::find()
            .filter(users::Column::Username.eq(username))
            .one(&self.conn)
            .await
            .context("Failed to query user by username")?;

        Ok(user.map(User::from))
    }

    /// Create a user with an already-hashed password.
    pub async fn create(&self, username: &str, password_hash: &str) -> Result<User> {
        let now = Utc::now();
        let model = users::ActiveModel {
            username: Set(username.to_string()),
            password_hash: Set(password_hash.to_string()),
            status: Set(UserStatus::Normal),
            role: Set(UserRole::User),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let inserted = model
            .insert(&self.conn)
            .await
            .context("Failed to insert user")?;

        Ok(User::from(inserted))
    }

    /// Verify password for a user.
    /// Note: runs under `spawn_blocking` because Argon2 verification is
    /// CPU-intensive and would stall the async runtime.
    pub async fn verify_password(&self, username: &str, password: &str) -> Result<bool> {
        let user = users::Entity::find()
            .filter(users::Column::Username.eq(username))
            .one(&self.conn)
            .await
            .context("Failed to query user for password verification")?;

        let Some(user) = user else {
            return Ok(false);
        };

        let password_hash = user.password_hash;
        let password = password.to_string();

        let is_valid = task::spawn_blocking(move || {
            let parsed_hash = PasswordHash::new(&password_hash)
                .map_err(|e| anyhow::anyhow!("Invalid password hash format: {e}"))?;

            let argon2 = Argon2::default();
            Ok::<bool, anyhow::Error>(
                argon2
                    .verify_password(password.as_bytes(), &parsed_hash)
                    .is_ok(),
            )
        })
        .await
        .context("Password verification task panicked")??;

        Ok(is_valid)
    }

    pub async fn update_status(&self, user_id: i32, status: UserStatus) -> Result<bool> {
        let Some(user) = users::Entity::find_by_id(user_id)
            .one(&self.conn)
            .await
            .context("Failed to query user for status update")?
        else {
            return Ok(false);
        };

        let mut active: users::ActiveModel = user.into();
        active.status = Set(status);
        active.updated_at = Set(Utc::now());
        active.update(&self.conn).await?;

        Ok(true)
    }

    pub async fn touch_last_login(&self, user_id: i32) -> Result<()> {
        let Some(user) = users::Entity::find_by_id(user_id)
            .one(&self.conn)
            .await
            .context("Failed to query user for login timestamp")?
        else {
            return Ok(());
        };

        let mut active: users::ActiveModel = user.into();
        active.last_login_at = Set(Some(Utc::now()));
        active.updated_at = Set(Utc::now());
        active.update(&self.conn).await?;

        Ok(())
    }

    /// Paged listing for the admin console, newest first.
    pub async fn list(
        &self,
        page: u64,
        size: u64,
        status: Option<UserStatus>,
        keyword: Option<&str>,
    ) -> Result<(Vec<User>, u64)> {
        let mut query = users::Entity::find();

        if let Some(status) = status {
            query = query.filter(users::Column::Status.eq(status));
        }

        if let Some(keyword) = keyword {
            query = query.filter(users::Column::Username.contains(keyword));
        }

        let total = query.clone().count(&self.conn).await?;

        let page = page.max(1);
        let rows = query
            .order_by_desc(users::Column::CreatedAt)
            .offset((page - 1) * size)
            .limit(size)
            .all(&self.conn)
            .await
            .context("Failed to list users")?;

        Ok((rows.into_iter().map(User::from).collect(), total))
    }

    pub async fn count(&self, status: Option<UserStatus>) -> Result<u64> {
        let mut query = users::Entity::find();
        if let Some(status) = status {
            query = query.filter(users::Column::Status.eq(status));
        }
        Ok(query.count(&self.conn).await?)
    }
}

/// Hash a password using Argon2id with optional tuned params.
pub fn hash_password(password: &str, config: Option<&SecurityConfig>) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    let argon2 = if let Some(cfg) = config {
        let params = Params::new(
            cfg.argon2_memory_cost_kib,
            cfg.argon2_time_cost,
            cfg.argon2_parallelism,
            None,
        )
        .map_err(|e| anyhow::anyhow!("Invalid Argon2 params: {e}"))?;
        Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
    } else {
        Argon2::default()
    };

    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {e}"))?;

    Ok(hash.to_string())
}
