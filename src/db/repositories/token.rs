use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};

use crate::entities::user_tokens;

pub struct TokenRepository {
    conn: DatabaseConnection,
}

impl TokenRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Store a freshly issued token. Any previous token for the same
    /// (user, app, device) triple is replaced so a device holds at most
    /// one live session.
    pub async fn store(
        &self,
        user_id: i32,
        app_id: i32,
        device_id: &str,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        user_tokens::Entity::delete_many()
            .filter(user_tokens::Column::UserId.eq(user_id))
            .filter(user_tokens::Column::AppId.eq(app_id))
            .filter(user_tokens::Column::DeviceId.eq(device_id))
            .exec(&self.conn)
            .await
            .context("Failed to clear previous tokens")?;

        let model = user_tokens::ActiveModel {
            user_id: Set(user_id),
            app_id: Set(app_id),
            device_id: Set(device_id.to_string()),
            token: Set(token.to_string()),
            expire_time: Set(expires_at),
            created_at: Set(Utc::now()),
            ..Default::default()
        };

        model
            .insert(&self.conn)
            .await
            .context("Failed to store token")?;

        Ok(())
    }

    /// Look up a stored token that has not yet expired.
    pub async fn find_live(&self, token: &str) -> Result<Option<user_tokens::Model>> {
        let row = user_tokens::Entity::find()
            .filter(user_tokens::Column::Token.eq(token))
            .filter(user_tokens::Column::ExpireTime.gt(Utc::now()))
            .one(&self.conn)
            .await
            .context("Failed to query token")?;

        Ok(row)
    }

    /// Revoke a token. Returns whether a row was actually deleted.
    pub async fn revoke(&self, token: &str) -> Result<bool> {
        let result = user_tokens::Entity::delete_many()
            .filter(user_tokens::Column::Token.eq(token))
            .exec(&self.conn)
            .await
            .context("Failed to revoke token")?;

        Ok(result.rows_affected > 0)
    }

    /// Remove expired rows. Returns how many were purged.
    pub async fn purge_expired(&self) -> Result<u64> {
        let result = user_tokens::Entity::delete_many()
            .filter(user_tokens::Column::ExpireTime.lte(Utc::now()))
            .exec(&self.conn)
            .await
            .context("Failed to purge expired tokens")?;

        Ok(result.rows_affected)
    }
}
