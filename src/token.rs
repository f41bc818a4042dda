//! JWT issue/decode for login tokens.
//!
//! The signed token carries the identity tuple the permission engine needs
//! (user, app, device, role). Issued tokens are additionally persisted in
//! `user_tokens` so logout can revoke them server-side; decoding alone is
//! never treated as proof of a live session.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::entities::users::UserRole;

/// Claims carried inside a login token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: i32,
    pub username: String,
    pub app_id: i32,
    pub device_id: String,
    pub role: UserRole,
    /// Issued at (unix timestamp).
    pub iat: i64,
    /// Expiration (unix timestamp).
    pub exp: i64,
}

#[derive(Clone)]
pub struct TokenService {
    encoding_key: jsonwebtoken::EncodingKey,
    decoding_key: jsonwebtoken::DecodingKey,
    validation: jsonwebtoken::Validation,
    expire_secs: i64,
}

impl TokenService {
    #[must_use]
    pub fn new(secret: &str, expire_secs: i64) -> Self {
        Self {
            encoding_key: jsonwebtoken::EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: jsonwebtoken::DecodingKey::from_secret(secret.as_bytes()),
            validation: jsonwebtoken::Validation::default(),
            expire_secs,
        }
    }

    #[must_use]
    pub const fn expire_secs(&self) -> i64 {
        self.expire_secs
    }

    /// Issues a signed token for an authenticated user on a device.
    pub fn issue(
        &self,
        user_id: i32,
        username: &str,
        app_id: i32,
        device_id: &str,
        role: UserRole,
    ) -> anyhow::Result<String> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            user_id,
            username: username.to_string(),
            app_id,
            device_id: device_id.to_string(),
            role,
            iat: now,
            exp: now + self.expire_secs,
        };

        jsonwebtoken::encode(&jsonwebtoken::Header::default(), &claims, &self.encoding_key)
            .map_err(|e| anyhow::anyhow!("failed to sign token: {e}"))
    }

    /// Decodes and validates a token's signature and expiry. Returns `None`
    /// for anything invalid; the caller decides how to phrase the refusal.
    #[must_use]
    pub fn decode(&self, token: &str) -> Option<Claims> {
        jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> TokenService {
        TokenService::new("test-secret", 3600)
    }

    #[test]
    fn issue_then_decode() {
        let svc = service();
        let token = svc
            .issue(7, "alice", 1, "device-001", UserRole::User)
            .unwrap();

        let claims = svc.decode(&token).expect("token should decode");
        assert_eq!(claims.user_id, 7);
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.app_id, 1);
        assert_eq!(claims.device_id, "device-001");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn wrong_secret_rejected() {
        let token = service()
            .issue(1, "bob", 1, "d", UserRole::Admin)
            .unwrap();
        let other = TokenService::new("different-secret", 3600);
        assert!(other.decode(&token).is_none());
    }

    #[test]
    fn tampered_token_rejected() {
        let svc = service();
        let mut token = svc.issue(1, "bob", 1, "d", UserRole::User).unwrap();
        token.push('x');
        assert!(svc.decode(&token).is_none());
    }
}
