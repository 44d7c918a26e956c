//! Token storage and management

use base64::Engine;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::models::User;

/// Stored bearer token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredToken {
    pub token: String,
    pub expires_at: Option<u64>,
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

impl StoredToken {
    /// Wrap a token issued by `/auth/login`.
    ///
    /// The API issues JWTs; when the payload carries an `exp` claim it becomes
    /// the expiry. Opaque tokens never expire locally.
    pub fn new(token: String) -> Self {
        let expires_at = jwt_expiry(&token);
        Self { token, expires_at }
    }

    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(exp) => now_secs() >= exp,
            None => false,
        }
    }
}

/// Read the `exp` claim from a JWT without verifying the signature.
fn jwt_expiry(token: &str) -> Option<u64> {
    let payload = token.split('.').nth(1)?;
    let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .ok()?;
    let claims: serde_json::Value = serde_json::from_slice(&bytes).ok()?;
    claims.get("exp")?.as_u64()
}

/// Token store trait for different storage backends
pub trait TokenStore {
    fn get_token(&self) -> Option<StoredToken>;
    fn set_token(&mut self, token: String);
    fn get_user(&self) -> Option<User>;
    fn set_user(&mut self, user: User);
    fn clear_tokens(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jwt_with(claims: &str) -> String {
        let enc = base64::engine::general_purpose::URL_SAFE_NO_PAD;
        format!(
            "{}.{}.sig",
            enc.encode(r#"{"alg":"HS256","typ":"JWT"}"#),
            enc.encode(claims)
        )
    }

    #[test]
    fn test_jwt_exp_is_read() {
        let token = StoredToken::new(jwt_with(r#"{"sub":"u1","exp":1700000000}"#));
        assert_eq!(token.expires_at, Some(1_700_000_000));
        assert!(token.is_expired());
    }

    #[test]
    fn test_future_exp_not_expired() {
        let exp = now_secs() + 3600;
        let token = StoredToken::new(jwt_with(&format!(r#"{{"exp":{}}}"#, exp)));
        assert!(!token.is_expired());
    }

    #[test]
    fn test_opaque_token_never_expires() {
        let token = StoredToken::new("not-a-jwt".to_string());
        assert_eq!(token.expires_at, None);
        assert!(!token.is_expired());
    }
}
