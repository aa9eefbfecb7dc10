//! One-shot tokens for password reset and similar flows.

use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use bazaar_cache::{cache_key, Cache};
use bazaar_commerce::ids::UserId;
use rand::RngCore;
use tracing::debug;

use crate::AuthError;

/// Random bytes behind each token.
const TOKEN_BYTES: usize = 32;

/// Token type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenType {
    /// Password reset token.
    PasswordReset,
}

impl TokenType {
    /// Get token type as string.
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::PasswordReset => "password_reset",
        }
    }

    /// How long a token stays valid.
    pub fn ttl(&self) -> Duration {
        match self {
            TokenType::PasswordReset => Duration::from_secs(60 * 60),
        }
    }
}

/// Generate an unguessable URL-safe token string.
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Tokens stored in the cache, each usable once.
#[derive(Clone)]
pub struct TokenStore {
    cache: Cache,
}

impl TokenStore {
    pub fn new(cache: Cache) -> Self {
        Self { cache }
    }

    /// Issue a token of `kind` for a user.
    pub fn issue(&self, kind: TokenType, user: &UserId) -> Result<String, AuthError> {
        let token = generate_token();
        self.cache
            .set_with_ttl(&cache_key!("token", kind.as_str(), token), user, kind.ttl())?;
        debug!(kind = kind.as_str(), user = %user, "Issued token");
        Ok(token)
    }

    /// Redeem a token, removing it. Unknown or expired tokens fail.
    pub fn consume(&self, kind: TokenType, token: &str) -> Result<UserId, AuthError> {
        let key = cache_key!("token", kind.as_str(), token);
        let user: Option<UserId> = self.cache.get(&key)?;
        let user = user.ok_or(AuthError::InvalidToken)?;
        self.cache.delete(&key)?;
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_shape() {
        let a = generate_token();
        let b = generate_token();
        assert_ne!(a, b);
        assert_eq!(a.len(), 43);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn test_consume_once() {
        let store = TokenStore::new(Cache::new());
        let user = UserId::generate();
        let token = store.issue(TokenType::PasswordReset, &user).unwrap();

        assert_eq!(store.consume(TokenType::PasswordReset, &token).unwrap(), user);
        assert!(matches!(
            store.consume(TokenType::PasswordReset, &token),
            Err(AuthError::InvalidToken)
        ));
        assert!(store.consume(TokenType::PasswordReset, "bogus").is_err());
    }
}
