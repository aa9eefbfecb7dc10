//! Session management.
//!
//! A session is an opaque bearer token mapped in the cache to the user it
//! was issued for. Expiry is the cache TTL.

use std::time::Duration;

use bazaar_cache::{cache_key, Cache};
use bazaar_commerce::ids::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::token::generate_token;
use crate::user::{Role, User};
use crate::AuthError;

/// Cache key prefix for sessions.
const SESSION_PREFIX: &str = "session";

/// An authenticated session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub token: String,
    pub user_id: UserId,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Default session duration: 7 days.
    pub const DEFAULT_DURATION: Duration = Duration::from_secs(7 * 24 * 60 * 60);

    /// Get cache key for this session.
    pub fn cache_key(&self) -> String {
        cache_key!(SESSION_PREFIX, self.token)
    }
}

/// Sessions kept in the cache.
#[derive(Clone)]
pub struct SessionStore {
    cache: Cache,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(cache: Cache, ttl: Duration) -> Self {
        Self { cache, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Start a session for a user.
    pub fn create(&self, user: &User) -> Result<Session, AuthError> {
        let now = Utc::now();
        let ttl = chrono::Duration::from_std(self.ttl).unwrap_or_else(|_| chrono::Duration::days(7));
        let session = Session {
            token: generate_token(),
            user_id: user.id.clone(),
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role,
            created_at: now,
            expires_at: now + ttl,
        };
        self.cache
            .set_with_ttl(&session.cache_key(), &session, self.ttl)?;
        debug!(user = %user.id, "Session created");
        Ok(session)
    }

    /// Look up a live session.
    pub fn get(&self, token: &str) -> Result<Session, AuthError> {
        self.cache
            .get::<Session>(&cache_key!(SESSION_PREFIX, token))?
            .ok_or(AuthError::NotAuthenticated)
    }

    /// End a session. Unknown tokens are ignored.
    pub fn revoke(&self, token: &str) -> Result<(), AuthError> {
        self.cache.delete(&cache_key!(SESSION_PREFIX, token))?;
        Ok(())
    }

    /// End every session of a user. Returns how many were removed.
    pub fn revoke_user(&self, user: &UserId) -> Result<usize, AuthError> {
        let mut removed = 0;
        for key in self.cache.keys(&format!("{}:", SESSION_PREFIX))? {
            let session: Option<Session> = self.cache.get(&key)?;
            if session.is_some_and(|s| &s.user_id == user) && self.cache.delete(&key)? {
                removed += 1;
            }
        }
        debug!(user = %user, removed, "Revoked user sessions");
        Ok(removed)
    }
}
