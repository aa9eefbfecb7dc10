//! Key-Value store with automatic serialization and expiry.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

use crate::CacheError;

struct Entry {
    bytes: Vec<u8>,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| now < at)
    }
}

/// Type-safe in-memory cache.
///
/// Provides automatic JSON serialization for any type that implements
/// `Serialize` and `DeserializeOwned`. Cloning shares the same store.
/// Expired entries read as absent. `get` and `exists` remove an expired
/// entry they run into; everything else waits for `purge_expired`.
#[derive(Clone, Default)]
pub struct Cache {
    entries: Arc<RwLock<HashMap<String, Entry>>>,
}

impl Cache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a value from the cache.
    ///
    /// Returns `None` if the key doesn't exist or has expired.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let session: Option<Session> = cache.get("session:abc")?;
    /// ```
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CacheError> {
        let now = Instant::now();
        {
            let entries = self.entries.read().map_err(poisoned)?;
            match entries.get(key) {
                Some(entry) if entry.is_live(now) => {
                    return Ok(Some(serde_json::from_slice(&entry.bytes)?));
                }
                None => return Ok(None),
                Some(_) => {}
            }
        }
        self.remove_expired(key, now)?;
        Ok(None)
    }

    /// Set a value with no expiry.
    pub fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<(), CacheError> {
        self.put(key, value, None)
    }

    /// Set a value that expires after `ttl`.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// cache.set_with_ttl("session:abc", &session, Duration::from_secs(7 * 24 * 3600))?;
    /// ```
    pub fn set_with_ttl<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        self.put(key, value, Some(Instant::now() + ttl))
    }

    fn put<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        expires_at: Option<Instant>,
    ) -> Result<(), CacheError> {
        let bytes = serde_json::to_vec(value)?;
        let mut entries = self.entries.write().map_err(poisoned)?;
        entries.insert(key.to_string(), Entry { bytes, expires_at });
        Ok(())
    }

    /// Delete a value. Returns whether a live entry was removed.
    pub fn delete(&self, key: &str) -> Result<bool, CacheError> {
        let mut entries = self.entries.write().map_err(poisoned)?;
        Ok(entries
            .remove(key)
            .is_some_and(|entry| entry.is_live(Instant::now())))
    }

    /// Check if a live key exists.
    pub fn exists(&self, key: &str) -> Result<bool, CacheError> {
        let now = Instant::now();
        let live = {
            let entries = self.entries.read().map_err(poisoned)?;
            match entries.get(key) {
                Some(entry) => entry.is_live(now),
                None => return Ok(false),
            }
        };
        if !live {
            self.remove_expired(key, now)?;
        }
        Ok(live)
    }

    /// Remove `key` if it is still expired. A concurrent `set` may have
    /// replaced it since the read lock was released.
    fn remove_expired(&self, key: &str, now: Instant) -> Result<(), CacheError> {
        let mut entries = self.entries.write().map_err(poisoned)?;
        if entries.get(key).is_some_and(|entry| !entry.is_live(now)) {
            entries.remove(key);
        }
        Ok(())
    }

    /// Get all live keys starting with `prefix`, sorted.
    pub fn keys(&self, prefix: &str) -> Result<Vec<String>, CacheError> {
        let now = Instant::now();
        let entries = self.entries.read().map_err(poisoned)?;
        let mut keys: Vec<String> = entries
            .iter()
            .filter(|(key, entry)| key.starts_with(prefix) && entry.is_live(now))
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        Ok(keys)
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn purge_expired(&self) -> Result<usize, CacheError> {
        let now = Instant::now();
        let mut entries = self.entries.write().map_err(poisoned)?;
        let before = entries.len();
        entries.retain(|_, entry| entry.is_live(now));
        let purged = before - entries.len();
        if purged > 0 {
            debug!(purged, "Purged expired cache entries");
        }
        Ok(purged)
    }
}

fn poisoned<E>(_: E) -> CacheError {
    CacheError::StoreError("cache lock poisoned".to_string())
}

/// Helper to build cache keys with namespacing.
///
/// # Example
///
/// ```rust,ignore
/// let key = cache_key!("session", token);
/// // Returns "session:<token>"
/// ```
#[macro_export]
macro_rules! cache_key {
    ($prefix:expr, $($part:expr),+) => {{
        let mut key = String::from($prefix);
        $(
            key.push(':');
            key.push_str(&$part.to_string());
        )+
        key
    }};
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Session {
        user: String,
        role: String,
    }

    #[test]
    fn test_set_get_delete() {
        let cache = Cache::new();
        let session = Session {
            user: "u1".into(),
            role: "admin".into(),
        };
        cache.set("session:a", &session).unwrap();

        let loaded: Option<Session> = cache.get("session:a").unwrap();
        assert_eq!(loaded, Some(session));
        assert!(cache.exists("session:a").unwrap());

        assert!(cache.delete("session:a").unwrap());
        assert!(!cache.delete("session:a").unwrap());
        assert_eq!(cache.get::<Session>("session:a").unwrap(), None);
    }

    #[test]
    fn test_expired_entries_read_as_absent() {
        let cache = Cache::new();
        cache
            .set_with_ttl("reset:t", &"u1", Duration::from_millis(0))
            .unwrap();
        cache.set("reset:keep", &"u2").unwrap();

        assert_eq!(cache.get::<String>("reset:t").unwrap(), None);
        assert!(!cache.exists("reset:t").unwrap());
        assert_eq!(cache.keys("reset:").unwrap(), vec!["reset:keep".to_string()]);
        assert_eq!(cache.purge_expired().unwrap(), 0);
    }

    #[test]
    fn test_reads_remove_expired_entries() {
        let cache = Cache::new();
        cache
            .set_with_ttl("session:old", &"u1", Duration::from_millis(0))
            .unwrap();
        cache
            .set_with_ttl("session:stale", &"u2", Duration::from_millis(0))
            .unwrap();
        cache
            .set_with_ttl("session:idle", &"u3", Duration::from_millis(0))
            .unwrap();

        assert_eq!(cache.get::<String>("session:old").unwrap(), None);
        assert!(!cache.exists("session:stale").unwrap());
        assert_eq!(cache.entries.read().unwrap().len(), 1);

        // Never read, so only the sweep drops it.
        assert_eq!(cache.purge_expired().unwrap(), 1);
        assert!(cache.entries.read().unwrap().is_empty());
    }

    #[test]
    fn test_clones_share_store() {
        let cache = Cache::new();
        let other = cache.clone();
        other.set("k", &42).unwrap();
        assert_eq!(cache.get::<i32>("k").unwrap(), Some(42));
    }

    #[test]
    fn test_cache_key_macro() {
        let token = "abc";
        assert_eq!(cache_key!("session", token), "session:abc");
        assert_eq!(cache_key!("token", "reset", 7), "token:reset:7");
    }
}
