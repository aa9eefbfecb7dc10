//! In-memory key/value cache for Bazaar.
//!
//! Values are stored as JSON and may carry an expiry. Sessions and one-shot
//! tokens live here.
//!
//! # Example
//!
//! ```rust,ignore
//! use bazaar_cache::{cache_key, Cache};
//! use std::time::Duration;
//!
//! let cache = Cache::new();
//!
//! // Store a value for one hour
//! cache.set_with_ttl(&cache_key!("reset", token), &user_id, Duration::from_secs(3600))?;
//!
//! // Retrieve it
//! let user_id: Option<String> = cache.get(&cache_key!("reset", token))?;
//!
//! // Delete it
//! cache.delete(&cache_key!("reset", token))?;
//! ```

mod error;
mod kv;

pub use error::CacheError;
pub use kv::Cache;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{cache_key, Cache, CacheError};
}
