//! Short-lived string cache used to avoid re-reading the durable store on
//! every gate check.

use crate::core::error::StoreError;
use moka::Expiry;
use moka::sync::Cache;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Key-value cache whose entries disappear after their time-to-live.
pub trait EphemeralCache {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Stores `value` under `key`, replacing any previous entry and restarting its TTL.
    fn put(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError>;
}

impl<T: EphemeralCache + ?Sized> EphemeralCache for Arc<T> {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get(key)
    }

    fn put(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        (**self).put(key, value, ttl)
    }
}

#[derive(Clone, Debug)]
struct CachedValue {
    value: String,
    ttl: Duration,
}

/// Expires each entry after the TTL it was stored with.
struct PerEntryTtl;

impl Expiry<String, CachedValue> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &CachedValue,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &CachedValue,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// In-process cache for long-running request handlers.
///
/// Entries are private to the process; use the redb-backed
/// [`Database`](crate::core::db::Database) cache to share them between
/// short-lived executions.
#[derive(Clone)]
pub struct MokaCache {
    inner: Cache<String, CachedValue>,
}

impl MokaCache {
    /// Create new cache with max capacity
    #[must_use]
    pub fn new(max_capacity: u64) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(max_capacity)
                .expire_after(PerEntryTtl)
                .build(),
        }
    }

    /// Drops every entry.
    pub fn invalidate_all(&self) {
        self.inner.invalidate_all();
    }
}

impl Default for MokaCache {
    /// The gate only caches a handful of keys.
    fn default() -> Self {
        Self::new(64)
    }
}

impl EphemeralCache for MokaCache {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.inner.get(key).map(|cached| cached.value))
    }

    fn put(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        self.inner.insert(
            key.to_string(),
            CachedValue {
                value: value.to_string(),
                ttl,
            },
        );
        Ok(())
    }
}
