//! In-process key/value cache with optional per-entry TTL, on top of moka.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use moka::notification::RemovalCause;
use moka::sync::Cache;
use moka::Expiry;

#[derive(Clone)]
struct Entry<V> {
    value: V,
    ttl: Option<Duration>,
}

/// Each entry lives for its own `ttl`; overwriting a key restarts the clock.
struct PerEntryTtl;

impl<V> Expiry<String, Entry<V>> for PerEntryTtl {
    fn expire_after_create(&self, _key: &String, entry: &Entry<V>, _created_at: Instant) -> Option<Duration> {
        entry.ttl
    }

    fn expire_after_update(
        &self,
        _key: &String,
        entry: &Entry<V>,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        entry.ttl
    }
}

/// Thread-safe TTL cache. Expired entries are never returned; moka evicts
/// them during its own housekeeping or on [`TtlCache::cleanup_expired`].
pub struct TtlCache<V> {
    inner: Cache<String, Entry<V>>,
    expired: Arc<AtomicUsize>,
}

impl<V: Clone + Send + Sync + 'static> TtlCache<V> {
    pub fn new() -> Self {
        let expired = Arc::new(AtomicUsize::new(0));
        let counter = expired.clone();
        let inner = Cache::builder()
            .expire_after(PerEntryTtl)
            .eviction_listener(move |_key, _value, cause| {
                if cause == RemovalCause::Expired {
                    counter.fetch_add(1, Ordering::Relaxed);
                }
            })
            .build();
        Self { inner, expired }
    }

    pub fn get(&self, key: &str) -> Option<V> {
        self.inner.get(key).map(|entry| entry.value)
    }

    /// Store `value`; `ttl = None` keeps it until deleted.
    pub fn set(&self, key: impl Into<String>, value: V, ttl: Option<Duration>) {
        self.inner.insert(key.into(), Entry { value, ttl });
    }

    pub fn delete(&self, key: &str) -> bool {
        self.inner.remove(key).is_some()
    }

    pub fn clear(&self) {
        self.inner.invalidate_all();
    }

    /// Evict expired entries now, returning how many were dropped.
    pub fn cleanup_expired(&self) -> usize {
        let before = self.expired.load(Ordering::Relaxed);
        self.inner.run_pending_tasks();
        self.expired.load(Ordering::Relaxed) - before
    }

    /// Live entries, after flushing pending evictions.
    pub fn len(&self) -> usize {
        self.inner.run_pending_tasks();
        self.inner.entry_count() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<V: Clone + Send + Sync + 'static> Default for TtlCache<V> {
    fn default() -> Self {
        Self::new()
    }
}
