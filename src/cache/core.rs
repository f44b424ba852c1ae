use super::config::CacheConfig;
use super::entry::CacheEntry;
use super::metrics::{CacheMetrics, CacheStats};
use super::policy::{make_room, purge_expired};
use super::store::DurableStore;
use crate::errors::Result;
use chrono::Utc;
use lru::LruCache;
use parking_lot::RwLock;
use regex::Regex;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Weak};
use std::time::Duration;

/// Bounds every cached value satisfies.
pub trait Cacheable: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {}
impl<T> Cacheable for T where T: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {}

/// In-memory TTL + LRU cache with optional durable mirroring.
///
/// Cloning is cheap and shares the same entries. Concurrent `get_or_set` calls for one key
/// may each run their factory; deduplicating in-flight loads is left to callers.
pub struct Cache<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for Cache<T> {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone() }
    }
}

struct Inner<T> {
    store: RwLock<LruCache<String, CacheEntry<T>>>,
    config: CacheConfig,
    metrics: CacheMetrics,
    durable: Option<Arc<dyn DurableStore>>,
}

impl<T: Cacheable> Cache<T> {
    /// Creates a memory-only cache and starts its sweeper.
    pub fn new(config: CacheConfig) -> Self {
        Self::build(config, None)
    }

    /// Creates a cache mirrored to `store` when `config.persist` is set, preloading the
    /// unexpired entries found under `config.key_prefix`.
    pub fn with_store(config: CacheConfig, store: Arc<dyn DurableStore>) -> Self {
        let durable = config.persist.then_some(store);
        Self::build(config, durable)
    }

    fn build(config: CacheConfig, durable: Option<Arc<dyn DurableStore>>) -> Self {
        let sweep_every = config.sweep_interval;
        let cache = Cache {
            inner: Arc::new(Inner {
                store: RwLock::new(LruCache::unbounded()),
                config,
                metrics: CacheMetrics::default(),
                durable,
            }),
        };
        cache.preload();
        if !sweep_every.is_zero() {
            spawn_sweeper(Arc::downgrade(&cache.inner), sweep_every);
        }
        cache
    }

    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    /// Returns the value and bumps its hit count and recency; expired entries are deleted.
    pub fn get(&self, key: &str) -> Option<T> {
        let now = Utc::now();
        let mut guard = self.inner.store.write();
        let expired = match guard.peek(key) {
            Some(entry) => entry.is_expired_at(now),
            None => {
                drop(guard);
                self.inner.metrics.misses.fetch_add(1, Ordering::Relaxed);
                return None;
            }
        };
        if expired {
            guard.pop(key);
            drop(guard);
            self.inner.metrics.ttl_expirations.fetch_add(1, Ordering::Relaxed);
            self.inner.metrics.misses.fetch_add(1, Ordering::Relaxed);
            self.inner.unmirror(key);
            crate::dev_trace!("cache", "expire", "key" => key);
            return None;
        }
        let value = guard.get_mut(key).map(|entry| {
            entry.hit_count += 1;
            entry.data.clone()
        });
        drop(guard);
        self.inner.metrics.hits.fetch_add(1, Ordering::Relaxed);
        value
    }

    /// Existence check with `get`'s expiry rules; recency and counters are untouched.
    pub fn has(&self, key: &str) -> bool {
        let now = Utc::now();
        let mut guard = self.inner.store.write();
        match guard.peek(key).map(|e| e.is_expired_at(now)) {
            Some(false) => true,
            Some(true) => {
                guard.pop(key);
                drop(guard);
                self.inner.metrics.ttl_expirations.fetch_add(1, Ordering::Relaxed);
                self.inner.unmirror(key);
                false
            }
            None => false,
        }
    }

    pub fn set(&self, key: &str, value: T) {
        self.set_with_ttl(key, value, self.inner.config.default_ttl);
    }

    /// Inserts or replaces `key`. A new key at capacity evicts one LRU entry first.
    pub fn set_with_ttl(&self, key: &str, value: T, ttl: Duration) {
        let entry = CacheEntry::new(key, value, ttl);
        let payload = self.inner.durable.as_ref().and_then(|_| match serde_json::to_string(&entry) {
            Ok(p) => Some(p),
            Err(e) => {
                log::warn!("cache entry {key} not mirrored: {e}");
                None
            }
        });

        let (expired, victim) = {
            let mut guard = self.inner.store.write();
            let room = if guard.contains(key) {
                (Vec::new(), None)
            } else {
                make_room(&mut guard, self.inner.config.max_entries.max(1))
            };
            guard.put(key.to_string(), entry);
            room
        };

        self.inner.metrics.sets.fetch_add(1, Ordering::Relaxed);
        if !expired.is_empty() {
            self.inner
                .metrics
                .ttl_expirations
                .fetch_add(crate::utils::num::usize_to_u64(expired.len()), Ordering::Relaxed);
            for k in &expired {
                self.inner.unmirror(k);
            }
        }
        if let Some(victim) = victim {
            self.inner.metrics.lru_evictions.fetch_add(1, Ordering::Relaxed);
            self.inner.unmirror(&victim);
            log::debug!("cache evicted least recently used entry {victim}");
            crate::dev_trace!("cache", "evict", "key" => victim);
        }
        if let (Some(store), Some(payload)) = (self.inner.durable.as_ref(), payload)
            && let Err(e) = store.set_item(&self.inner.durable_key(key), &payload)
        {
            log::warn!("cache mirror write failed for {key}: {e}");
        }
    }

    pub fn delete(&self, key: &str) -> bool {
        let removed = self.inner.store.write().pop(key).is_some();
        if removed {
            self.inner.metrics.removes.fetch_add(1, Ordering::Relaxed);
        }
        self.inner.unmirror(key);
        removed
    }

    pub fn clear(&self) {
        self.inner.store.write().clear();
        if let Some(store) = self.inner.durable.as_ref() {
            match store.keys_with_prefix(&self.inner.config.key_prefix) {
                Ok(keys) => keys.iter().for_each(|k| remove_durable(store.as_ref(), k)),
                Err(e) => log::warn!("cache mirror listing failed: {e}"),
            }
        }
    }

    /// Cached value, or the factory's result (cached) on a miss.
    pub async fn get_or_set<F, Fut>(&self, key: &str, factory: F, ttl: Option<Duration>) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if let Some(v) = self.get(key) {
            return Ok(v);
        }
        let value = factory().await?;
        self.set_with_ttl(key, value.clone(), ttl.unwrap_or(self.inner.config.default_ttl));
        Ok(value)
    }

    /// Deletes every key matching `pattern`, in memory and in the durable store.
    pub fn invalidate_by_pattern(&self, pattern: &Regex) -> usize {
        let matched: Vec<String> = {
            let mut guard = self.inner.store.write();
            let keys: Vec<String> =
                guard.iter().map(|(k, _)| k.clone()).filter(|k| pattern.is_match(k)).collect();
            for k in &keys {
                guard.pop(k);
            }
            keys
        };
        for k in &matched {
            self.inner.unmirror(k);
        }
        if let Some(store) = self.inner.durable.as_ref() {
            let prefix = &self.inner.config.key_prefix;
            match store.keys_with_prefix(prefix) {
                Ok(durable_keys) => durable_keys
                    .iter()
                    .filter(|dk| dk.strip_prefix(prefix.as_str()).is_some_and(|k| pattern.is_match(k)))
                    .for_each(|dk| remove_durable(store.as_ref(), dk)),
                Err(e) => log::warn!("cache mirror listing failed during invalidation: {e}"),
            }
        }
        let count = matched.len();
        if count > 0 {
            self.inner
                .metrics
                .removes
                .fetch_add(crate::utils::num::usize_to_u64(count), Ordering::Relaxed);
            crate::dev_trace!("cache", "invalidate", "pattern" => pattern.as_str(), "count" => count);
        }
        count
    }

    /// Force a TTL sweep now. Returns the number of entries removed.
    pub fn purge_expired_now(&self) -> usize {
        self.inner.sweep()
    }

    pub fn stats(&self) -> CacheStats {
        self.inner.metrics.snapshot(self.len())
    }

    pub fn reset_stats(&self) {
        self.inner.metrics.reset();
    }

    pub fn len(&self) -> usize {
        self.inner.store.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keys from most to least recently used.
    pub fn keys(&self) -> Vec<String> {
        self.inner.store.read().iter().map(|(k, _)| k.clone()).collect()
    }

    fn preload(&self) {
        let Some(store) = self.inner.durable.as_ref() else {
            return;
        };
        let prefix = &self.inner.config.key_prefix;
        let keys = match store.keys_with_prefix(prefix) {
            Ok(keys) => keys,
            Err(e) => {
                log::warn!("cache warm start skipped: {e}");
                return;
            }
        };
        let now = Utc::now();
        let mut live: Vec<CacheEntry<T>> = Vec::new();
        for dk in keys {
            let parsed = match store.get_item(&dk) {
                Ok(raw) => raw.and_then(|raw| serde_json::from_str::<CacheEntry<T>>(&raw).ok()),
                Err(e) => {
                    log::warn!("cache warm start could not read {dk}: {e}");
                    None
                }
            };
            match parsed {
                Some(entry) if !entry.is_expired_at(now) => live.push(entry),
                _ => remove_durable(store.as_ref(), &dk),
            }
        }
        live.sort_by_key(|e| e.created_at);
        let max = self.inner.config.max_entries.max(1);
        let mut guard = self.inner.store.write();
        for entry in live {
            if guard.len() >= max
                && let Some((old, _)) = guard.pop_lru()
            {
                remove_durable(store.as_ref(), &format!("{prefix}{old}"));
            }
            guard.put(entry.key.clone(), entry);
        }
        log::debug!("cache {prefix} warm-started with {} entries", guard.len());
    }
}

fn remove_durable(store: &dyn DurableStore, durable_key: &str) {
    if let Err(e) = store.remove_item(durable_key) {
        log::warn!("cache mirror remove failed for {durable_key}: {e}");
    }
}

impl<T> Inner<T> {
    fn durable_key(&self, key: &str) -> String {
        format!("{}{key}", self.config.key_prefix)
    }

    fn unmirror(&self, key: &str) {
        if let Some(store) = self.durable.as_ref() {
            remove_durable(store.as_ref(), &self.durable_key(key));
        }
    }

    fn sweep(&self) -> usize {
        let expired = purge_expired(&mut self.store.write());
        for k in &expired {
            self.unmirror(k);
        }
        let count = expired.len();
        if count > 0 {
            self.metrics
                .ttl_expirations
                .fetch_add(crate::utils::num::usize_to_u64(count), Ordering::Relaxed);
            crate::dev_trace!("cache", "sweep", "evicted" => count);
        }
        count
    }
}

// A plain thread keeps the sweeper independent of any async runtime; it exits once the
// cache it watches has been dropped.
fn spawn_sweeper<T: Send + Sync + 'static>(inner: Weak<Inner<T>>, every: Duration) {
    let spawned = std::thread::Builder::new().name("racedata-cache-sweep".into()).spawn(move || {
        loop {
            std::thread::sleep(every);
            match inner.upgrade() {
                Some(cache) => {
                    cache.sweep();
                }
                None => break,
            }
        }
    });
    if let Err(e) = spawned {
        log::warn!("cache sweeper not started: {e}");
    }
}
