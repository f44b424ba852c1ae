use std::sync::atomic::{AtomicU64, Ordering};

/// Counters accumulated since construction or the last `reset_stats`.
#[derive(Default)]
pub struct CacheMetrics {
    pub hits: AtomicU64,
    pub misses: AtomicU64,
    pub sets: AtomicU64,
    pub removes: AtomicU64,
    pub lru_evictions: AtomicU64,
    pub ttl_expirations: AtomicU64,
}

impl CacheMetrics {
    pub fn snapshot(&self, size: usize) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            size,
            evictions: self.lru_evictions.load(Ordering::Relaxed),
            expirations: self.ttl_expirations.load(Ordering::Relaxed),
            sets: self.sets.load(Ordering::Relaxed),
            removes: self.removes.load(Ordering::Relaxed),
        }
    }

    pub fn reset(&self) {
        for c in [
            &self.hits,
            &self.misses,
            &self.sets,
            &self.removes,
            &self.lru_evictions,
            &self.ttl_expirations,
        ] {
            c.store(0, Ordering::Relaxed);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub size: usize,
    pub evictions: u64,
    pub expirations: u64,
    pub sets: u64,
    pub removes: u64,
}

impl CacheStats {
    /// Hits over lookups, 0.0 when nothing was looked up.
    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 { 0.0 } else { self.hits as f64 / total as f64 }
    }
}
