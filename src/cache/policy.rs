use super::entry::CacheEntry;
use chrono::Utc;
use lru::LruCache;

/// Removes expired entries. Returns the removed keys so callers can drop durable mirrors.
pub fn purge_expired<T>(store: &mut LruCache<String, CacheEntry<T>>) -> Vec<String> {
    let now = Utc::now();
    let expired: Vec<String> =
        store.iter().filter(|(_, e)| e.is_expired_at(now)).map(|(k, _)| k.clone()).collect();
    for key in &expired {
        store.pop(key);
    }
    expired
}

/// Makes room for one new key: expired entries go first, then the least recently used.
/// Returns `(expired_keys, lru_victim)`.
pub fn make_room<T>(
    store: &mut LruCache<String, CacheEntry<T>>,
    max_entries: usize,
) -> (Vec<String>, Option<String>) {
    if store.len() < max_entries {
        return (Vec::new(), None);
    }
    let expired = purge_expired(store);
    if store.len() < max_entries {
        return (expired, None);
    }
    let victim = store.pop_lru().map(|(k, _)| k);
    (expired, victim)
}
