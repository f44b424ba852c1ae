use racedata::cache::{Cache, CacheConfig};
use racedata::errors::DataError;
use racedata::utils::devlog;
use regex::Regex;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

fn cache_with(max_entries: usize) -> Cache<String> {
    Cache::new(CacheConfig { max_entries, sweep_interval: Duration::ZERO, ..Default::default() })
}

#[test]
fn set_then_get_returns_value_until_ttl_passes() {
    let cache = cache_with(10);
    cache.set_with_ttl("race:1", "Heat 1".to_string(), Duration::from_millis(40));
    assert_eq!(cache.get("race:1").as_deref(), Some("Heat 1"));
    let misses_before = cache.stats().misses;

    std::thread::sleep(Duration::from_millis(80));
    assert_eq!(cache.get("race:1"), None);
    let stats = cache.stats();
    assert_eq!(stats.misses, misses_before + 1);
    assert_eq!(stats.expirations, 1);
    assert_eq!(stats.size, 0, "expired entries are deleted, not just hidden");
}

#[test]
fn inserting_past_capacity_evicts_least_recently_read() {
    let cache = cache_with(3);
    cache.set("a", "1".into());
    cache.set("b", "2".into());
    cache.set("c", "3".into());
    // Reading "a" protects it; "b" is now the least recently used.
    assert!(cache.get("a").is_some());
    cache.set("d", "4".into());

    assert!(cache.get("b").is_none());
    for k in ["a", "c", "d"] {
        assert!(cache.get(k).is_some(), "{k} should survive");
    }
    assert_eq!(cache.stats().evictions, 1);
    assert_eq!(cache.len(), 3);
}

#[test]
fn never_read_entries_evict_in_insertion_order() {
    let cache = cache_with(2);
    cache.set("first", "1".into());
    cache.set("second", "2".into());
    cache.set("third", "3".into());
    assert!(!cache.has("first"));
    assert!(cache.has("second"));
    assert!(cache.has("third"));
}

#[test]
fn has_does_not_refresh_recency() {
    let cache = cache_with(2);
    cache.set("a", "1".into());
    cache.set("b", "2".into());
    assert!(cache.has("a"));
    cache.set("c", "3".into());
    assert!(!cache.has("a"));
    let stats = cache.stats();
    assert_eq!(stats.hits, 0);
    assert_eq!(stats.misses, 0);
}

#[test]
fn repeated_set_is_idempotent() {
    let cache = cache_with(5);
    cache.set("k", "v".into());
    let size = cache.stats().size;
    cache.set("k", "v".into());
    assert_eq!(cache.stats().size, size);
    assert_eq!(cache.get("k").as_deref(), Some("v"));
    assert_eq!(cache.stats().evictions, 0);
}

#[test]
fn replacing_a_key_at_capacity_evicts_nothing() {
    let cache = cache_with(2);
    cache.set("a", "1".into());
    cache.set("b", "2".into());
    cache.set("a", "updated".into());
    assert_eq!(cache.get("a").as_deref(), Some("updated"));
    assert!(cache.has("b"));
    assert_eq!(cache.stats().evictions, 0);
}

#[test]
fn delete_clear_and_stats_reset() {
    let cache = cache_with(5);
    cache.set("a", "1".into());
    cache.set("b", "2".into());
    assert!(cache.delete("a"));
    assert!(!cache.delete("a"));
    let _ = cache.get("b");
    let _ = cache.get("zzz");
    let stats = cache.stats();
    assert_eq!((stats.hits, stats.misses, stats.removes), (1, 1, 1));
    assert!((stats.hit_rate() - 0.5).abs() < f64::EPSILON);

    cache.clear();
    assert!(cache.is_empty());
    cache.reset_stats();
    let stats = cache.stats();
    assert_eq!((stats.hits, stats.misses, stats.sets), (0, 0, 0));
}

#[test]
fn invalidate_by_pattern_removes_only_matches() {
    let cache = cache_with(10);
    for k in ["races:list?$top=5", "races:all", "races:id:7", "meetings:list"] {
        cache.set(k, k.to_string());
    }
    let removed = cache.invalidate_by_pattern(&Regex::new("^races:(list|all)").unwrap());
    assert_eq!(removed, 2);
    let mut keys = cache.keys();
    keys.sort();
    assert_eq!(keys, vec!["meetings:list".to_string(), "races:id:7".to_string()]);
}

#[tokio::test]
async fn get_or_set_runs_factory_once_per_miss() {
    let cache = cache_with(10);
    let calls = Arc::new(AtomicUsize::new(0));
    for _ in 0..3 {
        let calls = calls.clone();
        let v = cache
            .get_or_set(
                "track:sandown",
                move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok("Sandown Park".to_string())
                },
                None,
            )
            .await
            .unwrap();
        assert_eq!(v, "Sandown Park");
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn get_or_set_does_not_cache_failures() {
    let cache = cache_with(10);
    let err = cache
        .get_or_set("k", || async { Err(DataError::Network("offline".into())) }, None)
        .await
        .unwrap_err();
    assert!(matches!(err, DataError::Network(_)));
    assert!(!cache.has("k"));
}

#[test]
fn background_sweep_removes_unread_expired_entries() {
    let cache: Cache<String> = Cache::new(CacheConfig {
        sweep_interval: Duration::from_millis(20),
        ..Default::default()
    });
    cache.set_with_ttl("once", "never read".into(), Duration::from_millis(10));
    std::thread::sleep(Duration::from_millis(250));
    assert_eq!(cache.len(), 0);
    assert!(cache.stats().expirations >= 1);
}

#[test]
fn purge_now_and_trace_events() {
    let _guard = devlog::capture();
    let cache = cache_with(1);
    cache.set("a", "1".into());
    cache.set("b", "2".into());
    assert_eq!(devlog::events_for("evict").len(), 1);

    cache.set_with_ttl("b", "2".into(), Duration::from_millis(1));
    std::thread::sleep(Duration::from_millis(10));
    assert_eq!(cache.purge_expired_now(), 1);
    assert!(devlog::events_for("sweep").iter().any(|e| e.contains("\"evicted\":1")));
}
