//! Integration Tests for the Cache Engine
//!
//! Exercises both tiers together through the public API: TTL expiry with
//! simulated time, memory bypass, write ordering, clears, external eviction
//! and concurrent callers.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use chrono::Duration;
use parking_lot::Mutex;
use tempfile::{tempdir, TempDir};
use tiercache::cache::{key_for_string, ManualClock, MemoryStore, MemoryValue, MAX_KEY_LENGTH};
use tiercache::{current_cache, try_current_cache, CacheEngine};

const T0: i64 = 1_700_000_000;

fn engine_with_clock() -> (TempDir, Arc<ManualClock>, CacheEngine) {
    let dir = tempdir().unwrap();
    let clock = Arc::new(ManualClock::new(T0));
    let engine = CacheEngine::builder(dir.path())
        .clock(clock.clone())
        .build()
        .unwrap();
    (dir, clock, engine)
}

/// Memory tier that drops everything on every `evict_every`-th insert.
#[derive(Default)]
struct EvictingStore {
    entries: Mutex<HashMap<String, MemoryValue>>,
    inserts: AtomicUsize,
    evict_every: usize,
}

impl EvictingStore {
    fn new(evict_every: usize) -> Self {
        Self {
            evict_every,
            ..Self::default()
        }
    }

    fn evict_all(&self) {
        self.entries.lock().clear();
    }
}

impl MemoryStore for EvictingStore {
    fn get(&self, key: &str) -> Option<MemoryValue> {
        self.entries.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: MemoryValue) {
        let n = self.inserts.fetch_add(1, Ordering::SeqCst) + 1;
        let mut entries = self.entries.lock();
        if self.evict_every > 0 && n % self.evict_every == 0 {
            entries.clear();
        }
        entries.insert(key.to_string(), value);
    }

    fn remove(&self, key: &str) {
        self.entries.lock().remove(key);
    }

    fn clear(&self) {
        self.entries.lock().clear();
    }
}

// == TTL Scenarios ==

#[tokio::test]
async fn test_hour_ttl_expires_and_file_is_purged() {
    let (_dir, clock, engine) = engine_with_clock();

    engine.set_with("user:42", &b"hello"[..], Some(Duration::seconds(3600)), None);
    assert_eq!(engine.get("user:42").unwrap().as_ref(), b"hello");
    engine.flush().await;
    assert!(engine.path_for("user:42").is_file());

    clock.advance(Duration::seconds(3601));
    // The memory tier keeps its copy; drop it so the disk TTL is observed
    engine.remove_memory_only("user:42");
    assert!(engine.get("user:42").is_none());

    engine.flush().await;
    assert!(!engine.path_for("user:42").exists());
}

#[tokio::test]
async fn test_already_expired_write() {
    let (_dir, _clock, engine) = engine_with_clock();

    engine.set_with("k", &b"v"[..], Some(Duration::seconds(-1)), Some(false));
    engine.flush().await;

    assert!(engine.get("k").is_none());
    assert!(!engine.has("k", false));
}

#[tokio::test]
async fn test_rewrite_survives_pending_purge() {
    let (_dir, clock, engine) = engine_with_clock();

    engine.set_with("k", &b"old"[..], Some(Duration::seconds(10)), Some(false));
    engine.flush().await;
    clock.advance(Duration::seconds(20));

    // New write is queued, then a read sees the old expired file and queues a purge
    engine.set_with("k", &b"new"[..], Some(Duration::seconds(60)), Some(false));
    let _ = engine.get_with("k", false);
    engine.flush().await;

    assert_eq!(engine.get_with("k", false).unwrap().as_ref(), b"new");
}

// == Memory Bypass ==

#[tokio::test]
async fn test_bypass_is_invisible_to_memory_until_disk_lands() {
    let (_dir, _clock, engine) = engine_with_clock();

    engine.set_with("k", &b"v"[..], None, Some(false));
    // Nothing in memory, and the disk write has not run yet on this runtime
    assert!(!engine.has("k", true));
    assert!(engine.get_with("k", true).is_none());

    engine.flush().await;
    assert_eq!(engine.get_with("k", false).unwrap().as_ref(), b"v");
}

// == Ordering ==

#[tokio::test]
async fn test_last_write_wins() {
    let (_dir, _clock, engine) = engine_with_clock();

    engine.set("k", &b"v1"[..]);
    engine.set("k", &b"v2"[..]);
    engine.flush().await;

    assert_eq!(engine.get_with("k", false).unwrap().as_ref(), b"v2");
}

#[tokio::test]
async fn test_clear_removes_earlier_writes_only() {
    let (_dir, _clock, engine) = engine_with_clock();

    engine.set("before-1", &b"1"[..]);
    engine.set("before-2", &b"2"[..]);
    engine.clear();
    engine.set("after", &b"3"[..]);
    engine.flush().await;

    assert!(!engine.has("before-1", false));
    assert!(!engine.has("before-2", false));
    assert!(engine.has("after", false));
}

// == External Eviction ==

#[tokio::test]
async fn test_evicted_entry_falls_back_to_disk() {
    let dir = tempdir().unwrap();
    let store = Arc::new(EvictingStore::new(0));
    let engine = CacheEngine::builder(dir.path())
        .memory_store(store.clone())
        .build()
        .unwrap();

    engine.set("k", &b"v"[..]);
    engine.flush().await;
    store.evict_all();

    assert!(!engine.has("k", true));
    assert_eq!(engine.get("k").unwrap().as_ref(), b"v");
    // Repopulated by the disk hit
    assert!(engine.has("k", true));
}

#[tokio::test]
async fn test_eviction_before_disk_write_reads_absent() {
    let dir = tempdir().unwrap();
    let store = Arc::new(EvictingStore::new(2));
    let engine = CacheEngine::builder(dir.path())
        .memory_store(store.clone())
        .build()
        .unwrap();

    engine.set("a", &b"1"[..]);
    engine.set("b", &b"2"[..]); // evicts "a" from memory

    // Indistinguishable from never set until the disk write lands
    assert!(!engine.has("a", true));
    engine.flush().await;
    assert_eq!(engine.get("a").unwrap().as_ref(), b"1");
}

// == Keys ==

#[test]
fn test_keys_for_many_identifiers_are_distinct() {
    let keys: std::collections::HashSet<String> = (0..10_000)
        .map(|i| key_for_string("bulk", &format!("https://example.com/item/{}", i)))
        .collect();
    assert_eq!(keys.len(), 10_000);
}

#[tokio::test]
async fn test_key_with_long_prefix_reaches_disk() {
    let (_dir, _clock, engine) = engine_with_clock();
    let key = key_for_string(&"p".repeat(300), "https://example.com/a.png");

    engine.set(&key, &b"v"[..]);
    assert_eq!(engine.get(&key).unwrap().as_ref(), b"v");

    engine.flush().await;
    assert_eq!(engine.get_with(&key, false).unwrap().as_ref(), b"v");
    assert_eq!(engine.stats().write_failures, 0);
}

#[tokio::test]
async fn test_keys_near_the_length_limit_reach_disk() {
    let (_dir, _clock, engine) = engine_with_clock();

    for len in MAX_KEY_LENGTH - 5..=MAX_KEY_LENGTH {
        let key = "k".repeat(len);
        engine.set_with(&key, &b"v"[..], None, Some(false));
        engine.flush().await;
        assert_eq!(
            engine.get_with(&key, false).as_deref(),
            Some(&b"v"[..]),
            "key of {} bytes",
            len
        );
    }
    assert_eq!(engine.stats().write_failures, 0);
}

// == Threads ==

#[test]
fn test_concurrent_writers_from_threads() {
    let dir = tempdir().unwrap();
    let engine = Arc::new(CacheEngine::builder(dir.path()).build().unwrap());

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                for i in 0..50 {
                    let key = format!("t{}-{}", t, i);
                    engine.set(&key, format!("value-{}-{}", t, i));
                    assert!(engine.get(&key).is_some());
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    engine.flush_blocking();
    for t in 0..8 {
        for i in 0..50 {
            let key = format!("t{}-{}", t, i);
            let expected = format!("value-{}-{}", t, i);
            assert_eq!(engine.get_with(&key, false).unwrap().as_ref(), expected.as_bytes());
        }
    }
}

// == Shared Instance ==

#[test]
fn test_current_cache_is_shared() {
    let dir = tempdir().unwrap();
    std::env::set_var("TIERCACHE_DIR", dir.path());

    let first = try_current_cache().unwrap();
    let second = current_cache();
    assert!(std::ptr::eq(first, second));
    assert_eq!(first.cache_dir(), dir.path());

    let key = key_for_string("integration", "shared-instance");
    first.set_string(&key, "shared");
    assert_eq!(second.get_string(&key).as_deref(), Some("shared"));

    first.remove(&key);
    first.flush_blocking();
    assert!(!second.has(&key, false));
}
