//! Cache Engine Module
//!
//! Coordinates the memory and disk tiers: reads consult memory first and
//! fall back to disk with a TTL check; writes land in memory synchronously
//! and reach disk through the write queue.
//!
//! Memory entries carry no expiration. A value can outlive its disk TTL in
//! memory until it is removed or evicted.

use std::any::Any;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use chrono::Duration;
use parking_lot::RwLock;
use tracing::{debug, info, warn};
use url::Url;

use crate::cache::entry::{Clock, Expiration, SystemClock};
use crate::cache::key::{key_for_string, key_for_url, validate_key};
use crate::cache::memory::{MapMemoryStore, MemoryStore, MemoryValue, MokaMemoryStore};
use crate::cache::{CacheStats, DiskStore, StatsRecorder};
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::tasks::{DiskTask, WriteQueue};

// == Defaults ==
/// Policy applied when a call leaves TTL or the memory flag unspecified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Defaults {
    /// Zero means never expires
    pub ttl: Duration,
    pub use_memory: bool,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            ttl: Duration::days(1),
            use_memory: true,
        }
    }
}

// == Builder ==
/// Builder for [`CacheEngine`].
pub struct CacheEngineBuilder {
    cache_dir: PathBuf,
    defaults: Defaults,
    memory_capacity: u64,
    memory: Option<Arc<dyn MemoryStore>>,
    clock: Arc<dyn Clock>,
    dedicated_writer: bool,
}

impl CacheEngineBuilder {
    pub fn default_ttl(mut self, ttl: Duration) -> Self {
        self.defaults.ttl = ttl;
        self
    }

    pub fn use_memory(mut self, use_memory: bool) -> Self {
        self.defaults.use_memory = use_memory;
        self
    }

    /// Memory tier size in bytes; 0 selects an unbounded map.
    pub fn memory_capacity(mut self, bytes: u64) -> Self {
        self.memory_capacity = bytes;
        self
    }

    /// Uses a caller-provided memory tier instead of the built-in ones.
    pub fn memory_store(mut self, store: Arc<dyn MemoryStore>) -> Self {
        self.memory = Some(store);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Runs the disk worker on its own runtime even when built inside one.
    pub fn dedicated_writer(mut self, dedicated: bool) -> Self {
        self.dedicated_writer = dedicated;
        self
    }

    pub fn build(self) -> Result<CacheEngine> {
        // An unwritable directory degrades to memory-only; disk failures are absorbed.
        let disk = DiskStore::open(&self.cache_dir).unwrap_or_else(|err| {
            warn!(cache_dir = ?self.cache_dir, error = %err, "Cache directory unavailable");
            DiskStore::unchecked(&self.cache_dir)
        });

        let memory = self.memory.unwrap_or_else(|| {
            if self.memory_capacity == 0 {
                Arc::new(MapMemoryStore::new())
            } else {
                Arc::new(MokaMemoryStore::new(self.memory_capacity))
            }
        });

        let stats = Arc::new(StatsRecorder::new());
        let queue = if self.dedicated_writer {
            WriteQueue::spawn_dedicated(disk.clone(), Arc::clone(&stats))?
        } else {
            WriteQueue::spawn(disk.clone(), Arc::clone(&stats))?
        };

        info!(
            cache_dir = ?disk.root(),
            default_ttl = self.defaults.ttl.num_seconds(),
            use_memory = self.defaults.use_memory,
            "Cache engine initialized"
        );

        Ok(CacheEngine {
            memory,
            disk,
            queue,
            clock: self.clock,
            defaults: RwLock::new(self.defaults),
            stats,
        })
    }
}

/// Where a read was answered from.
pub(crate) enum Hit {
    Memory(MemoryValue),
    Disk(Bytes),
}

// == Cache Engine ==
/// Two-tier cache over a memory store and a disk directory.
pub struct CacheEngine {
    memory: Arc<dyn MemoryStore>,
    disk: DiskStore,
    queue: WriteQueue,
    clock: Arc<dyn Clock>,
    defaults: RwLock<Defaults>,
    stats: Arc<StatsRecorder>,
}

impl CacheEngine {
    // == Constructors ==
    pub fn builder(cache_dir: impl Into<PathBuf>) -> CacheEngineBuilder {
        CacheEngineBuilder {
            cache_dir: cache_dir.into(),
            defaults: Defaults::default(),
            memory_capacity: crate::config::DEFAULT_MEMORY_CAPACITY,
            memory: None,
            clock: Arc::new(SystemClock),
            dedicated_writer: false,
        }
    }

    /// Creates an engine from configuration.
    pub fn open(config: &Config) -> Result<Self> {
        Self::builder(&config.cache_dir)
            .default_ttl(Duration::seconds(config.default_ttl))
            .use_memory(config.use_memory)
            .memory_capacity(config.memory_capacity)
            .build()
    }

    // == Keys ==
    /// See [`key_for_string`].
    pub fn key_for(prefix: &str, identifier: &str) -> String {
        key_for_string(prefix, identifier)
    }

    /// See [`key_for_url`].
    pub fn key_for_url(prefix: &str, url: &Url) -> String {
        key_for_url(prefix, url)
    }

    // == Defaults ==
    pub fn defaults(&self) -> Defaults {
        *self.defaults.read()
    }

    pub fn default_ttl(&self) -> Duration {
        self.defaults.read().ttl
    }

    pub fn set_default_ttl(&self, ttl: Duration) {
        self.defaults.write().ttl = ttl;
    }

    pub fn default_use_memory(&self) -> bool {
        self.defaults.read().use_memory
    }

    pub fn set_default_use_memory(&self, use_memory: bool) {
        self.defaults.write().use_memory = use_memory;
    }

    // == Read Path ==
    /// Reads raw bytes using the default memory flag.
    pub fn get(&self, key: &str) -> Option<Bytes> {
        self.get_with(key, self.default_use_memory())
    }

    /// Reads raw bytes.
    ///
    /// A memory hit returns immediately without a TTL check, whichever
    /// accessor stored it. Otherwise the disk entry is read; expired entries
    /// are purged and reported absent. Disk hits repopulate memory when
    /// `use_memory` is set.
    pub fn get_with(&self, key: &str, use_memory: bool) -> Option<Bytes> {
        match self.fetch(key, use_memory)? {
            Hit::Memory(value) => Some(value.as_bytes().clone()),
            Hit::Disk(payload) => {
                if use_memory {
                    self.memory.set(key, MemoryValue::Bytes(payload.clone()));
                }
                Some(payload)
            }
        }
    }

    /// Reads and decodes a typed value.
    ///
    /// A memory hit holding a `T` is returned as is; any other memory value
    /// has its payload decoded. On a disk hit the decoded value (`keep_decoded`) or the raw
    /// bytes go back into memory. Decode failures read as absent.
    pub(crate) fn get_decoded<T, F>(
        &self,
        key: &str,
        use_memory: bool,
        keep_decoded: bool,
        decode: F,
    ) -> Option<Arc<T>>
    where
        T: Any + Send + Sync,
        F: FnOnce(&[u8]) -> Result<T>,
    {
        match self.fetch(key, use_memory)? {
            Hit::Memory(value) => {
                if let Some(object) = value.downcast::<T>() {
                    return Some(object);
                }
                self.decode_or_miss(key, value.as_bytes(), decode).map(Arc::new)
            }
            Hit::Disk(payload) => {
                let object = Arc::new(self.decode_or_miss(key, &payload, decode)?);
                if use_memory {
                    let value = if keep_decoded {
                        MemoryValue::object(Arc::clone(&object), payload)
                    } else {
                        MemoryValue::Bytes(payload)
                    };
                    self.memory.set(key, value);
                }
                Some(object)
            }
        }
    }

    fn decode_or_miss<T, F>(&self, key: &str, bytes: &[u8], decode: F) -> Option<T>
    where
        F: FnOnce(&[u8]) -> Result<T>,
    {
        match decode(bytes) {
            Ok(value) => Some(value),
            Err(err) => {
                debug!(key = %key, error = %err, "Cached payload did not decode");
                None
            }
        }
    }

    /// Shared lookup: memory (if enabled), then disk.
    fn fetch(&self, key: &str, use_memory: bool) -> Option<Hit> {
        if let Err(err) = validate_key(key) {
            debug!(error = %err, "Rejected cache key on read");
            self.stats.record_miss();
            return None;
        }

        if use_memory {
            if let Some(value) = self.memory.get(key) {
                debug!(key = %key, "Memory hit");
                self.stats.record_memory_hit();
                return Some(Hit::Memory(value));
            }
        }

        let payload = self.read_disk(key)?;
        debug!(key = %key, bytes = payload.len(), "Disk hit");
        self.stats.record_disk_hit();
        Some(Hit::Disk(payload))
    }

    fn read_disk(&self, key: &str) -> Option<Bytes> {
        let now = self.clock.now();
        match self.disk.read(key) {
            Ok((expiration, _)) if expiration.is_expired(now) => {
                debug!(key = %key, "Disk entry expired");
                self.stats.record_expiration();
                self.queue.enqueue(DiskTask::Purge {
                    key: key.to_string(),
                    now,
                });
                None
            }
            Ok((_, payload)) => Some(Bytes::from(payload)),
            Err(CacheError::NotFound(_)) => {
                self.stats.record_miss();
                None
            }
            Err(err @ CacheError::Corrupt { .. }) => {
                warn!(key = %key, error = %err, "Corrupt disk entry, purging");
                self.stats.record_miss();
                self.queue.enqueue(DiskTask::Purge {
                    key: key.to_string(),
                    now,
                });
                None
            }
            Err(err) => {
                warn!(key = %key, error = %err, "Disk read failed");
                self.stats.record_miss();
                None
            }
        }
    }

    // == Has ==
    /// Checks for a live entry without reading its payload.
    ///
    /// With `memory_only` false, a disk entry counts only if not expired.
    pub fn has(&self, key: &str, memory_only: bool) -> bool {
        if validate_key(key).is_err() {
            return false;
        }
        if self.memory.get(key).is_some() {
            return true;
        }
        if memory_only {
            return false;
        }

        let now = self.clock.now();
        match self.disk.read_meta(key) {
            Ok(expiration) => !expiration.is_expired(now),
            Err(CacheError::NotFound(_)) => false,
            Err(err) => {
                debug!(key = %key, error = %err, "Disk existence check failed");
                false
            }
        }
    }

    // == Write Path ==
    /// Stores raw bytes with the default TTL and memory flag.
    pub fn set(&self, key: &str, data: impl Into<Bytes>) {
        self.set_with(key, data, None, None);
    }

    /// Stores raw bytes. `None` picks up the current default.
    pub fn set_with(
        &self,
        key: &str,
        data: impl Into<Bytes>,
        ttl: Option<Duration>,
        use_memory: Option<bool>,
    ) {
        self.store(key, data.into(), ttl, use_memory, None);
    }

    /// Stores raw bytes on disk and `object` in memory, so the next memory
    /// hit for a typed read of `T` skips decoding.
    pub fn set_with_object<T: Any + Send + Sync>(
        &self,
        key: &str,
        data: impl Into<Bytes>,
        object: Arc<T>,
        ttl: Option<Duration>,
        use_memory: Option<bool>,
    ) {
        let data = data.into();
        let value = MemoryValue::object(object, data.clone());
        self.store(key, data, ttl, use_memory, Some(value));
    }

    pub(crate) fn store(
        &self,
        key: &str,
        payload: Bytes,
        ttl: Option<Duration>,
        use_memory: Option<bool>,
        memory_value: Option<MemoryValue>,
    ) {
        if let Err(err) = validate_key(key) {
            warn!(error = %err, "Rejected cache key on write");
            return;
        }

        let defaults = self.defaults();
        let ttl = ttl.unwrap_or(defaults.ttl);
        let expiration = Expiration::from_ttl(self.clock.now(), ttl);

        if use_memory.unwrap_or(defaults.use_memory) {
            let value = memory_value.unwrap_or_else(|| MemoryValue::Bytes(payload.clone()));
            self.memory.set(key, value);
        }

        self.queue.enqueue(DiskTask::Write {
            key: key.to_string(),
            expiration,
            payload,
        });
    }

    /// Stores the contents of the file at `path` under `key`.
    ///
    /// The copy runs on the write queue; a missing source is a swallowed
    /// failure. Any memory entry for `key` is dropped so reads see the copy.
    pub fn copy_file(&self, path: impl AsRef<Path>, key: &str, ttl: Option<Duration>) {
        if let Err(err) = validate_key(key) {
            warn!(error = %err, "Rejected cache key on copy");
            return;
        }

        let expiration = Expiration::from_ttl(self.clock.now(), ttl.unwrap_or(self.default_ttl()));
        self.memory.remove(key);
        self.queue.enqueue(DiskTask::CopyFile {
            key: key.to_string(),
            source: path.as_ref().to_path_buf(),
            expiration,
        });
    }

    // == Remove / Clear ==
    /// Removes `key` from memory now and from disk asynchronously.
    pub fn remove(&self, key: &str) {
        if validate_key(key).is_err() {
            return;
        }
        self.memory.remove(key);
        self.queue.enqueue(DiskTask::Remove {
            key: key.to_string(),
        });
    }

    pub fn remove_memory_only(&self, key: &str) {
        self.memory.remove(key);
    }

    /// Empties memory now and the disk directory asynchronously.
    pub fn clear(&self) {
        self.memory.clear();
        self.queue.enqueue(DiskTask::Clear);
        info!(cache_dir = ?self.disk.root(), "Cache cleared");
    }

    pub fn clear_memory_only(&self) {
        self.memory.clear();
    }

    // == Queue ==
    /// Waits until every disk task enqueued so far has run.
    pub async fn flush(&self) {
        self.queue.flush().await;
    }

    /// Blocking form of [`flush`](Self::flush); not for async context.
    pub fn flush_blocking(&self) {
        self.queue.flush_blocking();
    }

    // == Introspection ==
    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot()
    }

    pub fn cache_dir(&self) -> &Path {
        self.disk.root()
    }

    /// Path of the disk file for `key`, whether or not it exists.
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.disk.path_for(key)
    }
}

impl std::fmt::Debug for CacheEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheEngine")
            .field("cache_dir", &self.disk.root())
            .field("defaults", &self.defaults())
            .field("queue", &self.queue)
            .finish()
    }
}
