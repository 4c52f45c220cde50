//! Memory Store Module
//!
//! The in-process tier. Stores are reached through the [`MemoryStore`]
//! trait so the eviction mechanism behind it can be swapped; the engine
//! treats an evicted key exactly like one that was never set.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use moka::sync::Cache;
use parking_lot::RwLock;

// == Memory Value ==
/// What the memory tier holds for a key.
#[derive(Clone)]
pub enum MemoryValue {
    /// Raw payload bytes
    Bytes(Bytes),
    /// An already-decoded value supplied by a typed accessor, kept next to
    /// the payload it was encoded to so raw reads still hit memory
    Object {
        value: Arc<dyn Any + Send + Sync>,
        bytes: Bytes,
    },
}

impl MemoryValue {
    pub fn object<T: Any + Send + Sync>(value: Arc<T>, bytes: Bytes) -> Self {
        MemoryValue::Object { value, bytes }
    }

    /// Approximate size of the value in bytes.
    pub fn weight(&self) -> u32 {
        u32::try_from(self.as_bytes().len()).unwrap_or(u32::MAX)
    }

    /// The payload, whichever form the value was stored in.
    pub fn as_bytes(&self) -> &Bytes {
        match self {
            MemoryValue::Bytes(bytes) | MemoryValue::Object { bytes, .. } => bytes,
        }
    }

    /// Returns the decoded value if it holds a `T`.
    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        match self {
            MemoryValue::Object { value, .. } => Arc::clone(value).downcast::<T>().ok(),
            MemoryValue::Bytes(_) => None,
        }
    }
}

impl fmt::Debug for MemoryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoryValue::Bytes(bytes) => f.debug_tuple("Bytes").field(&bytes.len()).finish(),
            MemoryValue::Object { bytes, .. } => {
                f.debug_struct("Object").field("len", &bytes.len()).finish()
            }
        }
    }
}

// == Memory Store Trait ==
/// Capability interface for the memory tier.
///
/// Implementations must be safe to call from any thread and may drop
/// entries at any time.
pub trait MemoryStore: Send + Sync {
    fn get(&self, key: &str) -> Option<MemoryValue>;
    fn set(&self, key: &str, value: MemoryValue);
    fn remove(&self, key: &str);
    fn clear(&self);
}

// == Moka Memory Store ==
/// Size-bounded store; moka decides what to evict.
#[derive(Clone)]
pub struct MokaMemoryStore {
    cache: Cache<String, MemoryValue>,
}

impl MokaMemoryStore {
    /// Creates a store holding roughly `capacity_bytes` of values.
    pub fn new(capacity_bytes: u64) -> Self {
        Self {
            cache: Cache::builder()
                .max_capacity(capacity_bytes)
                .weigher(|key: &String, value: &MemoryValue| {
                    value
                        .weight()
                        .saturating_add(u32::try_from(key.len()).unwrap_or(u32::MAX))
                })
                .build(),
        }
    }

    /// Approximate number of live entries.
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}

impl MemoryStore for MokaMemoryStore {
    fn get(&self, key: &str) -> Option<MemoryValue> {
        self.cache.get(key)
    }

    fn set(&self, key: &str, value: MemoryValue) {
        self.cache.insert(key.to_string(), value);
    }

    fn remove(&self, key: &str) {
        self.cache.invalidate(key);
    }

    fn clear(&self) {
        self.cache.invalidate_all();
    }
}

// == Map Memory Store ==
/// Unbounded store; entries leave only on explicit removal.
#[derive(Default)]
pub struct MapMemoryStore {
    entries: RwLock<HashMap<String, MemoryValue>>,
}

impl MapMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl MemoryStore for MapMemoryStore {
    fn get(&self, key: &str) -> Option<MemoryValue> {
        self.entries.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: MemoryValue) {
        self.entries.write().insert(key.to_string(), value);
    }

    fn remove(&self, key: &str) {
        self.entries.write().remove(key);
    }

    fn clear(&self) {
        self.entries.write().clear();
    }
}
