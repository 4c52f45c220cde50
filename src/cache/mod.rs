//! Cache Module
//!
//! Two-tier caching: an in-process memory tier over a TTL-stamped disk tier,
//! with disk mutations serialized through the write queue.

mod disk;
mod engine;
mod entry;
mod global;
mod key;
mod memory;
mod stats;
pub mod typed;


// Re-export public types
pub use disk::DiskStore;
pub use engine::{CacheEngine, CacheEngineBuilder, Defaults};
pub use entry::{Clock, Expiration, ManualClock, SystemClock, HEADER_LEN};
pub use global::{current_cache, try_current_cache};
pub use key::{key_for_string, key_for_url, validate_key};
pub use memory::{MapMemoryStore, MemoryStore, MemoryValue, MokaMemoryStore};
pub use stats::{CacheStats, StatsRecorder};

// == Public Constants ==
/// Maximum allowed key length in bytes (one path component)
pub const MAX_KEY_LENGTH: usize = 255;
