//! Process-wide default cache instance.

use once_cell::sync::OnceCell;
use tracing::error;

use crate::cache::CacheEngine;
use crate::config::Config;
use crate::error::Result;

static CURRENT: OnceCell<CacheEngine> = OnceCell::new();

fn build_current() -> Result<CacheEngine> {
    let config = Config::from_env();
    CacheEngine::builder(&config.cache_dir)
        .default_ttl(chrono::Duration::seconds(config.default_ttl))
        .use_memory(config.use_memory)
        .memory_capacity(config.memory_capacity)
        .dedicated_writer(true)
        .build()
}

/// Returns the shared engine, building it from the environment on first use.
///
/// A failed build is returned to the caller and retried on the next call.
pub fn try_current_cache() -> Result<&'static CacheEngine> {
    CURRENT.get_or_try_init(build_current)
}

/// Returns the shared engine, building it from the environment on first use.
///
/// Tests and embedders that need isolation should build their own
/// [`CacheEngine`] instead.
///
/// # Panics
/// Panics if the engine's disk writer runtime cannot be started. Use
/// [`try_current_cache`] to handle that case.
pub fn current_cache() -> &'static CacheEngine {
    match try_current_cache() {
        Ok(engine) => engine,
        Err(err) => {
            error!(error = %err, "Failed to start the shared cache");
            panic!("tiercache: failed to start the shared cache: {}", err)
        }
    }
}
