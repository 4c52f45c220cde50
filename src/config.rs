//! Configuration Module
//!
//! Handles loading cache and server configuration from environment variables.

use std::env;
use std::path::PathBuf;

/// Default TTL in seconds (one day)
pub const DEFAULT_TTL_SECS: i64 = 86_400;

/// Default memory tier capacity in bytes (64 MiB)
pub const DEFAULT_MEMORY_CAPACITY: u64 = 64 * 1024 * 1024;

/// Cache and server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding one file per disk entry
    pub cache_dir: PathBuf,
    /// Default TTL in seconds for writes without explicit TTL (0 = never expires)
    pub default_ttl: i64,
    /// Whether calls without an explicit flag consult the memory tier
    pub use_memory: bool,
    /// Memory tier capacity in bytes, 0 selects the unbounded map
    pub memory_capacity: u64,
    /// HTTP server port
    pub server_port: u16,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `TIERCACHE_DIR` - Disk tier directory (default: `<temp>/TierCache`)
    /// - `TIERCACHE_DEFAULT_TTL` - Default TTL in seconds (default: 86400)
    /// - `TIERCACHE_USE_MEMORY` - Default memory tier flag (default: true)
    /// - `TIERCACHE_MEMORY_CAPACITY` - Memory tier bytes (default: 64 MiB)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds a Config from any variable source, falling back to defaults
    /// for missing or unparseable values.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            cache_dir: lookup("TIERCACHE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.cache_dir),
            default_ttl: parse_var(&lookup, "TIERCACHE_DEFAULT_TTL")
                .unwrap_or(defaults.default_ttl),
            use_memory: parse_var(&lookup, "TIERCACHE_USE_MEMORY").unwrap_or(defaults.use_memory),
            memory_capacity: parse_var(&lookup, "TIERCACHE_MEMORY_CAPACITY")
                .unwrap_or(defaults.memory_capacity),
            server_port: parse_var(&lookup, "SERVER_PORT").unwrap_or(defaults.server_port),
        }
    }

    /// Same defaults, rooted at another directory. Handy for tests.
    pub fn with_cache_dir(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            ..Self::default()
        }
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: impl Fn(&str) -> Option<String>,
    name: &str,
) -> Option<T> {
    lookup(name).and_then(|v| v.trim().parse().ok())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_dir: env::temp_dir().join("TierCache"),
            default_ttl: DEFAULT_TTL_SECS,
            use_memory: true,
            memory_capacity: DEFAULT_MEMORY_CAPACITY,
            server_port: 3000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.default_ttl, 86_400);
        assert!(config.use_memory);
        assert_eq!(config.memory_capacity, DEFAULT_MEMORY_CAPACITY);
        assert_eq!(config.server_port, 3000);
        assert!(config.cache_dir.ends_with("TierCache"));
    }

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| vars.get(name).cloned()
    }

    #[test]
    fn test_config_from_lookup_defaults() {
        let config = Config::from_lookup(lookup(&[]));
        assert_eq!(config.default_ttl, 86_400);
        assert!(config.use_memory);
        assert_eq!(config.server_port, 3000);
    }

    #[test]
    fn test_config_from_lookup_values() {
        let config = Config::from_lookup(lookup(&[
            ("TIERCACHE_DIR", "/var/cache/tier"),
            ("TIERCACHE_DEFAULT_TTL", " 60 "),
            ("TIERCACHE_USE_MEMORY", "false"),
            ("TIERCACHE_MEMORY_CAPACITY", "0"),
            ("SERVER_PORT", "8080"),
        ]));
        assert_eq!(config.cache_dir, PathBuf::from("/var/cache/tier"));
        assert_eq!(config.default_ttl, 60);
        assert!(!config.use_memory);
        assert_eq!(config.memory_capacity, 0);
        assert_eq!(config.server_port, 8080);
    }

    #[test]
    fn test_config_unparseable_values_fall_back() {
        let config = Config::from_lookup(lookup(&[
            ("TIERCACHE_DEFAULT_TTL", "a day"),
            ("SERVER_PORT", "99999"),
        ]));
        assert_eq!(config.default_ttl, DEFAULT_TTL_SECS);
        assert_eq!(config.server_port, 3000);
    }

    #[test]
    fn test_with_cache_dir() {
        let config = Config::with_cache_dir("/tmp/elsewhere");
        assert_eq!(config.cache_dir, PathBuf::from("/tmp/elsewhere"));
        assert_eq!(config.default_ttl, DEFAULT_TTL_SECS);
    }
}
