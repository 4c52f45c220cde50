//! Request DTOs for the cache server API
//!
//! Defines query strings and JSON bodies accepted by the handlers.

use chrono::Duration;
use serde::Deserialize;

/// Query for raw byte writes and reads (`/cache/:key`)
///
/// # Fields
/// - `ttl`: TTL in seconds; 0 never expires, omitted uses the default
/// - `memory`: whether to use the memory tier; omitted uses the default
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CacheQuery {
    #[serde(default)]
    pub ttl: Option<i64>,
    #[serde(default)]
    pub memory: Option<bool>,
}

impl CacheQuery {
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl.map(Duration::seconds)
    }
}

/// Request body for string writes (PUT /string/:key)
#[derive(Debug, Clone, Deserialize)]
pub struct SetStringRequest {
    /// The value to store
    pub value: String,
    /// Optional TTL in seconds
    #[serde(default)]
    pub ttl: Option<i64>,
    /// Optional memory tier flag
    #[serde(default)]
    pub memory: Option<bool>,
}

impl SetStringRequest {
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl.map(Duration::seconds)
    }
}

/// Query for existence checks (GET /has/:key)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HasQuery {
    #[serde(default)]
    pub memory_only: bool,
}

/// Query for key derivation (GET /key)
#[derive(Debug, Clone, Deserialize)]
pub struct KeyQuery {
    /// Namespace prefix
    #[serde(default)]
    pub prefix: String,
    /// URL or arbitrary string to hash
    pub id: String,
}

impl KeyQuery {
    /// Validates the query
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.id.is_empty() {
            return Some("Identifier cannot be empty".to_string());
        }
        None
    }
}
