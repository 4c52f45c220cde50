//! TierCache - A two-tier key-value cache
//!
//! An in-process memory tier over a persistent disk tier, with per-entry TTL
//! expiration and a single-writer queue for disk mutations.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod tasks;

pub use api::AppState;
pub use cache::{current_cache, try_current_cache, CacheEngine};
pub use config::Config;
pub use error::{CacheError, Result};
