//! API Module
//!
//! HTTP handlers and routing over the cache engine.
//!
//! # Endpoints
//! - `PUT|GET|DELETE /cache/:key` - Raw byte entries
//! - `DELETE /cache`, `DELETE /memory` - Clear both tiers / memory only
//! - `GET /has/:key` - Existence check
//! - `PUT|GET /string/:key` - UTF-8 entries
//! - `GET /key` - Key derivation
//! - `GET /stats`, `GET /health`

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
