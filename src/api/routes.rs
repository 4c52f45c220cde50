//! API Routes
//!
//! Configures the Axum router with all cache server endpoints.

use axum::{
    routing::{delete, get, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    clear_handler, clear_memory_handler, delete_handler, get_handler, get_string_handler,
    has_handler, health_handler, key_handler, set_handler, set_string_handler, stats_handler,
    AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `PUT /cache/:key` - Store the raw body (`?ttl=&memory=`)
/// - `GET /cache/:key` - Fetch raw bytes (`?memory=`)
/// - `DELETE /cache/:key` - Remove a key from both tiers
/// - `DELETE /cache` - Clear both tiers
/// - `DELETE /memory` - Clear the memory tier only
/// - `GET /has/:key` - Existence check (`?memory_only=`)
/// - `PUT /string/:key`, `GET /string/:key` - UTF-8 values as JSON
/// - `GET /key` - Derive a key (`?prefix=&id=`)
/// - `GET /stats` - Cache statistics
/// - `GET /health` - Health check endpoint
pub fn create_router(state: AppState) -> Router {
    // Configure CORS middleware
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/cache", delete(clear_handler))
        .route(
            "/cache/:key",
            put(set_handler).get(get_handler).delete(delete_handler),
        )
        .route("/memory", delete(clear_memory_handler))
        .route("/has/:key", get(has_handler))
        .route("/string/:key", put(set_string_handler).get(get_string_handler))
        .route("/key", get(key_handler))
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
