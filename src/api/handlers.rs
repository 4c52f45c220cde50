//! API Handlers
//!
//! HTTP request handlers exposing the cache engine.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    Json,
};

use crate::cache::{key_for_string, validate_key, CacheEngine};
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::models::{
    CacheQuery, ClearResponse, DeleteResponse, HasQuery, HasResponse, HealthResponse, KeyQuery,
    KeyResponse, SetResponse, SetStringRequest, StatsResponse, StringResponse,
};

/// Application state shared across all handlers.
///
/// The engine synchronizes internally, so no outer lock is needed.
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<CacheEngine>,
}

impl AppState {
    /// Creates a new AppState around an engine.
    pub fn new(cache: CacheEngine) -> Self {
        Self {
            cache: Arc::new(cache),
        }
    }

    /// Creates a new AppState from configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(CacheEngine::open(config)?))
    }
}

/// Handler for PUT /cache/:key
///
/// Stores the raw request body. Disk persistence is queued.
pub async fn set_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(query): Query<CacheQuery>,
    body: Bytes,
) -> Result<Json<SetResponse>> {
    validate_key(&key)?;
    state.cache.set_with(&key, body, query.ttl(), query.memory);
    Ok(Json(SetResponse::new(key)))
}

/// Handler for GET /cache/:key
///
/// Returns the raw payload as `application/octet-stream`.
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(query): Query<CacheQuery>,
) -> Result<Bytes> {
    let use_memory = query
        .memory
        .unwrap_or_else(|| state.cache.default_use_memory());

    state
        .cache
        .get_with(&key, use_memory)
        .ok_or(CacheError::NotFound(key))
}

/// Handler for DELETE /cache/:key
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<DeleteResponse>> {
    validate_key(&key)?;
    state.cache.remove(&key);
    Ok(Json(DeleteResponse::new(key)))
}

/// Handler for DELETE /cache
pub async fn clear_handler(State(state): State<AppState>) -> Json<ClearResponse> {
    state.cache.clear();
    Json(ClearResponse::new("Cache"))
}

/// Handler for DELETE /memory
pub async fn clear_memory_handler(State(state): State<AppState>) -> Json<ClearResponse> {
    state.cache.clear_memory_only();
    Json(ClearResponse::new("Memory tier"))
}

/// Handler for GET /has/:key
pub async fn has_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(query): Query<HasQuery>,
) -> Json<HasResponse> {
    let present = state.cache.has(&key, query.memory_only);
    Json(HasResponse { key, present })
}

/// Handler for PUT /string/:key
pub async fn set_string_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(req): Json<SetStringRequest>,
) -> Result<Json<SetResponse>> {
    validate_key(&key)?;
    state
        .cache
        .set_string_with(&key, &req.value, req.ttl(), req.memory);
    Ok(Json(SetResponse::new(key)))
}

/// Handler for GET /string/:key
pub async fn get_string_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<StringResponse>> {
    match state.cache.get_string(&key) {
        Some(value) => Ok(Json(StringResponse::new(key, value))),
        None => Err(CacheError::NotFound(key)),
    }
}

/// Handler for GET /key
///
/// Derives the cache key for a prefix and identifier.
pub async fn key_handler(Query(query): Query<KeyQuery>) -> Result<Json<KeyResponse>> {
    if let Some(error_msg) = query.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }
    Ok(Json(KeyResponse {
        key: key_for_string(&query.prefix, &query.id),
    }))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse::from(state.cache.stats()))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::{tempdir, TempDir};

    fn state() -> (TempDir, AppState) {
        let dir = tempdir().unwrap();
        let state = AppState::new(CacheEngine::builder(dir.path()).build().unwrap());
        (dir, state)
    }

    #[tokio::test]
    async fn test_set_and_get_handler() {
        let (_dir, state) = state();

        let result = set_handler(
            State(state.clone()),
            Path("test_key".to_string()),
            Query(CacheQuery::default()),
            Bytes::from_static(b"test_value"),
        )
        .await;
        assert!(result.is_ok());

        let body = get_handler(
            State(state.clone()),
            Path("test_key".to_string()),
            Query(CacheQuery::default()),
        )
        .await
        .unwrap();
        assert_eq!(body.as_ref(), b"test_value");
    }

    #[tokio::test]
    async fn test_get_nonexistent_key() {
        let (_dir, state) = state();

        let result = get_handler(
            State(state),
            Path("nonexistent".to_string()),
            Query(CacheQuery::default()),
        )
        .await;
        assert!(matches!(result, Err(CacheError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_handler() {
        let (_dir, state) = state();
        state.cache.set("to_delete", &b"value"[..]);

        let result = delete_handler(State(state.clone()), Path("to_delete".to_string())).await;
        assert!(result.is_ok());

        let Json(has) = has_handler(
            State(state),
            Path("to_delete".to_string()),
            Query(HasQuery { memory_only: true }),
        )
        .await;
        assert!(!has.present);
    }

    #[tokio::test]
    async fn test_string_handlers() {
        let (_dir, state) = state();

        let req = SetStringRequest {
            value: "hello".to_string(),
            ttl: Some(60),
            memory: None,
        };
        set_string_handler(State(state.clone()), Path("greeting".to_string()), Json(req))
            .await
            .unwrap();

        let Json(resp) = get_string_handler(State(state), Path("greeting".to_string()))
            .await
            .unwrap();
        assert_eq!(resp.value, "hello");
    }

    #[tokio::test]
    async fn test_set_invalid_key() {
        let (_dir, state) = state();

        let result = set_handler(
            State(state),
            Path("..".to_string()),
            Query(CacheQuery::default()),
            Bytes::from_static(b"value"),
        )
        .await;
        assert!(matches!(result, Err(CacheError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_key_handler() {
        let Json(resp) = key_handler(Query(KeyQuery {
            prefix: "img".to_string(),
            id: "https://example.com/a.png".to_string(),
        }))
        .await
        .unwrap();
        assert_eq!(resp.key, key_for_string("img", "https://example.com/a.png"));
    }

    #[tokio::test]
    async fn test_stats_handler() {
        let (_dir, state) = state();

        let response = stats_handler(State(state)).await;
        assert_eq!(response.memory_hits, 0);
        assert_eq!(response.misses, 0);
    }

    #[tokio::test]
    async fn test_health_handler() {
        let response = health_handler().await;
        assert_eq!(response.status, "healthy");
    }
}
