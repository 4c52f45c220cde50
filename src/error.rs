//! Error types for the cache
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache layers.
///
/// Only the internal layers (disk store, codecs, write queue) produce these.
/// The engine's read API folds them into "absent".
#[derive(Error, Debug)]
pub enum CacheError {
    /// Key not present in the addressed tier
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Key was present on disk but its expiration has passed
    #[error("Key expired: {0}")]
    Expired(String),

    /// Disk entry too short to hold the expiration header
    #[error("Corrupt entry for key {key}: {len} bytes")]
    Corrupt { key: String, len: u64 },

    /// Filesystem failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Payload bytes could not be turned into the requested type
    #[error("Decode failed: {0}")]
    Decode(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CacheError {
    /// True for the read-path signals that mean "absent" rather than failure.
    pub fn is_miss(&self) -> bool {
        matches!(self, CacheError::NotFound(_) | CacheError::Expired(_))
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        CacheError::Decode(err.to_string())
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::NotFound(_) | CacheError::Expired(_) => StatusCode::NOT_FOUND,
            CacheError::InvalidRequest(_) | CacheError::Decode(_) => StatusCode::BAD_REQUEST,
            CacheError::Corrupt { .. } | CacheError::Io(_) | CacheError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache.
pub type Result<T> = std::result::Result<T, CacheError>;
