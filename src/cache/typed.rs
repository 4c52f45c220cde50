//! Typed Accessors
//!
//! Convenience wrappers over the raw byte API for strings, structured values,
//! serde objects and images. Each family pairs a pure codec with engine
//! methods; decode failures read as absent.

use std::sync::Arc;

use bytes::Bytes;
use chrono::Duration;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::cache::engine::CacheEngine;
use crate::cache::memory::MemoryValue;
use crate::error::{CacheError, Result};

// == Codecs ==
pub fn encode_string(value: &str) -> Bytes {
    Bytes::copy_from_slice(value.as_bytes())
}

pub fn decode_string(bytes: &[u8]) -> Result<String> {
    String::from_utf8(bytes.to_vec()).map_err(|err| CacheError::Decode(err.to_string()))
}

/// Structured values are stored as JSON.
pub fn encode_plist(value: &Value) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(value)?)
}

pub fn decode_plist(bytes: &[u8]) -> Result<Value> {
    Ok(serde_json::from_slice(bytes)?)
}

pub fn encode_object<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(value)?)
}

pub fn decode_object<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Images are stored as PNG.
#[cfg(feature = "image")]
pub fn encode_image(image: &image::DynamicImage) -> Result<Vec<u8>> {
    let mut buf = std::io::Cursor::new(Vec::new());
    image
        .write_to(&mut buf, image::ImageFormat::Png)
        .map_err(|err| CacheError::Internal(format!("PNG encode failed: {}", err)))?;
    Ok(buf.into_inner())
}

#[cfg(feature = "image")]
pub fn decode_image(bytes: &[u8]) -> Result<image::DynamicImage> {
    image::load_from_memory(bytes).map_err(|err| CacheError::Decode(err.to_string()))
}

fn into_owned<T: Clone>(value: Arc<T>) -> T {
    Arc::try_unwrap(value).unwrap_or_else(|shared| (*shared).clone())
}

impl CacheEngine {
    // == String ==
    pub fn get_string(&self, key: &str) -> Option<String> {
        self.get_string_with(key, self.default_use_memory())
    }

    pub fn get_string_with(&self, key: &str, use_memory: bool) -> Option<String> {
        self.get_decoded(key, use_memory, false, decode_string)
            .map(into_owned)
    }

    pub fn set_string(&self, key: &str, value: &str) {
        self.set_string_with(key, value, None, None);
    }

    pub fn set_string_with(
        &self,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
        use_memory: Option<bool>,
    ) {
        self.store(key, encode_string(value), ttl, use_memory, None);
    }

    // == Plist ==
    /// Reads a structured value; the decoded form is kept in memory.
    pub fn get_plist(&self, key: &str) -> Option<Arc<Value>> {
        self.get_plist_with(key, self.default_use_memory())
    }

    pub fn get_plist_with(&self, key: &str, use_memory: bool) -> Option<Arc<Value>> {
        self.get_decoded(key, use_memory, true, decode_plist)
    }

    pub fn set_plist(&self, key: &str, value: Value) {
        self.set_plist_with(key, value, None, None);
    }

    pub fn set_plist_with(
        &self,
        key: &str,
        value: Value,
        ttl: Option<Duration>,
        use_memory: Option<bool>,
    ) {
        match encode_plist(&value) {
            Ok(payload) => {
                let payload = Bytes::from(payload);
                let memory = MemoryValue::object(Arc::new(value), payload.clone());
                self.store(key, payload, ttl, use_memory, Some(memory));
            }
            Err(err) => warn!(key = %key, error = %err, "Structured value not cached"),
        }
    }

    // == Object ==
    /// Reads a serde object. A memory hit on a value stored by
    /// [`set_object`](Self::set_object) returns the same `Arc` without decoding.
    pub fn get_object<T>(&self, key: &str) -> Option<Arc<T>>
    where
        T: DeserializeOwned + Send + Sync + 'static,
    {
        self.get_object_with(key, self.default_use_memory())
    }

    pub fn get_object_with<T>(&self, key: &str, use_memory: bool) -> Option<Arc<T>>
    where
        T: DeserializeOwned + Send + Sync + 'static,
    {
        self.get_decoded(key, use_memory, true, decode_object::<T>)
    }

    pub fn set_object<T>(&self, key: &str, object: Arc<T>)
    where
        T: Serialize + Send + Sync + 'static,
    {
        self.set_object_with(key, object, None, None);
    }

    pub fn set_object_with<T>(
        &self,
        key: &str,
        object: Arc<T>,
        ttl: Option<Duration>,
        use_memory: Option<bool>,
    ) where
        T: Serialize + Send + Sync + 'static,
    {
        match encode_object(object.as_ref()) {
            Ok(payload) => self.set_with_object(key, payload, object, ttl, use_memory),
            Err(err) => warn!(key = %key, error = %err, "Object not cached"),
        }
    }

    // == Image ==
    #[cfg(feature = "image")]
    pub fn get_image(&self, key: &str) -> Option<Arc<image::DynamicImage>> {
        self.get_image_with(key, self.default_use_memory())
    }

    #[cfg(feature = "image")]
    pub fn get_image_with(&self, key: &str, use_memory: bool) -> Option<Arc<image::DynamicImage>> {
        self.get_decoded(key, use_memory, true, decode_image)
    }

    #[cfg(feature = "image")]
    pub fn set_image(&self, key: &str, image: Arc<image::DynamicImage>) {
        self.set_image_with(key, image, None, None);
    }

    #[cfg(feature = "image")]
    pub fn set_image_with(
        &self,
        key: &str,
        image: Arc<image::DynamicImage>,
        ttl: Option<Duration>,
        use_memory: Option<bool>,
    ) {
        match encode_image(&image) {
            Ok(payload) => self.set_with_object(key, payload, image, ttl, use_memory),
            Err(err) => warn!(key = %key, error = %err, "Image not cached"),
        }
    }
}
