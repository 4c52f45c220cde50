//! Cache Key Module
//!
//! Derives stable, filesystem-safe keys from a namespace prefix plus a URL or
//! string identifier.

use sha2::{Digest, Sha256};
use url::Url;

use crate::cache::disk::TMP_PREFIX;
use crate::cache::MAX_KEY_LENGTH;
use crate::error::{CacheError, Result};

/// Hex length of a SHA-256 digest
const DIGEST_HEX_LEN: usize = 64;

/// Longest prefix kept verbatim in a derived key
const MAX_PREFIX_LEN: usize = MAX_KEY_LENGTH - 1 - DIGEST_HEX_LEN;

// == Key For String ==
/// Derives a key from a prefix and an arbitrary string identifier.
///
/// The result is `"{prefix}-{sha256 hex}"`, or the bare hex digest when the
/// prefix is empty. Prefix characters outside `[A-Za-z0-9._-]` become `_`.
/// A prefix longer than fits in [`MAX_KEY_LENGTH`] is truncated and the
/// full prefix is folded into the digest, so keys stay distinct per prefix.
pub fn key_for_string(prefix: &str, identifier: &str) -> String {
    let mut prefix = sanitize_prefix(prefix);
    let mut hasher = Sha256::new();
    if prefix.len() > MAX_PREFIX_LEN {
        hasher.update(prefix.as_bytes());
        hasher.update([0u8]);
        // Sanitised prefixes are ASCII, so any byte index is a char boundary
        prefix.truncate(MAX_PREFIX_LEN);
    }
    hasher.update(identifier.as_bytes());
    let digest = hex::encode(hasher.finalize());

    if prefix.is_empty() {
        digest
    } else {
        format!("{}-{}", prefix, digest)
    }
}

// == Key For Url ==
/// Derives a key from a prefix and a URL, hashing its serialized form.
pub fn key_for_url(prefix: &str, url: &Url) -> String {
    key_for_string(prefix, url.as_str())
}

// == Validate Key ==
/// Checks that a caller-supplied key can address a single file.
pub fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(CacheError::InvalidRequest("Key cannot be empty".to_string()));
    }
    if key.len() > MAX_KEY_LENGTH {
        return Err(CacheError::InvalidRequest(format!(
            "Key exceeds maximum length of {} bytes",
            MAX_KEY_LENGTH
        )));
    }
    if key == "."
        || key == ".."
        || key.contains(['/', '\\', '\0'])
        || key.starts_with(TMP_PREFIX)
    {
        return Err(CacheError::InvalidRequest(format!(
            "Key is not a valid file name: {}",
            key
        )));
    }
    Ok(())
}

fn sanitize_prefix(prefix: &str) -> String {
    prefix
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}
