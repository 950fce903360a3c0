//! Cache key normalization
//!
//! Turns caller-supplied strings or structured values into stable cache
//! keys. Strings are used verbatim. Structured values are serialized with
//! object keys sorted at every nesting level and hashed with SHA-256, so
//! deeply-equal values produce the identical key regardless of field
//! insertion order.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::{CacheError, Result};

/// Normalize a string key. Identity, kept for surface symmetry with
/// [`normalize_value`].
pub fn normalize_str(key: &str) -> String {
    key.to_string()
}

/// Derive a deterministic key from a structured value.
///
/// The value is converted through `serde_json::Value`, whose object map is
/// ordered by key, so the canonical serialization is insensitive to field
/// order. The SHA-256 digest of that serialization is returned hex-encoded.
pub fn normalize_value<T: Serialize>(value: &T) -> Result<String> {
    let canonical = canonical_json(value)?;

    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}

/// Derive the cache key for a wrapped function call from the function's
/// identity and its arguments.
pub fn fn_call_key<A: Serialize>(fn_name: &str, args: &A) -> Result<String> {
    let canonical = canonical_json(args)?;

    let mut hasher = Sha256::new();
    hasher.update(fn_name.as_bytes());
    hasher.update(b"|");
    hasher.update(canonical.as_bytes());
    Ok(format!("fn_{}_{:x}", fn_name, hasher.finalize()))
}

fn canonical_json<T: Serialize>(value: &T) -> Result<String> {
    let json = serde_json::to_value(value).map_err(|e| CacheError::Encode {
        message: e.to_string(),
    })?;
    serde_json::to_string(&json).map_err(|e| CacheError::Encode {
        message: e.to_string(),
    })
}
