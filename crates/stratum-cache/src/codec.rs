//! Payload encoding: serialization, compression, fingerprinting
//!
//! Values are serialized to JSON bytes. Payloads above a size threshold
//! (default 1 KiB) are gzip-compressed unless compression is explicitly
//! forced on or off. The fingerprint is the SHA-256 of the uncompressed
//! bytes, so callers can detect value changes across re-encodes.

use std::io::{Read, Write};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::{CacheError, Result};

/// Default compression threshold in bytes (1 KiB)
pub const DEFAULT_COMPRESSION_THRESHOLD: usize = 1024;

/// An encoded cache payload ready for storage in any tier.
#[derive(Debug, Clone)]
pub struct EncodedValue {
    /// Serialized bytes, compressed when `compressed` is set
    pub payload: Vec<u8>,
    /// Whether `payload` is gzip-compressed
    pub compressed: bool,
    /// Stored length of `payload` (post-compression)
    pub size_bytes: usize,
    /// SHA-256 hex of the uncompressed serialization
    pub fingerprint: String,
}

/// Value encoder/decoder with a configurable compression threshold.
#[derive(Debug, Clone)]
pub struct Codec {
    threshold: usize,
}

impl Codec {
    pub fn new(threshold: usize) -> Self {
        Self { threshold }
    }

    /// Serialize a value, compressing when forced or when the serialized
    /// size exceeds the threshold.
    pub fn encode<T: Serialize>(&self, value: &T, force: Option<bool>) -> Result<EncodedValue> {
        let raw = serde_json::to_vec(value).map_err(|e| CacheError::Encode {
            message: e.to_string(),
        })?;

        let mut hasher = Sha256::new();
        hasher.update(&raw);
        let fingerprint = format!("{:x}", hasher.finalize());

        let compress = force.unwrap_or(raw.len() > self.threshold);
        let payload = if compress {
            let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(&raw)?;
            encoder.finish()?
        } else {
            raw
        };

        let size_bytes = payload.len();
        Ok(EncodedValue {
            payload,
            compressed: compress,
            size_bytes,
            fingerprint,
        })
    }

    /// Reverse [`encode`](Self::encode). A corrupt payload yields
    /// [`CacheError::Decode`]; the facade absorbs that as a per-tier miss.
    pub fn decode<T: DeserializeOwned>(&self, payload: &[u8], compressed: bool) -> Result<T> {
        let raw = if compressed {
            let mut decoder = GzDecoder::new(payload);
            let mut buf = Vec::new();
            decoder
                .read_to_end(&mut buf)
                .map_err(|e| CacheError::Decode {
                    message: e.to_string(),
                })?;
            buf
        } else {
            payload.to_vec()
        };

        serde_json::from_slice(&raw).map_err(|e| CacheError::Decode {
            message: e.to_string(),
        })
    }
}

impl Default for Codec {
    fn default() -> Self {
        Self::new(DEFAULT_COMPRESSION_THRESHOLD)
    }
}
