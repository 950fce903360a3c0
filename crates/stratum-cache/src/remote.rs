//! Tier-2 / edge store protocol
//!
//! The shared backing store is a narrow key-value protocol injected into
//! the facade at construction time. Every operation may fail; the facade
//! treats any failure as temporary unavailability and degrades to tier-1
//! behavior instead of surfacing the error.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::{CacheError, Result};

/// A payload as stored in a lower tier: opaque bytes plus the decode flag
/// and fingerprint carried alongside.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemotePayload {
    pub payload: Vec<u8>,
    pub compressed: bool,
    pub fingerprint: String,
}

/// Narrow protocol over the shared backing store. Implementations own
/// their timeout/retry policy; a call that cannot complete in bounded time
/// must return an error rather than hang.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Store a payload with an expiry.
    async fn set(&self, key: &str, value: RemotePayload, ttl: Option<Duration>) -> Result<()>;

    /// Retrieve a payload. `Ok(None)` is a definitive absence; `Err` is
    /// unavailability.
    async fn get(&self, key: &str) -> Result<Option<RemotePayload>>;

    /// Remove a key. Returns whether it was present.
    async fn delete(&self, key: &str) -> Result<bool>;

    /// Drop everything.
    async fn clear(&self) -> Result<()>;
}

struct RemoteEntry {
    value: RemotePayload,
    expires_at: Option<SystemTime>,
}

impl RemoteEntry {
    fn is_expired(&self) -> bool {
        self.expires_at
            .map(|at| SystemTime::now() > at)
            .unwrap_or(false)
    }
}

/// In-process [`RemoteStore`] with TTL support and a failure toggle.
///
/// Serves as the default tier-2 in single-process deployments and as the
/// outage simulator in tests.
pub struct MemoryRemoteStore {
    data: RwLock<HashMap<String, RemoteEntry>>,
    unavailable: AtomicBool,
}

impl MemoryRemoteStore {
    pub fn new() -> Self {
        Self {
            data: RwLock::new(HashMap::new()),
            unavailable: AtomicBool::new(false),
        }
    }

    /// Simulate an outage: every subsequent call fails until restored.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(CacheError::Remote {
                message: "store unavailable".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for MemoryRemoteStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemoteStore for MemoryRemoteStore {
    async fn set(&self, key: &str, value: RemotePayload, ttl: Option<Duration>) -> Result<()> {
        self.check_available()?;
        let expires_at = ttl.map(|t| SystemTime::now() + t);
        let mut data = self.data.write().await;
        data.insert(key.to_string(), RemoteEntry { value, expires_at });
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<RemotePayload>> {
        self.check_available()?;
        {
            let data = self.data.read().await;
            match data.get(key) {
                Some(entry) if !entry.is_expired() => return Ok(Some(entry.value.clone())),
                Some(_) => {}
                None => return Ok(None),
            }
        }
        // Expired: drop lazily, report absent
        let mut data = self.data.write().await;
        if data.get(key).map(|e| e.is_expired()).unwrap_or(false) {
            data.remove(key);
        }
        Ok(None)
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        self.check_available()?;
        let mut data = self.data.write().await;
        Ok(data.remove(key).is_some())
    }

    async fn clear(&self) -> Result<()> {
        self.check_available()?;
        let mut data = self.data.write().await;
        data.clear();
        Ok(())
    }
}
