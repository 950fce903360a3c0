//! # Stratum Cache
//!
//! Multi-tier caching for Stratum services: a bounded in-process tier, a
//! shared best-effort remote tier, and an optional edge tier, fronted by a
//! single facade.
//!
//! ## Features
//!
//! - **Tiered lookups**: tier-1 first, remote fallback with promotion,
//!   opportunistic edge reads
//! - **Bounded tier-1**: LRU eviction by entry count, total bytes, and TTL
//! - **Tag invalidation**: bulk-delete every entry under a tag
//! - **Transparent compression**: large payloads gzipped automatically
//! - **Stale fallback**: opted-in entries outlive a remote outage
//! - **Statistics**: per-instance hit/miss/eviction accounting

pub mod cache;
pub mod codec;
pub mod error;
pub mod key;
pub mod local;
pub mod metrics;
pub mod remote;
pub mod tags;

pub use cache::{
    Cache, CacheBuilder, CacheConfig, CacheOptions, CachedFn, CachedValue, WarmUpTask,
    DEFAULT_SWEEP_INTERVAL,
};
pub use codec::{Codec, EncodedValue, DEFAULT_COMPRESSION_THRESHOLD};
pub use error::{BoxError, CacheError};
pub use metrics::{CacheMetrics, CacheStats};
pub use remote::{MemoryRemoteStore, RemotePayload, RemoteStore};

/// Re-export commonly used types
pub type Result<T> = std::result::Result<T, CacheError>;
