//! Cache facade orchestrating the tiers
//!
//! Callers talk only to [`Cache`]. A `get` checks the in-process tier
//! first, falls back to the shared remote tier (promoting hits back into
//! tier-1), then the optional edge tier. Remote failures never surface to
//! callers: writes are best-effort and reads degrade to a miss, or to a
//! stale tier-1 read where the entry opted in.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use futures::future::{join_all, BoxFuture};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::codec::{Codec, DEFAULT_COMPRESSION_THRESHOLD};
use crate::error::{BoxError, CacheError, Result};
use crate::key;
use crate::local::{LocalEntry, LocalLookup, LocalStore};
use crate::metrics::{CacheMetrics, CacheStats};
use crate::remote::{RemotePayload, RemoteStore};
use crate::tags::TagIndex;

/// Default sweep interval for the background expiry pass
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Cache-wide configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// TTL applied when a set carries none
    pub default_ttl: Option<Duration>,
    /// Tier-1 entry count bound
    pub max_entries: Option<usize>,
    /// Tier-1 total byte bound
    pub max_total_bytes: Option<u64>,
    /// Serialized size above which payloads are compressed
    pub compression_threshold: usize,
    /// Enable statistics collection
    pub enable_metrics: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: Some(Duration::from_secs(3600)), // 1 hour
            max_entries: None,
            max_total_bytes: None,
            compression_threshold: DEFAULT_COMPRESSION_THRESHOLD,
            enable_metrics: true,
        }
    }
}

/// Per-set options
#[derive(Debug, Clone, Default)]
pub struct CacheOptions {
    /// Entry lifetime; falls back to the config default when unset
    pub ttl: Option<Duration>,
    /// Force compression on or off; `None` means auto by threshold
    pub compress: Option<bool>,
    /// Tags to associate for bulk invalidation
    pub tags: Vec<String>,
    /// Serve this entry past expiry when the remote tier is unreachable
    pub allow_stale: bool,
}

impl CacheOptions {
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_compress(mut self, compress: bool) -> Self {
        self.compress = Some(compress);
        self
    }

    pub fn with_allow_stale(mut self, allow_stale: bool) -> Self {
        self.allow_stale = allow_stale;
        self
    }
}

/// A looked-up value with its out-of-band freshness flag
#[derive(Debug, Clone)]
pub struct CachedValue<T> {
    pub value: T,
    /// True when the value was served past its expiry because the remote
    /// tier was unreachable
    pub stale: bool,
}

/// Tier-1 map and tag index behind one lock, so their invariants are
/// maintained atomically between suspension points.
struct CacheState {
    local: LocalStore,
    tags: TagIndex,
}

/// Multi-tier cache facade
pub struct Cache {
    state: RwLock<CacheState>,
    remote: Option<Arc<dyn RemoteStore>>,
    edge: Option<Arc<dyn RemoteStore>>,
    codec: Codec,
    config: CacheConfig,
    metrics: CacheMetrics,
}

impl Cache {
    /// Create a tier-1-only cache with default configuration
    pub fn new() -> Self {
        Self::with_config(CacheConfig::default())
    }

    pub fn with_config(config: CacheConfig) -> Self {
        Self {
            state: RwLock::new(CacheState {
                local: LocalStore::new(config.max_entries, config.max_total_bytes),
                tags: TagIndex::new(),
            }),
            remote: None,
            edge: None,
            codec: Codec::new(config.compression_threshold),
            config,
            metrics: CacheMetrics::new(),
        }
    }

    pub fn builder() -> CacheBuilder {
        CacheBuilder::new()
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Current statistics snapshot
    pub fn stats(&self) -> CacheStats {
        self.metrics.snapshot()
    }

    /// Retrieve a value, fresh tiers only unless the entry opted into
    /// stale serving and the remote tier is unreachable.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        Ok(self.get_detailed(key).await?.map(|cached| cached.value))
    }

    /// Retrieve a value along with its freshness flag.
    pub async fn get_detailed<T: DeserializeOwned>(
        &self,
        key: &str,
    ) -> Result<Option<CachedValue<T>>> {
        // Tier-1
        let mut stale_candidate = false;
        {
            let mut state = self.state.write().await;
            match state.local.lookup(key) {
                LocalLookup::Hit {
                    payload,
                    compressed,
                    ..
                } => match self.codec.decode::<T>(&payload, compressed) {
                    Ok(value) => {
                        debug!(key, "tier-1 hit");
                        self.record_hit();
                        return Ok(Some(CachedValue {
                            value,
                            stale: false,
                        }));
                    }
                    Err(e) => {
                        warn!(key, error = %e, "dropping undecodable tier-1 entry");
                        Self::drop_entry(&mut state, key);
                        self.refresh_usage(&state);
                    }
                },
                LocalLookup::Expired { allow_stale } => {
                    if allow_stale {
                        // Keep the entry around until the remote tier answers
                        stale_candidate = true;
                    } else {
                        debug!(key, "tier-1 entry expired");
                        Self::drop_entry(&mut state, key);
                        self.record_evictions(1);
                        self.refresh_usage(&state);
                    }
                }
                LocalLookup::Absent => {}
            }
        }

        // Tier-2
        let mut remote_unreachable = false;
        if let Some(ref remote) = self.remote {
            match remote.get(key).await {
                Ok(Some(found)) => {
                    match self.codec.decode::<T>(&found.payload, found.compressed) {
                        Ok(value) => {
                            debug!(key, "tier-2 hit, promoting");
                            self.promote(key, &found).await;
                            self.record_hit();
                            return Ok(Some(CachedValue {
                                value,
                                stale: false,
                            }));
                        }
                        Err(e) => {
                            warn!(key, error = %e, "dropping undecodable tier-2 entry");
                            let _ = remote.delete(key).await;
                        }
                    }
                }
                Ok(None) => {
                    // Definitive absence: an expired stale candidate has
                    // nothing to fall back on
                    if stale_candidate {
                        let mut state = self.state.write().await;
                        Self::drop_entry(&mut state, key);
                        self.record_evictions(1);
                        self.refresh_usage(&state);
                        stale_candidate = false;
                    }
                }
                Err(e) => {
                    warn!(key, error = %e, "tier-2 unreachable, degrading");
                    remote_unreachable = true;
                }
            }
        }

        // Edge tier, strictly opportunistic
        if let Some(ref edge) = self.edge {
            match edge.get(key).await {
                Ok(Some(found)) => {
                    match self.codec.decode::<T>(&found.payload, found.compressed) {
                        Ok(value) => {
                            debug!(key, "edge hit, promoting");
                            self.promote(key, &found).await;
                            if let Some(ref remote) = self.remote {
                                if let Err(e) = remote
                                    .set(key, found.clone(), self.config.default_ttl)
                                    .await
                                {
                                    warn!(key, error = %e, "tier-2 backfill failed");
                                }
                            }
                            self.record_hit();
                            return Ok(Some(CachedValue {
                                value,
                                stale: false,
                            }));
                        }
                        Err(e) => {
                            warn!(key, error = %e, "dropping undecodable edge entry");
                            let _ = edge.delete(key).await;
                        }
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    debug!(key, error = %e, "edge tier unreachable");
                }
            }
        }

        // Stale fallback: the expired tier-1 copy outlives a remote outage
        if stale_candidate && remote_unreachable {
            let state = self.state.read().await;
            if let Some((payload, compressed)) = state.local.peek_stale(key) {
                if let Ok(value) = self.codec.decode::<T>(&payload, compressed) {
                    debug!(key, "serving stale tier-1 entry");
                    self.record_hit();
                    return Ok(Some(CachedValue { value, stale: true }));
                }
            }
        }

        // A stale candidate with no outage to excuse it is just expired
        if stale_candidate {
            let mut state = self.state.write().await;
            Self::drop_entry(&mut state, key);
            self.record_evictions(1);
            self.refresh_usage(&state);
        }

        debug!(key, "cache miss");
        self.record_miss();
        Ok(None)
    }

    /// Store a value in every tier and register its tags.
    ///
    /// Serialization failure is a hard error; remote write failures are
    /// logged and swallowed.
    pub async fn set<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        options: &CacheOptions,
    ) -> Result<()> {
        let encoded = self.codec.encode(value, options.compress)?;
        let ttl = options.ttl.or(self.config.default_ttl);
        let now = SystemTime::now();

        let remote_payload = RemotePayload {
            payload: encoded.payload.clone(),
            compressed: encoded.compressed,
            fingerprint: encoded.fingerprint.clone(),
        };

        let entry = LocalEntry {
            payload: encoded.payload,
            compressed: encoded.compressed,
            created_at: now,
            last_accessed_at: now,
            access_count: 0,
            size_bytes: encoded.size_bytes,
            tags: options.tags.iter().cloned().collect::<HashSet<_>>(),
            fingerprint: encoded.fingerprint,
            ttl,
            allow_stale: options.allow_stale,
        };

        {
            let mut state = self.state.write().await;
            self.insert_entry(&mut state, key, entry);
            self.refresh_usage(&state);
        }
        if self.config.enable_metrics {
            self.metrics.record_set();
        }

        if let Some(ref remote) = self.remote {
            if let Err(e) = remote.set(key, remote_payload.clone(), ttl).await {
                warn!(key, error = %e, "tier-2 write failed, tier-1 only");
            }
        }
        if let Some(ref edge) = self.edge {
            if let Err(e) = edge.set(key, remote_payload, ttl).await {
                debug!(key, error = %e, "edge write failed");
            }
        }

        Ok(())
    }

    /// Remove a key from every tier and the tag index. Returns whether
    /// anything was actually present.
    pub async fn delete(&self, key: &str) -> Result<bool> {
        let mut present = {
            let mut state = self.state.write().await;
            let removed = Self::drop_entry(&mut state, key);
            self.refresh_usage(&state);
            removed
        };

        if let Some(ref remote) = self.remote {
            match remote.delete(key).await {
                Ok(was_there) => present = present || was_there,
                Err(e) => warn!(key, error = %e, "tier-2 delete failed"),
            }
        }
        if let Some(ref edge) = self.edge {
            if let Err(e) = edge.delete(key).await {
                debug!(key, error = %e, "edge delete failed");
            }
        }

        if present && self.config.enable_metrics {
            self.metrics.record_delete();
        }
        Ok(present)
    }

    /// Delete every key registered under any of the given tags. Returns
    /// the number of distinct keys removed.
    pub async fn invalidate_tags(&self, tags: &[&str]) -> Result<usize> {
        let keys = {
            let state = self.state.read().await;
            state.tags.keys_for_any(tags)
        };

        let mut removed = 0;
        for key in &keys {
            if self.delete(key).await? {
                removed += 1;
            }
        }

        debug!(?tags, removed, "tag invalidation");
        Ok(removed)
    }

    /// Drop everything in every tier and the tag index, and start a fresh
    /// statistics scope (all counters reset, including hits and misses).
    pub async fn clear(&self) -> Result<()> {
        {
            let mut state = self.state.write().await;
            state.local.clear();
            state.tags.clear();
        }
        self.metrics.reset();

        if let Some(ref remote) = self.remote {
            if let Err(e) = remote.clear().await {
                warn!(error = %e, "tier-2 clear failed");
            }
        }
        if let Some(ref edge) = self.edge {
            if let Err(e) = edge.clear().await {
                debug!(error = %e, "edge clear failed");
            }
        }

        Ok(())
    }

    /// Return the cached value for `key`, or compute it with `factory`,
    /// store it, and return it.
    ///
    /// Concurrent callers missing on the same key each run their own
    /// factory; results are last-write-wins. A failed factory propagates
    /// its error unchanged and stores nothing.
    pub async fn get_or_set<T, F, Fut>(
        &self,
        key: &str,
        factory: F,
        options: &CacheOptions,
    ) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = std::result::Result<T, BoxError>>,
    {
        if let Some(value) = self.get(key).await? {
            return Ok(value);
        }

        let value = factory().await.map_err(CacheError::Factory)?;
        self.set(key, &value, options).await?;
        Ok(value)
    }

    /// Wrap an async function so its results are cached under a key
    /// derived from the function's identity and its arguments.
    pub fn wrap<F>(
        self: &Arc<Self>,
        fn_name: impl Into<String>,
        func: F,
        options: CacheOptions,
    ) -> CachedFn<F> {
        CachedFn {
            cache: Arc::clone(self),
            fn_name: fn_name.into(),
            func,
            options,
        }
    }

    /// Run each warm-up task through [`get_or_set`](Self::get_or_set)
    /// concurrently. Individual failures are logged and do not abort the
    /// batch. Returns the number of tasks that succeeded.
    pub async fn warm_up(&self, tasks: Vec<WarmUpTask>) -> usize {
        let results = join_all(tasks.into_iter().map(|task| async move {
            let WarmUpTask {
                key,
                factory,
                options,
            } = task;
            match self
                .get_or_set::<serde_json::Value, _, _>(&key, factory, &options)
                .await
            {
                Ok(_) => true,
                Err(e) => {
                    warn!(key, error = %e, "warm-up task failed");
                    false
                }
            }
        }))
        .await;

        results.into_iter().filter(|ok| *ok).count()
    }

    /// Physically purge expired tier-1 entries and refresh the usage
    /// gauges. Returns the number of entries removed.
    pub async fn purge_expired(&self) -> usize {
        let mut state = self.state.write().await;
        let purged = state.local.purge_expired();
        for (key, entry) in &purged {
            state.tags.remove(key, &entry.tags);
        }
        self.record_evictions(purged.len() as u64);
        self.refresh_usage(&state);
        purged.len()
    }

    /// Spawn the periodic sweep (see [`purge_expired`](Self::purge_expired)).
    /// The returned handle can be aborted to stop sweeping.
    pub fn run_sweeper(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let cache = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await; // first tick fires immediately
            loop {
                ticker.tick().await;
                let purged = cache.purge_expired().await;
                if purged > 0 {
                    info!(purged, "sweep removed expired entries");
                }
            }
        })
    }

    /// Copy a lower-tier hit into tier-1, subject to its bounds. Promoted
    /// entries carry the default TTL and no tags.
    async fn promote(&self, key: &str, found: &RemotePayload) {
        let now = SystemTime::now();
        let entry = LocalEntry {
            payload: found.payload.clone(),
            compressed: found.compressed,
            created_at: now,
            last_accessed_at: now,
            access_count: 0,
            size_bytes: found.payload.len(),
            tags: HashSet::new(),
            fingerprint: found.fingerprint.clone(),
            ttl: self.config.default_ttl,
            allow_stale: false,
        };

        let mut state = self.state.write().await;
        self.insert_entry(&mut state, key, entry);
        self.refresh_usage(&state);
    }

    /// Insert into tier-1 keeping the tag index consistent: the replaced
    /// entry's tags are unregistered, and evictions are untagged and
    /// counted. The new entry's tags are registered before the insert, so
    /// a key evicted on arrival (too large to retain) is retracted along
    /// with the rest.
    fn insert_entry(&self, state: &mut CacheState, key: &str, entry: LocalEntry) {
        if let Some(old) = state.local.remove(key) {
            state.tags.remove(key, &old.tags);
        }

        let new_tags: Vec<String> = entry.tags.iter().cloned().collect();
        state.tags.add(key, new_tags);

        let evicted = state.local.insert(key.to_string(), entry);
        for (evicted_key, evicted_entry) in &evicted {
            debug!(key = %evicted_key, "evicted under tier-1 pressure");
            state.tags.remove(evicted_key, &evicted_entry.tags);
        }
        self.record_evictions(evicted.len() as u64);
    }

    /// Remove a key from tier-1 and every tag bucket it belonged to.
    fn drop_entry(state: &mut CacheState, key: &str) -> bool {
        match state.local.remove(key) {
            Some(entry) => {
                state.tags.remove(key, &entry.tags);
                true
            }
            None => false,
        }
    }

    fn refresh_usage(&self, state: &CacheState) {
        if self.config.enable_metrics {
            self.metrics
                .set_usage(state.local.len(), state.local.total_bytes());
        }
    }

    fn record_evictions(&self, count: u64) {
        if self.config.enable_metrics {
            self.metrics.record_evictions(count);
        }
    }

    fn record_hit(&self) {
        if self.config.enable_metrics {
            self.metrics.record_hit();
        }
    }

    fn record_miss(&self) {
        if self.config.enable_metrics {
            self.metrics.record_miss();
        }
    }
}

impl Default for Cache {
    fn default() -> Self {
        Self::new()
    }
}

/// A caching wrapper around an async function, produced by
/// [`Cache::wrap`]. Calls with equal arguments (field order ignored) share
/// one cache slot.
pub struct CachedFn<F> {
    cache: Arc<Cache>,
    fn_name: String,
    func: F,
    options: CacheOptions,
}

impl<F> CachedFn<F> {
    pub async fn call<A, T, Fut>(&self, args: A) -> Result<T>
    where
        A: Serialize,
        F: Fn(A) -> Fut,
        Fut: std::future::Future<Output = std::result::Result<T, BoxError>>,
        T: Serialize + DeserializeOwned,
    {
        let cache_key = key::fn_call_key(&self.fn_name, &args)?;
        self.cache
            .get_or_set(&cache_key, || (self.func)(args), &self.options)
            .await
    }
}

/// One `(key, factory)` pair for [`Cache::warm_up`]
pub struct WarmUpTask {
    pub key: String,
    pub factory: Box<
        dyn FnOnce() -> BoxFuture<'static, std::result::Result<serde_json::Value, BoxError>>
            + Send,
    >,
    pub options: CacheOptions,
}

impl WarmUpTask {
    pub fn new<F, Fut>(key: impl Into<String>, options: CacheOptions, factory: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: std::future::Future<Output = std::result::Result<serde_json::Value, BoxError>>
            + Send
            + 'static,
    {
        Self {
            key: key.into(),
            factory: Box::new(move || {
                Box::pin(factory())
                    as BoxFuture<'static, std::result::Result<serde_json::Value, BoxError>>
            }),
            options,
        }
    }
}

/// Builder for cache construction
pub struct CacheBuilder {
    config: CacheConfig,
    remote: Option<Arc<dyn RemoteStore>>,
    edge: Option<Arc<dyn RemoteStore>>,
}

impl CacheBuilder {
    pub fn new() -> Self {
        Self {
            config: CacheConfig::default(),
            remote: None,
            edge: None,
        }
    }

    pub fn config(mut self, config: CacheConfig) -> Self {
        self.config = config;
        self
    }

    /// Attach the shared tier-2 store
    pub fn remote(mut self, store: Arc<dyn RemoteStore>) -> Self {
        self.remote = Some(store);
        self
    }

    /// Attach the optional edge tier
    pub fn edge(mut self, store: Arc<dyn RemoteStore>) -> Self {
        self.edge = Some(store);
        self
    }

    pub fn build(self) -> Cache {
        let mut cache = Cache::with_config(self.config);
        cache.remote = self.remote;
        cache.edge = self.edge;
        cache
    }
}

impl Default for CacheBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::MemoryRemoteStore;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_set_get_roundtrip() {
        let cache = Cache::new();

        cache
            .set("key1", &"value1", &CacheOptions::default())
            .await
            .unwrap();
        let value: Option<String> = cache.get("key1").await.unwrap();
        assert_eq!(value, Some("value1".to_string()));

        let absent: Option<String> = cache.get("other").await.unwrap();
        assert_eq!(absent, None);
    }

    #[tokio::test]
    async fn test_ttl_expiry_without_sweep() {
        let cache = Cache::new();

        let opts = CacheOptions::default().with_ttl(Duration::from_millis(100));
        cache.set("key1", &42u64, &opts).await.unwrap();

        tokio::time::sleep(Duration::from_millis(150)).await;

        let value: Option<u64> = cache.get("key1").await.unwrap();
        assert_eq!(value, None);
    }

    #[tokio::test]
    async fn test_delete_reports_presence() {
        let cache = Cache::new();

        cache.set("key1", &1u8, &CacheOptions::default()).await.unwrap();
        assert!(cache.delete("key1").await.unwrap());
        assert!(!cache.delete("key1").await.unwrap());

        let stats = cache.stats();
        assert_eq!(stats.deletes, 1);
    }

    #[tokio::test]
    async fn test_get_or_set_memoizes() {
        let cache = Cache::new();
        let calls = AtomicU32::new(0);

        for _ in 0..2 {
            let value = cache
                .get_or_set(
                    "k",
                    || async {
                        calls.fetch_add(1, Ordering::SeqCst);
                        Ok::<_, BoxError>(42u64)
                    },
                    &CacheOptions::default(),
                )
                .await
                .unwrap();
            assert_eq!(value, 42);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_factory_stores_nothing() {
        let cache = Cache::new();

        let result = cache
            .get_or_set::<u64, _, _>(
                "k",
                || async { Err::<u64, BoxError>("boom".into()) },
                &CacheOptions::default(),
            )
            .await;
        assert!(matches!(result, Err(CacheError::Factory(_))));

        let value: Option<u64> = cache.get("k").await.unwrap();
        assert_eq!(value, None);
    }

    #[tokio::test]
    async fn test_promotion_from_remote() {
        let remote = Arc::new(MemoryRemoteStore::new());
        let cache = Cache::builder().remote(remote.clone()).build();

        cache
            .set("key1", &"shared", &CacheOptions::default())
            .await
            .unwrap();

        // Simulate a restarted process: empty tier-1, populated tier-2
        {
            let mut state = cache.state.write().await;
            state.local.clear();
            state.tags.clear();
        }

        let value: Option<String> = cache.get("key1").await.unwrap();
        assert_eq!(value, Some("shared".to_string()));

        // Promotion means the next read hits tier-1 even with tier-2 down
        remote.set_unavailable(true);
        let value: Option<String> = cache.get("key1").await.unwrap();
        assert_eq!(value, Some("shared".to_string()));
    }

    #[tokio::test]
    async fn test_remote_outage_degrades_to_local() {
        let remote = Arc::new(MemoryRemoteStore::new());
        remote.set_unavailable(true);
        let cache = Cache::builder().remote(remote).build();

        // Writes succeed locally despite the outage
        cache
            .set("key1", &"local", &CacheOptions::default())
            .await
            .unwrap();
        let value: Option<String> = cache.get("key1").await.unwrap();
        assert_eq!(value, Some("local".to_string()));
    }

    #[tokio::test]
    async fn test_clear_resets_stats_scope() {
        let cache = Cache::new();

        cache.set("a", &1u8, &CacheOptions::default()).await.unwrap();
        let _: Option<u8> = cache.get("a").await.unwrap();
        let _: Option<u8> = cache.get("missing").await.unwrap();

        cache.clear().await.unwrap();

        let stats = cache.stats();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 0);
        assert_eq!(stats.entry_count, 0);
        assert_eq!(stats.size_bytes, 0);

        let value: Option<u8> = cache.get("a").await.unwrap();
        assert_eq!(value, None);
    }

    #[tokio::test]
    async fn test_disabled_metrics_leave_every_counter_at_zero() {
        let cache = Cache::with_config(CacheConfig {
            max_entries: Some(1),
            enable_metrics: false,
            ..CacheConfig::default()
        });

        cache.set("a", &1u8, &CacheOptions::default()).await.unwrap();
        cache.set("b", &2u8, &CacheOptions::default()).await.unwrap();
        let _: Option<u8> = cache.get("b").await.unwrap();
        let _: Option<u8> = cache.get("missing").await.unwrap();
        cache.delete("b").await.unwrap();

        let stats = cache.stats();
        assert_eq!(stats.sets, 0);
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 0);
        assert_eq!(stats.deletes, 0);
        assert_eq!(stats.evictions, 0);
        assert_eq!(stats.entry_count, 0);
        assert_eq!(stats.size_bytes, 0);
    }

    #[tokio::test]
    async fn test_purge_expired_updates_usage() {
        let cache = Cache::new();

        let short = CacheOptions::default().with_ttl(Duration::from_millis(20));
        cache.set("dying", &1u8, &short).await.unwrap();
        cache.set("alive", &2u8, &CacheOptions::default()).await.unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;

        let purged = cache.purge_expired().await;
        assert_eq!(purged, 1);

        let stats = cache.stats();
        assert_eq!(stats.entry_count, 1);
        assert_eq!(stats.evictions, 1);
    }

    #[tokio::test]
    async fn test_invalidate_tags_cleans_both_sides() {
        let cache = Cache::new();

        let tagged = CacheOptions::default().with_tags(["users"]);
        cache.set("user:1", &"Ann", &tagged).await.unwrap();
        cache.set("user:2", &"Bo", &tagged).await.unwrap();
        cache.set("team:1", &"Core", &CacheOptions::default()).await.unwrap();

        let removed = cache.invalidate_tags(&["users"]).await.unwrap();
        assert_eq!(removed, 2);

        let gone: Option<String> = cache.get("user:1").await.unwrap();
        assert_eq!(gone, None);
        let kept: Option<String> = cache.get("team:1").await.unwrap();
        assert_eq!(kept, Some("Core".to_string()));

        let state = cache.state.read().await;
        assert!(state.tags.keys_for("users").is_empty());
    }
}
