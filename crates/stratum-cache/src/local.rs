//! Tier-1 in-process store
//!
//! A bounded key -> entry table with LRU recency ordering, a running byte
//! total, and per-entry logical TTL. Eviction runs synchronously during
//! insert; expired entries are never returned by reads even before the
//! sweeper physically removes them.

use std::collections::HashSet;
use std::time::{Duration, SystemTime};

use lru::LruCache;

/// A stored tier-1 entry. Owned exclusively by the store; lower tiers hold
/// serialized copies, never references.
#[derive(Debug, Clone)]
pub struct LocalEntry {
    /// Serialized (possibly compressed) payload
    pub payload: Vec<u8>,
    /// Decode path selector
    pub compressed: bool,
    /// Creation time, the TTL anchor
    pub created_at: SystemTime,
    /// Refreshed on every successful read
    pub last_accessed_at: SystemTime,
    /// Informational only, not an eviction input
    pub access_count: u64,
    /// Stored payload length; eviction accounting uses this
    pub size_bytes: usize,
    /// Tags this entry is registered under
    pub tags: HashSet<String>,
    /// SHA-256 of the uncompressed value, for change detection
    pub fingerprint: String,
    /// Logical lifetime; `None` never expires
    pub ttl: Option<Duration>,
    /// Whether an expired copy may be served when tier-2 is unreachable
    pub allow_stale: bool,
}

impl LocalEntry {
    pub fn is_expired(&self) -> bool {
        match self.ttl {
            Some(ttl) => SystemTime::now()
                .duration_since(self.created_at)
                .map(|elapsed| elapsed > ttl)
                .unwrap_or(false),
            None => false,
        }
    }
}

/// Outcome of a tier-1 lookup.
#[derive(Debug)]
pub enum LocalLookup {
    /// Fresh entry; recency was refreshed
    Hit {
        payload: Vec<u8>,
        compressed: bool,
        fingerprint: String,
    },
    /// Entry exists but its TTL elapsed. The entry is left in place so the
    /// facade can still serve it stale if tier-2 turns out unreachable.
    Expired { allow_stale: bool },
    Absent,
}

/// Bounded in-process store with count, size, and TTL eviction.
pub struct LocalStore {
    entries: LruCache<String, LocalEntry>,
    max_entries: Option<usize>,
    max_total_bytes: Option<u64>,
    total_bytes: u64,
}

impl LocalStore {
    pub fn new(max_entries: Option<usize>, max_total_bytes: Option<u64>) -> Self {
        Self {
            entries: LruCache::unbounded(),
            max_entries,
            max_total_bytes,
            total_bytes: 0,
        }
    }

    /// Insert an entry, evicting least-recently-used entries as needed to
    /// keep the store within its count and byte bounds. Returns the evicted
    /// entries so the caller can unregister their tags and count them.
    pub fn insert(&mut self, key: String, entry: LocalEntry) -> Vec<(String, LocalEntry)> {
        if let Some(old) = self.entries.pop(&key) {
            self.total_bytes = self.total_bytes.saturating_sub(old.size_bytes as u64);
        }

        self.total_bytes += entry.size_bytes as u64;
        self.entries.put(key, entry);

        let mut evicted = Vec::new();

        if let Some(max) = self.max_entries {
            while self.entries.len() > max {
                if let Some((k, v)) = self.entries.pop_lru() {
                    self.total_bytes = self.total_bytes.saturating_sub(v.size_bytes as u64);
                    evicted.push((k, v));
                } else {
                    break;
                }
            }
        }

        if let Some(max) = self.max_total_bytes {
            while self.total_bytes > max {
                if let Some((k, v)) = self.entries.pop_lru() {
                    self.total_bytes = self.total_bytes.saturating_sub(v.size_bytes as u64);
                    evicted.push((k, v));
                } else {
                    break;
                }
            }
        }

        evicted
    }

    /// Look a key up, refreshing recency and access bookkeeping on a fresh
    /// hit. Expired entries are reported, not returned, and keep their
    /// place in the eviction order.
    pub fn lookup(&mut self, key: &str) -> LocalLookup {
        match self.entries.peek(key) {
            Some(entry) if entry.is_expired() => {
                return LocalLookup::Expired {
                    allow_stale: entry.allow_stale,
                };
            }
            Some(_) => {}
            None => return LocalLookup::Absent,
        }

        match self.entries.get_mut(key) {
            Some(entry) => {
                entry.last_accessed_at = SystemTime::now();
                entry.access_count += 1;
                LocalLookup::Hit {
                    payload: entry.payload.clone(),
                    compressed: entry.compressed,
                    fingerprint: entry.fingerprint.clone(),
                }
            }
            None => LocalLookup::Absent,
        }
    }

    /// Read an expired entry's payload without refreshing recency, for
    /// stale serving when tier-2 is unreachable.
    pub fn peek_stale(&self, key: &str) -> Option<(Vec<u8>, bool)> {
        self.entries
            .peek(key)
            .map(|e| (e.payload.clone(), e.compressed))
    }

    pub fn remove(&mut self, key: &str) -> Option<LocalEntry> {
        let removed = self.entries.pop(key);
        if let Some(ref entry) = removed {
            self.total_bytes = self.total_bytes.saturating_sub(entry.size_bytes as u64);
        }
        removed
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.total_bytes = 0;
    }

    /// Physically remove every expired entry and recompute the byte total
    /// from the survivors. Used by the periodic sweep.
    pub fn purge_expired(&mut self) -> Vec<(String, LocalEntry)> {
        let expired_keys: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired())
            .map(|(key, _)| key.clone())
            .collect();

        let mut purged = Vec::with_capacity(expired_keys.len());
        for key in expired_keys {
            if let Some(entry) = self.entries.pop(&key) {
                purged.push((key, entry));
            }
        }

        self.total_bytes = self
            .entries
            .iter()
            .map(|(_, entry)| entry.size_bytes as u64)
            .sum();

        purged
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(size: usize, ttl: Option<Duration>) -> LocalEntry {
        let now = SystemTime::now();
        LocalEntry {
            payload: vec![0u8; size],
            compressed: false,
            created_at: now,
            last_accessed_at: now,
            access_count: 0,
            size_bytes: size,
            tags: HashSet::new(),
            fingerprint: String::new(),
            ttl,
            allow_stale: false,
        }
    }

    #[test]
    fn test_count_bound_evicts_lru() {
        let mut store = LocalStore::new(Some(2), None);

        assert!(store.insert("a".into(), entry(10, None)).is_empty());
        assert!(store.insert("b".into(), entry(10, None)).is_empty());

        // Touch "a" so "b" becomes least recently used
        assert!(matches!(store.lookup("a"), LocalLookup::Hit { .. }));

        let evicted = store.insert("c".into(), entry(10, None));
        assert_eq!(evicted.len(), 1);
        assert_eq!(evicted[0].0, "b");
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_size_bound_evicts_until_under() {
        let mut store = LocalStore::new(None, Some(100));

        store.insert("a".into(), entry(40, None));
        store.insert("b".into(), entry(40, None));
        let evicted = store.insert("c".into(), entry(40, None));

        assert_eq!(evicted.len(), 1);
        assert_eq!(evicted[0].0, "a");
        assert!(store.total_bytes() <= 100);
    }

    #[test]
    fn test_overwrite_is_not_an_eviction() {
        let mut store = LocalStore::new(Some(2), None);

        store.insert("a".into(), entry(10, None));
        let evicted = store.insert("a".into(), entry(20, None));

        assert!(evicted.is_empty());
        assert_eq!(store.len(), 1);
        assert_eq!(store.total_bytes(), 20);
    }

    #[test]
    fn test_expired_entry_not_returned() {
        let mut store = LocalStore::new(None, None);

        store.insert("a".into(), entry(10, Some(Duration::ZERO)));
        std::thread::sleep(Duration::from_millis(5));

        assert!(matches!(
            store.lookup("a"),
            LocalLookup::Expired { allow_stale: false }
        ));
    }

    #[test]
    fn test_expired_lookup_keeps_eviction_order() {
        let mut store = LocalStore::new(Some(2), None);

        store.insert("stale".into(), entry(10, Some(Duration::ZERO)));
        store.insert("fresh".into(), entry(10, None));
        std::thread::sleep(Duration::from_millis(5));

        // Reporting an expired entry must not promote it over fresh ones
        assert!(matches!(store.lookup("stale"), LocalLookup::Expired { .. }));

        let evicted = store.insert("new".into(), entry(10, None));
        assert_eq!(evicted.len(), 1);
        assert_eq!(evicted[0].0, "stale");
    }

    #[test]
    fn test_purge_expired_recomputes_bytes() {
        let mut store = LocalStore::new(None, None);

        store.insert("old".into(), entry(30, Some(Duration::ZERO)));
        store.insert("live".into(), entry(20, None));
        std::thread::sleep(Duration::from_millis(5));

        let purged = store.purge_expired();
        assert_eq!(purged.len(), 1);
        assert_eq!(purged[0].0, "old");
        assert_eq!(store.len(), 1);
        assert_eq!(store.total_bytes(), 20);
    }

    #[test]
    fn test_remove_adjusts_bytes() {
        let mut store = LocalStore::new(None, None);

        store.insert("a".into(), entry(25, None));
        assert!(store.remove("a").is_some());
        assert!(store.remove("a").is_none());
        assert_eq!(store.total_bytes(), 0);
        assert!(store.is_empty());
    }
}
