//! Tag index for bulk invalidation
//!
//! Private facade structure mapping tag -> set of keys. Used only to
//! resolve tag invalidations, never for lookups. Every removal path keeps
//! the invariant that an emptied bucket is dropped from the index.

use std::collections::{HashMap, HashSet};

#[derive(Debug, Default)]
pub struct TagIndex {
    buckets: HashMap<String, HashSet<String>>,
}

impl TagIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a key under each of the given tags.
    pub fn add<I, S>(&mut self, key: &str, tags: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for tag in tags {
            self.buckets
                .entry(tag.into())
                .or_default()
                .insert(key.to_string());
        }
    }

    /// Remove a key from the given tag buckets.
    pub fn remove<'a, I>(&mut self, key: &str, tags: I)
    where
        I: IntoIterator<Item = &'a String>,
    {
        for tag in tags {
            if let Some(bucket) = self.buckets.get_mut(tag) {
                bucket.remove(key);
                if bucket.is_empty() {
                    self.buckets.remove(tag);
                }
            }
        }
    }

    /// The keys currently registered under a tag.
    pub fn keys_for(&self, tag: &str) -> HashSet<String> {
        self.buckets.get(tag).cloned().unwrap_or_default()
    }

    /// Distinct keys registered under any of the given tags.
    pub fn keys_for_any(&self, tags: &[&str]) -> HashSet<String> {
        let mut keys = HashSet::new();
        for tag in tags {
            if let Some(bucket) = self.buckets.get(*tag) {
                keys.extend(bucket.iter().cloned());
            }
        }
        keys
    }

    pub fn clear(&mut self) {
        self.buckets.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}
