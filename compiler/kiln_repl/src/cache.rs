//! Bounded, time-limited memo for analysis query results.
//!
//! Completion and highlighting are asked again and again for the same text
//! while a user types. Results are keyed by the project they were computed
//! against, a hash of the candidate text and the caret, so an update of the
//! workspace (new project id) never serves a stale answer. Entries also
//! expire after a fixed time to live.

use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use rustc_hash::{FxBuildHasher, FxHasher};

use crate::workspace::ProjectId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub project: ProjectId,
    pub text_hash: u64,
    pub caret: Option<usize>,
}

impl CacheKey {
    pub fn new(project: ProjectId, text: &str, caret: Option<usize>) -> Self {
        let mut hasher = FxHasher::default();
        text.hash(&mut hasher);
        CacheKey {
            project,
            text_hash: hasher.finish(),
            caret,
        }
    }
}

#[derive(Debug)]
struct Entry<V> {
    value: V,
    inserted: Instant,
}

/// Concurrent memo with a capacity bound and a time to live.
#[derive(Debug)]
pub struct ResultCache<V> {
    entries: DashMap<CacheKey, Entry<V>, FxBuildHasher>,
    capacity: usize,
    ttl: Duration,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl<V: Clone> ResultCache<V> {
    /// A cache of at most `capacity` entries (at least one).
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        ResultCache {
            entries: DashMap::with_hasher(FxBuildHasher),
            capacity: capacity.max(1),
            ttl,
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
        }
    }

    /// The cached value for `key`, computing and storing it on a miss.
    pub fn get_or_insert_with(&self, key: CacheKey, compute: impl FnOnce() -> V) -> V {
        self.get_or_insert_with_at(key, Instant::now(), compute)
    }

    pub(crate) fn get_or_insert_with_at(
        &self,
        key: CacheKey,
        now: Instant,
        compute: impl FnOnce() -> V,
    ) -> V {
        if let Some(value) = self.get_at(&key, now) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            tracing::trace!(?key, "analysis cache hit");
            return value;
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        let value = compute();
        self.insert_at(key, value.clone(), now);
        value
    }

    fn get_at(&self, key: &CacheKey, now: Instant) -> Option<V> {
        if let Some(entry) = self.entries.get(key) {
            if !self.is_expired(&entry, now) {
                return Some(entry.value.clone());
            }
        }
        self.entries.remove_if(key, |_, entry| self.is_expired(entry, now));
        None
    }

    fn insert_at(&self, key: CacheKey, value: V, now: Instant) {
        if !self.entries.contains_key(&key) && self.entries.len() >= self.capacity {
            self.evict(now);
        }
        self.entries.insert(key, Entry { value, inserted: now });
    }

    /// Drop expired entries, then the oldest until there is room for one.
    fn evict(&self, now: Instant) {
        self.entries.retain(|_, entry| !self.is_expired(entry, now));
        while self.entries.len() >= self.capacity {
            // Collect the key first; removing while iterating deadlocks.
            let oldest = self
                .entries
                .iter()
                .min_by_key(|entry| entry.value().inserted)
                .map(|entry| *entry.key());
            match oldest {
                Some(key) => {
                    self.entries.remove(&key);
                }
                None => break,
            }
        }
    }

    fn is_expired(&self, entry: &Entry<V>, now: Instant) -> bool {
        now.saturating_duration_since(entry.inserted) >= self.ttl
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> usize {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests;
