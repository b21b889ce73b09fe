use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::models::PriceRecord;

pub const DEFAULT_TTL: Duration = Duration::from_secs(600);

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    inserted_at: Instant,
}

/// Thread-safe, process-local cache with one fixed time-to-live for every entry.
///
/// Expired entries are dropped lazily on lookup and by [`TtlCache::cleanup_expired`].
#[derive(Clone)]
pub struct TtlCache<V> {
    entries: Arc<DashMap<String, CacheEntry<V>>>,
    ttl: Duration,
}

/// Cache of serialized-ready endpoint responses.
pub type ResponseCache = TtlCache<Arc<Vec<PriceRecord>>>;

impl<V: Clone> TtlCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            ttl,
        }
    }

    pub fn get(&self, key: &str) -> Option<V> {
        if let Some(entry) = self.entries.get(key) {
            if entry.inserted_at.elapsed() < self.ttl {
                return Some(entry.value.clone());
            }
            drop(entry); // release the shard read lock before removing
            self.entries
                .remove_if(key, |_, e| e.inserted_at.elapsed() >= self.ttl);
        }
        None
    }

    pub fn insert(&self, key: impl Into<String>, value: V) {
        self.entries.insert(
            key.into(),
            CacheEntry {
                value,
                inserted_at: Instant::now(),
            },
        );
    }

    /// Drop every expired entry, returning how many were removed.
    pub fn cleanup_expired(&self) -> usize {
        let ttl = self.ttl;
        let mut removed = 0;
        self.entries.retain(|_, e| {
            let keep = e.inserted_at.elapsed() < ttl;
            if !keep {
                removed += 1;
            }
            keep
        });
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V: Clone> Default for TtlCache<V> {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

pub fn days_key(days: u32) -> String {
    format!("btc-price-{}", days)
}

pub fn range_key(start: &str, end: &str) -> String {
    format!("btc-price-range-{}-{}", start, end)
}
