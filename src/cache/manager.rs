//! Response cache with per-read TTL and least-recently-used eviction
//!
//! Provides a `ResponseCache` that keeps the latest forecast per city together
//! with freshness metadata, evicting the least recently accessed entry when the
//! configured capacity is exceeded.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::clock::Clock;

/// Wrapper struct for a cached payload and its bookkeeping
#[derive(Debug, Clone)]
struct CacheEntry<T> {
    /// The cached payload
    data: T,
    /// When the payload was stored
    stored_at: DateTime<Utc>,
    /// Number of reads and writes that touched this entry
    access_count: u64,
    /// When the entry was last read or written
    last_accessed_at: DateTime<Utc>,
    /// Monotonic touch order, breaks ties between equal timestamps
    touched: u64,
}

/// Result of a stale-tolerant read, including metadata about cache freshness
#[derive(Debug, Clone)]
pub struct CachedData<T> {
    /// The cached data
    pub data: T,
    /// When the data was originally cached
    pub cached_at: DateTime<Utc>,
    /// Whether the entry is older than the cache's standard TTL
    pub is_expired: bool,
}

/// Summary of cache contents
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub entry_count: usize,
    pub max_entries: usize,
    pub ttl_minutes: i64,
    /// Keys ordered from most to least recently accessed
    pub keys: Vec<String>,
}

/// Normalizes a city name into a cache key (trimmed, lowercased)
pub fn normalize_key(key: &str) -> String {
    key.trim().to_lowercase()
}

/// Bounded map from city key to the last fetched payload
///
/// Reads always update recency, even when the entry turns out to be too old
/// for the caller, so stale reads do not starve LRU tracking.
#[derive(Debug)]
pub struct ResponseCache<T> {
    entries: HashMap<String, CacheEntry<T>>,
    max_entries: usize,
    ttl: Duration,
    refresh_threshold: Duration,
    touch_counter: u64,
    clock: Arc<dyn Clock>,
}

impl<T: Clone> ResponseCache<T> {
    /// Creates an empty cache
    ///
    /// # Arguments
    /// * `max_entries` - Capacity; eviction runs after each write
    /// * `ttl` - Standard freshness window, used for `is_expired` reporting
    /// * `refresh_threshold` - Age after which [`ResponseCache::is_refresh_due`] is true
    pub fn new(
        max_entries: usize,
        ttl: Duration,
        refresh_threshold: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            entries: HashMap::new(),
            max_entries,
            ttl,
            refresh_threshold,
            touch_counter: 0,
            clock,
        }
    }

    fn next_touch(&mut self) -> u64 {
        self.touch_counter += 1;
        self.touch_counter
    }

    /// Looks up an entry and bumps its recency
    fn touch(&mut self, key: &str) -> Option<&CacheEntry<T>> {
        let now = self.clock.now();
        let touched = self.next_touch();
        let entry = self.entries.get_mut(&normalize_key(key))?;
        entry.access_count += 1;
        entry.last_accessed_at = now;
        entry.touched = touched;
        Some(&*entry)
    }

    /// Returns the payload if it is younger than `max_age`
    ///
    /// A present entry has its access count and last access time updated
    /// whether or not it is fresh enough to return.
    pub fn get(&mut self, key: &str, max_age: Duration) -> Option<T> {
        let now = self.clock.now();
        let entry = self.touch(key)?;
        if now - entry.stored_at < max_age {
            Some(entry.data.clone())
        } else {
            None
        }
    }

    /// Returns the payload regardless of age
    ///
    /// Used as a fallback when the provider fails or the call budget is spent.
    pub fn get_stale(&mut self, key: &str) -> Option<CachedData<T>> {
        let now = self.clock.now();
        let ttl = self.ttl;
        let entry = self.touch(key)?;
        Some(CachedData {
            data: entry.data.clone(),
            cached_at: entry.stored_at,
            is_expired: now - entry.stored_at >= ttl,
        })
    }

    /// Reads an entry without touching recency
    pub fn peek(&self, key: &str) -> Option<CachedData<T>> {
        let now = self.clock.now();
        self.entries.get(&normalize_key(key)).map(|entry| CachedData {
            data: entry.data.clone(),
            cached_at: entry.stored_at,
            is_expired: now - entry.stored_at >= self.ttl,
        })
    }

    /// Inserts or replaces an entry, then evicts down to capacity
    ///
    /// A replaced entry keeps its prior access count plus one; a new entry
    /// starts at one.
    pub fn put(&mut self, key: &str, data: T) {
        let now = self.clock.now();
        let touched = self.next_touch();
        let key = normalize_key(key);
        let access_count = self
            .entries
            .get(&key)
            .map_or(1, |previous| previous.access_count + 1);

        self.entries.insert(
            key,
            CacheEntry {
                data,
                stored_at: now,
                access_count,
                last_accessed_at: now,
                touched,
            },
        );

        self.evict_if_over_capacity();
    }

    /// Removes least recently accessed entries until within capacity
    pub fn evict_if_over_capacity(&mut self) {
        while self.entries.len() > self.max_entries {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|(_, entry)| (entry.last_accessed_at, entry.touched))
                .map(|(key, _)| key.clone());

            match oldest {
                Some(key) => {
                    tracing::debug!(key = %key, "Evicting least recently used cache entry");
                    self.entries.remove(&key);
                }
                None => break,
            }
        }
    }

    /// Whether an entry exists and is older than the refresh threshold
    pub fn is_refresh_due(&self, key: &str) -> bool {
        let now = self.clock.now();
        self.entries
            .get(&normalize_key(key))
            .is_some_and(|entry| now - entry.stored_at > self.refresh_threshold)
    }

    /// Drops one entry, returning whether it existed
    pub fn invalidate(&mut self, key: &str) -> bool {
        self.entries.remove(&normalize_key(key)).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(&normalize_key(key))
    }

    /// Access count of an entry, if present
    pub fn access_count(&self, key: &str) -> Option<u64> {
        self.entries
            .get(&normalize_key(key))
            .map(|entry| entry.access_count)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn stats(&self) -> CacheStats {
        let mut by_recency: Vec<(&String, &CacheEntry<T>)> = self.entries.iter().collect();
        by_recency.sort_by_key(|(_, entry)| {
            std::cmp::Reverse((entry.last_accessed_at, entry.touched))
        });

        CacheStats {
            entry_count: self.entries.len(),
            max_entries: self.max_entries,
            ttl_minutes: self.ttl.num_minutes(),
            keys: by_recency.into_iter().map(|(key, _)| key.clone()).collect(),
        }
    }
}
