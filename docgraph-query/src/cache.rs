// Copyright 2025 Sushanth (https://github.com/sushanthpy)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Resource Cache
//!
//! Keyed cache for rendered resource bodies with hit/miss accounting.
//!
//! ## Semantics
//!
//! - Disabled: `get` records a miss and returns `None`; `set` does nothing
//! - TTL: an entry older than `ttl` is dropped when `get` finds it, counting as
//!   both a miss and an eviction. Nothing sweeps expired entries proactively.
//! - Capacity: unbounded unless `max_entries` is set. When full, inserting a
//!   new key evicts the oldest *inserted* key. Reads do not refresh position,
//!   so this is insertion-order eviction, not LRU.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};

/// Cache configuration
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub enabled: bool,
    /// Entry lifetime
    pub ttl: Duration,
    /// Entry bound; `None` means unbounded
    pub max_entries: Option<usize>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl: Duration::from_secs(300),
            max_entries: None,
        }
    }
}

/// Cache counters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub sets: u64,
    pub size: usize,
    pub evictions: u64,
    /// Hit percentage with two decimals, e.g. `"66.67%"`
    pub hit_rate: String,
}

struct Entry<V> {
    value: V,
    stored_at: Instant,
    seq: u64,
}

/// TTL cache with optional insertion-order capacity bound
pub struct CacheManager<V> {
    config: CacheConfig,
    entries: HashMap<String, Entry<V>>,
    /// Insertion sequence -> key
    order: BTreeMap<u64, String>,
    next_seq: u64,
    hits: u64,
    misses: u64,
    sets: u64,
    evictions: u64,
}

impl<V: Clone> Default for CacheManager<V> {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

impl<V: Clone> CacheManager<V> {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            entries: HashMap::new(),
            order: BTreeMap::new(),
            next_seq: 0,
            hits: 0,
            misses: 0,
            sets: 0,
            evictions: 0,
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Look up `key`, dropping it if expired
    pub fn get(&mut self, key: &str) -> Option<V> {
        if !self.config.enabled {
            self.misses += 1;
            return None;
        }

        let expired = match self.entries.get(key) {
            None => {
                self.misses += 1;
                return None;
            }
            Some(entry) => entry.stored_at.elapsed() > self.config.ttl,
        };

        if expired {
            self.remove(key);
            self.evictions += 1;
            self.misses += 1;
            tracing::trace!(key, "Cache entry expired");
            return None;
        }

        self.hits += 1;
        self.entries.get(key).map(|e| e.value.clone())
    }

    /// Store `value` under `key`.
    ///
    /// Replacing an existing key refreshes its value and timestamp but keeps
    /// its insertion position.
    pub fn set(&mut self, key: impl Into<String>, value: V) {
        if !self.config.enabled {
            return;
        }
        let key = key.into();
        self.sets += 1;

        if let Some(entry) = self.entries.get_mut(&key) {
            entry.value = value;
            entry.stored_at = Instant::now();
            return;
        }

        if let Some(max) = self.config.max_entries {
            while self.entries.len() >= max {
                let Some((_, oldest)) = self.order.pop_first() else {
                    break;
                };
                self.entries.remove(&oldest);
                self.evictions += 1;
            }
            if max == 0 {
                return;
            }
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        self.order.insert(seq, key.clone());
        self.entries.insert(
            key,
            Entry {
                value,
                stored_at: Instant::now(),
                seq,
            },
        );
    }

    /// Whether a live entry exists; does not touch the counters
    pub fn has(&self, key: &str) -> bool {
        self.config.enabled
            && self
                .entries
                .get(key)
                .is_some_and(|e| e.stored_at.elapsed() <= self.config.ttl)
    }

    /// Remove `key`; returns whether it was present
    pub fn delete(&mut self, key: &str) -> bool {
        self.remove(key)
    }

    /// Drop every entry; counters are kept
    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        let total = self.hits + self.misses;
        let rate = if total > 0 {
            self.hits as f64 / total as f64 * 100.0
        } else {
            0.0
        };

        CacheStats {
            hits: self.hits,
            misses: self.misses,
            sets: self.sets,
            size: self.entries.len(),
            evictions: self.evictions,
            hit_rate: format!("{:.2}%", rate),
        }
    }

    /// Return the cached value or compute and store it
    pub fn get_or_insert_with<F>(&mut self, key: &str, build: F) -> V
    where
        F: FnOnce() -> V,
    {
        if let Some(value) = self.get(key) {
            return value;
        }
        let value = build();
        self.set(key, value.clone());
        value
    }

    /// Fallible [`get_or_insert_with`](Self::get_or_insert_with); errors are not cached
    pub fn try_get_or_insert_with<F, E>(&mut self, key: &str, build: F) -> Result<V, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        if let Some(value) = self.get(key) {
            return Ok(value);
        }
        let value = build()?;
        self.set(key, value.clone());
        Ok(value)
    }

    fn remove(&mut self, key: &str) -> bool {
        match self.entries.remove(key) {
            Some(entry) => {
                self.order.remove(&entry.seq);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn bounded(max: usize) -> CacheManager<u32> {
        CacheManager::new(CacheConfig {
            max_entries: Some(max),
            ..Default::default()
        })
    }

    #[test]
    fn test_miss_then_hit_accounting() {
        let mut cache: CacheManager<u32> = CacheManager::default();

        for key in ["a", "b", "c"] {
            assert_eq!(cache.get(key), None);
        }
        assert_eq!(cache.stats().misses, 3);

        cache.set("a", 1);
        assert_eq!(cache.get("a"), Some(1));

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.sets, 1);
        assert_eq!(stats.size, 1);
        assert_eq!(stats.hit_rate, "25.00%");
    }

    #[test]
    fn test_disabled_cache() {
        let mut cache: CacheManager<u32> = CacheManager::new(CacheConfig {
            enabled: false,
            ..Default::default()
        });

        cache.set("a", 1);
        assert_eq!(cache.get("a"), None);
        assert!(!cache.has("a"));

        let stats = cache.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.sets, 0);
        assert_eq!(stats.size, 0);
    }

    #[test]
    fn test_ttl_expiry_is_lazy() {
        let mut cache: CacheManager<u32> = CacheManager::new(CacheConfig {
            ttl: Duration::from_millis(1),
            ..Default::default()
        });

        cache.set("a", 1);
        thread::sleep(Duration::from_millis(10));

        // Still resident until read
        assert_eq!(cache.len(), 1);
        assert!(!cache.has("a"));

        assert_eq!(cache.get("a"), None);
        let stats = cache.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.evictions, 1);
        assert_eq!(stats.size, 0);
    }

    #[test]
    fn test_insertion_order_eviction() {
        let mut cache = bounded(2);
        cache.set("a", 1);
        cache.set("b", 2);

        // Reading does not protect "a"
        assert_eq!(cache.get("a"), Some(1));
        cache.set("c", 3);

        assert!(!cache.has("a"));
        assert!(cache.has("b"));
        assert!(cache.has("c"));
        assert_eq!(cache.stats().evictions, 1);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_reset_keeps_position() {
        let mut cache = bounded(2);
        cache.set("a", 1);
        cache.set("b", 2);
        cache.set("a", 10);
        cache.set("c", 3);

        // "a" was inserted first, so it is still the oldest
        assert!(!cache.has("a"));
        assert_eq!(cache.get("b"), Some(2));
    }

    #[test]
    fn test_delete_and_clear() {
        let mut cache: CacheManager<u32> = CacheManager::default();
        cache.set("a", 1);
        cache.set("b", 2);

        assert!(cache.delete("a"));
        assert!(!cache.delete("a"));
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.stats().sets, 2);
    }

    #[test]
    fn test_get_or_insert_with() {
        let mut cache: CacheManager<String> = CacheManager::default();
        let mut calls = 0;

        for _ in 0..3 {
            let v = cache.get_or_insert_with("k", || {
                calls += 1;
                "body".to_string()
            });
            assert_eq!(v, "body");
        }
        assert_eq!(calls, 1);
        assert_eq!(cache.stats().hits, 2);
    }

    #[test]
    fn test_errors_not_cached() {
        let mut cache: CacheManager<u32> = CacheManager::default();

        let r: Result<u32, &str> = cache.try_get_or_insert_with("k", || Err("boom"));
        assert!(r.is_err());
        assert!(!cache.has("k"));

        let r: Result<u32, &str> = cache.try_get_or_insert_with("k", || Ok(7));
        assert_eq!(r, Ok(7));
        assert!(cache.has("k"));
    }

    #[test]
    fn test_empty_hit_rate() {
        let cache: CacheManager<u32> = CacheManager::default();
        assert_eq!(cache.stats().hit_rate, "0.00%");
    }
}
