// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Fixed-capacity cache with first-in-first-out eviction

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::hash::Hash;

/// Map plus an explicit insertion-order queue
///
/// Once `capacity` entries are stored, inserting a new key evicts the
/// entry that was inserted first. Lookups never reorder entries.
#[derive(Debug, Clone)]
pub struct InsertionCache<K, V> {
    entries: HashMap<K, V>,
    order: VecDeque<K>,
    capacity: usize,
    hits: u64,
    misses: u64,
}

impl<K: Eq + Hash + Clone, V: Clone> InsertionCache<K, V> {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
            capacity,
            hits: 0,
            misses: 0,
        }
    }

    /// Clone of the cached value, counting a hit or a miss
    pub fn get(&mut self, key: &K) -> Option<V> {
        match self.entries.get(key) {
            Some(value) => {
                self.hits += 1;
                Some(value.clone())
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Store `value`, returning the evicted key if the cache was full
    pub fn insert(&mut self, key: K, value: V) -> Option<K> {
        if self.capacity == 0 {
            return None;
        }
        if self.entries.insert(key.clone(), value).is_some() {
            // Replacing keeps the original insertion slot
            return None;
        }
        self.order.push_back(key);

        if self.order.len() > self.capacity {
            let oldest = self.order.pop_front()?;
            self.entries.remove(&oldest);
            return Some(oldest);
        }
        None
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Keys from oldest to newest
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.order.iter()
    }

    /// Drop every entry; counters are kept
    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    pub fn stats(&self) -> CacheCounters {
        CacheCounters {
            size: self.entries.len(),
            capacity: self.capacity,
            hits: self.hits,
            misses: self.misses,
        }
    }
}

/// Snapshot of a cache's occupancy and hit/miss counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheCounters {
    pub size: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
}

impl CacheCounters {
    pub fn hit_rate(&self) -> f32 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f32 / total as f32) * 100.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evicts_oldest_insertion() {
        let mut cache = InsertionCache::new(2);
        assert_eq!(cache.insert("a", 1), None);
        assert_eq!(cache.insert("b", 2), None);
        // Reading does not refresh "a"
        assert_eq!(cache.get(&"a"), Some(1));
        assert_eq!(cache.insert("c", 3), Some("a"));
        assert!(!cache.contains(&"a"));
        assert_eq!(cache.keys().copied().collect::<Vec<_>>(), vec!["b", "c"]);
    }

    #[test]
    fn test_replace_keeps_slot() {
        let mut cache = InsertionCache::new(2);
        cache.insert("a", 1);
        cache.insert("b", 2);
        assert_eq!(cache.insert("a", 10), None);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.insert("c", 3), Some("a"));
    }

    #[test]
    fn test_counters() {
        let mut cache: InsertionCache<&str, i32> = InsertionCache::new(4);
        assert_eq!(cache.get(&"missing"), None);
        cache.insert("x", 1);
        assert_eq!(cache.get(&"x"), Some(1));
        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses, stats.size), (1, 1, 1));
        assert_eq!(stats.hit_rate(), 50.0);
    }

    #[test]
    fn test_zero_capacity_stores_nothing() {
        let mut cache = InsertionCache::new(0);
        cache.insert(1, 1);
        assert!(cache.is_empty());
    }
}
