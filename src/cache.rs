//! Bounded in-memory cache with per-entry time-to-live and LRU eviction.
//!
//! ```text
//! TtlCache
//!     ├── entries: HashMap<K, Slot<V>>     // value, insert time, last-touch tick
//!     └── order:   VecDeque<(K, u64)>      // touch log, oldest first
//! ```
//!
//! Every `get` or `insert` appends `(key, tick)` to `order`. When evicting, queue
//! items whose tick no longer matches the live slot are stale and skipped, so the
//! queue never has to be searched.
//!
//! The cache itself is not synchronized; callers wrap it in a lock.
use std::{
    collections::{HashMap, VecDeque},
    hash::Hash,
    time::{Duration, Instant},
};

#[derive(Debug, Clone)]
struct Slot<V> {
    value: V,
    inserted_at: Instant,
    tick: u64,
}

#[derive(Debug)]
pub struct TtlCache<K, V> {
    entries: HashMap<K, Slot<V>>,
    order: VecDeque<(K, u64)>,
    capacity: usize,
    ttl: Duration,
    next_tick: u64,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// A zero capacity is bumped to 1.
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
            capacity: capacity.max(1),
            ttl,
            next_tick: 0,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn get(&mut self, key: &K) -> Option<V> {
        self.get_at(key, Instant::now())
    }

    /// Returns a clone of the value if present and younger than the TTL. Expired
    /// entries are dropped on access.
    pub fn get_at(&mut self, key: &K, now: Instant) -> Option<V> {
        let expired = match self.entries.get(key) {
            None => return None,
            Some(slot) => now.saturating_duration_since(slot.inserted_at) >= self.ttl,
        };
        if expired {
            self.entries.remove(key);
            return None;
        }

        let tick = self.bump();
        let slot = self.entries.get_mut(key)?;
        slot.tick = tick;
        let value = slot.value.clone();
        self.order.push_back((key.clone(), tick));
        self.compact();
        Some(value)
    }

    pub fn insert(&mut self, key: K, value: V) {
        self.insert_at(key, value, Instant::now());
    }

    pub fn insert_at(&mut self, key: K, value: V, now: Instant) {
        let tick = self.bump();
        self.order.push_back((key.clone(), tick));
        self.entries.insert(
            key,
            Slot {
                value,
                inserted_at: now,
                tick,
            },
        );

        while self.entries.len() > self.capacity {
            if !self.evict_oldest() {
                break;
            }
        }
        self.compact();
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.entries.remove(key).map(|slot| slot.value)
    }

    /// Keeps only the entries for which `keep` returns true.
    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&K, &V) -> bool,
    {
        self.entries.retain(|k, slot| keep(k, &slot.value));
        self.compact();
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    /// Number of stored entries, including expired ones not yet touched.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn bump(&mut self) -> u64 {
        self.next_tick += 1;
        self.next_tick
    }

    /// Pops the touch log until a live entry is found and removes it.
    fn evict_oldest(&mut self) -> bool {
        while let Some((key, tick)) = self.order.pop_front() {
            let live = self.entries.get(&key).is_some_and(|slot| slot.tick == tick);
            if live {
                self.entries.remove(&key);
                return true;
            }
        }
        false
    }

    /// Drops stale touch records once the log grows well past the live set.
    fn compact(&mut self) {
        if self.order.len() <= self.capacity * 4 {
            return;
        }
        let entries = &self.entries;
        self.order
            .retain(|(key, tick)| entries.get(key).is_some_and(|slot| slot.tick == *tick));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expired_entries_are_not_returned() {
        let mut cache = TtlCache::new(4, Duration::from_secs(10));
        let start = Instant::now();
        cache.insert_at("a", 1, start);

        assert_eq!(cache.get_at(&"a", start + Duration::from_secs(9)), Some(1));
        assert_eq!(cache.get_at(&"a", start + Duration::from_secs(10)), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn least_recently_used_entry_is_evicted() {
        let mut cache = TtlCache::new(2, Duration::from_secs(60));
        let now = Instant::now();
        cache.insert_at("a", 1, now);
        cache.insert_at("b", 2, now);
        // Touch "a" so "b" becomes the oldest.
        assert_eq!(cache.get_at(&"a", now), Some(1));
        cache.insert_at("c", 3, now);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get_at(&"b", now), None);
        assert_eq!(cache.get_at(&"a", now), Some(1));
        assert_eq!(cache.get_at(&"c", now), Some(3));
    }

    #[test]
    fn reinsert_refreshes_value_and_age() {
        let mut cache = TtlCache::new(2, Duration::from_secs(10));
        let start = Instant::now();
        cache.insert_at("a", 1, start);
        cache.insert_at("a", 2, start + Duration::from_secs(8));

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get_at(&"a", start + Duration::from_secs(15)), Some(2));
    }

    #[test]
    fn retain_and_clear() {
        let mut cache = TtlCache::new(8, Duration::from_secs(60));
        for (i, key) in ["x1", "x2", "y1"].into_iter().enumerate() {
            cache.insert(key, i);
        }
        cache.retain(|k, _| !k.starts_with('x'));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&"y1"), Some(2));

        assert_eq!(cache.remove(&"y1"), Some(2));
        cache.insert("z", 9);
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn touch_log_stays_bounded() {
        let mut cache = TtlCache::new(2, Duration::from_secs(60));
        cache.insert("a", 1);
        for _ in 0..100 {
            cache.get(&"a");
        }
        assert!(cache.order.len() <= 2 * 4 + 1);
    }
}
