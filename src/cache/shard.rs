//! Cache Shard Module
//!
//! One independently locked partition of the key space: a key map plus a
//! recency list, with capacity eviction and TTL expiry applied in place.
//!
//! Shards know nothing about locking; every `&mut self` method must be called
//! under the shard's write lock and every `&self` method under at least its
//! read lock.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::RwLock;

use crate::cache::entry::{Cacheable, Entry};
use crate::cache::recency::RecencyList;

// == Peek Result ==
/// Outcome of the read-only phase of a lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Peek<V> {
    /// Key is not present
    Missing,
    /// Key is present but has outlived the TTL
    Expired,
    /// Key is present and live; holds a copy of the value
    Live(V),
}

// == Shard ==
#[derive(Debug)]
pub struct Shard<V> {
    /// Key to recency-list slot
    items: HashMap<String, usize>,
    /// Entries ordered from least to most recently touched
    recency: RecencyList<Entry<V>>,
}

impl<V> Default for Shard<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Shard<V> {
    pub fn new() -> Self {
        Self {
            items: HashMap::new(),
            recency: RecencyList::new(),
        }
    }

    // == Touch ==
    /// Moves `key` to the back of the recency list if it is still present.
    pub fn touch(&mut self, key: &str) -> bool {
        match self.items.get(key) {
            Some(&idx) => {
                self.recency.move_to_back(idx);
                true
            }
            None => false,
        }
    }

    // == Remove If Expired ==
    /// Removes `key` only if it is present and expired at `now`.
    pub fn remove_if_expired(&mut self, key: &str, now: Instant, ttl: Duration) -> bool {
        let expired = self
            .items
            .get(key)
            .and_then(|&idx| self.recency.get(idx))
            .map(|entry| entry.is_expired(now, ttl))
            .unwrap_or(false);

        if expired {
            self.remove(key);
        }
        expired
    }

    // == Sweep Expired ==
    /// Removes expired entries from the front of the recency list, stopping
    /// at the first live one.
    ///
    /// Reads move entries to the back without refreshing their write time, so
    /// an expired entry that was read recently can sit behind a live one and
    /// survive the sweep. Lazy expiry in lookups is what guarantees an expired
    /// entry is never returned.
    pub fn sweep_expired(&mut self, now: Instant, ttl: Duration) -> usize {
        if ttl.is_zero() {
            return 0;
        }

        let mut removed = 0;
        while let Some(idx) = self.recency.front() {
            let expired = self
                .recency
                .get(idx)
                .map(|entry| entry.is_expired(now, ttl))
                .unwrap_or(false);
            if !expired {
                break;
            }
            self.remove_slot(idx);
            removed += 1;
        }
        removed
    }

    // == Evict Front ==
    /// Unconditionally removes up to `n` least recently used entries.
    pub fn evict_front(&mut self, n: usize) -> usize {
        let mut evicted = 0;
        while evicted < n {
            match self.recency.pop_front() {
                Some(entry) => {
                    self.items.remove(&entry.key);
                    evicted += 1;
                }
                None => break,
            }
        }
        evicted
    }

    // == Remove ==
    fn remove(&mut self, key: &str) -> Option<Entry<V>> {
        let idx = self.items.remove(key)?;
        self.recency.remove(idx)
    }

    fn remove_slot(&mut self, idx: usize) {
        if let Some(entry) = self.recency.remove(idx) {
            self.items.remove(&entry.key);
        }
    }

    // == Length ==
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Keys from least to most recently touched.
    #[cfg(test)]
    pub fn keys_by_recency(&self) -> Vec<String> {
        self.recency.iter().map(|(_, entry)| entry.key.clone()).collect()
    }

    // == Consistency Check ==
    /// Verifies that the key map and the recency list describe the same set
    /// of entries. Returns a description of the first violation found.
    pub fn check_consistency(&self) -> Result<(), String> {
        if self.items.len() != self.recency.len() {
            return Err(format!(
                "map holds {} keys but recency list holds {}",
                self.items.len(),
                self.recency.len()
            ));
        }

        let mut walked = 0;
        for (idx, entry) in self.recency.iter() {
            match self.items.get(&entry.key) {
                Some(&mapped) if mapped == idx => {}
                Some(&mapped) => {
                    return Err(format!(
                        "key '{}' maps to slot {} but sits in slot {}",
                        entry.key, mapped, idx
                    ))
                }
                None => return Err(format!("key '{}' missing from map", entry.key)),
            }
            walked += 1;
        }

        if walked != self.items.len() {
            return Err(format!(
                "walked {} entries but map holds {}",
                walked,
                self.items.len()
            ));
        }
        Ok(())
    }
}

impl<V: Cacheable + Clone> Shard<V> {
    // == Upsert ==
    /// Inserts or replaces `value` under its own key.
    ///
    /// An existing entry gets the new value and moves to the back; its write
    /// time is reset only when `refresh_on_write` is set (TTL enabled). A new
    /// entry is appended at the back, after which the front is evicted until
    /// the shard is within `capacity` (0 = unlimited).
    ///
    /// Returns the number of entries evicted.
    pub fn upsert(
        &mut self,
        value: V,
        now: Instant,
        refresh_on_write: bool,
        capacity: usize,
    ) -> usize {
        if let Some(&idx) = self.items.get(value.cache_key()) {
            if let Some(entry) = self.recency.get_mut(idx) {
                entry.value = value;
                if refresh_on_write {
                    entry.created_at = now;
                }
            }
            self.recency.move_to_back(idx);
            return 0;
        }

        let key = value.cache_key().to_owned();
        let idx = self.recency.push_back(Entry::new(key.clone(), value, now));
        self.items.insert(key, idx);

        if capacity > 0 && self.items.len() > capacity {
            self.evict_front(self.items.len() - capacity)
        } else {
            0
        }
    }

    // == Peek ==
    /// Read-only half of a lookup: classifies `key` and copies a live value
    /// without touching recency.
    pub fn peek(&self, key: &str, now: Instant, ttl: Duration) -> Peek<V> {
        match self.items.get(key).and_then(|&idx| self.recency.get(idx)) {
            None => Peek::Missing,
            Some(entry) if entry.is_expired(now, ttl) => Peek::Expired,
            Some(entry) => Peek::Live(entry.value.clone()),
        }
    }

    // == Lookup ==
    /// Single-lock lookup: drops an expired entry, otherwise marks the entry
    /// as most recently used and returns a copy of its value.
    pub fn lookup(&mut self, key: &str, now: Instant, ttl: Duration) -> Option<V> {
        let idx = *self.items.get(key)?;
        let expired = self.recency.get(idx)?.is_expired(now, ttl);
        if expired {
            self.remove_slot(idx);
            return None;
        }
        self.recency.move_to_back(idx);
        self.recency.get(idx).map(|entry| entry.value.clone())
    }
}

// == Sweep Shards ==
/// Sweeps every shard in turn, holding one write lock at a time.
///
/// Returns the total number of expired entries removed.
pub fn sweep_shards<V>(shards: &[RwLock<Shard<V>>], now: Instant, ttl: Duration) -> usize {
    shards
        .iter()
        .map(|shard| shard.write().sweep_expired(now, ttl))
        .sum()
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::testing::Item;

    const TTL: Duration = Duration::from_millis(100);

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_upsert_and_lookup() {
        let mut shard = Shard::new();
        let t0 = Instant::now();

        assert_eq!(shard.upsert(Item::new("a", "1"), t0, false, 0), 0);
        assert_eq!(shard.lookup("a", t0, Duration::ZERO), Some(Item::new("a", "1")));
        assert_eq!(shard.lookup("missing", t0, Duration::ZERO), None);
        assert_eq!(shard.len(), 1);
    }

    #[test]
    fn test_upsert_existing_replaces_and_moves_to_back() {
        let mut shard = Shard::new();
        let t0 = Instant::now();

        shard.upsert(Item::new("a", "1"), t0, false, 0);
        shard.upsert(Item::new("b", "1"), t0, false, 0);
        shard.upsert(Item::new("a", "2"), t0, false, 0);

        assert_eq!(shard.len(), 2);
        assert_eq!(shard.keys_by_recency(), vec!["b", "a"]);
        assert_eq!(shard.peek("a", t0, Duration::ZERO), Peek::Live(Item::new("a", "2")));
        assert!(shard.check_consistency().is_ok());
    }

    #[test]
    fn test_capacity_evicts_least_recently_used() {
        let mut shard = Shard::new();
        let t0 = Instant::now();

        shard.upsert(Item::new("a", "1"), t0, false, 2);
        shard.upsert(Item::new("b", "1"), t0, false, 2);
        let evicted = shard.upsert(Item::new("c", "1"), t0, false, 2);

        assert_eq!(evicted, 1);
        assert_eq!(shard.keys_by_recency(), vec!["b", "c"]);
        assert!(shard.check_consistency().is_ok());
    }

    #[test]
    fn test_lookup_protects_from_eviction() {
        let mut shard = Shard::new();
        let t0 = Instant::now();

        shard.upsert(Item::new("a", "1"), t0, false, 2);
        shard.upsert(Item::new("b", "1"), t0, false, 2);
        shard.lookup("a", t0, Duration::ZERO);
        shard.upsert(Item::new("c", "1"), t0, false, 2);

        assert_eq!(shard.keys_by_recency(), vec!["a", "c"]);
    }

    #[test]
    fn test_overwrite_at_capacity_does_not_evict() {
        let mut shard = Shard::new();
        let t0 = Instant::now();

        shard.upsert(Item::new("a", "1"), t0, false, 2);
        shard.upsert(Item::new("b", "1"), t0, false, 2);
        assert_eq!(shard.upsert(Item::new("a", "2"), t0, false, 2), 0);
        assert_eq!(shard.len(), 2);
    }

    #[test]
    fn test_lazy_expiry_on_lookup() {
        let mut shard = Shard::new();
        let t0 = Instant::now();

        shard.upsert(Item::new("a", "1"), t0, true, 0);

        assert!(shard.lookup("a", t0 + ms(100), TTL).is_some());
        assert_eq!(shard.lookup("a", t0 + ms(101), TTL), None);
        assert!(shard.is_empty());
        assert!(shard.check_consistency().is_ok());
    }

    #[test]
    fn test_write_refreshes_age_only_when_enabled() {
        let t0 = Instant::now();

        let mut refreshing = Shard::new();
        refreshing.upsert(Item::new("a", "1"), t0, true, 0);
        refreshing.upsert(Item::new("a", "2"), t0 + ms(80), true, 0);
        assert_eq!(
            refreshing.peek("a", t0 + ms(150), TTL),
            Peek::Live(Item::new("a", "2"))
        );

        let mut fixed = Shard::new();
        fixed.upsert(Item::new("a", "1"), t0, false, 0);
        fixed.upsert(Item::new("a", "2"), t0 + ms(80), false, 0);
        assert_eq!(fixed.peek("a", t0 + ms(150), TTL), Peek::Expired);
    }

    #[test]
    fn test_read_does_not_refresh_age() {
        let mut shard = Shard::new();
        let t0 = Instant::now();

        shard.upsert(Item::new("a", "1"), t0, true, 0);
        assert!(shard.lookup("a", t0 + ms(50), TTL).is_some());
        assert_eq!(shard.lookup("a", t0 + ms(120), TTL), None);
    }

    #[test]
    fn test_peek_classifies() {
        let mut shard = Shard::new();
        let t0 = Instant::now();
        shard.upsert(Item::new("a", "1"), t0, true, 0);

        assert_eq!(shard.peek("x", t0, TTL), Peek::Missing);
        assert_eq!(shard.peek("a", t0, TTL), Peek::Live(Item::new("a", "1")));
        assert_eq!(shard.peek("a", t0 + ms(200), TTL), Peek::Expired);
        // Peeking never mutates
        assert_eq!(shard.len(), 1);
    }

    #[test]
    fn test_remove_if_expired_revalidates() {
        let mut shard = Shard::new();
        let t0 = Instant::now();
        shard.upsert(Item::new("a", "1"), t0, true, 0);

        // Rewritten between phases: no longer expired, so kept
        shard.upsert(Item::new("a", "2"), t0 + ms(150), true, 0);
        assert!(!shard.remove_if_expired("a", t0 + ms(200), TTL));
        assert_eq!(shard.len(), 1);

        assert!(shard.remove_if_expired("a", t0 + ms(300), TTL));
        assert!(!shard.remove_if_expired("a", t0 + ms(300), TTL));
        assert!(shard.is_empty());
    }

    #[test]
    fn test_touch() {
        let mut shard = Shard::new();
        let t0 = Instant::now();
        shard.upsert(Item::new("a", "1"), t0, false, 0);
        shard.upsert(Item::new("b", "1"), t0, false, 0);

        assert!(shard.touch("a"));
        assert!(!shard.touch("zzz"));
        assert_eq!(shard.keys_by_recency(), vec!["b", "a"]);
    }

    #[test]
    fn test_sweep_removes_expired_prefix() {
        let mut shard = Shard::new();
        let t0 = Instant::now();

        shard.upsert(Item::new("a", "1"), t0, true, 0);
        shard.upsert(Item::new("b", "1"), t0 + ms(10), true, 0);
        shard.upsert(Item::new("c", "1"), t0 + ms(90), true, 0);

        let removed = shard.sweep_expired(t0 + ms(150), TTL);
        assert_eq!(removed, 2);
        assert_eq!(shard.keys_by_recency(), vec!["c"]);
        assert!(shard.check_consistency().is_ok());
    }

    #[test]
    fn test_sweep_stops_at_first_live_entry() {
        let mut shard = Shard::new();
        let t0 = Instant::now();

        shard.upsert(Item::new("old", "1"), t0, true, 0);
        shard.upsert(Item::new("fresh", "1"), t0 + ms(90), true, 0);
        // A read moves "old" behind "fresh" without refreshing it
        shard.lookup("old", t0 + ms(95), TTL);

        assert_eq!(shard.sweep_expired(t0 + ms(150), TTL), 0);
        assert_eq!(shard.len(), 2);
        // Lazy expiry still catches it
        assert_eq!(shard.lookup("old", t0 + ms(150), TTL), None);
    }

    #[test]
    fn test_sweep_with_ttl_disabled_is_noop() {
        let mut shard = Shard::new();
        let t0 = Instant::now();
        shard.upsert(Item::new("a", "1"), t0, false, 0);

        assert_eq!(shard.sweep_expired(t0 + Duration::from_secs(3600), Duration::ZERO), 0);
        assert_eq!(shard.len(), 1);
    }

    #[test]
    fn test_evict_front_bounded_by_len() {
        let mut shard = Shard::new();
        let t0 = Instant::now();
        shard.upsert(Item::new("a", "1"), t0, false, 0);
        shard.upsert(Item::new("b", "1"), t0, false, 0);

        assert_eq!(shard.evict_front(5), 2);
        assert!(shard.is_empty());
        assert!(shard.check_consistency().is_ok());
    }

    #[test]
    fn test_sweep_shards_visits_all() {
        let t0 = Instant::now();
        let shards: Vec<RwLock<Shard<Item>>> = (0..4).map(|_| RwLock::new(Shard::new())).collect();
        for (i, shard) in shards.iter().enumerate() {
            shard.write().upsert(Item::new(&format!("k{}", i), "v"), t0, true, 0);
        }

        assert_eq!(sweep_shards(&shards, t0 + ms(500), TTL), 4);
        assert!(shards.iter().all(|s| s.read().is_empty()));
    }
}
