//! Order Cache Module
//!
//! Sharded cache facade: validates configuration, routes keys to shards and
//! owns the background reaper.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::router::shard_index;
use crate::cache::shard::{sweep_shards, Peek, Shard};
use crate::cache::stats::{CacheCounters, CacheStats};
use crate::cache::{Cacheable, DEFAULT_CLEANUP_INTERVAL, MAX_SHARDS};
use crate::config::CacheConfig;
use crate::error::{CacheError, Result};
use crate::models::Order;
use crate::tasks::spawn_reaper;

// == Order Cache ==
/// Sharded LRU cache with per-entry TTL and a background reaper.
///
/// Capacity is enforced per shard: with `max_items > 0` every shard holds at
/// most `max(1, max_items / shard_count)` entries, so the aggregate bound is
/// soft and may exceed `max_items` after rounding.
///
/// The TTL is measured from the last `set` of a key; reads never extend it.
/// Expired entries are never returned by [`get`](Self::get). The reaper only
/// reclaims memory early and may leave some expired entries for lazy expiry.
pub struct OrderCache<V = Order> {
    shards: Arc<[RwLock<Shard<V>>]>,
    mask: u32,
    per_shard_capacity: usize,
    ttl: Duration,
    cleanup_interval: Duration,
    counters: Arc<CacheCounters>,
    closed: AtomicBool,
    stop_tx: watch::Sender<bool>,
    pub(crate) reaper: Mutex<Option<JoinHandle<()>>>,
}

impl<V> OrderCache<V>
where
    V: Cacheable + Clone + Send + Sync + 'static,
{
    // == Constructor ==
    /// Creates a new cache.
    ///
    /// # Arguments
    /// * `shard_count` - Requested shards, rounded up to a power of two
    /// * `max_items` - Soft capacity, 0 = unlimited
    /// * `ttl` - Entry time-to-live, zero = disabled
    /// * `cleanup_interval` - Reaper period, zero = one minute when TTL is enabled
    ///
    /// The reaper is spawned on the current Tokio runtime when the TTL is
    /// enabled. Without a runtime the cache relies on lazy expiry alone.
    pub fn new(
        shard_count: usize,
        max_items: usize,
        ttl: Duration,
        cleanup_interval: Duration,
    ) -> Result<Self> {
        if shard_count == 0 {
            return Err(CacheError::InvalidConfiguration(
                "shard_count must be > 0".to_string(),
            ));
        }
        if max_items > 0 && max_items < shard_count {
            return Err(CacheError::InvalidConfiguration(
                "max_items must be >= shard_count (or 0 for unlimited)".to_string(),
            ));
        }
        let shard_count = shard_count
            .checked_next_power_of_two()
            .filter(|&count| count <= MAX_SHARDS)
            .ok_or_else(|| {
                CacheError::InvalidConfiguration(format!(
                    "shard_count must be <= {}",
                    MAX_SHARDS
                ))
            })?;

        let per_shard_capacity = if max_items > 0 {
            (max_items / shard_count).max(1)
        } else {
            0
        };
        let cleanup_interval = if !ttl.is_zero() && cleanup_interval.is_zero() {
            DEFAULT_CLEANUP_INTERVAL
        } else {
            cleanup_interval
        };
        // The reaper schedules its first tick one interval from now
        if !ttl.is_zero() && Instant::now().checked_add(cleanup_interval).is_none() {
            return Err(CacheError::InvalidConfiguration(
                "cleanup_interval is too large".to_string(),
            ));
        }

        let shards: Vec<RwLock<Shard<V>>> =
            (0..shard_count).map(|_| RwLock::new(Shard::new())).collect();
        let (stop_tx, stop_rx) = watch::channel(false);

        let cache = Self {
            shards: shards.into(),
            mask: (shard_count - 1) as u32,
            per_shard_capacity,
            ttl,
            cleanup_interval,
            counters: Arc::new(CacheCounters::new()),
            closed: AtomicBool::new(false),
            stop_tx,
            reaper: Mutex::new(None),
        };

        if !ttl.is_zero() {
            cache.start_reaper(stop_rx);
        }

        info!(
            shard_count,
            per_shard_capacity,
            ?ttl,
            ?cleanup_interval,
            "Order cache initialized"
        );
        Ok(cache)
    }

    /// Creates a cache from configuration values.
    ///
    /// Negative values are rejected with [`CacheError::InvalidConfiguration`].
    pub fn from_config(config: &CacheConfig) -> Result<Self> {
        let shard_count = non_negative("shard_count", config.shard_count)?;
        let max_items = non_negative("max_items", config.max_items)?;
        let ttl_ms = non_negative("ttl", config.ttl_ms)?;
        let cleanup_ms = non_negative("cleanup_interval", config.cleanup_interval_ms)?;

        Self::new(
            shard_count,
            max_items,
            Duration::from_millis(ttl_ms as u64),
            Duration::from_millis(cleanup_ms as u64),
        )
    }

    fn start_reaper(&self, stop_rx: watch::Receiver<bool>) {
        if tokio::runtime::Handle::try_current().is_err() {
            warn!("No Tokio runtime available, TTL sweeping disabled (lazy expiry only)");
            return;
        }
        let handle = spawn_reaper(
            Arc::clone(&self.shards),
            Arc::clone(&self.counters),
            self.ttl,
            self.cleanup_interval,
            stop_rx,
        );
        *self.reaper.lock() = Some(handle);
    }

    // == Set ==
    /// Inserts or replaces `value` under its own key.
    pub fn set(&self, value: V) {
        let shard = self.shard_for(value.cache_key());
        let evicted = shard.write().upsert(
            value,
            Instant::now(),
            !self.ttl.is_zero(),
            self.per_shard_capacity,
        );
        if evicted > 0 {
            self.counters.record_evictions(evicted);
            debug!(evicted, "Capacity eviction");
        }
    }

    // == Get ==
    /// Returns a copy of the value stored under `key`.
    ///
    /// The lookup runs under the shard's read lock; marking the entry as
    /// recently used (or dropping it when expired) happens under a separate
    /// write lock that re-fetches the key first.
    pub fn get(&self, key: &str) -> Option<V> {
        let shard = self.shard_for(key);
        let now = Instant::now();

        let peeked = shard.read().peek(key, now, self.ttl);
        match peeked {
            Peek::Missing => {
                self.counters.record_miss();
                None
            }
            Peek::Live(value) => {
                shard.write().touch(key);
                self.counters.record_hit();
                Some(value)
            }
            Peek::Expired => {
                let mut guard = shard.write();
                if guard.remove_if_expired(key, now, self.ttl) {
                    drop(guard);
                    self.counters.record_expirations(1);
                    self.counters.record_miss();
                    return None;
                }
                // Rewritten or removed since the read phase
                let value = guard.lookup(key, now, self.ttl);
                drop(guard);
                match value {
                    Some(value) => {
                        self.counters.record_hit();
                        Some(value)
                    }
                    None => {
                        self.counters.record_miss();
                        None
                    }
                }
            }
        }
    }

    // == Load From Slice ==
    /// Sets every value in order; later duplicates win.
    pub fn load_from_slice(&self, values: &[V]) {
        for value in values {
            self.set(value.clone());
        }
        debug!(count = values.len(), "Bulk load complete");
    }
}

impl<V> OrderCache<V> {
    // == Close ==
    /// Stops the reaper.
    ///
    /// The cache stays readable and writable afterwards. A second call returns
    /// [`CacheError::AlreadyClosed`] and has no other effect.
    pub fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            warn!("Close called on an already closed cache");
            return Err(CacheError::AlreadyClosed);
        }
        self.stop_tx.send_replace(true);
        info!("Order cache closed");
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Returns true while a reaper task exists and has not finished.
    pub fn reaper_running(&self) -> bool {
        self.reaper
            .lock()
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    // == Sweep Expired ==
    /// Runs one reaper pass over every shard immediately.
    pub fn sweep_expired(&self) -> usize {
        let removed = sweep_shards(&self.shards, Instant::now(), self.ttl);
        self.counters.record_expirations(removed);
        removed
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        self.counters.snapshot(self.len())
    }

    // == Length ==
    /// Returns the number of entries across all shards, including expired
    /// entries not yet reclaimed.
    pub fn len(&self) -> usize {
        self.shards.iter().map(|shard| shard.read().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.shards.iter().all(|shard| shard.read().is_empty())
    }

    // == Accessors ==
    /// Actual number of shards (a power of two).
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Per-shard capacity, 0 = unlimited.
    pub fn per_shard_capacity(&self) -> usize {
        self.per_shard_capacity
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn cleanup_interval(&self) -> Duration {
        self.cleanup_interval
    }

    /// Index of the shard `key` routes to.
    pub fn shard_of(&self, key: &str) -> usize {
        shard_index(key, self.mask)
    }

    /// Number of entries held by shard `idx`.
    pub fn shard_len(&self, idx: usize) -> Option<usize> {
        self.shards.get(idx).map(|shard| shard.read().len())
    }

    /// Checks the map/recency-list invariant on every shard.
    pub fn check_consistency(&self) -> std::result::Result<(), String> {
        for (idx, shard) in self.shards.iter().enumerate() {
            shard
                .read()
                .check_consistency()
                .map_err(|err| format!("shard {}: {}", idx, err))?;
        }
        Ok(())
    }

    fn shard_for(&self, key: &str) -> &RwLock<Shard<V>> {
        &self.shards[shard_index(key, self.mask)]
    }
}

impl<V> Drop for OrderCache<V> {
    fn drop(&mut self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            self.stop_tx.send_replace(true);
        }
    }
}

fn non_negative(name: &str, value: i64) -> Result<usize> {
    usize::try_from(value)
        .map_err(|_| CacheError::InvalidConfiguration(format!("{} must be >= 0", name)))
}
