//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

use std::time::{Duration, Instant};

// == Cacheable ==
/// A value that carries its own unique cache key.
pub trait Cacheable {
    /// Returns the key the value is stored under.
    fn cache_key(&self) -> &str;
}

// == Cache Entry ==
/// Represents a single cache entry with value and metadata.
///
/// The entry's position in its shard's recency list is the slot index that
/// the shard's key map points at.
#[derive(Debug, Clone)]
pub struct Entry<V> {
    /// Key the entry is stored under
    pub key: String,
    /// The stored value
    pub value: V,
    /// Time of creation, or of the last write when TTL is enabled
    pub created_at: Instant,
}

impl<V> Entry<V> {
    // == Constructor ==
    /// Creates a new entry stamped with `now`.
    pub fn new(key: String, value: V, now: Instant) -> Self {
        Self {
            key,
            value,
            created_at: now,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has outlived `ttl` at time `now`.
    ///
    /// A zero `ttl` disables expiry. The entry is expired only once its age is
    /// strictly greater than `ttl`.
    pub fn is_expired(&self, now: Instant, ttl: Duration) -> bool {
        !ttl.is_zero() && self.age(now) > ttl
    }

    // == Age ==
    /// Returns how long ago the entry was written.
    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.created_at)
    }
}
