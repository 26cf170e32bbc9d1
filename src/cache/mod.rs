//! Cache Module
//!
//! Provides a sharded in-memory cache with per-shard LRU eviction and TTL
//! expiration.

mod entry;
mod recency;
mod router;
pub(crate) mod shard;
pub(crate) mod stats;
mod store;

#[cfg(test)]
pub(crate) mod testing;

use std::time::Duration;

// Re-export public types
pub use entry::{Cacheable, Entry};
pub use recency::RecencyList;
pub use router::{fnv1a_32, shard_index};
pub use stats::CacheStats;
pub use store::OrderCache;

// == Public Constants ==
/// Reaper interval used when a TTL is set without one
pub const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

/// Upper bound on the (rounded) number of shards
pub const MAX_SHARDS: usize = 1 << 16;
