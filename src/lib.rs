//! Order Cache - order query service backed by a sharded in-process cache
//!
//! The cache is split into independently locked shards, each bounded by an
//! LRU capacity, with a TTL measured from the last write and a background
//! reaper that sweeps expired entries.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod snapshot;
mod tasks;

pub use api::AppState;
pub use cache::{Cacheable, OrderCache};
pub use config::{CacheConfig, Config};
pub use error::CacheError;
