//! Background Tasks Module
//!
//! Contains background tasks that run periodically while a cache is open.
//!
//! # Tasks
//! - Reaper: sweeps TTL-expired entries from every shard at a fixed interval

mod reaper;

pub use reaper::spawn_reaper;
