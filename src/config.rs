//! Configuration Module
//!
//! Handles loading and managing service configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

/// Cache construction parameters.
///
/// Values are kept signed so that negative settings coming from the
/// environment reach the cache's validation instead of being silently
/// dropped by the parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Requested number of shards (rounded up to a power of two)
    pub shard_count: i64,
    /// Soft upper bound on cached orders, 0 = unlimited
    pub max_items: i64,
    /// Time-to-live in milliseconds, 0 = disabled
    pub ttl_ms: i64,
    /// Reaper interval in milliseconds, 0 = default when TTL is enabled
    pub cleanup_interval_ms: i64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            shard_count: 16,
            max_items: 10_000,
            ttl_ms: 600_000,
            cleanup_interval_ms: 60_000,
        }
    }
}

/// Service configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Cache settings
    pub cache: CacheConfig,
    /// HTTP server port
    pub server_port: u16,
    /// Optional JSON snapshot of orders loaded at startup
    pub snapshot_path: Option<PathBuf>,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SHARD_COUNT` - Number of cache shards (default: 16)
    /// - `MAX_ITEMS` - Soft capacity, 0 = unlimited (default: 10000)
    /// - `CACHE_TTL_MS` - Entry TTL in milliseconds, 0 = disabled (default: 600000)
    /// - `CLEANUP_INTERVAL_MS` - Reaper interval in milliseconds (default: 60000)
    /// - `SERVER_PORT` - HTTP server port (default: 8081)
    /// - `SNAPSHOT_PATH` - JSON array of orders to preload (default: none)
    pub fn from_env() -> Self {
        let defaults = CacheConfig::default();
        Self {
            cache: CacheConfig {
                shard_count: env_or("SHARD_COUNT", defaults.shard_count),
                max_items: env_or("MAX_ITEMS", defaults.max_items),
                ttl_ms: env_or("CACHE_TTL_MS", defaults.ttl_ms),
                cleanup_interval_ms: env_or("CLEANUP_INTERVAL_MS", defaults.cleanup_interval_ms),
            },
            server_port: env_or("SERVER_PORT", 8081),
            snapshot_path: env::var("SNAPSHOT_PATH")
                .ok()
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            server_port: 8081,
            snapshot_path: None,
        }
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
