//! Startup Snapshot
//!
//! Reads the initial set of orders (a JSON array) that is bulk-loaded into
//! the cache before the service starts answering queries.

use std::fs;
use std::path::Path;

use tracing::{info, warn};

use crate::cache::OrderCache;
use crate::error::SnapshotError;
use crate::models::Order;

/// Reads orders from a JSON array file, dropping ones that fail validation.
pub fn read_snapshot(path: &Path) -> Result<Vec<Order>, SnapshotError> {
    let data = fs::read(path)?;
    let orders: Vec<Order> = serde_json::from_slice(&data)?;
    let total = orders.len();

    let valid: Vec<Order> = orders
        .into_iter()
        .filter(|order| match order.validate() {
            Some(reason) => {
                warn!("Skipping snapshot order: {}", reason);
                false
            }
            None => true,
        })
        .collect();

    info!(
        "Read {} orders from {} ({} skipped)",
        valid.len(),
        path.display(),
        total - valid.len()
    );
    Ok(valid)
}

/// Reads the snapshot at `path` and loads it into `cache` in file order.
///
/// Returns the number of orders loaded.
pub fn load_snapshot(cache: &OrderCache, path: &Path) -> Result<usize, SnapshotError> {
    let orders = read_snapshot(path)?;
    cache.load_from_slice(&orders);
    info!("Loaded {} orders into cache", orders.len());
    Ok(orders.len())
}
