//! TTL Reaper Task
//!
//! Background task that periodically removes expired cache entries.

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::cache::shard::{sweep_shards, Shard};
use crate::cache::stats::CacheCounters;

/// Spawns a background task that sweeps expired entries from every shard.
///
/// The first sweep runs one `interval` after spawning. Each tick visits the
/// shards in order, holding one shard's write lock at a time. The task exits
/// as soon as `stop` flips to `true` or its sender is dropped, and performs no
/// further sweeps after that.
///
/// A panic inside the sweeper is not recoverable: it is logged and the
/// process is aborted rather than leaving the cache without its reaper.
///
/// # Arguments
/// * `shards` - Shard array shared with the cache facade
/// * `counters` - Counters credited with every expired entry removed
/// * `ttl` - Entry time-to-live
/// * `interval` - Time between sweeps, must be non-zero and representable as
///   an offset from now (`OrderCache::new` checks both)
/// * `stop` - Stop signal from the cache's `close`
///
/// # Returns
/// A JoinHandle that completes once the sweeper has exited.
///
/// # Panics
/// Must be called from within a Tokio runtime.
pub fn spawn_reaper<V>(
    shards: Arc<[RwLock<Shard<V>>]>,
    counters: Arc<CacheCounters>,
    ttl: Duration,
    interval: Duration,
    stop: watch::Receiver<bool>,
) -> JoinHandle<()>
where
    V: Send + Sync + 'static,
{
    let sweeper = tokio::spawn(run_reaper(shards, counters, ttl, interval, stop));

    tokio::spawn(async move {
        let exit = sweeper.await;
        if is_fatal_exit(&exit) {
            if let Err(err) = exit {
                error!(
                    "TTL reaper panicked: {}",
                    panic_message(err.into_panic().as_ref())
                );
            }
            std::process::abort();
        }
    })
}

async fn run_reaper<V>(
    shards: Arc<[RwLock<Shard<V>>]>,
    counters: Arc<CacheCounters>,
    ttl: Duration,
    interval: Duration,
    mut stop: watch::Receiver<bool>,
) {
    info!(?interval, "Starting TTL reaper");

    let mut ticker = interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        if *stop.borrow() {
            break;
        }

        tokio::select! {
            biased;

            changed = stop.changed() => {
                // Err means the cache is gone
                if changed.is_err() {
                    break;
                }
            }
            _ = ticker.tick() => {
                let removed = sweep_shards(&shards, std::time::Instant::now(), ttl);
                counters.record_expirations(removed);

                if removed > 0 {
                    info!("TTL sweep: removed {} expired entries", removed);
                } else {
                    debug!("TTL sweep: no expired entries found");
                }
            }
        }
    }

    info!("TTL reaper stopped");
}

/// Cancellation during runtime shutdown is a normal exit; only panics are fatal.
fn is_fatal_exit(exit: &Result<(), JoinError>) -> bool {
    matches!(exit, Err(err) if err.is_panic())
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.as_str()
    } else {
        "unknown panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::testing::Item;
    use crate::cache::OrderCache;

    fn shard_array(count: usize) -> Arc<[RwLock<Shard<Item>>]> {
        let shards: Vec<RwLock<Shard<Item>>> =
            (0..count).map(|_| RwLock::new(Shard::new())).collect();
        shards.into()
    }

    fn total_len(shards: &[RwLock<Shard<Item>>]) -> usize {
        shards.iter().map(|s| s.read().len()).sum()
    }

    #[tokio::test]
    async fn test_reaper_removes_expired_entries() {
        let shards = shard_array(2);
        let counters = Arc::new(CacheCounters::new());
        let now = std::time::Instant::now();
        shards[0].write().upsert(Item::new("a", "v"), now, true, 0);
        shards[1].write().upsert(Item::new("b", "v"), now, true, 0);

        let (stop_tx, stop_rx) = watch::channel(false);
        let handle = spawn_reaper(
            Arc::clone(&shards),
            Arc::clone(&counters),
            Duration::from_millis(20),
            Duration::from_millis(10),
            stop_rx,
        );

        tokio::time::sleep(Duration::from_millis(150)).await;

        assert_eq!(total_len(&shards), 0, "expired entries should be swept");
        assert_eq!(counters.snapshot(0).expirations, 2);

        stop_tx.send_replace(true);
        handle.await.expect("reaper should exit cleanly");
    }

    #[tokio::test]
    async fn test_reaper_preserves_valid_entries() {
        let shards = shard_array(1);
        let now = std::time::Instant::now();
        shards[0].write().upsert(Item::new("long_lived", "v"), now, true, 0);

        let (stop_tx, stop_rx) = watch::channel(false);
        let handle = spawn_reaper(
            Arc::clone(&shards),
            Arc::new(CacheCounters::new()),
            Duration::from_secs(3600),
            Duration::from_millis(10),
            stop_rx,
        );

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(total_len(&shards), 1, "valid entry should not be removed");

        stop_tx.send_replace(true);
        handle.await.expect("reaper should exit cleanly");
    }

    #[tokio::test]
    async fn test_reaper_stops_on_signal_without_sweeping() {
        let shards = shard_array(1);
        let (stop_tx, stop_rx) = watch::channel(false);
        let handle = spawn_reaper(
            Arc::clone(&shards),
            Arc::new(CacheCounters::new()),
            Duration::from_millis(1),
            Duration::from_millis(50),
            stop_rx,
        );

        stop_tx.send_replace(true);
        tokio::time::timeout(Duration::from_millis(500), handle)
            .await
            .expect("reaper should stop well within one interval")
            .expect("reaper should not panic");

        // Written after the stop: nothing may sweep it
        shards[0]
            .write()
            .upsert(Item::new("late", "v"), std::time::Instant::now(), true, 0);
        tokio::time::sleep(Duration::from_millis(120)).await;
        assert_eq!(total_len(&shards), 1);
    }

    #[tokio::test]
    async fn test_reaper_exits_when_sender_dropped() {
        let (stop_tx, stop_rx) = watch::channel(false);
        let handle = spawn_reaper(
            shard_array(1),
            Arc::new(CacheCounters::new()),
            Duration::from_millis(1),
            Duration::from_millis(10),
            stop_rx,
        );

        drop(stop_tx);
        tokio::time::timeout(Duration::from_millis(500), handle)
            .await
            .expect("reaper should exit once the cache is gone")
            .expect("reaper should not panic");
    }

    #[tokio::test]
    async fn test_cache_starts_and_stops_reaper() {
        let cache: OrderCache<Item> =
            OrderCache::new(4, 0, Duration::from_millis(30), Duration::from_millis(10)).unwrap();
        assert!(cache.reaper_running());

        for i in 0..20 {
            cache.set(Item::new(&format!("k{}", i), "v"));
        }
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(cache.is_empty(), "reaper should have swept every shard");

        cache.close().unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!cache.reaper_running(), "reaper should stop after close");
    }

    #[tokio::test]
    async fn test_capacity_only_cache_has_no_reaper() {
        let cache: OrderCache<Item> =
            OrderCache::new(2, 4, Duration::ZERO, Duration::from_millis(10)).unwrap();
        assert!(!cache.reaper_running());
    }

    #[tokio::test]
    async fn test_dropping_cache_stops_reaper() {
        let reaper_handle;
        {
            let cache: OrderCache<Item> =
                OrderCache::new(1, 0, Duration::from_millis(30), Duration::from_millis(10))
                    .unwrap();
            reaper_handle = cache.reaper.lock().take();
        }
        let handle = reaper_handle.expect("reaper should have been spawned");
        tokio::time::timeout(Duration::from_millis(500), handle)
            .await
            .expect("reaper should stop once the cache is dropped")
            .expect("reaper should not panic");
    }

    #[tokio::test]
    async fn test_panicked_sweeper_is_fatal() {
        let exit = tokio::spawn(async { panic!("sweep failed") }).await;
        assert!(is_fatal_exit(&exit));

        let payload = exit.unwrap_err().into_panic();
        assert_eq!(panic_message(payload.as_ref()), "sweep failed");
    }

    #[tokio::test]
    async fn test_clean_or_cancelled_exit_is_not_fatal() {
        assert!(!is_fatal_exit(&Ok(())));

        let pending = tokio::spawn(std::future::pending::<()>());
        pending.abort();
        let exit = pending.await;
        assert!(exit.as_ref().is_err_and(|err| err.is_cancelled()));
        assert!(!is_fatal_exit(&exit));
    }

    #[test]
    fn test_panic_message_formats() {
        let owned: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(owned.as_ref()), "owned");

        let other: Box<dyn Any + Send> = Box::new(42u32);
        assert_eq!(panic_message(other.as_ref()), "unknown panic payload");
    }
}
