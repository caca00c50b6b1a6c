//! Active expiration task
//!
//! Periodically runs a sampling pass over the store so keys that are never
//! read again still get reclaimed.

use super::memory::MemoryStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Spawn the background sweeper
///
/// Runs one `sweep_expired` pass per `period` on the blocking pool until
/// `shutdown` is cancelled.
pub fn spawn_sweeper(
    store: Arc<MemoryStore>,
    period: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Active expiration every {:?}", period);
        let mut ticker = tokio::time::interval(period);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    // Synchronous pass, one store lock per sampled key
                    let pass_store = store.clone();
                    match tokio::task::spawn_blocking(move || pass_store.sweep_expired()).await {
                        Ok(stats) if stats.expired > 0 => {
                            debug!(
                                "Active expiration removed {} keys ({} sampled in {} rounds{})",
                                stats.expired,
                                stats.sampled,
                                stats.rounds,
                                if stats.out_of_time { ", out of time" } else { "" }
                            );
                        }
                        Ok(_) => {}
                        Err(e) => warn!("Active expiration pass failed: {}", e),
                    }
                }
                _ = shutdown.cancelled() => {
                    debug!("Active expiration stopped");
                    break;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Entry, Value};
    use std::time::SystemTime;

    #[tokio::test]
    async fn test_sweeper_reclaims_expired_keys() {
        let store = Arc::new(MemoryStore::new());
        let past = SystemTime::now() - Duration::from_secs(1);
        for i in 0..30 {
            store.set(format!("k{}", i), Entry::with_expiry(Value::integer(i), past));
        }
        store.set("live", Entry::new(Value::string("v")));

        let shutdown = CancellationToken::new();
        let handle = spawn_sweeper(store.clone(), Duration::from_millis(10), shutdown.clone());

        tokio::time::sleep(Duration::from_millis(100)).await;
        shutdown.cancel();
        handle.await.unwrap();

        assert!(store.contains(b"live"));
        assert!(store.len() < 31);
    }

    #[tokio::test]
    async fn test_sweeper_stops_on_shutdown() {
        let store = Arc::new(MemoryStore::new());
        let shutdown = CancellationToken::new();
        let handle = spawn_sweeper(store, Duration::from_secs(3600), shutdown.clone());

        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("sweeper did not stop")
            .unwrap();
    }
}
