//! Expiry Sweep Task
//!
//! Background task that periodically removes expired memory driver entries.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::driver::memory::MemoryStore;

/// Spawns a background task that periodically sweeps expired entries.
///
/// The task runs in an infinite loop, sleeping for `interval` between passes.
/// Each pass takes the store's write lock, so readers never observe a
/// partially swept map. Reads already hide expired entries; the sweep only
/// bounds memory growth.
///
/// # Arguments
/// * `store` - shared reference to the memory store
/// * `interval` - time between sweep passes
///
/// # Returns
/// A JoinHandle for the spawned task. The owning driver aborts it on drop.
pub fn spawn_sweep_task(store: Arc<RwLock<MemoryStore>>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Starting expiry sweep task with interval of {:?}", interval);

        loop {
            tokio::time::sleep(interval).await;

            let removed = {
                let mut store_guard = store.write().await;
                store_guard.cleanup_expired()
            };

            if removed > 0 {
                info!("Expiry sweep: removed {} expired entries", removed);
            } else {
                debug!("Expiry sweep: no expired entries found");
            }
        }
    })
}
