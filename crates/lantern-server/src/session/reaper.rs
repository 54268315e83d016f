//! Periodic eviction of idle sessions.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::registry::SessionRegistry;

/// Spawn the sweep task.
///
/// Runs every `registry.timeout()` and removes sessions idle for at least
/// that long. Stops when `cancel` fires.
pub fn spawn_reaper(registry: Arc<SessionRegistry>, cancel: CancellationToken) -> JoinHandle<()> {
    let period = registry.timeout();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // Skip the immediate first tick
        let _ = interval.tick().await;

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    debug!("session reaper stopping");
                    break;
                }
                _ = interval.tick() => {
                    let evicted = registry.evict_idle();
                    if !evicted.is_empty() {
                        info!(count = evicted.len(), remaining = registry.len(), "evicted idle sessions");
                    }
                }
            }
        }
    })
}
