//! Shutdown of the listener, reaper, and engine tasks.
//!
//! Every long-running task registers its handle with the coordinator.
//! [`ShutdownCoordinator::graceful_shutdown`] cancels the shared token, waits
//! for the tasks to drain, and aborts whatever is still running at the
//! deadline.

use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

struct Tracked {
    name: &'static str,
    handle: JoinHandle<()>,
}

/// Owns the cancellation token and the handles of the tasks it stops.
pub struct ShutdownCoordinator {
    token: CancellationToken,
    tasks: Mutex<Vec<Tracked>>,
}

impl ShutdownCoordinator {
    /// Create a coordinator with no tracked tasks.
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Token observed by every channel and task.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Cancel the token without waiting.
    pub fn shutdown(&self) {
        self.token.cancel();
    }

    /// Hand a task over to be stopped at shutdown.
    pub fn track(&self, name: &'static str, handle: JoinHandle<()>) {
        debug!(task = name, "tracking task");
        self.tasks.lock().push(Tracked { name, handle });
    }

    /// Number of tracked tasks not yet reaped by a shutdown.
    pub fn tracked(&self) -> usize {
        self.tasks.lock().len()
    }

    /// Cancel, wait up to `timeout` for tracked tasks, then abort stragglers.
    ///
    /// Returns how many tasks were aborted.
    pub async fn graceful_shutdown(&self, timeout: Duration) -> usize {
        self.shutdown();
        let mut tasks = std::mem::take(&mut *self.tasks.lock());
        info!(
            task_count = tasks.len(),
            timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            "stopping tasks"
        );

        let drain = futures::future::join_all(tasks.iter_mut().map(|t| &mut t.handle));
        if tokio::time::timeout(timeout, drain).await.is_ok() {
            return 0;
        }

        let mut aborted = 0;
        for task in &tasks {
            if !task.handle.is_finished() {
                warn!(task = task.name, "task still running after {timeout:?}, aborting");
                task.handle.abort();
                aborted += 1;
            }
        }
        aborted
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}
