use std::future::Future;

use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio_util::task::TaskTracker;

/// Holds the manager's background tasks and their shutdown channel.
/// Tasks may be added at any time (account workers come and go); `shutdown()`
/// signals all of them and waits until every one has returned.
pub struct ServiceHandle {
    shutdown_tx: watch::Sender<bool>,
    tracker: TaskTracker,
    runtime: Handle,
}

impl ServiceHandle {
    pub fn new(runtime: Handle) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self { shutdown_tx, tracker: TaskTracker::new(), runtime }
    }

    /// Spawn a tracked task on the runtime captured at construction, so callers
    /// need not be inside a runtime themselves.
    pub fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.tracker.spawn_on(task, &self.runtime);
    }

    /// Return a shutdown receiver for a task that needs to observe shutdown state.
    pub fn shutdown_rx(&self) -> watch::Receiver<bool> {
        self.shutdown_tx.subscribe()
    }

    /// Tasks still running.
    pub fn active_tasks(&self) -> usize {
        self.tracker.len()
    }

    /// Signal shutdown to all tasks and wait for them to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        self.tracker.close();
        self.tracker.wait().await;
    }
}
