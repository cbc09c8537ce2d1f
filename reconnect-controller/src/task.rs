//! Owned handle to a timer or background attempt.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;

/// A spawned timer or attempt owned by the controller.
///
/// The task is aborted when the handle is cancelled or dropped, so replacing
/// the controller's pending slot can never leave a stray timer behind.
pub struct ScheduledTask {
    label: &'static str,
    handle: JoinHandle<()>,
}

impl ScheduledTask {
    /// Run `future` in the background
    pub(crate) fn spawn<F>(label: &'static str, future: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        Self {
            label,
            handle: tokio::spawn(future),
        }
    }

    /// Run `on_fire` once `delay` has elapsed
    pub(crate) fn after<F>(label: &'static str, delay: Duration, on_fire: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self::spawn(label, async move {
            tokio::time::sleep(delay).await;
            on_fire();
        })
    }

    /// Stop the task if it has not completed yet
    pub fn cancel(self) {
        tracing::trace!(task = self.label, "cancelling scheduled task");
        // Drop aborts
    }

    #[cfg(test)]
    pub(crate) fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for ScheduledTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

impl std::fmt::Debug for ScheduledTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScheduledTask")
            .field("label", &self.label)
            .field("finished", &self.handle.is_finished())
            .finish()
    }
}
