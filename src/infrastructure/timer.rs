use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::sleep;

/// Single-slot one-shot timer.
///
/// Arming always clears the previous timer first, so at most one callback
/// is ever in flight.
#[derive(Debug, Default)]
pub struct Timer {
    handle: Option<JoinHandle<()>>,
}

impl Timer {
    pub fn new() -> Self {
        Self { handle: None }
    }

    /// Runs `task` after `delay`, replacing whatever was armed.
    pub fn arm<F>(&mut self, delay: Duration, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.clear();
        self.handle = Some(tokio::spawn(async move {
            sleep(delay).await;
            task.await;
        }));
    }

    /// Cancels the armed timer. No-op when nothing is armed.
    pub fn clear(&mut self) {
        if let Some(handle) = self.handle.take() {
            // A callback clearing its own slot must not abort itself
            if tokio::task::try_id() != Some(handle.id()) {
                handle.abort();
            }
        }
    }

    /// Whether the caller is running as this timer's armed callback.
    ///
    /// False once the timer was cleared or re-armed.
    pub fn is_current_task(&self) -> bool {
        self.handle
            .as_ref()
            .is_some_and(|handle| tokio::task::try_id() == Some(handle.id()))
    }

    pub fn is_armed(&self) -> bool {
        self.handle.as_ref().is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        self.clear();
    }
}
