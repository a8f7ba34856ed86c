use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;

/// Cancellable fire-once timer with last-write-wins semantics.
///
/// Arming the timer again before it fires aborts the previous timer. Once a
/// timer fires, its `on_fire` closure runs synchronously on the timer task and
/// the future it returns is spawned detached, so later cancellation only ever
/// hits a timer that is still waiting, never work that already started.
///
/// Must be armed from within a Tokio runtime.
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    pending: Option<JoinHandle<()>>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Arms the timer, cancelling any timer that has not fired yet.
    pub fn schedule<F, Fut>(&mut self, on_fire: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.cancel();
        let delay = self.delay;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            tokio::spawn(on_fire());
        }));
    }

    /// Cancels a timer that has not fired yet.
    ///
    /// Returns `true` if an armed timer was cancelled.
    pub fn cancel(&mut self) -> bool {
        match self.pending.take() {
            Some(handle) if !handle.is_finished() => {
                handle.abort();
                tracing::debug!("debounce timer cancelled");
                true
            }
            _ => false,
        }
    }

    /// `true` while a timer is armed and has not fired.
    pub fn is_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}
