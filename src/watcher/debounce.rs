//! Trailing-edge debouncing and throttling

use parking_lot::Mutex;
use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Runs an action once a window has passed
///
/// In the default mode each `trigger` aborts the action scheduled by the
/// previous one, so a burst collapses into a single run of the last action.
/// A [`Debouncer::throttled`] instance instead keeps the first pending
/// deadline and ignores triggers until it has run, so a steady stream of
/// triggers still runs the action once per window.
pub struct Debouncer {
    window: Duration,
    restart: bool,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            restart: true,
            pending: Mutex::new(None),
        }
    }

    /// A debouncer whose deadline is never pushed back by later triggers
    pub fn throttled(window: Duration) -> Self {
        Self {
            window,
            restart: false,
            pending: Mutex::new(None),
        }
    }

    /// Schedule `action` after the window
    ///
    /// Replaces any pending action, unless throttled and one is pending.
    pub fn trigger<F, Fut>(&self, action: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut pending = self.pending.lock();
        if !self.restart && pending.as_ref().is_some_and(|task| !task.is_finished()) {
            return;
        }

        let window = self.window;
        let task = tokio::spawn(async move {
            tokio::time::sleep(window).await;
            action().await;
        });

        if let Some(previous) = pending.replace(task) {
            previous.abort();
        }
    }

    /// Drop the pending action, if any
    pub fn cancel(&self) {
        if let Some(task) = self.pending.lock().take() {
            task.abort();
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending
            .lock()
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}
