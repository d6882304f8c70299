//! Cancellable dismissal timer for notifications.
//!
//! A notification stays visible for a fixed delay. Showing a new one must
//! restart that delay, so the pending dismissal is a spawned tokio task whose
//! handle is kept here: scheduling aborts the previous task before the new
//! one takes its place. The reducer additionally ignores expiries for any
//! notification but the latest, so an abort that loses the race is harmless.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

/// Holds at most one pending dismissal task.
#[derive(Debug, Default)]
pub struct DismissTimer {
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl DismissTimer {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `on_expire` after `delay`, cancelling any pending dismissal.
    ///
    /// Returns `false` when called outside a tokio runtime; nothing is
    /// scheduled then and the previous dismissal is still cancelled.
    pub fn schedule<F>(&self, delay: Duration, on_expire: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            debug!("No tokio runtime; notification will not auto-dismiss");
            self.cancel();
            return false;
        };

        let task = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            on_expire();
        });

        if let Some(previous) = self.slot().replace(task) {
            previous.abort();
        }
        true
    }

    /// Abort the pending dismissal, if any.
    pub fn cancel(&self) {
        if let Some(previous) = self.slot().take() {
            previous.abort();
        }
    }

    /// Whether a dismissal is scheduled and has not fired yet.
    pub fn is_pending(&self) -> bool {
        self.slot().as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for DismissTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn fires_after_delay() {
        let timer = DismissTimer::new();
        let fired = Arc::new(AtomicUsize::new(0));
        let f = fired.clone();
        assert!(timer.schedule(Duration::from_millis(3500), move || {
            f.fetch_add(1, Ordering::SeqCst);
        }));

        tokio::time::sleep(Duration::from_millis(3400)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert!(timer.is_pending());

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!timer.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn rescheduling_cancels_previous() {
        let timer = DismissTimer::new();
        let fired = Arc::new(AtomicUsize::new(0));

        let f = fired.clone();
        timer.schedule(Duration::from_millis(100), move || {
            f.fetch_add(1, Ordering::SeqCst);
        });
        let f = fired.clone();
        timer.schedule(Duration::from_millis(100), move || {
            f.fetch_add(10, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_prevents_firing() {
        let timer = DismissTimer::new();
        let fired = Arc::new(AtomicUsize::new(0));
        let f = fired.clone();
        timer.schedule(Duration::from_millis(100), move || {
            f.fetch_add(1, Ordering::SeqCst);
        });
        timer.cancel();
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn without_runtime_nothing_is_scheduled() {
        let timer = DismissTimer::new();
        assert!(!timer.schedule(Duration::from_millis(1), || {}));
        assert!(!timer.is_pending());
    }
}
