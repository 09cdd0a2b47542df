//! Debounce scheduler: coalesces mutation bursts into one sync attempt.
//!
//! Classic debounce, not throttle: every `schedule` call resets the quiet
//! period, so a typing burst produces exactly one fire carrying whatever
//! state exists when the burst ends.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;

/// One-shot timer that is re-armed on every schedule call.
#[derive(Default)]
pub struct Debouncer {
    generation: Arc<AtomicU64>,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl Debouncer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel any pending timer and arm a new one. `action` runs exactly
    /// once, `window` after the most recent schedule call, unless superseded
    /// or cancelled first.
    pub fn schedule<F>(&self, window: Duration, action: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let armed = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let generation = Arc::clone(&self.generation);

        let handle = tokio::spawn(async move {
            tokio::time::sleep(window).await;
            // A newer schedule or a cancel moved the generation on; this
            // timer is stale even though it woke up.
            if generation.load(Ordering::SeqCst) == armed {
                action();
            }
        });

        if let Ok(mut pending) = self.pending.lock() {
            if let Some(stale) = pending.replace(handle) {
                stale.abort();
            }
        }
    }

    /// Drop the pending timer, if any. Invoked on unmount so no sync fires
    /// against a torn-down context.
    pub fn cancel(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut pending) = self.pending.lock() {
            if let Some(handle) = pending.take() {
                handle.abort();
            }
        }
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;

    const WINDOW: Duration = Duration::from_millis(500);

    fn counter() -> (Arc<AtomicUsize>, impl Fn() -> usize) {
        let count = Arc::new(AtomicUsize::new(0));
        let reader = Arc::clone(&count);
        (count, move || reader.load(Ordering::SeqCst))
    }

    #[tokio::test(start_paused = true)]
    async fn fires_once_after_the_quiet_period() {
        let debouncer = Debouncer::new();
        let (count, fired) = counter();

        let count_a = Arc::clone(&count);
        debouncer.schedule(WINDOW, move || {
            count_a.fetch_add(1, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(fired(), 1);

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(fired(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn rescheduling_resets_the_window() {
        let debouncer = Debouncer::new();
        let (count, fired) = counter();

        for _ in 0..5 {
            let count_a = Arc::clone(&count);
            debouncer.schedule(WINDOW, move || {
                count_a.fetch_add(1, Ordering::SeqCst);
            });
            tokio::time::sleep(Duration::from_millis(200)).await;
        }
        // 200ms after the last reschedule: still inside the window.
        assert_eq!(fired(), 0);

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(fired(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_prevents_the_pending_fire() {
        let debouncer = Debouncer::new();
        let (count, fired) = counter();

        let count_a = Arc::clone(&count);
        debouncer.schedule(WINDOW, move || {
            count_a.fetch_add(1, Ordering::SeqCst);
        });
        debouncer.cancel();

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(fired(), 0);
    }
}
