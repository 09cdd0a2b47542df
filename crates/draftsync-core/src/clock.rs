//! Logical clock for last-write-wins timestamps.
//!
//! Draft mutations are ordered by a unix-millisecond timestamp. Wall clocks
//! can stand still (or step backwards under NTP correction) within a burst of
//! keystrokes, so the system clock is wrapped to never hand out the same
//! value twice.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// Source of unix-millisecond timestamps for mutation ordering.
pub trait Clock: Send + Sync {
    /// Current logical time in unix milliseconds. Strictly monotonic:
    /// successive calls on the same clock never return the same value.
    fn now_ms(&self) -> i64;
}

/// System clock forced strictly monotonic.
#[derive(Debug, Default)]
pub struct SystemClock {
    last: AtomicI64,
}

impl SystemClock {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        let wall = chrono::Utc::now().timestamp_millis();
        self.last
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(wall.max(last.saturating_add(1)))
            })
            .map_or(wall, |last| wall.max(last.saturating_add(1)))
    }
}

/// Manually advanced clock for tests.
#[derive(Debug)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    #[must_use]
    pub fn new(start_ms: i64) -> Arc<Self> {
        Arc::new(Self {
            now: AtomicI64::new(start_ms),
        })
    }

    /// Jump the clock forward by `delta_ms`.
    pub fn advance(&self, delta_ms: i64) {
        self.now.fetch_add(delta_ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        // Tick by one on every read so two mutations never share a timestamp.
        self.now.fetch_add(1, Ordering::SeqCst) + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_clock_is_strictly_monotonic() {
        let clock = SystemClock::new();
        let mut previous = clock.now_ms();
        for _ in 0..1000 {
            let next = clock.now_ms();
            assert!(next > previous);
            previous = next;
        }
    }

    #[test]
    fn manual_clock_advances() {
        let clock = ManualClock::new(100);
        let first = clock.now_ms();
        clock.advance(50);
        let second = clock.now_ms();
        assert!(second >= first + 50);
    }
}
