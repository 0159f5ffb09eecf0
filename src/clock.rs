//! Timestamp sources for snapshot acceptance.
//!
//! Timestamps are `i64` milliseconds since the Unix epoch. The registry
//! never trusts a clock to be monotonic on its own; it clamps every reading
//! against the last committed timestamp (see [`crate::registry::Registry`]).

use std::sync::atomic::{AtomicI64, Ordering};

/// Milliseconds since the Unix epoch.
pub type Timestamp = i64;

/// Source of acceptance timestamps.
pub trait Clock: Send + Sync {
    /// Current time in milliseconds since the Unix epoch.
    fn now(&self) -> Timestamp;
}

/// Wall clock backed by `chrono::Utc`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Manually driven clock.
///
/// Useful wherever timestamps must be deterministic: each reading returns the
/// current value, optionally advancing by a fixed step afterwards.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
    step: AtomicI64,
}

impl ManualClock {
    /// Clock frozen at `start`.
    pub fn new(start: Timestamp) -> Self {
        Self {
            now: AtomicI64::new(start),
            step: AtomicI64::new(0),
        }
    }

    /// Clock that advances by `step` after every reading.
    pub fn ticking(start: Timestamp, step: i64) -> Self {
        Self {
            now: AtomicI64::new(start),
            step: AtomicI64::new(step),
        }
    }

    /// Jump to an absolute time. Moving backwards is allowed.
    pub fn set(&self, now: Timestamp) {
        self.now.store(now, Ordering::SeqCst);
    }

    /// Move forward by `delta` milliseconds.
    pub fn advance(&self, delta: i64) {
        self.now.fetch_add(delta, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        let step = self.step.load(Ordering::SeqCst);
        self.now.fetch_add(step, Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_frozen() {
        let clock = ManualClock::new(42);
        assert_eq!(clock.now(), 42);
        assert_eq!(clock.now(), 42);
    }

    #[test]
    fn test_manual_clock_ticking() {
        let clock = ManualClock::ticking(100, 5);
        assert_eq!(clock.now(), 100);
        assert_eq!(clock.now(), 105);
        assert_eq!(clock.now(), 110);
    }

    #[test]
    fn test_manual_clock_set_and_advance() {
        let clock = ManualClock::new(1_000);
        clock.advance(250);
        assert_eq!(clock.now(), 1_250);
        clock.set(10);
        assert_eq!(clock.now(), 10);
    }

    #[test]
    fn test_system_clock_is_after_2020() {
        // 2020-01-01T00:00:00Z
        assert!(SystemClock.now() > 1_577_836_800_000);
    }
}
