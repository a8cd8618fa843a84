//! Clock capability for event timestamps
//!
//! Events carry an epoch-millisecond wall-clock timestamp plus a monotonic
//! nanosecond counter used to order events that land in the same millisecond.
//! The clock is injectable so tests can produce deterministic timestamps.

use chrono::Utc;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::OnceLock;
use std::time::Instant;

/// Source of event timestamps, supplied to the pipeline at build time.
pub trait Clock: Send + Sync {
    /// Current wall-clock time in epoch milliseconds.
    fn now_millis(&self) -> i64;

    /// Monotonic nanosecond counter. Only differences are meaningful.
    fn nano_time(&self) -> u64;
}

/// Process-wide anchor so `nano_time` readings are comparable across threads.
fn nano_anchor() -> Instant {
    static ANCHOR: OnceLock<Instant> = OnceLock::new();
    *ANCHOR.get_or_init(Instant::now)
}

/// Default clock backed by the system time and a monotonic instant.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        Utc::now().timestamp_millis()
    }

    fn nano_time(&self) -> u64 {
        nano_anchor().elapsed().as_nanos() as u64
    }
}

/// Manually advanced clock for deterministic tests.
#[derive(Debug, Default)]
pub struct ManualClock {
    millis: AtomicI64,
    nanos: AtomicU64,
}

impl ManualClock {
    pub fn new(millis: i64) -> Self {
        Self {
            millis: AtomicI64::new(millis),
            nanos: AtomicU64::new(0),
        }
    }

    pub fn set_millis(&self, millis: i64) {
        self.millis.store(millis, Ordering::Relaxed);
    }

    /// Advance the wall clock and the nano counter together.
    pub fn advance_millis(&self, delta: i64) {
        self.millis.fetch_add(delta, Ordering::Relaxed);
        self.nanos
            .fetch_add((delta as u64).saturating_mul(1_000_000), Ordering::Relaxed);
    }

    pub fn advance_nanos(&self, delta: u64) {
        self.nanos.fetch_add(delta, Ordering::Relaxed);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.millis.load(Ordering::Relaxed)
    }

    fn nano_time(&self) -> u64 {
        self.nanos.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_monotonic_nanos() {
        let clock = SystemClock;
        let a = clock.nano_time();
        let b = clock.nano_time();
        assert!(b >= a);
    }

    #[test]
    fn test_system_clock_sane_millis() {
        // 2020-01-01 as a lower bound
        assert!(SystemClock.now_millis() > 1_577_836_800_000);
    }

    #[test]
    fn test_manual_clock() {
        let clock = ManualClock::new(1_000);
        assert_eq!(clock.now_millis(), 1_000);
        assert_eq!(clock.nano_time(), 0);

        clock.advance_millis(5);
        assert_eq!(clock.now_millis(), 1_005);
        assert_eq!(clock.nano_time(), 5_000_000);

        clock.advance_nanos(250);
        assert_eq!(clock.nano_time(), 5_000_250);

        clock.set_millis(42);
        assert_eq!(clock.now_millis(), 42);
    }
}
