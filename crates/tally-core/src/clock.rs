//! [`Clock`] implementations: the system clock and a manually driven
//! clock for tests and simulated hosts.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::id::Timestamp;
use crate::traits::Clock;

/// Reads `SystemTime::now()`.
///
/// A system clock set before the Unix epoch reads as `Timestamp(0)`.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Timestamp(secs)
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    /// Create a clock reading `start`.
    pub fn new(start: Timestamp) -> Self {
        Self {
            now: AtomicU64::new(start.0),
        }
    }

    /// Jump to `ts`. Moving backwards is allowed; rotation ignores it.
    pub fn set(&self, ts: Timestamp) {
        self.now.store(ts.0, Ordering::Release);
    }

    /// Move forward by `secs` and return the new reading.
    pub fn advance(&self, secs: u64) -> Timestamp {
        Timestamp(self.now.fetch_add(secs, Ordering::AcqRel) + secs)
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        Timestamp(self.now.load(Ordering::Acquire))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_advances() {
        let clock = ManualClock::new(Timestamp(100));
        assert_eq!(clock.now(), Timestamp(100));
        assert_eq!(clock.advance(15), Timestamp(115));
        clock.set(Timestamp(3));
        assert_eq!(clock.now(), Timestamp(3));
    }

    #[test]
    fn system_clock_is_after_2020() {
        assert!(SystemClock.now() > Timestamp(1_577_836_800));
    }
}
