// Time source for report timestamps

use std::cell::Cell;

use chrono::{DateTime, Duration, Utc};

pub type Timestamp = DateTime<Utc>;

/// Source of start/end/log timestamps
pub trait Clock {
    fn now(&self) -> Timestamp;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        #[cfg(miri)]
        {
            DateTime::<Utc>::UNIX_EPOCH
        }
        #[cfg(not(miri))]
        {
            Utc::now()
        }
    }
}

/// Deterministic clock that advances by a fixed step on every reading
#[derive(Debug, Clone)]
pub struct ManualClock {
    current: Cell<Timestamp>,
    step: Duration,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self::with_step(start, Duration::milliseconds(1))
    }

    pub fn with_step(start: Timestamp, step: Duration) -> Self {
        Self {
            current: Cell::new(start),
            step,
        }
    }

    /// Clock starting at the Unix epoch
    pub fn epoch() -> Self {
        Self::new(DateTime::<Utc>::UNIX_EPOCH)
    }

    /// Next reading without advancing
    pub fn peek(&self) -> Timestamp {
        self.current.get()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        let now = self.current.get();
        self.current.set(now + self.step);
        now
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Timestamp {
        (**self).now()
    }
}

/// Milliseconds since the Unix epoch, the resolution report backends store
pub fn unix_millis(ts: Timestamp) -> i64 {
    ts.timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_advances_by_step() {
        let clock = ManualClock::with_step(DateTime::<Utc>::UNIX_EPOCH, Duration::seconds(2));
        assert_eq!(unix_millis(clock.now()), 0);
        assert_eq!(unix_millis(clock.now()), 2000);
        assert_eq!(unix_millis(clock.peek()), 4000);
    }

    #[test]
    fn test_manual_clock_readings_are_monotonic() {
        let clock = ManualClock::epoch();
        let first = clock.now();
        let second = clock.now();
        assert!(second > first);
    }
}
