use chrono::{DateTime, TimeDelta, Utc};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Wall-clock abstraction used to timestamp calibration samples.
///
/// - now(): returns the current UTC time
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

/// Default clock backed by the system time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl SystemClock {
    #[inline]
    pub fn new() -> Self {
        Self
    }
}

impl Clock for SystemClock {
    #[inline]
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Deterministic clock whose time only moves when told to.
///
/// Every call to `now()` returns the current instant and then advances it by
/// the configured tick, so consecutive samples get distinct, ordered timestamps.
#[derive(Debug, Clone)]
pub struct ManualClock {
    current: Arc<Mutex<DateTime<Utc>>>,
    tick: TimeDelta,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>, tick: TimeDelta) -> Self {
        Self {
            current: Arc::new(Mutex::new(start)),
            tick,
        }
    }

    // A panic while holding the lock cannot leave a half-written instant.
    fn guard(&self) -> MutexGuard<'_, DateTime<Utc>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Advance the clock by the given duration.
    pub fn advance(&self, d: TimeDelta) {
        *self.guard() += d;
    }

    /// Current instant without advancing.
    pub fn peek(&self) -> DateTime<Utc> {
        *self.guard()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        let mut cur = self.guard();
        let t = *cur;
        *cur += self.tick;
        t
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_ticks_on_every_read() {
        let start = DateTime::<Utc>::UNIX_EPOCH;
        let clock = ManualClock::new(start, TimeDelta::seconds(1));
        assert_eq!(clock.now(), start);
        assert_eq!(clock.now(), start + TimeDelta::seconds(1));
        clock.advance(TimeDelta::seconds(10));
        assert_eq!(clock.peek(), start + TimeDelta::seconds(12));
    }

    #[test]
    fn poisoned_clock_keeps_its_time() {
        let start = DateTime::<Utc>::UNIX_EPOCH + TimeDelta::seconds(100);
        let clock = ManualClock::new(start, TimeDelta::seconds(1));
        let shared = clock.clone();
        let _ = std::thread::spawn(move || {
            let _guard = shared.current.lock().unwrap();
            panic!("holder panicked");
        })
        .join();
        assert!(clock.current.is_poisoned());

        assert_eq!(clock.now(), start);
        clock.advance(TimeDelta::seconds(5));
        assert_eq!(clock.peek(), start + TimeDelta::seconds(6));
    }
}
