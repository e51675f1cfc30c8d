//! Wall clock used to timestamp entries

use chrono::{Duration, Local, NaiveTime};
use std::cell::Cell;

/// Source of entry timestamps
pub trait Clock {
    /// Current local time of day
    fn now(&self) -> NaiveTime;
}

/// The host's local wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveTime {
        Local::now().time()
    }
}

/// A clock that only moves when told to
///
/// Useful for hosts that replay sessions and for tests.
#[derive(Debug)]
pub struct ManualClock {
    current: Cell<NaiveTime>,
}

impl ManualClock {
    pub fn new(start: NaiveTime) -> Self {
        Self {
            current: Cell::new(start),
        }
    }

    /// Start at midnight
    pub fn midnight() -> Self {
        Self::new(NaiveTime::MIN)
    }

    /// Move the clock forward (wraps at midnight)
    pub fn advance_ms(&self, millis: i64) {
        let (next, _) = self
            .current
            .get()
            .overflowing_add_signed(Duration::milliseconds(millis));
        self.current.set(next);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> NaiveTime {
        self.current.get()
    }
}

impl<C: Clock + ?Sized> Clock for std::rc::Rc<C> {
    fn now(&self) -> NaiveTime {
        (**self).now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_advances() {
        let clock = ManualClock::midnight();
        clock.advance_ms(1_500);
        assert_eq!(clock.now().format("%H:%M:%S%.3f").to_string(), "00:00:01.500");
    }

    #[test]
    fn test_manual_clock_wraps_at_midnight() {
        let clock = ManualClock::new(NaiveTime::from_hms_milli_opt(23, 59, 59, 900).unwrap());
        clock.advance_ms(200);
        assert_eq!(clock.now().format("%H:%M:%S%.3f").to_string(), "00:00:00.100");
    }
}
