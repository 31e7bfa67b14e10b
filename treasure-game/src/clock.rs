//! Time source for log timestamps and narrative delays.
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use std::time::Duration;

pub trait Clock {
    fn now(&self) -> DateTime<Utc>;

    /// Block until `delay` has passed.
    fn sleep(&mut self, delay: Duration);

    /// Log-line prefix for the current instant.
    fn stamp(&self) -> String {
        self.now().format("%H:%M:%S").to_string()
    }
}

impl<T: Clock + ?Sized> Clock for &mut T {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }

    fn sleep(&mut self, delay: Duration) {
        (**self).sleep(delay);
    }
}

/// Wall clock; sleeping parks the current thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn sleep(&mut self, delay: Duration) {
        std::thread::sleep(delay);
    }
}

/// Virtual clock that advances instantly when asked to sleep.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: DateTime<Utc>,
    slept: Duration,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::starting_at(Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).single().unwrap_or_default())
    }
}

impl ManualClock {
    #[must_use]
    pub const fn starting_at(now: DateTime<Utc>) -> Self {
        Self {
            now,
            slept: Duration::ZERO,
        }
    }

    /// Total virtual time spent sleeping.
    #[must_use]
    pub const fn slept(&self) -> Duration {
        self.slept
    }

    pub fn advance(&mut self, delay: Duration) {
        self.slept += delay;
        self.now += ChronoDuration::from_std(delay).unwrap_or_else(|_| ChronoDuration::zero());
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.now
    }

    fn sleep(&mut self, delay: Duration) {
        self.advance(delay);
    }
}
