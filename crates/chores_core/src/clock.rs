//! Time source abstraction.
//!
//! Everything that asks "what is today" goes through [`Clock`] so the
//! recurrence and maintenance paths stay deterministic under test.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, Utc};
use std::sync::{Arc, Mutex};

pub trait Clock {
    /// Current instant, used for `created`/`finished` timestamps and ids.
    fn now(&self) -> DateTime<Utc>;

    /// Current wall-clock time in the household's local zone.
    fn local_now(&self) -> NaiveDateTime;

    /// Current local calendar day.
    fn today(&self) -> NaiveDate {
        self.local_now().date()
    }
}

/// Process clock backed by the system time and local zone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn local_now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Settable clock. Clones share the same instant; local time equals UTC.
#[derive(Debug, Clone)]
pub struct FixedClock {
    instant: Arc<Mutex<DateTime<Utc>>>,
}

impl FixedClock {
    pub fn new(instant: DateTime<Utc>) -> Self {
        Self {
            instant: Arc::new(Mutex::new(instant)),
        }
    }

    /// Starts the clock at `hour:minute` on `day`.
    pub fn at(day: NaiveDate, hour: u32, minute: u32) -> Self {
        let naive = day.and_hms_opt(hour, minute, 0).unwrap_or_default();
        Self::new(naive.and_utc())
    }

    pub fn set(&self, instant: DateTime<Utc>) {
        match self.instant.lock() {
            Ok(mut guard) => *guard = instant,
            Err(poisoned) => *poisoned.into_inner() = instant,
        }
    }

    pub fn advance(&self, delta: chrono::Duration) {
        self.set(self.now() + delta);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        match self.instant.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    fn local_now(&self) -> NaiveDateTime {
        self.now().naive_utc()
    }
}
