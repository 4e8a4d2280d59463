//! Cooperative daily triggers.
//!
//! # Responsibility
//! - Track when a once-a-day job is next due.
//! - Fire at most once per armed instant when polled.
//!
//! # Invariants
//! - A trigger holds at most one armed instant; re-arming clears it first.
//! - A late poll fires once and re-arms in the future, never catching up
//!   missed days.

use chrono::{Days, NaiveDateTime, NaiveTime};
use log::{debug, warn};

/// Parses an `HH:MM` trigger time.
pub fn parse_time_of_day(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M").ok()
}

/// First instant at `at` strictly after `now`.
pub fn next_fire_after(now: NaiveDateTime, at: NaiveTime) -> NaiveDateTime {
    let same_day = now.date().and_time(at);
    if same_day > now {
        return same_day;
    }
    now.date()
        .checked_add_days(Days::new(1))
        .map_or(same_day, |tomorrow| tomorrow.and_time(at))
}

/// Single-instance daily timer slot.
#[derive(Debug, Clone)]
pub struct DailyTrigger {
    name: &'static str,
    at: Option<NaiveTime>,
    armed_for: Option<NaiveDateTime>,
}

impl DailyTrigger {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            at: None,
            armed_for: None,
        }
    }

    /// Clears any armed instant, then arms for `time` if it parses.
    pub fn rearm(&mut self, time: Option<&str>, now: NaiveDateTime) {
        self.clear();
        let Some(raw) = time else {
            return;
        };
        let Some(at) = parse_time_of_day(raw) else {
            warn!(
                "event=trigger_arm module=schedule status=error trigger={} error_code=invalid_time",
                self.name
            );
            return;
        };
        self.at = Some(at);
        self.armed_for = Some(next_fire_after(now, at));
        debug!(
            "event=trigger_arm module=schedule status=ok trigger={} due={:?}",
            self.name, self.armed_for
        );
    }

    pub fn clear(&mut self) {
        self.at = None;
        self.armed_for = None;
    }

    /// Returns true when due, re-arming for the next day.
    pub fn poll(&mut self, now: NaiveDateTime) -> bool {
        match (self.at, self.armed_for) {
            (Some(at), Some(due)) if now >= due => {
                self.armed_for = Some(next_fire_after(now, at));
                true
            }
            _ => false,
        }
    }

    pub fn armed_for(&self) -> Option<NaiveDateTime> {
        self.armed_for
    }
}

#[cfg(test)]
mod tests {
    use super::{next_fire_after, parse_time_of_day, DailyTrigger};
    use chrono::{NaiveDate, NaiveDateTime};

    fn at(d: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, d)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn next_fire_rolls_to_tomorrow_when_passed() {
        let three = parse_time_of_day("03:00").unwrap();
        assert_eq!(next_fire_after(at(1, 2, 0), three), at(1, 3, 0));
        assert_eq!(next_fire_after(at(1, 3, 0), three), at(2, 3, 0));
    }

    #[test]
    fn late_poll_fires_once() {
        let mut trigger = DailyTrigger::new("maintenance");
        trigger.rearm(Some("03:00"), at(1, 12, 0));
        assert!(!trigger.poll(at(1, 23, 0)));
        assert!(trigger.poll(at(5, 9, 0)));
        assert!(!trigger.poll(at(5, 9, 1)));
        assert_eq!(trigger.armed_for(), Some(at(6, 3, 0)));
    }

    #[test]
    fn rearm_replaces_previous_instant() {
        let mut trigger = DailyTrigger::new("reminder");
        trigger.rearm(Some("08:00"), at(1, 7, 0));
        trigger.rearm(Some("20:00"), at(1, 7, 0));
        assert_eq!(trigger.armed_for(), Some(at(1, 20, 0)));
        trigger.rearm(Some("not a time"), at(1, 7, 0));
        assert_eq!(trigger.armed_for(), None);
    }
}
