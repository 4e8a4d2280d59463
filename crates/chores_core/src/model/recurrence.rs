//! Recurrence kind vocabulary.
//!
//! # Responsibility
//! - Map the wire-visible recurrence strings to a typed enum and back.
//! - Preserve unknown persisted kinds instead of failing the whole load.
//!
//! # Invariants
//! - Parsing never fails; malformed kinds become `Unrecognized`.
//! - Parametric intervals are always >= 1.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Upper bound for parametric intervals (`every_X_days_<N>`).
pub const MAX_INTERVAL: u32 = 3650;

static EVERY_N_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^every_X_(days|weeks)_([1-9][0-9]{0,5})$").expect("valid recurrence regex")
});

/// How a chore repeats.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Recurrence {
    #[default]
    None,
    Daily,
    Weekly,
    /// Monday through Friday.
    Weekdays,
    /// Saturday and Sunday.
    Weekends,
    Monthly,
    Yearly,
    EveryDays(u32),
    EveryWeeks(u32),
    FirstMondayOfMonth,
    /// Kind read from storage that this build cannot interpret.
    Unrecognized(String),
}

impl Recurrence {
    /// Parses a wire kind. Empty input means no recurrence.
    ///
    /// Only canonical spellings are recognized, so every recognized kind
    /// writes back exactly as read.
    pub fn parse(value: &str) -> Self {
        match value {
            "" | "none" => Self::None,
            "daily" => Self::Daily,
            "weekly" => Self::Weekly,
            "weekdays" => Self::Weekdays,
            "weekends" => Self::Weekends,
            "monthly" => Self::Monthly,
            "yearly" => Self::Yearly,
            "first_monday_month" => Self::FirstMondayOfMonth,
            other => parse_every_n(other).unwrap_or_else(|| Self::Unrecognized(other.to_string())),
        }
    }

    /// Wire representation.
    pub fn as_wire(&self) -> String {
        match self {
            Self::None => "none".to_string(),
            Self::Daily => "daily".to_string(),
            Self::Weekly => "weekly".to_string(),
            Self::Weekdays => "weekdays".to_string(),
            Self::Weekends => "weekends".to_string(),
            Self::Monthly => "monthly".to_string(),
            Self::Yearly => "yearly".to_string(),
            Self::EveryDays(n) => format!("every_X_days_{n}"),
            Self::EveryWeeks(n) => format!("every_X_weeks_{n}"),
            Self::FirstMondayOfMonth => "first_monday_month".to_string(),
            Self::Unrecognized(raw) => raw.clone(),
        }
    }

    /// True for every kind except `None`, including unrecognized ones.
    pub fn is_recurring(&self) -> bool {
        !matches!(self, Self::None)
    }
}

fn parse_every_n(value: &str) -> Option<Recurrence> {
    let caps = EVERY_N_RE.captures(value)?;
    let n: u32 = caps.get(2)?.as_str().parse().ok()?;
    if n > MAX_INTERVAL {
        return None;
    }
    match caps.get(1)?.as_str() {
        "days" => Some(Recurrence::EveryDays(n)),
        "weeks" => Some(Recurrence::EveryWeeks(n)),
        _ => None,
    }
}

impl From<String> for Recurrence {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<Recurrence> for String {
    fn from(value: Recurrence) -> Self {
        value.as_wire()
    }
}

impl Display for Recurrence {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.as_wire())
    }
}
