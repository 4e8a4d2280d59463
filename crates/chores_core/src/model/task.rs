//! Task domain model.
//!
//! # Responsibility
//! - Define the canonical chore occurrence record and its wire shape.
//! - Provide validation helpers used before any store mutation.
//!
//! # Invariants
//! - `id` is stable and never reused for another task.
//! - `deleted` is the source of truth for tombstone state; deleted tasks
//!   carry no `order`.
//! - `awarded_points` is set only while `done` is true and an assignee exists.

use crate::model::person::PersonId;
use crate::model::recurrence::Recurrence;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Stable identifier for one task occurrence.
pub type TaskId = u64;

/// Wire format for task dates.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Validation failures raised before a mutation is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskValidationError {
    /// Name is empty or whitespace only.
    EmptyName,
    /// Date is not a calendar day in `YYYY-MM-DD` form.
    InvalidDate(String),
    /// Recurrence kind is not part of the supported vocabulary.
    UnrecognizedRecurrence(String),
}

impl Display for TaskValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyName => write!(f, "task name cannot be empty"),
            Self::InvalidDate(value) => {
                write!(f, "invalid task date `{value}`; expected YYYY-MM-DD")
            }
            Self::UnrecognizedRecurrence(value) => {
                write!(f, "unrecognized recurrence kind `{value}`")
            }
        }
    }
}

impl Error for TaskValidationError {}

/// One dated occurrence of a chore.
///
/// `date` keeps its wire string so a malformed persisted value survives a
/// load; [`Task::day`] is the parsed view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    /// Identity of the recurring chain. Backfilled to `id` on load when absent.
    #[serde(default)]
    pub series_id: Option<TaskId>,
    /// Relative position of the whole series among other series.
    #[serde(default)]
    pub series_anchor: Option<i64>,
    pub name: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub assigned_to: Option<PersonId>,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default)]
    pub recurring: Recurrence,
    /// Dense display index among non-deleted tasks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<usize>,
    #[serde(default)]
    pub created: Option<DateTime<Utc>>,
    #[serde(default)]
    pub finished: Option<DateTime<Utc>>,
    /// Coin value of this chore.
    #[serde(default)]
    pub points: Option<u32>,
    /// Idempotency marker for the coin award of the current completion.
    #[serde(default)]
    pub awarded_points: Option<u32>,
    /// Coin rule pattern that produced `points`, when auto-derived.
    #[serde(default)]
    pub auto_points_rule: Option<String>,
    /// When the current assignee took the task; cleared on unassign.
    #[serde(default)]
    pub assigned_date: Option<DateTime<Utc>>,
    /// Keys written by other clients, kept verbatim across saves.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Task {
    /// Creates the first occurrence of a new series.
    pub fn new(
        id: TaskId,
        name: impl Into<String>,
        date: NaiveDate,
        created: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            series_id: Some(id),
            series_anchor: None,
            name: name.into(),
            date: format_date(date),
            assigned_to: None,
            done: false,
            deleted: false,
            recurring: Recurrence::None,
            order: None,
            created: Some(created),
            finished: None,
            points: None,
            awarded_points: None,
            auto_points_rule: None,
            assigned_date: None,
            extra: BTreeMap::new(),
        }
    }

    /// Clones this occurrence as the next instance of its series.
    ///
    /// Completion, ledger marker, display order and foreign keys are reset;
    /// identity, assignment, recurrence, anchor and coin value carry over.
    pub fn next_in_series(&self, id: TaskId, date: NaiveDate, created: DateTime<Utc>) -> Self {
        Self {
            id,
            series_id: Some(self.series()),
            series_anchor: self.series_anchor,
            name: self.name.clone(),
            date: format_date(date),
            assigned_to: self.assigned_to,
            done: false,
            deleted: false,
            recurring: self.recurring.clone(),
            order: None,
            created: Some(created),
            finished: None,
            points: self.points,
            awarded_points: None,
            auto_points_rule: self.auto_points_rule.clone(),
            assigned_date: self.assigned_date,
            extra: BTreeMap::new(),
        }
    }

    /// Series identity; a task without one is its own series.
    pub fn series(&self) -> TaskId {
        self.series_id.unwrap_or(self.id)
    }

    /// Parsed calendar day, `None` when the stored date is malformed.
    pub fn day(&self) -> Option<NaiveDate> {
        parse_date(&self.date).ok()
    }

    /// Marks this task as softly deleted and drops its display index.
    pub fn soft_delete(&mut self) {
        self.deleted = true;
        self.order = None;
    }

    /// Returns whether this task should be considered visible/active.
    pub fn is_active(&self) -> bool {
        !self.deleted
    }

    pub fn is_recurring(&self) -> bool {
        self.recurring.is_recurring()
    }
}

/// Parses a strict `YYYY-MM-DD` calendar day.
pub fn parse_date(value: &str) -> Result<NaiveDate, TaskValidationError> {
    let trimmed = value.trim();
    if trimmed.len() != 10 {
        return Err(TaskValidationError::InvalidDate(value.to_string()));
    }
    NaiveDate::parse_from_str(trimmed, DATE_FORMAT)
        .map_err(|_| TaskValidationError::InvalidDate(value.to_string()))
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Trims and rejects empty task names.
pub fn validate_name(name: &str) -> Result<String, TaskValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(TaskValidationError::EmptyName);
    }
    Ok(trimmed.to_string())
}

/// Rejects recurrence kinds outside the supported vocabulary.
pub fn validate_recurrence(kind: &Recurrence) -> Result<(), TaskValidationError> {
    match kind {
        Recurrence::Unrecognized(raw) => {
            Err(TaskValidationError::UnrecognizedRecurrence(raw.clone()))
        }
        _ => Ok(()),
    }
}
