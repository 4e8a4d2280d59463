//! On-demand data integrity repair.
//!
//! # Responsibility
//! - Archive duplicate occurrences inside recurring series.
//! - Archive overdue open occurrences of series that still have a future.
//! - Archive exact duplicate active tasks across the whole collection.
//! - Archive completed tasks whose date has passed.
//!
//! # Invariants
//! - Repair only soft-deletes; nothing is removed from history.
//! - The last remaining active occurrence of a series is never archived
//!   by the overdue pass.
//! - Among duplicates the earliest-created task survives.

use crate::model::person::PersonId;
use crate::model::task::{Task, TaskId};
use crate::store::series_index;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Counts of each category of change made by one repair pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepairReport {
    pub series_duplicates_archived: usize,
    pub overdue_occurrences_archived: usize,
    pub duplicate_tasks_archived: usize,
    pub completed_archived: usize,
}

impl RepairReport {
    pub fn total(&self) -> usize {
        self.series_duplicates_archived
            + self.overdue_occurrences_archived
            + self.duplicate_tasks_archived
            + self.completed_archived
    }

    pub fn is_clean(&self) -> bool {
        self.total() == 0
    }
}

type DuplicateKey = (String, String, Option<PersonId>);

/// Runs every repair step in order.
pub fn repair(tasks: &mut [Task], today: NaiveDate) -> RepairReport {
    let mut report = RepairReport::default();
    let index = series_index(tasks);

    for positions in index.values() {
        if !positions.iter().any(|&p| tasks[p].is_recurring()) {
            continue;
        }
        report.series_duplicates_archived += archive_series_duplicates(tasks, positions);
        report.overdue_occurrences_archived += archive_overdue(tasks, positions, today);
    }

    report.duplicate_tasks_archived = archive_exact_duplicates(tasks);
    report.completed_archived = archive_past_completed(tasks, today);
    report
}

fn archive_series_duplicates(tasks: &mut [Task], positions: &[usize]) -> usize {
    let mut by_date: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for &position in positions {
        if tasks[position].is_active() {
            by_date
                .entry(tasks[position].date.clone())
                .or_default()
                .push(position);
        }
    }
    by_date
        .values()
        .map(|group| archive_all_but_earliest(tasks, group))
        .sum()
}

fn archive_overdue(tasks: &mut [Task], positions: &[usize], today: NaiveDate) -> usize {
    let has_upcoming = positions.iter().any(|&p| {
        let task = &tasks[p];
        task.is_active() && task.day().is_some_and(|day| day >= today)
    });
    if !has_upcoming {
        return 0;
    }

    let mut archived = 0;
    for &position in positions {
        let task = &mut tasks[position];
        if task.is_active() && !task.done && task.day().is_some_and(|day| day < today) {
            task.soft_delete();
            archived += 1;
        }
    }
    archived
}

fn archive_exact_duplicates(tasks: &mut [Task]) -> usize {
    let mut groups: HashMap<DuplicateKey, Vec<usize>> = HashMap::new();
    for (position, task) in tasks.iter().enumerate() {
        if task.is_active() {
            groups
                .entry(duplicate_key(task))
                .or_default()
                .push(position);
        }
    }
    groups
        .values()
        .map(|group| archive_all_but_earliest(tasks, group))
        .sum()
}

fn archive_past_completed(tasks: &mut [Task], today: NaiveDate) -> usize {
    let mut archived = 0;
    for task in tasks.iter_mut() {
        if task.is_active() && task.done && task.day().is_some_and(|day| day < today) {
            task.soft_delete();
            archived += 1;
        }
    }
    archived
}

fn archive_all_but_earliest(tasks: &mut [Task], group: &[usize]) -> usize {
    if group.len() < 2 {
        return 0;
    }
    let Some(&keep) = group.iter().min_by_key(|&&p| creation_key(&tasks[p])) else {
        return 0;
    };
    let mut archived = 0;
    for &position in group {
        if position != keep {
            tasks[position].soft_delete();
            archived += 1;
        }
    }
    archived
}

/// Earliest-created first; tasks without a timestamp lose to dated ones.
fn creation_key(task: &Task) -> (bool, Option<DateTime<Utc>>, TaskId) {
    (task.created.is_none(), task.created, task.id)
}

fn duplicate_key(task: &Task) -> DuplicateKey {
    (task.name.to_lowercase(), task.date.clone(), task.assigned_to)
}

#[cfg(test)]
mod tests {
    use super::{repair, RepairReport};
    use crate::model::recurrence::Recurrence;
    use crate::model::task::Task;
    use chrono::{NaiveDate, TimeZone, Utc};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    #[test]
    fn clean_collection_reports_zero() {
        let created = Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap();
        let mut tasks = vec![Task::new(1, "Sweep", day(20), created)];
        assert_eq!(repair(&mut tasks, day(10)), RepairReport::default());
        assert!(repair(&mut tasks, day(10)).is_clean());
    }

    #[test]
    fn lone_overdue_occurrence_is_kept() {
        let created = Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap();
        let mut only = Task::new(1, "Mop", day(2), created);
        only.recurring = Recurrence::Weekly;
        let mut tasks = vec![only];
        let report = repair(&mut tasks, day(10));
        assert_eq!(report.overdue_occurrences_archived, 0);
        assert!(tasks[0].is_active());
    }

    #[test]
    fn exact_duplicates_match_case_insensitively_but_not_whitespace() {
        let early = Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap();
        let late = Utc.with_ymd_and_hms(2024, 6, 1, 9, 30, 0).unwrap();
        let mut tasks = vec![
            Task::new(2, "Dust shelves", day(20), late),
            Task::new(1, "dust SHELVES", day(20), early),
            Task::new(3, "Dust shelves ", day(20), late),
        ];
        let report = repair(&mut tasks, day(10));
        assert_eq!(report.duplicate_tasks_archived, 1);
        assert!(tasks[0].deleted);
        assert!(tasks[1].is_active());
        assert!(tasks[2].is_active());
    }
}
