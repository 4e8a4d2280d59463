//! Display ordering and series anchors.
//!
//! # Responsibility
//! - Provide the total order used to lay out tasks.
//! - Compact `order` into a dense index over non-deleted tasks.
//! - Move whole series when the caller supplies an explicit id sequence.
//!
//! # Invariants
//! - After [`compact`], non-deleted tasks hold `order` values `0..n-1`
//!   and deleted tasks hold none.
//! - Every task of a series carries the same `series_anchor`.

use crate::model::task::{Task, TaskId};
use chrono::{DateTime, NaiveDate, Utc};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Total order over tasks, ascending.
///
/// Deleted last, then series anchor (falling back to the task's own order),
/// open before done, date with malformed dates last, creation time, id.
pub fn compare_for_ordering(a: &Task, b: &Task) -> Ordering {
    a.deleted
        .cmp(&b.deleted)
        .then_with(|| anchor_key(a).cmp(&anchor_key(b)))
        .then_with(|| a.done.cmp(&b.done))
        .then_with(|| date_key(a).cmp(&date_key(b)))
        .then_with(|| created_key(a).cmp(&created_key(b)))
        .then_with(|| a.id.cmp(&b.id))
}

/// Sorts tasks, assigns missing anchors and rewrites the dense `order`.
pub fn compact(tasks: &mut Vec<Task>) {
    ensure_series_anchors(tasks);
    tasks.sort_by(compare_for_ordering);

    let mut next = 0usize;
    for task in tasks.iter_mut() {
        if task.deleted {
            task.order = None;
        } else {
            task.order = Some(next);
            next += 1;
        }
    }
}

/// Re-anchors series following the caller's id sequence.
///
/// Each referenced task's series takes the next anchor in sequence order
/// (first reference wins). Unreferenced series follow, keeping their
/// previous relative order. Unknown ids are ignored. Returns the number of
/// series that were referenced.
pub fn reorder_series(tasks: &mut Vec<Task>, ids: &[TaskId]) -> usize {
    let series_by_id: HashMap<TaskId, TaskId> =
        tasks.iter().map(|task| (task.id, task.series())).collect();

    let mut seen = HashSet::new();
    let referenced: Vec<TaskId> = ids
        .iter()
        .filter_map(|id| series_by_id.get(id).copied())
        .filter(|series| seen.insert(*series))
        .collect();

    ensure_series_anchors(tasks);
    let mut others: BTreeMap<(i64, TaskId), TaskId> = BTreeMap::new();
    for task in tasks.iter() {
        let series = task.series();
        if !seen.contains(&series) {
            others.insert((task.series_anchor.unwrap_or(i64::MAX), series), series);
        }
    }
    let mut others_in_order: Vec<TaskId> = Vec::new();
    for series in others.into_values() {
        if !others_in_order.contains(&series) {
            others_in_order.push(series);
        }
    }

    let anchors: HashMap<TaskId, i64> = referenced
        .iter()
        .chain(others_in_order.iter())
        .enumerate()
        .map(|(position, series)| (*series, position as i64))
        .collect();
    for task in tasks.iter_mut() {
        task.series_anchor = anchors.get(&task.series()).copied();
    }

    compact(tasks);
    referenced.len()
}

/// Gives every series one shared anchor.
///
/// A series that already has an anchor on any member propagates it to the
/// rest; series without one are appended after the current maximum in
/// their present sequence position.
fn ensure_series_anchors(tasks: &mut [Task]) {
    let mut known: HashMap<TaskId, i64> = HashMap::new();
    for task in tasks.iter() {
        if let Some(anchor) = task.series_anchor {
            known.entry(task.series()).or_insert(anchor);
        }
    }
    let mut next = known.values().max().map_or(0, |anchor| anchor + 1);

    for task in tasks.iter_mut() {
        let series = task.series();
        let anchor = *known.entry(series).or_insert_with(|| {
            let assigned = next;
            next += 1;
            assigned
        });
        task.series_anchor = Some(anchor);
    }
}

fn anchor_key(task: &Task) -> i64 {
    task.series_anchor
        .or_else(|| task.order.and_then(|order| i64::try_from(order).ok()))
        .unwrap_or(i64::MAX)
}

fn date_key(task: &Task) -> (bool, Option<NaiveDate>) {
    match task.day() {
        Some(day) => (false, Some(day)),
        None => (true, None),
    }
}

fn created_key(task: &Task) -> (bool, Option<DateTime<Utc>>) {
    match task.created {
        Some(created) => (false, Some(created)),
        None => (true, None),
    }
}

#[cfg(test)]
mod tests {
    use super::{compact, compare_for_ordering};
    use crate::model::task::Task;
    use chrono::{NaiveDate, TimeZone, Utc};
    use std::cmp::Ordering;

    fn task(id: u64, date: &str) -> Task {
        let created = Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap();
        let mut task = Task::new(id, "chore", NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(), created);
        task.date = date.to_string();
        task
    }

    #[test]
    fn malformed_dates_sort_after_valid_ones() {
        let mut valid = task(2, "2024-07-01");
        let mut broken = task(1, "soon");
        valid.series_anchor = Some(0);
        broken.series_anchor = Some(0);
        assert_eq!(compare_for_ordering(&valid, &broken), Ordering::Less);
    }

    #[test]
    fn open_tasks_precede_done_within_anchor() {
        let mut open = task(2, "2024-07-01");
        let mut done = task(1, "2024-06-01");
        open.series_anchor = Some(4);
        done.series_anchor = Some(4);
        done.done = true;
        assert_eq!(compare_for_ordering(&open, &done), Ordering::Less);
    }

    #[test]
    fn compact_assigns_dense_order_and_clears_deleted() {
        let mut tasks = vec![task(1, "2024-06-01"), task(2, "2024-06-02"), task(3, "2024-06-03")];
        tasks[1].soft_delete();
        tasks[0].order = Some(7);
        compact(&mut tasks);

        let active: Vec<usize> = tasks.iter().filter_map(|t| t.order).collect();
        assert_eq!(active, vec![0, 1]);
        assert!(tasks.last().unwrap().deleted);
        assert_eq!(tasks.last().unwrap().order, None);
    }

    #[test]
    fn missing_anchors_are_shared_across_a_series() {
        let mut first = task(10, "2024-06-01");
        let mut second = task(11, "2024-06-08");
        second.series_id = Some(10);
        first.series_anchor = None;
        second.series_anchor = None;
        let mut tasks = vec![first, second, task(12, "2024-06-02")];
        compact(&mut tasks);

        let anchor_of = |id: u64| tasks.iter().find(|t| t.id == id).unwrap().series_anchor;
        assert_eq!(anchor_of(10), anchor_of(11));
        assert_ne!(anchor_of(10), anchor_of(12));
    }
}
