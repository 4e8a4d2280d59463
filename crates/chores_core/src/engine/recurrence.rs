//! Series recurrence engine.
//!
//! # Responsibility
//! - Step a date forward by one recurrence period.
//! - Synthesize the single occurrence a lagging series needs to reach today.
//!
//! # Invariants
//! - Stepping never errors; unsupported kinds yield no next date.
//! - Top-up takes at most [`MAX_TOP_UP_STEPS`] steps per series and pass.
//! - Top-up never creates a second active occurrence on the same date.

use crate::model::recurrence::Recurrence;
use crate::model::task::{format_date, TaskId};
use crate::store::Store;
use chrono::{DateTime, Datelike, Days, Months, NaiveDate, Utc, Weekday};
use log::{debug, warn};

/// Hard cap on stepping iterations for one top-up.
pub const MAX_TOP_UP_STEPS: usize = 730;

/// Outcome of topping up one series.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopUp {
    /// Series has no active occurrence or no usable date.
    Empty,
    /// Latest occurrence is already today or later.
    UpToDate,
    /// The recurrence kind produced no next date.
    NoNextDate,
    /// Step cap hit before reaching today; retried on the next pass.
    StepLimitReached,
    /// Target date already has an active occurrence.
    AlreadyPresent(NaiveDate),
    /// New occurrence inserted.
    Generated { id: TaskId, date: NaiveDate },
}

/// Computes the next occurrence date for `kind`.
pub fn next_occurrence(date: NaiveDate, kind: &Recurrence) -> Option<NaiveDate> {
    match kind {
        Recurrence::None | Recurrence::Unrecognized(_) => None,
        Recurrence::Daily => date.checked_add_days(Days::new(1)),
        Recurrence::Weekly => date.checked_add_days(Days::new(7)),
        Recurrence::Weekdays => step_until(date, is_weekday),
        Recurrence::Weekends => step_until(date, |day| !is_weekday(day)),
        // chrono clamps the day of month when the target month is shorter.
        Recurrence::Monthly => date.checked_add_months(Months::new(1)),
        Recurrence::Yearly => date.checked_add_months(Months::new(12)),
        Recurrence::EveryDays(n) => date.checked_add_days(Days::new(u64::from(*n))),
        Recurrence::EveryWeeks(n) => date.checked_add_days(Days::new(7 * u64::from(*n))),
        Recurrence::FirstMondayOfMonth => first_monday_of_next_month(date),
    }
}

/// Nudges a new series' start date forward onto a compatible day.
///
/// Only `weekdays` and `weekends` constrain the start; other kinds return
/// the input unchanged.
pub fn normalize_start_date(date: NaiveDate, kind: &Recurrence) -> NaiveDate {
    let compatible: fn(NaiveDate) -> bool = match kind {
        Recurrence::Weekdays => is_weekday,
        Recurrence::Weekends => |day| !is_weekday(day),
        _ => return date,
    };
    if compatible(date) {
        return date;
    }
    step_until(date, compatible).unwrap_or(date)
}

/// Tops up one series using its own recurrence kind.
pub fn top_up_series(
    store: &mut Store,
    series: TaskId,
    today: NaiveDate,
    now: DateTime<Utc>,
) -> TopUp {
    top_up_series_with(store, series, today, now, next_occurrence)
}

/// Tops up one series with a caller-provided stepping rule.
///
/// Finds the chronologically last active occurrence, steps from its date
/// until the candidate is on or after `today`, and clones the occurrence
/// onto the candidate date unless one already exists there.
pub fn top_up_series_with<F>(
    store: &mut Store,
    series: TaskId,
    today: NaiveDate,
    now: DateTime<Utc>,
    step: F,
) -> TopUp
where
    F: Fn(NaiveDate, &Recurrence) -> Option<NaiveDate>,
{
    let Some((last_position, last_day)) = latest_occurrence(store, series) else {
        return TopUp::Empty;
    };
    if last_day >= today {
        return TopUp::UpToDate;
    }

    let kind = store.tasks[last_position].recurring.clone();
    let target = match catch_up(last_day, today, |day| step(day, &kind)) {
        CatchUp::Reached(day) => day,
        CatchUp::NoNext => return TopUp::NoNextDate,
        CatchUp::Exhausted => {
            warn!(
                "event=series_top_up module=recurrence status=step_limit series={} kind={} steps={}",
                series, kind, MAX_TOP_UP_STEPS
            );
            return TopUp::StepLimitReached;
        }
    };

    let target_text = format_date(target);
    if store.series_has_date(series, &target_text) {
        return TopUp::AlreadyPresent(target);
    }

    let id = store.next_task_id(now);
    let occurrence = store.tasks[last_position].next_in_series(id, target, now);
    store.insert_task(occurrence);
    debug!(
        "event=series_top_up module=recurrence status=ok series={} task_id={} date={}",
        series, id, target_text
    );
    TopUp::Generated { id, date: target }
}

/// Tops up every recurring series. Returns ids of generated occurrences.
pub fn top_up_all(store: &mut Store, today: NaiveDate, now: DateTime<Utc>) -> Vec<TaskId> {
    let recurring_series: Vec<TaskId> = store
        .series_index()
        .into_iter()
        .filter(|(_, positions)| {
            positions.iter().any(|&position| {
                let task = &store.tasks[position];
                task.is_active() && task.is_recurring()
            })
        })
        .map(|(series, _)| series)
        .collect();

    recurring_series
        .into_iter()
        .filter_map(|series| match top_up_series(store, series, today, now) {
            TopUp::Generated { id, .. } => Some(id),
            _ => None,
        })
        .collect()
}

/// Inserts the immediate successor of a just-completed occurrence.
///
/// Returns the new id, or `None` when the kind has no next date or the
/// series already has an active occurrence on that date.
pub fn spawn_successor(store: &mut Store, task_id: TaskId, now: DateTime<Utc>) -> Option<TaskId> {
    let task = store.task(task_id)?;
    let next = next_occurrence(task.day()?, &task.recurring)?;
    let series = task.series();
    if store.series_has_date(series, &format_date(next)) {
        return None;
    }
    let id = store.next_task_id(now);
    let occurrence = store.task(task_id)?.next_in_series(id, next, now);
    store.insert_task(occurrence);
    Some(id)
}

enum CatchUp {
    Reached(NaiveDate),
    NoNext,
    Exhausted,
}

fn catch_up<F>(from: NaiveDate, today: NaiveDate, step: F) -> CatchUp
where
    F: Fn(NaiveDate) -> Option<NaiveDate>,
{
    let mut candidate = from;
    for _ in 0..MAX_TOP_UP_STEPS {
        match step(candidate) {
            Some(next) => candidate = next,
            None => return CatchUp::NoNext,
        }
        if candidate >= today {
            return CatchUp::Reached(candidate);
        }
    }
    CatchUp::Exhausted
}

fn latest_occurrence(store: &Store, series: TaskId) -> Option<(usize, NaiveDate)> {
    store
        .tasks
        .iter()
        .enumerate()
        .filter(|(_, task)| task.series() == series && task.is_active())
        .filter_map(|(position, task)| task.day().map(|day| (position, day)))
        .max_by_key(|&(position, day)| (day, store.tasks[position].id))
}

fn is_weekday(day: NaiveDate) -> bool {
    !matches!(day.weekday(), Weekday::Sat | Weekday::Sun)
}

fn step_until(date: NaiveDate, accept: fn(NaiveDate) -> bool) -> Option<NaiveDate> {
    (1..=7)
        .filter_map(|offset| date.checked_add_days(Days::new(offset)))
        .find(|day| accept(*day))
}

fn first_monday_of_next_month(date: NaiveDate) -> Option<NaiveDate> {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_weekday_of_month_opt(year, month, Weekday::Mon, 1)
}

#[cfg(test)]
mod tests {
    use super::{next_occurrence, normalize_start_date};
    use crate::model::recurrence::Recurrence;
    use chrono::NaiveDate;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn weekdays_skip_the_weekend() {
        // 2024-06-07 is a Friday.
        assert_eq!(
            next_occurrence(day(2024, 6, 7), &Recurrence::Weekdays),
            Some(day(2024, 6, 10))
        );
    }

    #[test]
    fn weekends_jump_to_saturday() {
        assert_eq!(
            next_occurrence(day(2024, 6, 3), &Recurrence::Weekends),
            Some(day(2024, 6, 8))
        );
        assert_eq!(
            next_occurrence(day(2024, 6, 8), &Recurrence::Weekends),
            Some(day(2024, 6, 9))
        );
    }

    #[test]
    fn monthly_clamps_short_months() {
        assert_eq!(
            next_occurrence(day(2024, 1, 31), &Recurrence::Monthly),
            Some(day(2024, 2, 29))
        );
        assert_eq!(
            next_occurrence(day(2024, 3, 15), &Recurrence::Monthly),
            Some(day(2024, 4, 15))
        );
    }

    #[test]
    fn yearly_handles_leap_day() {
        assert_eq!(
            next_occurrence(day(2024, 2, 29), &Recurrence::Yearly),
            Some(day(2025, 2, 28))
        );
    }

    #[test]
    fn parametric_intervals() {
        assert_eq!(
            next_occurrence(day(2024, 6, 1), &Recurrence::EveryDays(3)),
            Some(day(2024, 6, 4))
        );
        assert_eq!(
            next_occurrence(day(2024, 6, 1), &Recurrence::EveryWeeks(2)),
            Some(day(2024, 6, 15))
        );
    }

    #[test]
    fn first_monday_rolls_over_year() {
        assert_eq!(
            next_occurrence(day(2024, 12, 2), &Recurrence::FirstMondayOfMonth),
            Some(day(2025, 1, 6))
        );
        assert_eq!(
            next_occurrence(day(2024, 6, 20), &Recurrence::FirstMondayOfMonth),
            Some(day(2024, 7, 1))
        );
    }

    #[test]
    fn none_and_unrecognized_have_no_next_date() {
        assert_eq!(next_occurrence(day(2024, 6, 1), &Recurrence::None), None);
        assert_eq!(
            next_occurrence(
                day(2024, 6, 1),
                &Recurrence::Unrecognized("every_full_moon".to_string())
            ),
            None
        );
    }

    #[test]
    fn normalize_start_only_moves_forward() {
        // Saturday -> Monday for weekdays, unchanged for weekends.
        assert_eq!(
            normalize_start_date(day(2024, 6, 8), &Recurrence::Weekdays),
            day(2024, 6, 10)
        );
        assert_eq!(
            normalize_start_date(day(2024, 6, 8), &Recurrence::Weekends),
            day(2024, 6, 8)
        );
        assert_eq!(
            normalize_start_date(day(2024, 6, 5), &Recurrence::Weekends),
            day(2024, 6, 8)
        );
        assert_eq!(
            normalize_start_date(day(2024, 6, 8), &Recurrence::Daily),
            day(2024, 6, 8)
        );
    }
}
