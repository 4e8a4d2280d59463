//! In-memory task store.
//!
//! # Responsibility
//! - Own the task, people, settings and ledger collections for one process.
//! - Allocate never-reused ids and per-series anchors.
//! - Convert to and from the two durable snapshots.
//!
//! # Invariants
//! - Every task has a `series_id` after construction.
//! - Id allocation is strictly increasing across tasks, people, rewards and
//!   redemptions respectively, even when the clock goes backwards.

use crate::model::person::{Person, PersonId};
use crate::model::reward::{Ledger, RedemptionId, RewardId};
use crate::model::settings::Settings;
use crate::model::task::{Task, TaskId};
use crate::repo::snapshot_repo::TaskSnapshot;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Single source of truth for household state.
#[derive(Debug, Clone, Default)]
pub struct Store {
    pub(crate) tasks: Vec<Task>,
    pub(crate) people: Vec<Person>,
    pub(crate) settings: Settings,
    pub(crate) analytics_boards: Vec<String>,
    pub(crate) ledger: Ledger,
    last_task_id: TaskId,
    last_person_id: PersonId,
    last_ledger_id: u64,
}

impl Store {
    /// Builds a store from loaded snapshots, backfilling missing series ids.
    pub fn from_snapshots(snapshot: TaskSnapshot, ledger: Ledger) -> Self {
        let mut tasks = snapshot.tasks;
        for task in &mut tasks {
            if task.series_id.is_none() {
                task.series_id = Some(task.id);
            }
            if task.deleted {
                task.order = None;
            }
        }
        // Persisted order is the starting point for anchor assignment.
        tasks.sort_by_key(|task| (task.deleted, task.order.unwrap_or(usize::MAX)));

        let mut settings = snapshot.settings;
        settings.absorb_legacy_fields();

        let last_task_id = tasks.iter().map(|task| task.id).max().unwrap_or(0);
        let last_person_id = snapshot.people.iter().map(|p| p.id).max().unwrap_or(0);
        let last_ledger_id = ledger
            .rewards
            .iter()
            .map(|reward| reward.id)
            .chain(ledger.redemptions.iter().map(|entry| entry.id))
            .max()
            .unwrap_or(0);

        Self {
            tasks,
            people: snapshot.people,
            settings,
            analytics_boards: snapshot.analytics_boards,
            ledger,
            last_task_id,
            last_person_id,
            last_ledger_id,
        }
    }

    pub fn task_snapshot(&self) -> TaskSnapshot {
        TaskSnapshot {
            tasks: self.tasks.clone(),
            people: self.people.clone(),
            analytics_boards: self.analytics_boards.clone(),
            settings: self.settings.with_legacy_fields(),
        }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn people(&self) -> &[Person] {
        &self.people
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    pub fn task_mut(&mut self, id: TaskId) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|task| task.id == id)
    }

    pub fn person(&self, id: PersonId) -> Option<&Person> {
        self.people.iter().find(|person| person.id == id)
    }

    /// Appends a task. Display order is assigned by the next compaction.
    pub fn insert_task(&mut self, task: Task) {
        self.last_task_id = self.last_task_id.max(task.id);
        self.tasks.push(task);
    }

    /// Epoch-millisecond id, bumped past the last issued one.
    pub fn next_task_id(&mut self, now: DateTime<Utc>) -> TaskId {
        self.last_task_id = next_id(self.last_task_id, now);
        self.last_task_id
    }

    pub fn next_person_id(&mut self, now: DateTime<Utc>) -> PersonId {
        self.last_person_id = next_id(self.last_person_id, now);
        self.last_person_id
    }

    pub fn next_reward_id(&mut self, now: DateTime<Utc>) -> RewardId {
        self.last_ledger_id = next_id(self.last_ledger_id, now);
        self.last_ledger_id
    }

    pub fn next_redemption_id(&mut self, now: DateTime<Utc>) -> RedemptionId {
        self.last_ledger_id = next_id(self.last_ledger_id, now);
        self.last_ledger_id
    }

    /// Anchor that places a new series after every existing one.
    pub fn next_anchor(&self) -> i64 {
        self.tasks
            .iter()
            .filter_map(|task| task.series_anchor)
            .max()
            .map_or(0, |anchor| anchor + 1)
    }

    /// Secondary index: series id -> positions in the task vector.
    pub fn series_index(&self) -> BTreeMap<TaskId, Vec<usize>> {
        series_index(&self.tasks)
    }

    /// Whether a non-deleted occurrence of `series` already sits on `date`.
    pub fn series_has_date(&self, series: TaskId, date: &str) -> bool {
        self.tasks
            .iter()
            .any(|task| task.series() == series && task.is_active() && task.date == date)
    }
}

/// Groups task positions by series id.
pub fn series_index(tasks: &[Task]) -> BTreeMap<TaskId, Vec<usize>> {
    let mut index: BTreeMap<TaskId, Vec<usize>> = BTreeMap::new();
    for (position, task) in tasks.iter().enumerate() {
        index.entry(task.series()).or_default().push(position);
    }
    index
}

fn next_id(last: u64, now: DateTime<Utc>) -> u64 {
    let millis = u64::try_from(now.timestamp_millis()).unwrap_or(0);
    millis.max(last.saturating_add(1))
}

#[cfg(test)]
mod tests {
    use super::Store;
    use crate::model::task::Task;
    use crate::repo::snapshot_repo::TaskSnapshot;
    use chrono::{NaiveDate, TimeZone, Utc};

    #[test]
    fn ids_stay_monotonic_when_clock_repeats() {
        let mut store = Store::default();
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap();
        let first = store.next_task_id(now);
        let second = store.next_task_id(now);
        assert!(second > first);
    }

    #[test]
    fn load_backfills_series_and_strips_deleted_order() {
        let day = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap();
        let mut legacy = Task::new(5, "Vacuum", day, now);
        legacy.series_id = None;
        let mut gone = Task::new(6, "Old", day, now);
        gone.deleted = true;
        gone.order = Some(3);

        let mut store = Store::from_snapshots(
            TaskSnapshot {
                tasks: vec![legacy, gone],
                ..TaskSnapshot::default()
            },
            Default::default(),
        );
        assert_eq!(store.task(5).unwrap().series_id, Some(5));
        assert_eq!(store.task(6).unwrap().order, None);
        assert!(store.next_task_id(now) > 6);
    }
}
