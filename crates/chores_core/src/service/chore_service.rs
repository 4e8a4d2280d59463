//! Chore use-case service.
//!
//! # Responsibility
//! - Own the [`Store`] and route every mutation through validation,
//!   derivation (top-up, ordering, levels, coins) and a durable commit.
//! - Expose the read/write boundary consumed by request handlers.
//!
//! # Invariants
//! - Validation runs before any mutation; a rejected request leaves the
//!   store untouched.
//! - Durable write failures are reported via [`Commit::persisted`], never
//!   as an error; the in-memory state keeps the mutation.
//! - Completion toggles award/revoke coins exactly once per transition.

use crate::clock::{Clock, SystemClock};
use crate::config::{apply_settings_patch, sanitize_leveling};
use crate::engine::integrity::{self, RepairReport};
use crate::engine::ledger::{assign_auto_points, award, revoke};
use crate::engine::leveling::refresh_people;
use crate::engine::ordering::{compact, reorder_series};
use crate::engine::recurrence::{normalize_start_date, spawn_successor, top_up_all};
use crate::model::person::{Person, PersonId};
use crate::model::recurrence::Recurrence;
use crate::model::reward::{Redemption, Reward, RewardId};
use crate::model::settings::{RewardMode, Settings, SettingsPatch};
use crate::model::task::{
    format_date, parse_date, validate_name, validate_recurrence, Task, TaskId,
    TaskValidationError,
};
use crate::repo::atomic::LoadSource;
use crate::repo::snapshot_repo::SnapshotRepository;
use crate::service::schedule::DailyTrigger;
use crate::store::Store;
use chrono::NaiveDate;
use log::{info, warn};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ChoreResult<T> = Result<T, ChoreError>;

/// Service error for chore use-cases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChoreError {
    /// Request field failed validation.
    Validation(TaskValidationError),
    TaskNotFound(TaskId),
    PersonNotFound(PersonId),
    RewardNotFound(RewardId),
    /// Another active occurrence of the series already uses this date.
    DateTaken { series: TaskId, date: String },
    InsufficientCoins {
        person: PersonId,
        balance: u64,
        cost: u64,
    },
    EmptyPersonName,
    EmptyRewardName,
}

impl Display for ChoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::TaskNotFound(id) => write!(f, "task not found: {id}"),
            Self::PersonNotFound(id) => write!(f, "person not found: {id}"),
            Self::RewardNotFound(id) => write!(f, "reward not found: {id}"),
            Self::DateTaken { series, date } => {
                write!(f, "series {series} already has an occurrence on {date}")
            }
            Self::InsufficientCoins {
                person,
                balance,
                cost,
            } => write!(
                f,
                "person {person} has {balance} coins; reward costs {cost}"
            ),
            Self::EmptyPersonName => write!(f, "person name cannot be empty"),
            Self::EmptyRewardName => write!(f, "reward name cannot be empty"),
        }
    }
}

impl Error for ChoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            _ => None,
        }
    }
}

impl From<TaskValidationError> for ChoreError {
    fn from(value: TaskValidationError) -> Self {
        Self::Validation(value)
    }
}

/// Result of a mutation plus whether it reached durable storage.
#[derive(Debug, Clone, PartialEq)]
pub struct Commit<T> {
    pub value: T,
    pub persisted: bool,
}

impl<T> Commit<Option<T>> {
    fn require(self, missing: ChoreError) -> ChoreResult<Commit<T>> {
        match self.value {
            Some(value) => Ok(Commit {
                value,
                persisted: self.persisted,
            }),
            None => Err(missing),
        }
    }
}

/// Request model for creating a chore.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewTask {
    pub name: String,
    /// `YYYY-MM-DD`.
    pub date: String,
    pub recurring: Recurrence,
    pub assigned_to: Option<PersonId>,
    pub points: Option<u32>,
}

impl NewTask {
    pub fn new(name: impl Into<String>, date: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            date: date.into(),
            ..Self::default()
        }
    }
}

/// Partial task update. `None` keeps the field; nested `Some(None)` clears.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub name: Option<String>,
    pub date: Option<String>,
    pub assigned_to: Option<Option<PersonId>>,
    pub done: Option<bool>,
    pub recurring: Option<Recurrence>,
    pub points: Option<Option<u32>>,
}

impl TaskPatch {
    pub fn done(done: bool) -> Self {
        Self {
            done: Some(done),
            ..Self::default()
        }
    }
}

/// Open tasks due today for one assignee (`None` = unassigned).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reminder {
    pub person_id: Option<PersonId>,
    pub task_ids: Vec<TaskId>,
}

/// What fired during one [`ChoreService::tick`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub maintenance: Option<RepairReport>,
    pub reminders: Option<Vec<Reminder>>,
}

/// Chore service facade over a snapshot repository and a clock.
pub struct ChoreService<R: SnapshotRepository, C: Clock = SystemClock> {
    repo: R,
    clock: C,
    store: Store,
    maintenance: DailyTrigger,
    reminder: DailyTrigger,
}

impl<R: SnapshotRepository, C: Clock> ChoreService<R, C> {
    /// Loads both snapshots and derives ordering, levels and balances.
    ///
    /// Never fails: corrupt or missing snapshots fall back to backups and
    /// then to empty defaults.
    pub fn open(repo: R, clock: C) -> Self {
        let tasks = repo.load_tasks();
        let ledger = repo.load_ledger();
        if tasks.source != LoadSource::Primary || ledger.source != LoadSource::Primary {
            warn!(
                "event=store_open module=service status=fallback tasks_source={:?} ledger_source={:?}",
                tasks.source, ledger.source
            );
        }

        let mut store = Store::from_snapshots(tasks.value, ledger.value);
        store.settings.leveling = sanitize_leveling(store.settings.leveling.clone());
        info!(
            "event=store_open module=service status=ok tasks={} people={} rewards={}",
            store.tasks.len(),
            store.people.len(),
            store.ledger.rewards.len()
        );

        let mut service = Self {
            repo,
            clock,
            store,
            maintenance: DailyTrigger::new("maintenance"),
            reminder: DailyTrigger::new("reminder"),
        };
        compact(&mut service.store.tasks);
        service.refresh_derived();
        service.rearm_triggers();
        service
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Ordered task collection, non-deleted first.
    ///
    /// Tops up lagging recurring series first and persists when anything
    /// was generated.
    pub fn list_tasks(&mut self) -> Vec<Task> {
        let generated = self.derive();
        if !generated.is_empty() {
            info!(
                "event=series_top_up module=service status=ok generated={}",
                generated.len()
            );
            self.persist();
        }
        self.store.tasks.clone()
    }

    /// Ordered tasks minus those both deleted and unfinished.
    pub fn analytics_tasks(&mut self) -> Vec<Task> {
        self.list_tasks()
            .into_iter()
            .filter(|task| !(task.deleted && !task.done))
            .collect()
    }

    /// People with level, title and coin balance attached.
    pub fn list_people(&self) -> Vec<Person> {
        self.store.people.clone()
    }

    /// Creates the first occurrence of a new series.
    ///
    /// # Contract
    /// - `series_id` equals the new id; the series gets the next anchor.
    /// - Weekday/weekend series start on the first compatible day.
    /// - An assignee stamps `assigned_date`.
    /// - Unpriced tasks take points from the first matching coin rule.
    ///
    /// # Errors
    /// - [`ChoreError::Validation`] for a blank name, malformed date or
    ///   unrecognized recurrence.
    /// - [`ChoreError::PersonNotFound`] for an unknown assignee.
    pub fn create_task(&mut self, request: NewTask) -> ChoreResult<Commit<Task>> {
        let name = validate_name(&request.name)?;
        let date = parse_date(&request.date)?;
        validate_recurrence(&request.recurring)?;
        if let Some(person) = request.assigned_to {
            self.require_person(person)?;
        }

        let now = self.clock.now();
        let start = normalize_start_date(date, &request.recurring);
        let id = self.store.next_task_id(now);
        let mut task = Task::new(id, name, start, now);
        task.series_anchor = Some(self.store.next_anchor());
        task.assigned_to = request.assigned_to;
        task.assigned_date = request.assigned_to.map(|_| now);
        task.points = request.points;
        task.recurring = request.recurring;
        if task.points.is_none() {
            assign_auto_points(&mut task, &self.store.settings);
        }
        info!(
            "event=task_create module=service status=ok task_id={} recurring={}",
            id, task.recurring
        );
        self.store.insert_task(task);

        self.commit_with(|store| store.task(id).cloned())
            .require(ChoreError::TaskNotFound(id))
    }

    /// Applies a partial update.
    ///
    /// Reassignment of an awarded task moves the award to the new assignee.
    /// A false->true completion stamps `finished`, awards coins and, for
    /// recurring tasks, inserts the next occurrence. A true->false toggle
    /// clears `finished` and revokes the award. Any change of assignee
    /// re-stamps `assigned_date`, or clears it when unassigning.
    ///
    /// # Errors
    /// - [`ChoreError::Validation`], [`ChoreError::PersonNotFound`] and
    ///   [`ChoreError::TaskNotFound`]; the task is left unchanged.
    /// - [`ChoreError::DateTaken`] when another active occurrence of the
    ///   series already sits on the new date.
    pub fn update_task(&mut self, id: TaskId, patch: TaskPatch) -> ChoreResult<Commit<Task>> {
        let name = patch.name.as_deref().map(validate_name).transpose()?;
        let date = patch.date.as_deref().map(parse_date).transpose()?;
        if let Some(kind) = &patch.recurring {
            validate_recurrence(kind)?;
        }
        if let Some(Some(person)) = patch.assigned_to {
            self.require_person(person)?;
        }
        let current = self.store.task(id).ok_or(ChoreError::TaskNotFound(id))?;
        if let Some(date) = date {
            let text = format_date(date);
            let series = current.series();
            let taken = self.store.tasks.iter().any(|other| {
                other.id != id && other.series() == series && other.is_active() && other.date == text
            });
            if taken {
                return Err(ChoreError::DateTaken { series, date: text });
            }
        }

        let now = self.clock.now();
        let store = &mut self.store;
        let settings = &store.settings;
        let ledger = &mut store.ledger;
        let task = store
            .tasks
            .iter_mut()
            .find(|task| task.id == id)
            .ok_or(ChoreError::TaskNotFound(id))?;

        let was_done = task.done;
        let renamed = name.is_some();
        if let Some(name) = name {
            task.name = name;
        }
        if let Some(date) = date {
            task.date = format_date(date);
        }
        if let Some(kind) = patch.recurring {
            task.recurring = kind;
        }
        match patch.points {
            Some(points) => {
                task.points = points;
                task.auto_points_rule = None;
            }
            None if renamed && task.awarded_points.is_none() => {
                assign_auto_points(task, settings);
            }
            None => {}
        }
        if let Some(assignee) = patch.assigned_to {
            if assignee != task.assigned_to {
                revoke(task, ledger);
                task.assigned_to = assignee;
                task.assigned_date = assignee.map(|_| now);
                award(task, ledger, settings);
            }
        }
        if let Some(done) = patch.done {
            task.done = done;
        }

        let completed = !was_done && task.done;
        let reopened = was_done && !task.done;
        if completed {
            task.finished = Some(now);
            award(task, ledger, settings);
        } else if reopened {
            task.finished = None;
            revoke(task, ledger);
        }
        let spawn = completed && task.is_recurring();

        if spawn {
            if let Some(next_id) = spawn_successor(store, id, now) {
                info!(
                    "event=series_next module=service status=ok task_id={} next_id={}",
                    id, next_id
                );
            }
        }
        info!(
            "event=task_update module=service status=ok task_id={} completed={} reopened={}",
            id, completed, reopened
        );

        self.commit_with(|store| store.task(id).cloned())
            .require(ChoreError::TaskNotFound(id))
    }

    /// Soft-deletes a task. Deleting twice is a no-op.
    ///
    /// # Errors
    /// - [`ChoreError::TaskNotFound`] for an unknown id.
    pub fn delete_task(&mut self, id: TaskId) -> ChoreResult<Commit<()>> {
        let task = self.store.task_mut(id).ok_or(ChoreError::TaskNotFound(id))?;
        task.soft_delete();
        info!("event=task_delete module=service status=ok task_id={}", id);
        Ok(self.commit_with(|_| ()))
    }

    /// Moves the series of each referenced task into the given sequence.
    ///
    /// Returns the number of series that were re-anchored.
    pub fn reorder(&mut self, ids: &[TaskId]) -> Commit<usize> {
        let moved = reorder_series(&mut self.store.tasks, ids);
        info!(
            "event=task_reorder module=service status=ok ids={} series={}",
            ids.len(),
            moved
        );
        self.commit_with(|_| moved)
    }

    /// Runs the integrity repair pass and commits the result.
    pub fn repair(&mut self) -> Commit<RepairReport> {
        let today = self.clock.today();
        let report = integrity::repair(&mut self.store.tasks, today);
        info!(
            "event=integrity_repair module=service status=ok series_duplicates={} overdue={} duplicates={} completed={}",
            report.series_duplicates_archived,
            report.overdue_occurrences_archived,
            report.duplicate_tasks_archived,
            report.completed_archived
        );
        self.commit_with(|_| report)
    }

    /// Adds a person at level 1 with a computed title.
    ///
    /// # Errors
    /// - [`ChoreError::EmptyPersonName`] for a blank name.
    pub fn add_person(&mut self, name: &str) -> ChoreResult<Commit<Person>> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ChoreError::EmptyPersonName);
        }
        let id = self.store.next_person_id(self.clock.now());
        self.store.people.push(Person::new(id, name));
        info!("event=person_add module=service status=ok person_id={}", id);
        self.commit_with(|store| store.person(id).cloned())
            .require(ChoreError::PersonNotFound(id))
    }

    /// Unassigns the person's tasks, then removes the person and balance.
    ///
    /// # Errors
    /// - [`ChoreError::PersonNotFound`] for an unknown id.
    pub fn remove_person(&mut self, id: PersonId) -> ChoreResult<Commit<()>> {
        self.require_person(id)?;
        let mut unassigned = 0usize;
        for task in self
            .store
            .tasks
            .iter_mut()
            .filter(|task| task.assigned_to == Some(id))
        {
            task.assigned_to = None;
            task.assigned_date = None;
            task.awarded_points = None;
            unassigned += 1;
        }
        self.store.people.retain(|person| person.id != id);
        self.store.ledger.balances.remove(&id);
        info!(
            "event=person_remove module=service status=ok person_id={} unassigned={}",
            id, unassigned
        );
        Ok(self.commit_with(|_| ()))
    }

    /// Current household settings.
    pub fn settings(&self) -> &Settings {
        &self.store.settings
    }

    /// Applies a settings patch and re-arms triggers whose time changed.
    pub fn update_settings(&mut self, patch: SettingsPatch) -> Commit<Settings> {
        let next = apply_settings_patch(&self.store.settings, patch);
        let times_changed = next.maintenance_time != self.store.settings.maintenance_time
            || next.reminder_time != self.store.settings.reminder_time;
        self.store.settings = next;
        if times_changed {
            self.rearm_triggers();
        }
        info!("event=settings_update module=service status=ok rearmed={}", times_changed);
        self.commit_with(|store| store.settings.clone())
    }

    /// Switches the displayed progress system; balances and levels are kept.
    pub fn set_reward_mode(&mut self, mode: RewardMode) -> Commit<Settings> {
        self.update_settings(SettingsPatch {
            reward_mode: Some(mode),
            ..SettingsPatch::default()
        })
    }

    /// Chart identifiers shown on the analytics page, in display order.
    pub fn analytics_boards(&self) -> &[String] {
        &self.store.analytics_boards
    }

    /// Replaces the analytics board list.
    ///
    /// # Contract
    /// - The list is stored as given; no deduplication.
    /// - Returns the stored list and whether it reached disk.
    pub fn set_analytics_boards(&mut self, boards: Vec<String>) -> Commit<Vec<String>> {
        self.store.analytics_boards = boards;
        self.commit_with(|store| store.analytics_boards.clone())
    }

    /// Reward catalog in insertion order.
    pub fn rewards(&self) -> &[Reward] {
        &self.store.ledger.rewards
    }

    /// Append-only redemption log, oldest first.
    pub fn redemptions(&self) -> &[Redemption] {
        &self.store.ledger.redemptions
    }

    /// Coin balance of `person`; unknown people have zero.
    pub fn balance(&self, person: PersonId) -> u64 {
        self.store.ledger.balance(person)
    }

    /// Adds a catalog entry with a trimmed name.
    ///
    /// # Errors
    /// - [`ChoreError::EmptyRewardName`] for a blank name.
    pub fn add_reward(&mut self, name: &str, cost: u64) -> ChoreResult<Commit<Reward>> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ChoreError::EmptyRewardName);
        }
        let id = self.store.next_reward_id(self.clock.now());
        let reward = Reward {
            id,
            name: name.to_string(),
            cost,
        };
        self.store.ledger.rewards.push(reward.clone());
        info!("event=reward_add module=service status=ok reward_id={} cost={}", id, cost);
        Ok(self.commit_with(|_| reward))
    }

    /// Removes a catalog entry. Past redemptions of it stay in the log.
    ///
    /// # Errors
    /// - [`ChoreError::RewardNotFound`] when `id` is not in the catalog.
    pub fn remove_reward(&mut self, id: RewardId) -> ChoreResult<Commit<()>> {
        if self.store.ledger.reward(id).is_none() {
            return Err(ChoreError::RewardNotFound(id));
        }
        self.store.ledger.rewards.retain(|reward| reward.id != id);
        Ok(self.commit_with(|_| ()))
    }

    /// Debits the reward cost and appends to the redemption log.
    ///
    /// # Errors
    /// - [`ChoreError::PersonNotFound`] or [`ChoreError::RewardNotFound`].
    /// - [`ChoreError::InsufficientCoins`] when the balance is below the
    ///   cost; nothing is debited.
    pub fn redeem(
        &mut self,
        reward_id: RewardId,
        person: PersonId,
    ) -> ChoreResult<Commit<Redemption>> {
        self.require_person(person)?;
        let cost = self
            .store
            .ledger
            .reward(reward_id)
            .map(|reward| reward.cost)
            .ok_or(ChoreError::RewardNotFound(reward_id))?;
        let balance = self.store.ledger.balance(person);
        if balance < cost {
            return Err(ChoreError::InsufficientCoins {
                person,
                balance,
                cost,
            });
        }

        let now = self.clock.now();
        let redemption = Redemption {
            id: self.store.next_redemption_id(now),
            reward_id,
            person_id: person,
            cost,
            redeemed_at: now,
        };
        self.store.ledger.debit_clamped(person, cost);
        self.store.ledger.redemptions.push(redemption.clone());
        info!(
            "event=reward_redeem module=service status=ok reward_id={} person_id={} cost={}",
            reward_id, person, cost
        );
        Ok(self.commit_with(|_| redemption))
    }

    /// Open, active tasks dated `day`, grouped by assignee.
    pub fn reminders(&self, day: NaiveDate) -> Vec<Reminder> {
        let mut grouped: BTreeMap<Option<PersonId>, Vec<TaskId>> = BTreeMap::new();
        for task in &self.store.tasks {
            if task.is_active() && !task.done && task.day() == Some(day) {
                grouped.entry(task.assigned_to).or_default().push(task.id);
            }
        }
        grouped
            .into_iter()
            .map(|(person_id, task_ids)| Reminder {
                person_id,
                task_ids,
            })
            .collect()
    }

    /// Polls the daily triggers and runs whatever is due.
    pub fn tick(&mut self) -> TickReport {
        let now = self.clock.local_now();
        let mut report = TickReport::default();
        if self.maintenance.poll(now) {
            report.maintenance = Some(self.repair().value);
        }
        if self.reminder.poll(now) {
            report.reminders = Some(self.reminders(now.date()));
        }
        report
    }

    /// Next armed instants of the maintenance and reminder triggers.
    pub fn trigger_schedule(&self) -> (Option<chrono::NaiveDateTime>, Option<chrono::NaiveDateTime>) {
        (self.maintenance.armed_for(), self.reminder.armed_for())
    }

    fn require_person(&self, id: PersonId) -> ChoreResult<()> {
        match self.store.person(id) {
            Some(_) => Ok(()),
            None => Err(ChoreError::PersonNotFound(id)),
        }
    }

    fn rearm_triggers(&mut self) {
        let now = self.clock.local_now();
        let settings = &self.store.settings;
        self.maintenance
            .rearm(settings.maintenance_time.as_deref(), now);
        self.reminder.rearm(settings.reminder_time.as_deref(), now);
    }

    /// Top-up, compaction and people refresh. Returns generated task ids.
    fn derive(&mut self) -> Vec<TaskId> {
        let generated = top_up_all(&mut self.store, self.clock.today(), self.clock.now());
        compact(&mut self.store.tasks);
        self.refresh_derived();
        generated
    }

    fn refresh_derived(&mut self) {
        let store = &mut self.store;
        let ledger = &store.ledger;
        refresh_people(&mut store.people, &store.tasks, &store.settings, |id| {
            ledger.balance(id)
        });
    }

    fn commit_with<T>(&mut self, read: impl FnOnce(&Store) -> T) -> Commit<T> {
        self.derive();
        let persisted = self.persist();
        Commit {
            value: read(&self.store),
            persisted,
        }
    }

    fn persist(&self) -> bool {
        let tasks_ok = self.repo.save_tasks(&self.store.task_snapshot()).is_ok();
        let ledger_ok = self.repo.save_ledger(&self.store.ledger).is_ok();
        if !(tasks_ok && ledger_ok) {
            warn!(
                "event=store_commit module=service status=error tasks_ok={} ledger_ok={}",
                tasks_ok, ledger_ok
            );
        }
        tasks_ok && ledger_ok
    }
}
