//! Level and title derivation.
//!
//! # Invariants
//! - Level is within `[1, max_level]` and non-decreasing in completed count.
//! - Leveling disabled pins every level at 1.
//! - Completed counts include soft-deleted completed tasks, so archival
//!   never regresses a level.

use crate::model::person::{Person, PersonId};
use crate::model::settings::{LevelingConfig, LevelingMode, Settings};
use crate::model::task::Task;

pub const TITLE_BANDS: usize = 10;
pub const LEVELS_PER_BAND: u32 = 10;

pub const DEFAULT_TITLES: [&str; TITLE_BANDS] = [
    "Junior",
    "Apprentice",
    "Journeyman",
    "Experienced",
    "Expert",
    "Veteran",
    "Master",
    "Grandmaster",
    "Legend",
    "Mythic",
];

/// Chores needed to reach the max level.
///
/// `chores` mode without an explicit target falls back to the time-based
/// estimate.
pub fn chores_to_max_level(config: &LevelingConfig) -> f64 {
    let estimate = config.years_to_max_level * 52.0 * config.chores_per_week_estimate;
    match config.mode {
        LevelingMode::Chores => config.chores_to_max_level.unwrap_or(estimate),
        LevelingMode::Years => estimate,
    }
}

/// Level reached after `completed` chores.
pub fn level_for_count(completed: usize, config: &LevelingConfig) -> u32 {
    if !config.enabled {
        return 1;
    }
    let max_level = config.max_level.max(1);
    let per_level = chores_to_max_level(config) / f64::from(max_level);
    if !per_level.is_finite() || per_level <= 0.0 {
        return max_level;
    }

    let raw = (completed as f64 / per_level).floor() + 1.0;
    if raw >= f64::from(max_level) {
        max_level
    } else {
        // raw is in [1, max_level) here.
        raw as u32
    }
}

/// Completed chores credited to `person`.
pub fn completed_count(tasks: &[Task], person: PersonId) -> usize {
    tasks
        .iter()
        .filter(|task| task.done && task.assigned_to == Some(person))
        .count()
}

pub fn level(tasks: &[Task], person: PersonId, config: &LevelingConfig) -> u32 {
    level_for_count(completed_count(tasks, person), config)
}

/// Title for `level`, honoring per-person then global ten-entry overrides.
pub fn title(level: u32, person: Option<&Person>, settings: &Settings) -> String {
    let band = (level.max(1) - 1) / LEVELS_PER_BAND;
    let band = usize::try_from(band).unwrap_or(usize::MAX);

    let custom = person
        .and_then(|person| settings.custom_level_titles.get(&person.name))
        .filter(|titles| titles.len() == TITLE_BANDS);
    let global = settings
        .level_titles
        .as_ref()
        .filter(|titles| titles.len() == TITLE_BANDS);

    match custom.or(global) {
        Some(titles) => titles
            .get(band)
            .or_else(|| titles.last())
            .cloned()
            .unwrap_or_default(),
        None => DEFAULT_TITLES
            .get(band)
            .unwrap_or(&DEFAULT_TITLES[TITLE_BANDS - 1])
            .to_string(),
    }
}

/// Recomputes level, title and coin balance for every person.
pub fn refresh_people(
    people: &mut [Person],
    tasks: &[Task],
    settings: &Settings,
    balance: impl Fn(PersonId) -> u64,
) {
    for person in people.iter_mut() {
        person.level = level(tasks, person.id, &settings.leveling);
        person.title = title(person.level, Some(&*person), settings);
        person.points = balance(person.id);
    }
}
