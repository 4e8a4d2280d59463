//! Store configuration and settings resolution.
//!
//! # Responsibility
//! - Locate the two durable snapshot files inside one data directory.
//! - Resolve settings values through an explicit precedence order.
//!
//! # Invariants
//! - Resolution returns the first defined candidate, in caller order.
//! - Blank strings never override a defined value.

use crate::model::settings::{
    LevelingConfig, Settings, SettingsPatch, DEFAULT_DATE_FORMATTING, DEFAULT_LANGUAGE,
    DEFAULT_MAX_LEVEL,
};
use std::path::{Path, PathBuf};

pub const DEFAULT_TASKS_FILE: &str = "chores.json";
pub const DEFAULT_LEDGER_FILE: &str = "ledger.json";

/// File layout for one household store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub data_dir: PathBuf,
    pub tasks_file: String,
    pub ledger_file: String,
}

impl StoreConfig {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            tasks_file: DEFAULT_TASKS_FILE.to_string(),
            ledger_file: DEFAULT_LEDGER_FILE.to_string(),
        }
    }

    pub fn tasks_path(&self) -> PathBuf {
        self.data_dir.join(&self.tasks_file)
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.data_dir.join(&self.ledger_file)
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

/// Returns the first defined value in precedence order.
pub fn first_defined<T, I>(candidates: I) -> Option<T>
where
    I: IntoIterator<Item = Option<T>>,
{
    candidates.into_iter().flatten().next()
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|text| !text.trim().is_empty())
}

fn positive(value: f64) -> Option<f64> {
    (value.is_finite() && value > 0.0).then_some(value)
}

/// Clamps leveling numbers into usable ranges.
///
/// Non-positive estimates fall back to 1; a zero max level falls back to
/// the default max level.
pub fn sanitize_leveling(config: LevelingConfig) -> LevelingConfig {
    LevelingConfig {
        chores_to_max_level: config.chores_to_max_level.and_then(positive),
        years_to_max_level: positive(config.years_to_max_level).unwrap_or(1.0),
        chores_per_week_estimate: positive(config.chores_per_week_estimate).unwrap_or(1.0),
        max_level: if config.max_level > 0 {
            config.max_level
        } else {
            DEFAULT_MAX_LEVEL
        },
        ..config
    }
}

/// Applies a patch: patch value, then current value, then built-in default.
pub fn apply_settings_patch(current: &Settings, patch: SettingsPatch) -> Settings {
    Settings {
        language: first_defined([
            non_blank(patch.language),
            non_blank(Some(current.language.clone())),
        ])
        .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
        date_formatting: first_defined([
            non_blank(patch.date_formatting),
            non_blank(Some(current.date_formatting.clone())),
        ])
        .unwrap_or_else(|| DEFAULT_DATE_FORMATTING.to_string()),
        use_ai: first_defined([patch.use_ai, Some(current.use_ai)]).unwrap_or(true),
        leveling_enabled: None,
        leveling: sanitize_leveling(
            first_defined([patch.leveling, Some(current.leveling.clone())]).unwrap_or_default(),
        ),
        level_titles: first_defined([patch.level_titles, Some(current.level_titles.clone())])
            .flatten(),
        custom_level_titles: first_defined([
            patch.custom_level_titles,
            Some(current.custom_level_titles.clone()),
        ])
        .unwrap_or_default(),
        coin_rules: first_defined([patch.coin_rules, Some(current.coin_rules.clone())])
            .unwrap_or_default(),
        default_coin_points: first_defined([
            patch.default_coin_points,
            Some(current.default_coin_points),
        ])
        .unwrap_or(1),
        reward_mode: first_defined([patch.reward_mode, Some(current.reward_mode)])
            .unwrap_or_default(),
        maintenance_time: first_defined([
            patch.maintenance_time,
            Some(current.maintenance_time.clone()),
        ])
        .flatten(),
        reminder_time: first_defined([patch.reminder_time, Some(current.reminder_time.clone())])
            .flatten(),
        extra: current.extra.clone(),
    }
}
