//! Household settings persisted alongside the task collection.
//!
//! # Responsibility
//! - Hold leveling, title, coin-rule and trigger configuration.
//! - Provide patch records whose absent fields mean "keep current".
//!
//! # Invariants
//! - Every field has a built-in default so partial or legacy snapshots load.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFAULT_LANGUAGE: &str = "en";
pub const DEFAULT_DATE_FORMATTING: &str = "yyyy-mm-dd";
pub const DEFAULT_MAX_LEVEL: u32 = 100;
pub const DEFAULT_COIN_POINTS: u32 = 1;

/// How the level target is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LevelingMode {
    /// Fixed number of completed chores to reach max level.
    Chores,
    /// `years_to_max_level * 52 * chores_per_week_estimate` chores.
    #[default]
    Years,
}

/// Which progress system the display layer shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewardMode {
    #[default]
    Levels,
    Coins,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LevelingConfig {
    pub enabled: bool,
    pub mode: LevelingMode,
    pub chores_to_max_level: Option<f64>,
    pub years_to_max_level: f64,
    pub chores_per_week_estimate: f64,
    pub max_level: u32,
}

impl Default for LevelingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            mode: LevelingMode::Years,
            chores_to_max_level: None,
            years_to_max_level: 3.0,
            chores_per_week_estimate: 4.0,
            max_level: DEFAULT_MAX_LEVEL,
        }
    }
}

/// Auto-pricing rule: tasks whose name contains `pattern` are worth `points`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoinRule {
    pub pattern: String,
    pub points: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub language: String,
    pub date_formatting: String,
    #[serde(rename = "useAI", alias = "useAi")]
    pub use_ai: bool,
    /// Top-level leveling switch from older files.
    ///
    /// Folded into `leveling.enabled` on load and mirrored back on save, so
    /// it is always `None` in memory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub leveling_enabled: Option<bool>,
    pub leveling: LevelingConfig,
    /// Global title bands; only honored when exactly ten entries long.
    pub level_titles: Option<Vec<String>>,
    /// Per-person title bands keyed by person name.
    pub custom_level_titles: BTreeMap<String, Vec<String>>,
    pub coin_rules: Vec<CoinRule>,
    pub default_coin_points: u32,
    pub reward_mode: RewardMode,
    /// Daily maintenance trigger time, `HH:MM`.
    pub maintenance_time: Option<String>,
    /// Daily reminder trigger time, `HH:MM`.
    pub reminder_time: Option<String>,
    /// Keys written by other clients, kept verbatim across saves.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            language: DEFAULT_LANGUAGE.to_string(),
            date_formatting: DEFAULT_DATE_FORMATTING.to_string(),
            use_ai: true,
            leveling_enabled: None,
            leveling: LevelingConfig::default(),
            level_titles: None,
            custom_level_titles: BTreeMap::new(),
            coin_rules: Vec::new(),
            default_coin_points: DEFAULT_COIN_POINTS,
            reward_mode: RewardMode::Levels,
            maintenance_time: None,
            reminder_time: None,
            extra: BTreeMap::new(),
        }
    }
}

impl Settings {
    /// Moves the legacy top-level leveling switch into `leveling`.
    pub fn absorb_legacy_fields(&mut self) {
        if let Some(enabled) = self.leveling_enabled.take() {
            self.leveling.enabled = enabled;
        }
    }

    /// Copy with the legacy switch filled in for older readers.
    pub fn with_legacy_fields(&self) -> Self {
        Self {
            leveling_enabled: Some(self.leveling.enabled),
            ..self.clone()
        }
    }
}

/// Partial settings update.
///
/// `None` keeps the current value. Clearable fields use a nested `Option`
/// where `Some(None)` clears.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsPatch {
    pub language: Option<String>,
    pub date_formatting: Option<String>,
    pub use_ai: Option<bool>,
    pub leveling: Option<LevelingConfig>,
    pub level_titles: Option<Option<Vec<String>>>,
    pub custom_level_titles: Option<BTreeMap<String, Vec<String>>>,
    pub coin_rules: Option<Vec<CoinRule>>,
    pub default_coin_points: Option<u32>,
    pub reward_mode: Option<RewardMode>,
    pub maintenance_time: Option<Option<String>>,
    pub reminder_time: Option<Option<String>>,
}
