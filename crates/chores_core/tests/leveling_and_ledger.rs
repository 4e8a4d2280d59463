use chores_core::engine::ledger::{award, revoke};
use chores_core::engine::leveling::{level, level_for_count, title, DEFAULT_TITLES};
use chores_core::model::settings::{CoinRule, LevelingConfig};
use chores_core::{Ledger, LevelingMode, Settings, Task};
use chrono::{NaiveDate, Utc};

fn chores_mode(target: f64, max_level: u32) -> LevelingConfig {
    LevelingConfig {
        mode: LevelingMode::Chores,
        chores_to_max_level: Some(target),
        max_level,
        ..LevelingConfig::default()
    }
}

fn done_task(id: u64, name: &str, person: u64) -> Task {
    let mut task = Task::new(
        id,
        name,
        NaiveDate::from_ymd_opt(2024, 3, 20).unwrap(),
        Utc::now(),
    );
    task.assigned_to = Some(person);
    task.done = true;
    task
}

#[test]
fn one_chore_per_level_caps_at_max() {
    let config = chores_mode(100.0, 100);
    for completed in 0..99 {
        assert_eq!(level_for_count(completed, &config), completed as u32 + 1);
    }
    assert_eq!(level_for_count(99, &config), 100);
    assert_eq!(level_for_count(250, &config), 100);
}

#[test]
fn chores_mode_without_target_uses_time_estimate() {
    let config = LevelingConfig {
        mode: LevelingMode::Chores,
        ..LevelingConfig::default()
    };
    // 3 years * 52 weeks * 4 chores / 100 levels = 6.24 chores per level.
    assert_eq!(level_for_count(6, &config), 1);
    assert_eq!(level_for_count(7, &config), 2);
}

#[test]
fn deleted_completions_still_count_toward_level() {
    let config = chores_mode(10.0, 10);
    let mut archived = done_task(1, "Sweep", 5);
    archived.soft_delete();
    let tasks = vec![archived, done_task(2, "Mop", 5), done_task(3, "Dust", 6)];
    assert_eq!(level(&tasks, 5, &config), 3);
    assert_eq!(level(&tasks, 6, &config), 2);
}

#[test]
fn titles_follow_bands_and_overrides() {
    let mut settings = Settings::default();
    assert_eq!(title(1, None, &settings), DEFAULT_TITLES[0]);
    assert_eq!(title(100, None, &settings), DEFAULT_TITLES[9]);

    settings.level_titles = Some(vec!["too short".to_string()]);
    assert_eq!(title(15, None, &settings), DEFAULT_TITLES[1]);
}

#[test]
fn rule_priced_award_is_credited_once_and_revoked_once() {
    let settings = Settings {
        coin_rules: vec![
            CoinRule {
                pattern: "  ".to_string(),
                points: 50,
            },
            CoinRule {
                pattern: "DISH".to_string(),
                points: 5,
            },
        ],
        ..Settings::default()
    };
    let mut ledger = Ledger::default();
    let mut task = done_task(1, "Wash the dishes", 9);

    assert_eq!(award(&mut task, &mut ledger, &settings), Some(5));
    assert_eq!(award(&mut task, &mut ledger, &settings), None);
    assert_eq!(ledger.balance(9), 5);
    assert_eq!(task.auto_points_rule.as_deref(), Some("DISH"));

    assert_eq!(revoke(&mut task, &mut ledger), Some(5));
    assert_eq!(revoke(&mut task, &mut ledger), None);
    assert_eq!(ledger.balance(9), 0);
}

#[test]
fn revoke_clamps_a_spent_balance_at_zero() {
    let settings = Settings::default();
    let mut ledger = Ledger::default();
    let mut task = done_task(1, "Anything", 3);
    task.points = Some(4);
    award(&mut task, &mut ledger, &settings);
    ledger.debit_clamped(3, 3);

    assert_eq!(revoke(&mut task, &mut ledger), Some(1));
    assert_eq!(ledger.balance(3), 0);
}

#[test]
fn unassigned_completion_awards_nothing() {
    let settings = Settings::default();
    let mut ledger = Ledger::default();
    let mut task = done_task(1, "Anything", 3);
    task.assigned_to = None;
    assert_eq!(award(&mut task, &mut ledger, &settings), None);
    assert!(task.awarded_points.is_none());
}
