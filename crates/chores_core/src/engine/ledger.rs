//! Coin ledger bookkeeping for completion toggles.
//!
//! # Responsibility
//! - Price a chore from its explicit value, a matching coin rule, or the
//!   configured default.
//! - Credit on completion and debit on un-completion exactly once each.
//!
//! # Invariants
//! - `awarded_points` is the idempotency marker: set by [`award`], cleared
//!   by [`revoke`]. A second award without a revoke is a no-op.
//! - Revoking without a prior award is a no-op, not an error.

use crate::model::reward::Ledger;
use crate::model::settings::{CoinRule, Settings};
use crate::model::task::Task;
use log::debug;

/// Point value and the rule pattern that produced it, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPoints {
    pub points: u32,
    pub rule: Option<String>,
}

/// First rule whose pattern is a case-insensitive substring of `name`.
pub fn matching_rule<'a>(name: &str, rules: &'a [CoinRule]) -> Option<&'a CoinRule> {
    let name = name.to_lowercase();
    rules.iter().find(|rule| {
        let pattern = rule.pattern.trim().to_lowercase();
        !pattern.is_empty() && name.contains(&pattern)
    })
}

/// Resolves the coin value for `task`.
pub fn resolve_points(task: &Task, settings: &Settings) -> ResolvedPoints {
    if let Some(points) = task.points {
        return ResolvedPoints {
            points,
            rule: task.auto_points_rule.clone(),
        };
    }
    match matching_rule(&task.name, &settings.coin_rules) {
        Some(rule) => ResolvedPoints {
            points: rule.points,
            rule: Some(rule.pattern.clone()),
        },
        None => ResolvedPoints {
            points: settings.default_coin_points,
            rule: None,
        },
    }
}

/// Re-derives rule-based points for a task that has no explicit value.
///
/// Explicitly priced tasks are left alone.
pub fn assign_auto_points(task: &mut Task, settings: &Settings) {
    if task.points.is_some() && task.auto_points_rule.is_none() {
        return;
    }
    match matching_rule(&task.name, &settings.coin_rules) {
        Some(rule) => {
            task.points = Some(rule.points);
            task.auto_points_rule = Some(rule.pattern.clone());
        }
        None => {
            task.points = None;
            task.auto_points_rule = None;
        }
    }
}

/// Credits the assignee for a completed task once.
///
/// Returns the awarded amount, or `None` when the task is not done, has no
/// assignee, or was already awarded.
pub fn award(task: &mut Task, ledger: &mut Ledger, settings: &Settings) -> Option<u32> {
    if !task.done || task.awarded_points.is_some() {
        return None;
    }
    let person = task.assigned_to?;
    let resolved = resolve_points(task, settings);
    if task.points.is_none() && resolved.rule.is_some() {
        task.points = Some(resolved.points);
        task.auto_points_rule = resolved.rule.clone();
    }

    ledger.credit(person, u64::from(resolved.points));
    task.awarded_points = Some(resolved.points);
    debug!(
        "event=coin_award module=ledger status=ok task_id={} person_id={} points={}",
        task.id, person, resolved.points
    );
    Some(resolved.points)
}

/// Debits a previous award and clears the marker.
///
/// Returns the amount actually removed from the balance.
pub fn revoke(task: &mut Task, ledger: &mut Ledger) -> Option<u64> {
    let amount = task.awarded_points.take()?;
    let person = task.assigned_to?;
    let removed = ledger.debit_clamped(person, u64::from(amount));
    debug!(
        "event=coin_revoke module=ledger status=ok task_id={} person_id={} points={}",
        task.id, person, removed
    );
    Some(removed)
}

#[cfg(test)]
mod tests {
    use super::{matching_rule, resolve_points};
    use crate::model::settings::{CoinRule, Settings};
    use crate::model::task::Task;
    use chrono::{NaiveDate, TimeZone, Utc};

    fn rules() -> Vec<CoinRule> {
        vec![
            CoinRule {
                pattern: "  ".to_string(),
                points: 99,
            },
            CoinRule {
                pattern: "DISH".to_string(),
                points: 5,
            },
            CoinRule {
                pattern: "wash".to_string(),
                points: 2,
            },
        ]
    }

    #[test]
    fn first_non_blank_rule_wins_case_insensitively() {
        let rules = rules();
        let rule = matching_rule("Wash the dishes", &rules).unwrap();
        assert_eq!(rule.points, 5);
    }

    #[test]
    fn explicit_points_beat_rules_and_default_applies_last() {
        let mut settings = Settings::default();
        settings.coin_rules = rules();
        let created = Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap();
        let day = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();

        let mut explicit = Task::new(1, "Wash the dishes", day, created);
        explicit.points = Some(8);
        assert_eq!(resolve_points(&explicit, &settings).points, 8);

        let plain = Task::new(2, "Water plants", day, created);
        let resolved = resolve_points(&plain, &settings);
        assert_eq!(resolved.points, 1);
        assert_eq!(resolved.rule, None);
    }
}
