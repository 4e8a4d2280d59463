//! Coin ledger records: balances, reward catalog and redemption log.
//!
//! # Invariants
//! - Balances never go negative; debits clamp at zero.
//! - The redemption log is append-only.

use crate::model::person::PersonId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub type RewardId = u64;
pub type RedemptionId = u64;

/// Catalog entry that can be bought with coins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reward {
    pub id: RewardId,
    pub name: String,
    pub cost: u64,
}

/// One coin deduction for a redeemed reward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Redemption {
    pub id: RedemptionId,
    pub reward_id: RewardId,
    pub person_id: PersonId,
    pub cost: u64,
    pub redeemed_at: DateTime<Utc>,
}

/// Second durable collection: everything that shares the coin balance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Ledger {
    pub balances: BTreeMap<PersonId, u64>,
    pub rewards: Vec<Reward>,
    pub redemptions: Vec<Redemption>,
}

impl Ledger {
    pub fn balance(&self, person: PersonId) -> u64 {
        self.balances.get(&person).copied().unwrap_or(0)
    }

    pub fn credit(&mut self, person: PersonId, amount: u64) {
        let entry = self.balances.entry(person).or_insert(0);
        *entry = entry.saturating_add(amount);
    }

    /// Debits `amount`, clamping at zero. Returns the amount actually removed.
    pub fn debit_clamped(&mut self, person: PersonId, amount: u64) -> u64 {
        let entry = self.balances.entry(person).or_insert(0);
        let removed = amount.min(*entry);
        *entry -= removed;
        removed
    }

    pub fn reward(&self, id: RewardId) -> Option<&Reward> {
        self.rewards.iter().find(|reward| reward.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::Ledger;

    #[test]
    fn debit_clamps_at_zero() {
        let mut ledger = Ledger::default();
        ledger.credit(7, 3);
        assert_eq!(ledger.debit_clamped(7, 5), 3);
        assert_eq!(ledger.balance(7), 0);
    }

    #[test]
    fn balances_roundtrip_with_integer_keys() {
        let mut ledger = Ledger::default();
        ledger.credit(42, 9);
        let json = serde_json::to_string(&ledger).unwrap();
        let back: Ledger = serde_json::from_str(&json).unwrap();
        assert_eq!(back.balance(42), 9);
    }
}
