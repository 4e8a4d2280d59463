//! Person domain model.
//!
//! `level`, `title` and `points` are derived fields: they are recomputed
//! from the task collection and the coin ledger after every mutation and
//! only persisted as a convenience snapshot.

use serde::{Deserialize, Serialize};

/// Stable identifier for one household member.
pub type PersonId = u64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    pub id: PersonId,
    pub name: String,
    #[serde(default = "first_level")]
    pub level: u32,
    #[serde(default)]
    pub title: String,
    /// Coin balance mirrored from the ledger.
    #[serde(default)]
    pub points: u64,
}

impl Person {
    pub fn new(id: PersonId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            level: first_level(),
            title: String::new(),
            points: 0,
        }
    }
}

fn first_level() -> u32 {
    1
}
