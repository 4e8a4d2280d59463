//! Household chores store.
//!
//! Owns the task collection, people, settings and coin ledger; derives
//! recurrence, ordering, levels and balances; persists every change with
//! crash-safe snapshot writes.

pub mod clock;
pub mod config;
pub mod engine;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod store;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::StoreConfig;
pub use engine::integrity::RepairReport;
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::person::{Person, PersonId};
pub use model::recurrence::Recurrence;
pub use model::reward::{Ledger, Redemption, Reward, RewardId};
pub use model::settings::{LevelingMode, RewardMode, Settings, SettingsPatch};
pub use model::task::{Task, TaskId, TaskValidationError};
pub use repo::atomic::{LoadSource, PersistError};
pub use repo::snapshot_repo::{JsonFileRepository, SnapshotRepository, TaskSnapshot};
pub use service::chore_service::{
    ChoreError, ChoreResult, ChoreService, Commit, NewTask, Reminder, TaskPatch, TickReport,
};
pub use store::Store;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
