//! Snapshot repository contract and JSON file implementation.
//!
//! # Responsibility
//! - Persist the task collection (with people, settings, boards) and the
//!   coin ledger as two independent snapshots.
//!
//! # Invariants
//! - Loads never fail; corrupt state degrades to backup, then defaults.
//! - Each successful save leaves a `.bak` of the previous content.

use crate::config::StoreConfig;
use crate::model::person::Person;
use crate::model::reward::Ledger;
use crate::model::settings::Settings;
use crate::model::task::Task;
use crate::repo::atomic::{load_json_with_fallback, write_json_atomic, Loaded, PersistResult};
use serde::{Deserialize, Serialize};

/// First durable collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TaskSnapshot {
    pub tasks: Vec<Task>,
    pub people: Vec<Person>,
    pub analytics_boards: Vec<String>,
    pub settings: Settings,
}

/// Repository interface for the two durable snapshots.
pub trait SnapshotRepository {
    fn load_tasks(&self) -> Loaded<TaskSnapshot>;
    fn save_tasks(&self, snapshot: &TaskSnapshot) -> PersistResult<()>;
    fn load_ledger(&self) -> Loaded<Ledger>;
    fn save_ledger(&self, ledger: &Ledger) -> PersistResult<()>;
}

/// JSON-file-backed snapshot repository.
#[derive(Debug, Clone)]
pub struct JsonFileRepository {
    config: StoreConfig,
}

impl JsonFileRepository {
    pub fn new(config: StoreConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }
}

impl SnapshotRepository for JsonFileRepository {
    fn load_tasks(&self) -> Loaded<TaskSnapshot> {
        load_json_with_fallback(&self.config.tasks_path(), "tasks")
    }

    fn save_tasks(&self, snapshot: &TaskSnapshot) -> PersistResult<()> {
        write_json_atomic(&self.config.tasks_path(), snapshot, "tasks")
    }

    fn load_ledger(&self) -> Loaded<Ledger> {
        load_json_with_fallback(&self.config.ledger_path(), "ledger")
    }

    fn save_ledger(&self, ledger: &Ledger) -> PersistResult<()> {
        write_json_atomic(&self.config.ledger_path(), ledger, "ledger")
    }
}

impl<R: SnapshotRepository + ?Sized> SnapshotRepository for &R {
    fn load_tasks(&self) -> Loaded<TaskSnapshot> {
        (**self).load_tasks()
    }

    fn save_tasks(&self, snapshot: &TaskSnapshot) -> PersistResult<()> {
        (**self).save_tasks(snapshot)
    }

    fn load_ledger(&self) -> Loaded<Ledger> {
        (**self).load_ledger()
    }

    fn save_ledger(&self, ledger: &Ledger) -> PersistResult<()> {
        (**self).save_ledger(ledger)
    }
}
