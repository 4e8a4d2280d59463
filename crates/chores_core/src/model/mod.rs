//! Household chore domain model.
//!
//! # Responsibility
//! - Define the persisted records shared by the store, engines and service.
//! - Keep "cleared" states as explicit `Option` values instead of missing keys.
//!
//! # Invariants
//! - Task and person ids are never reused.
//! - Task deletion is a soft-delete flag; tasks are never removed from history.

pub mod person;
pub mod recurrence;
pub mod reward;
pub mod settings;
pub mod task;
