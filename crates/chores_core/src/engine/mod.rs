//! Derivation engines operating on the in-memory store.
//!
//! # Responsibility
//! - Recurrence stepping and series top-up.
//! - Display ordering and series anchors.
//! - Level/title derivation and coin award bookkeeping.
//! - On-demand integrity repair.
//!
//! # Invariants
//! - Engines never touch durable storage; the service commits after them.

pub mod integrity;
pub mod ledger;
pub mod leveling;
pub mod ordering;
pub mod recurrence;
