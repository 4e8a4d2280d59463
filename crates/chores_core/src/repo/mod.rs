//! Persistence layer.
//!
//! # Responsibility
//! - Define the snapshot repository contract used by the service.
//! - Keep file layout, atomic replacement and recovery inside this boundary.
//!
//! # Invariants
//! - A failed write leaves the previous durable snapshot intact.
//! - Startup recovery is primary -> `.bak` -> defaults, never fatal.

pub mod atomic;
pub mod snapshot_repo;
