//! Use-case services over the in-memory store.
//!
//! `chore_service` owns the store and commits every mutation;
//! `schedule` holds the cooperative daily triggers it polls.

pub mod chore_service;
pub mod schedule;
