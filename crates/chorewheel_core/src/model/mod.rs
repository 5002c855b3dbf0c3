//! Chore domain model.
//!
//! # Responsibility
//! - Define the records the store loads and persists: chores, their
//!   recurrence rules, history entries and circle membership.
//!
//! # Invariants
//! - Every chore is identified by a stable `ChoreId`.
//! - History is append-only; no model type mutates an existing entry.

pub mod chore;
pub mod circle;
pub mod history;
pub mod recurrence;
