//! Due date scheduling.
//!
//! # Responsibility
//! - Compute when a chore is next due from its rule and history.
//!
//! # Invariants
//! - Everything here is a pure function of its inputs.

pub mod calendar;
pub mod due_date;
