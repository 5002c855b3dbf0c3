//! Chore use-case services.
//!
//! # Responsibility
//! - Orchestrate the pure scheduling and assignment functions into
//!   completion, skip, edit and trigger operations.
//! - Keep callers decoupled from how the next state is derived.

pub mod edit_guard;
pub mod error;
pub mod lifecycle;
