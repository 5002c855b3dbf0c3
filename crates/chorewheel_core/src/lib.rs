//! Recurrence and assignment engine for shared chores.
//! This crate is the single source of truth for scheduling and rotation rules;
//! storage, transport and notifications live outside it.

pub mod assign;
pub mod clock;
pub mod config;
pub mod logging;
pub mod model;
pub mod schedule;
pub mod service;

pub use assign::resolver::{resolve_next_assignee, AssignmentCounts, AssignmentError};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{ConfigError, EngineConfig};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::chore::{AssignStrategy, Chore, ChoreId, ChoreStatus, ChoreValidationError};
pub use model::circle::{CircleId, CircleMember, CircleRole, MemberId};
pub use model::history::{ChoreHistory, HistoryStatus};
pub use model::recurrence::{
    migrate_frequency_metadata, FrequencyMetadata, FrequencySpec, FrequencyType, IntervalUnit,
    Recurrence, RecurrenceRule, RuleError, CURRENT_METADATA_VERSION,
};
pub use schedule::due_date::{reference_time, DueDateCalculator};
pub use service::edit_guard::check_edit_allowed;
pub use service::error::{ChoreError, ChoreResult};
pub use service::lifecycle::{ChoreLifecycle, ChoreUpdate, CompletionRequest, LifecycleOutcome};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
