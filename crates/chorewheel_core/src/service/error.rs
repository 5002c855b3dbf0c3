//! Errors surfaced by chore use-case services.

use crate::assign::resolver::AssignmentError;
use crate::model::chore::{ChoreId, ChoreValidationError};
use crate::model::circle::MemberId;
use crate::model::recurrence::RuleError;
use chrono::{DateTime, Utc};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ChoreResult<T> = Result<T, ChoreError>;

/// Typed failure of a lifecycle or edit operation.
///
/// None of these are retried inside core; there is no I/O to retry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChoreError {
    /// Malformed recurrence configuration.
    InvalidRule(RuleError),
    /// Empty or inconsistent assignee set.
    InvalidAssignment(AssignmentError),
    /// Chore record violates its own invariants.
    InvalidChore(ChoreValidationError),
    /// Actor lacks the rights for this operation.
    PermissionDenied { actor: MemberId, chore_id: ChoreId },
    /// Chore changed after the editor loaded it; reload and re-apply.
    EditConflict {
        chore_id: ChoreId,
        current_updated_at: DateTime<Utc>,
    },
    /// Terminal chore already done; nothing left to complete or skip.
    Inactive(ChoreId),
    /// Completion attempted before the completion window opened.
    CompletionWindowNotOpen {
        chore_id: ChoreId,
        opens_at: DateTime<Utc>,
    },
}

impl Display for ChoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidRule(err) => write!(f, "invalid recurrence rule: {err}"),
            Self::InvalidAssignment(err) => write!(f, "invalid assignment: {err}"),
            Self::InvalidChore(err) => write!(f, "invalid chore: {err}"),
            Self::PermissionDenied { actor, chore_id } => {
                write!(f, "member {actor} is not allowed to modify chore {chore_id}")
            }
            Self::EditConflict {
                chore_id,
                current_updated_at,
            } => write!(
                f,
                "chore {chore_id} was modified at {} by another member; reload and retry",
                current_updated_at.to_rfc3339()
            ),
            Self::Inactive(chore_id) => write!(f, "chore {chore_id} is no longer active"),
            Self::CompletionWindowNotOpen { chore_id, opens_at } => write!(
                f,
                "chore {chore_id} cannot be completed before {}",
                opens_at.to_rfc3339()
            ),
        }
    }
}

impl Error for ChoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidRule(err) => Some(err),
            Self::InvalidAssignment(err) => Some(err),
            Self::InvalidChore(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RuleError> for ChoreError {
    fn from(value: RuleError) -> Self {
        Self::InvalidRule(value)
    }
}

impl From<AssignmentError> for ChoreError {
    fn from(value: AssignmentError) -> Self {
        Self::InvalidAssignment(value)
    }
}

impl From<ChoreValidationError> for ChoreError {
    fn from(value: ChoreValidationError) -> Self {
        match value {
            ChoreValidationError::DuplicateAssignee(member) => {
                Self::InvalidAssignment(AssignmentError::DuplicateAssignee(member))
            }
            other => Self::InvalidChore(other),
        }
    }
}
