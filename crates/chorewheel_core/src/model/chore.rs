//! Chore domain model.
//!
//! # Responsibility
//! - Define the canonical chore record loaded and persisted by the store.
//! - Own the chore-level invariants around the assignee set.
//! - Answer the "may this member complete it" question.
//!
//! # Invariants
//! - `id` is stable and never reused for another chore.
//! - `assignees` holds no duplicates and keeps its persisted order.
//! - `assigned_to` is a member of `assignees` whenever `assignees` is
//!   non-empty.
//! - Chores are never hard-deleted in core; `is_active` drops to `false`
//!   once a terminal rule has been completed.

use crate::model::circle::{is_circle_admin, CircleId, CircleMember, MemberId};
use crate::model::recurrence::RecurrenceRule;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable chore identifier.
pub type ChoreId = Uuid;

/// Policy deciding who is responsible after the current turn ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignStrategy {
    Random,
    LeastAssigned,
    LeastCompleted,
    KeepLastAssigned,
    RandomExceptLastAssigned,
    RoundRobin,
}

impl AssignStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Random => "random",
            Self::LeastAssigned => "least_assigned",
            Self::LeastCompleted => "least_completed",
            Self::KeepLastAssigned => "keep_last_assigned",
            Self::RandomExceptLastAssigned => "random_except_last_assigned",
            Self::RoundRobin => "round_robin",
        }
    }

    /// Returns whether the strategy reads the current assignee.
    pub fn requires_current_assignee(self) -> bool {
        matches!(
            self,
            Self::KeepLastAssigned | Self::RandomExceptLastAssigned | Self::RoundRobin
        )
    }
}

impl Display for AssignStrategy {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Administrative chore state. Neither value advances the schedule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChoreStatus {
    #[default]
    NoStatus,
    InProgress,
    Paused,
}

/// Canonical chore record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chore {
    pub id: ChoreId,
    pub circle_id: CircleId,
    pub name: String,
    pub rule: RecurrenceRule,
    /// `None` means unscheduled (trigger-only or finished).
    pub next_due_date: Option<DateTime<Utc>>,
    pub assigned_to: Option<MemberId>,
    /// Eligible members in rotation order.
    pub assignees: Vec<MemberId>,
    pub assign_strategy: AssignStrategy,
    pub is_active: bool,
    #[serde(default)]
    pub status: ChoreStatus,
    #[serde(default)]
    pub priority: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points: Option<i32>,
    /// Seconds before `next_due_date` during which completion is accepted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_window: Option<i64>,
    pub created_at: DateTime<Utc>,
    /// Last-write timestamp used for optimistic concurrency.
    pub updated_at: DateTime<Utc>,
    pub created_by: MemberId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<MemberId>,
}

impl Chore {
    /// Creates an active chore with a generated ID, assigned to its creator.
    pub fn new(
        circle_id: CircleId,
        name: impl Into<String>,
        rule: RecurrenceRule,
        created_by: MemberId,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self::with_id(Uuid::new_v4(), circle_id, name, rule, created_by, created_at)
    }

    /// Creates a chore with a caller-provided stable ID.
    ///
    /// Used by load/import paths where identity already exists in the store.
    pub fn with_id(
        id: ChoreId,
        circle_id: CircleId,
        name: impl Into<String>,
        rule: RecurrenceRule,
        created_by: MemberId,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            circle_id,
            name: name.into(),
            rule,
            next_due_date: None,
            assigned_to: Some(created_by),
            assignees: vec![created_by],
            assign_strategy: AssignStrategy::KeepLastAssigned,
            is_active: true,
            status: ChoreStatus::NoStatus,
            priority: 0,
            points: None,
            completion_window: None,
            created_at,
            updated_at: created_at,
            created_by,
            updated_by: None,
        }
    }

    /// Validates chore-level invariants.
    pub fn validate(&self) -> Result<(), ChoreValidationError> {
        if self.name.trim().is_empty() {
            return Err(ChoreValidationError::BlankName);
        }

        let mut seen = HashSet::with_capacity(self.assignees.len());
        if let Some(duplicate) = self.assignees.iter().find(|id| !seen.insert(**id)) {
            return Err(ChoreValidationError::DuplicateAssignee(*duplicate));
        }

        if !self.assignees.is_empty() {
            match self.assigned_to {
                None => return Err(ChoreValidationError::MissingAssignedTo),
                Some(member) if !self.assignees.contains(&member) => {
                    return Err(ChoreValidationError::AssignedToNotEligible(member));
                }
                Some(_) => {}
            }
        }

        if let Some(window) = self.completion_window {
            if window < 0 {
                return Err(ChoreValidationError::NegativeCompletionWindow(window));
            }
        }
        Ok(())
    }

    /// Returns whether `actor` may complete or skip this chore.
    ///
    /// # Contract
    /// - Creator, circle admin, current `assigned_to` and any listed assignee
    ///   are allowed.
    pub fn can_complete(&self, actor: MemberId, circle_members: &[CircleMember]) -> bool {
        self.created_by == actor
            || self.assigned_to == Some(actor)
            || self.assignees.contains(&actor)
            || is_circle_admin(circle_members, self.circle_id, actor)
    }

    /// Earliest instant at which a completion is accepted, if windowed.
    pub fn completion_opens_at(&self) -> Option<DateTime<Utc>> {
        let due = self.next_due_date?;
        let window = self.completion_window?;
        due.checked_sub_signed(Duration::seconds(window))
    }
}

/// Chore invariant violations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChoreValidationError {
    BlankName,
    DuplicateAssignee(MemberId),
    /// Assignees are set but nobody is currently responsible.
    MissingAssignedTo,
    AssignedToNotEligible(MemberId),
    NegativeCompletionWindow(i64),
}

impl Display for ChoreValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankName => write!(f, "chore name must not be blank"),
            Self::DuplicateAssignee(id) => write!(f, "member {id} is listed twice as assignee"),
            Self::MissingAssignedTo => {
                write!(f, "chore has assignees but no current assignee")
            }
            Self::AssignedToNotEligible(id) => {
                write!(f, "assigned member {id} is not an eligible assignee")
            }
            Self::NegativeCompletionWindow(value) => {
                write!(f, "completion window must be >= 0 seconds, got {value}")
            }
        }
    }
}

impl Error for ChoreValidationError {}

#[cfg(test)]
mod tests {
    use super::{Chore, ChoreValidationError};
    use crate::model::circle::{CircleMember, CircleRole};
    use crate::model::recurrence::{Recurrence, RecurrenceRule};
    use chrono::{Duration, TimeZone, Utc};
    use uuid::Uuid;

    fn chore() -> Chore {
        let created_at = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
        Chore::new(
            Uuid::new_v4(),
            "water plants",
            RecurrenceRule::new(Recurrence::Daily { every: 1 }),
            1,
            created_at,
        )
    }

    #[test]
    fn new_chore_is_assigned_to_creator() {
        let chore = chore();
        assert_eq!(chore.assigned_to, Some(1));
        assert_eq!(chore.assignees, vec![1]);
        assert!(chore.is_active);
        assert_eq!(chore.updated_at, chore.created_at);
        chore.validate().expect("fresh chore is valid");
    }

    #[test]
    fn validate_rejects_duplicate_and_foreign_assignees() {
        let mut chore = chore();
        chore.assignees = vec![1, 2, 1];
        assert_eq!(
            chore.validate().unwrap_err(),
            ChoreValidationError::DuplicateAssignee(1)
        );

        chore.assignees = vec![2, 3];
        assert_eq!(
            chore.validate().unwrap_err(),
            ChoreValidationError::AssignedToNotEligible(1)
        );
    }

    #[test]
    fn unassigned_chore_without_assignees_is_valid() {
        let mut chore = chore();
        chore.assignees.clear();
        chore.assigned_to = None;
        chore.validate().expect("empty assignee set is allowed");
    }

    #[test]
    fn can_complete_covers_creator_admin_and_assignees() {
        let mut chore = chore();
        chore.assignees = vec![2, 3];
        chore.assigned_to = Some(2);
        let members = vec![CircleMember::new(chore.circle_id, 9, CircleRole::Admin)];

        assert!(chore.can_complete(1, &members));
        assert!(chore.can_complete(3, &members));
        assert!(chore.can_complete(9, &members));
        assert!(!chore.can_complete(4, &members));
    }

    #[test]
    fn completion_window_opens_before_due() {
        let mut chore = chore();
        let due = Utc.with_ymd_and_hms(2024, 1, 5, 12, 0, 0).unwrap();
        chore.next_due_date = Some(due);
        assert_eq!(chore.completion_opens_at(), None);

        chore.completion_window = Some(3600);
        assert_eq!(chore.completion_opens_at(), Some(due - Duration::hours(1)));
    }
}
