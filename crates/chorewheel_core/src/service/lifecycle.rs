//! Chore lifecycle use-case service.
//!
//! # Responsibility
//! - Turn completion, skip, edit and trigger events into an updated chore
//!   snapshot plus, for completion/skip, one new history entry.
//! - Combine permission checks, the due date calculator and the assignment
//!   resolver into one call.
//!
//! # Invariants
//! - Inputs are snapshots; nothing is mutated in place and nothing is
//!   persisted here. The caller stores the returned chore and entry.
//! - Every successful mutation stamps `updated_at` and `updated_by`.
//! - Permission is checked before any state of the chore is reported.
//! - Terminal rules deactivate the chore and clear its due date.
//! - `in_progress` falls back to `no_status` after a turn; `paused` stays.

use crate::assign::resolver::{resolve_next_assignee, AssignmentCounts};
use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::model::chore::{AssignStrategy, Chore, ChoreStatus};
use crate::model::circle::{CircleMember, MemberId};
use crate::model::history::{ChoreHistory, HistoryStatus};
use crate::model::recurrence::{Recurrence, RecurrenceRule, RuleError};
use crate::schedule::due_date::DueDateCalculator;
use crate::service::edit_guard::check_edit_allowed;
use crate::service::error::{ChoreError, ChoreResult};
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use rand::Rng;

/// Input for a completion or skip.
#[derive(Debug, Clone)]
pub struct CompletionRequest<'a> {
    pub actor: MemberId,
    /// When the turn was taken; the service clock when `None`.
    pub performed_at: Option<DateTime<Utc>>,
    pub note: Option<String>,
    /// Points awarded; a completion falls back to the chore's points.
    pub points: Option<i32>,
    /// Members (with roles) of the chore's circle.
    pub circle_members: &'a [CircleMember],
    /// Circle-wide tally read by `least_assigned`.
    pub circle_counts: &'a AssignmentCounts,
}

impl<'a> CompletionRequest<'a> {
    pub fn new(
        actor: MemberId,
        circle_members: &'a [CircleMember],
        circle_counts: &'a AssignmentCounts,
    ) -> Self {
        Self {
            actor,
            performed_at: None,
            note: None,
            points: None,
            circle_members,
            circle_counts,
        }
    }

    pub fn at(mut self, performed_at: DateTime<Utc>) -> Self {
        self.performed_at = Some(performed_at);
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn with_points(mut self, points: i32) -> Self {
        self.points = Some(points);
        self
    }
}

/// Updated chore plus the history entry to append.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleOutcome {
    pub chore: Chore,
    pub entry: ChoreHistory,
}

/// Partial edit of a chore. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChoreUpdate {
    pub name: Option<String>,
    pub rule: Option<RecurrenceRule>,
    pub next_due_date: Option<Option<DateTime<Utc>>>,
    pub assignees: Option<Vec<MemberId>>,
    pub assigned_to: Option<MemberId>,
    pub assign_strategy: Option<AssignStrategy>,
    pub is_active: Option<bool>,
    pub status: Option<ChoreStatus>,
    pub priority: Option<i32>,
    pub points: Option<Option<i32>>,
    pub completion_window: Option<Option<i64>>,
}

/// Orchestrates completion, skip, edit and trigger events.
pub struct ChoreLifecycle<C: Clock> {
    calculator: DueDateCalculator,
    rotate_on_skip: bool,
    clock: C,
}

impl<C: Clock> ChoreLifecycle<C> {
    pub fn new(config: &EngineConfig, clock: C) -> Self {
        Self {
            calculator: DueDateCalculator::from_config(config),
            rotate_on_skip: config.rotate_on_skip,
            clock,
        }
    }

    pub fn calculator(&self) -> &DueDateCalculator {
        &self.calculator
    }

    /// Records a completion and advances the chore.
    ///
    /// # Contract
    /// - Actor must be creator, circle admin, current assignee or listed
    ///   assignee; otherwise `PermissionDenied`.
    /// - Completion before `next_due_date - completion_window` fails with
    ///   `CompletionWindowNotOpen`.
    /// - The entry snapshots `assigned_to` and `next_due_date` as they were.
    /// - `history` is the chore's prior history, most recent first; the new
    ///   entry is considered by adaptive cadence and `least_completed`.
    pub fn complete<R: Rng + ?Sized>(
        &self,
        chore: &Chore,
        history: &[ChoreHistory],
        request: CompletionRequest<'_>,
        rng: &mut R,
    ) -> ChoreResult<LifecycleOutcome> {
        self.take_turn(chore, history, request, HistoryStatus::Completed, rng)
    }

    /// Records a skip and advances the chore.
    ///
    /// Same as [`Self::complete`] except the entry is `skipped`, no points
    /// are awarded, the completion window does not apply, and rotation
    /// follows `EngineConfig::rotate_on_skip`.
    pub fn skip<R: Rng + ?Sized>(
        &self,
        chore: &Chore,
        history: &[ChoreHistory],
        request: CompletionRequest<'_>,
        rng: &mut R,
    ) -> ChoreResult<LifecycleOutcome> {
        self.take_turn(chore, history, request, HistoryStatus::Skipped, rng)
    }

    fn take_turn<R: Rng + ?Sized>(
        &self,
        chore: &Chore,
        history: &[ChoreHistory],
        request: CompletionRequest<'_>,
        status: HistoryStatus,
        rng: &mut R,
    ) -> ChoreResult<LifecycleOutcome> {
        let actor = request.actor;
        ensure_can_complete(chore, actor, request.circle_members)?;
        if !chore.is_active {
            return Err(ChoreError::Inactive(chore.id));
        }
        chore.rule.validate()?;
        chore.validate()?;

        let performed_at = request.performed_at.unwrap_or_else(|| self.clock.now());
        if status == HistoryStatus::Completed {
            if let Some(opens_at) = chore.completion_opens_at() {
                if performed_at < opens_at {
                    return Err(ChoreError::CompletionWindowNotOpen {
                        chore_id: chore.id,
                        opens_at,
                    });
                }
            }
        }

        let entry = ChoreHistory {
            chore_id: chore.id,
            performed_at,
            completed_by: actor,
            assigned_to: chore.assigned_to,
            due_date: chore.next_due_date,
            status,
            points: match status {
                HistoryStatus::Completed => request.points.or(chore.points),
                HistoryStatus::Skipped | HistoryStatus::Pending => None,
            },
            note: request.note,
        };
        let history_with_entry = std::iter::once(entry.clone())
            .chain(history.iter().cloned())
            .collect::<Vec<_>>();

        let terminal = chore.rule.is_terminal();
        let next_due_date = if terminal {
            None
        } else {
            self.calculator.next_due_date(
                &chore.rule,
                chore.next_due_date,
                performed_at,
                &history_with_entry,
            )?
        };

        let rotates = status == HistoryStatus::Completed || self.rotate_on_skip;
        let assigned_to = if terminal || !rotates || chore.assignees.is_empty() {
            chore.assigned_to
        } else {
            Some(resolve_next_assignee(
                chore.assign_strategy,
                &chore.assignees,
                chore.assigned_to,
                &history_with_entry,
                request.circle_counts,
                rng,
            )?)
        };

        let mut updated = chore.clone();
        updated.next_due_date = next_due_date;
        updated.assigned_to = assigned_to;
        if terminal {
            updated.is_active = false;
        }
        if updated.status == ChoreStatus::InProgress {
            updated.status = ChoreStatus::NoStatus;
        }
        updated.updated_at = performed_at;
        updated.updated_by = Some(actor);

        info!(
            "event=chore_turn_recorded module=lifecycle status={:?} chore_id={} frequency={} terminal={} rotated={}",
            status,
            chore.id,
            chore.rule.frequency_type(),
            terminal,
            assigned_to != chore.assigned_to
        );
        debug!(
            "event=chore_rescheduled module=lifecycle chore_id={} next_due={:?} assigned_to={:?}",
            chore.id, next_due_date, assigned_to
        );

        Ok(LifecycleOutcome {
            chore: updated,
            entry,
        })
    }

    /// Applies a partial edit after the edit guard accepts it.
    ///
    /// # Contract
    /// - Creator or circle admin only (`PermissionDenied`).
    /// - Stale `client_seen_updated_at` fails with `EditConflict`.
    /// - The edited chore must still satisfy rule and chore invariants.
    pub fn edit(
        &self,
        chore: &Chore,
        update: ChoreUpdate,
        actor: MemberId,
        circle_members: &[CircleMember],
        client_seen_updated_at: Option<DateTime<Utc>>,
    ) -> ChoreResult<Chore> {
        check_edit_allowed(chore, actor, circle_members, client_seen_updated_at)?;

        let mut updated = chore.clone();
        if let Some(name) = update.name {
            updated.name = name;
        }
        if let Some(rule) = update.rule {
            updated.rule = rule;
        }
        if let Some(next_due_date) = update.next_due_date {
            updated.next_due_date = next_due_date;
        }
        if let Some(assignees) = update.assignees {
            updated.assignees = assignees;
        }
        if let Some(assigned_to) = update.assigned_to {
            updated.assigned_to = Some(assigned_to);
        }
        if let Some(strategy) = update.assign_strategy {
            updated.assign_strategy = strategy;
        }
        if let Some(is_active) = update.is_active {
            updated.is_active = is_active;
        }
        if let Some(status) = update.status {
            updated.status = status;
        }
        if let Some(priority) = update.priority {
            updated.priority = priority;
        }
        if let Some(points) = update.points {
            updated.points = points;
        }
        if let Some(window) = update.completion_window {
            updated.completion_window = window;
        }

        updated.rule.validate()?;
        updated.validate()?;
        updated.updated_at = self.clock.now();
        updated.updated_by = Some(actor);

        info!(
            "event=chore_edited module=lifecycle status=ok chore_id={} actor={}",
            chore.id, actor
        );
        Ok(updated)
    }

    /// Schedules a `trigger` chore when its external event fires.
    ///
    /// # Contract
    /// - `actor` needs the same rights as for completion.
    /// - Only active `trigger` chores can be scheduled.
    pub fn trigger(
        &self,
        chore: &Chore,
        actor: MemberId,
        circle_members: &[CircleMember],
        due_at: DateTime<Utc>,
    ) -> ChoreResult<Chore> {
        ensure_can_complete(chore, actor, circle_members)?;
        if !chore.is_active {
            return Err(ChoreError::Inactive(chore.id));
        }
        if chore.rule.recurrence != Recurrence::Trigger {
            return Err(RuleError::NotTriggerBased(chore.rule.frequency_type()).into());
        }

        let mut updated = chore.clone();
        updated.next_due_date = Some(due_at);
        updated.updated_at = self.clock.now();
        updated.updated_by = Some(actor);

        info!(
            "event=chore_triggered module=lifecycle status=ok chore_id={} actor={}",
            chore.id, actor
        );
        Ok(updated)
    }
}

fn ensure_can_complete(
    chore: &Chore,
    actor: MemberId,
    circle_members: &[CircleMember],
) -> ChoreResult<()> {
    if chore.can_complete(actor, circle_members) {
        return Ok(());
    }
    warn!(
        "event=chore_turn_rejected module=lifecycle status=denied chore_id={} actor={}",
        chore.id, actor
    );
    Err(ChoreError::PermissionDenied {
        actor,
        chore_id: chore.id,
    })
}
