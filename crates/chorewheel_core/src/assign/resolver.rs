//! Next-assignee resolution.
//!
//! # Responsibility
//! - Decide who is responsible for a chore after the current turn ends.
//! - Build the circle-wide assignment tally used by `least_assigned`.
//!
//! # Invariants
//! - Pure: randomness comes from the caller's `Rng`, nothing global.
//! - The result is always a member of `assignees`.
//! - Ties in count-based strategies go to the lowest member id.

use crate::model::chore::{AssignStrategy, Chore};
use crate::model::circle::{CircleId, MemberId};
use crate::model::history::ChoreHistory;
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Number of chores currently assigned to each member across a circle.
///
/// Scope: active chores of one circle, counted by their current assignee.
/// Members absent from the tally count as zero.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssignmentCounts {
    counts: BTreeMap<MemberId, u32>,
}

impl AssignmentCounts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tallies active chores of `circle_id` by their current assignee.
    pub fn from_chores<'a>(
        chores: impl IntoIterator<Item = &'a Chore>,
        circle_id: CircleId,
    ) -> Self {
        let mut tally = Self::new();
        for chore in chores {
            if chore.circle_id != circle_id || !chore.is_active {
                continue;
            }
            if let Some(member) = chore.assigned_to {
                tally.record(member);
            }
        }
        tally
    }

    pub fn record(&mut self, member: MemberId) {
        *self.counts.entry(member).or_default() += 1;
    }

    pub fn get(&self, member: MemberId) -> u32 {
        self.counts.get(&member).copied().unwrap_or(0)
    }
}

impl FromIterator<(MemberId, u32)> for AssignmentCounts {
    fn from_iter<I: IntoIterator<Item = (MemberId, u32)>>(iter: I) -> Self {
        Self {
            counts: iter.into_iter().collect(),
        }
    }
}

/// Resolves who the chore goes to next.
///
/// # Contract
/// - `random`: uniform over `assignees`.
/// - `random_except_last_assigned`: uniform over `assignees` minus
///   `current`; plain random when that leaves nobody.
/// - `keep_last_assigned`: `current`, unchanged.
/// - `round_robin`: the member after `current` in persisted order, wrapping.
/// - `least_assigned`: fewest entries in `circle_counts`.
/// - `least_completed`: fewest `completed` entries in `history`.
///
/// # Errors
/// - `EmptyAssignees` / `DuplicateAssignee` for a malformed assignee list.
/// - `MissingCurrentAssignee` / `CurrentNotAssignee` when a strategy that
///   reads `current` gets none or a non-member.
pub fn resolve_next_assignee<R: Rng + ?Sized>(
    strategy: AssignStrategy,
    assignees: &[MemberId],
    current: Option<MemberId>,
    history: &[ChoreHistory],
    circle_counts: &AssignmentCounts,
    rng: &mut R,
) -> Result<MemberId, AssignmentError> {
    ensure_assignee_list(assignees)?;
    let current_position = if strategy.requires_current_assignee() {
        let member = current.ok_or(AssignmentError::MissingCurrentAssignee(strategy))?;
        let position = assignees
            .iter()
            .position(|id| *id == member)
            .ok_or(AssignmentError::CurrentNotAssignee(member))?;
        Some((member, position))
    } else {
        None
    };

    let next = match (strategy, current_position) {
        (AssignStrategy::Random, _) => pick(assignees, rng)?,
        (AssignStrategy::RandomExceptLastAssigned, Some((member, _))) => {
            let others = assignees
                .iter()
                .copied()
                .filter(|id| *id != member)
                .collect::<Vec<_>>();
            if others.is_empty() {
                pick(assignees, rng)?
            } else {
                pick(&others, rng)?
            }
        }
        (AssignStrategy::KeepLastAssigned, Some((member, _))) => member,
        (AssignStrategy::RoundRobin, Some((_, position))) => {
            assignees[(position + 1) % assignees.len()]
        }
        (AssignStrategy::LeastAssigned, _) => {
            least_by(assignees, |member| circle_counts.get(member))?
        }
        (AssignStrategy::LeastCompleted, _) => {
            let completed = completion_counts(history);
            least_by(assignees, |member| completed.get(&member).copied().unwrap_or(0))?
        }
        (
            AssignStrategy::RandomExceptLastAssigned
            | AssignStrategy::KeepLastAssigned
            | AssignStrategy::RoundRobin,
            None,
        ) => return Err(AssignmentError::MissingCurrentAssignee(strategy)),
    };
    Ok(next)
}

fn ensure_assignee_list(assignees: &[MemberId]) -> Result<(), AssignmentError> {
    if assignees.is_empty() {
        return Err(AssignmentError::EmptyAssignees);
    }
    let mut seen = HashSet::with_capacity(assignees.len());
    match assignees.iter().find(|id| !seen.insert(**id)) {
        Some(duplicate) => Err(AssignmentError::DuplicateAssignee(*duplicate)),
        None => Ok(()),
    }
}

fn pick<R: Rng + ?Sized>(members: &[MemberId], rng: &mut R) -> Result<MemberId, AssignmentError> {
    members
        .choose(rng)
        .copied()
        .ok_or(AssignmentError::EmptyAssignees)
}

fn least_by<F>(assignees: &[MemberId], count: F) -> Result<MemberId, AssignmentError>
where
    F: Fn(MemberId) -> u32,
{
    assignees
        .iter()
        .copied()
        .min_by_key(|member| (count(*member), *member))
        .ok_or(AssignmentError::EmptyAssignees)
}

fn completion_counts(history: &[ChoreHistory]) -> HashMap<MemberId, u32> {
    let mut counts = HashMap::new();
    for entry in history.iter().filter(|entry| entry.is_completed()) {
        *counts.entry(entry.completed_by).or_insert(0) += 1;
    }
    counts
}

/// Empty or inconsistent assignee configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssignmentError {
    EmptyAssignees,
    DuplicateAssignee(MemberId),
    MissingCurrentAssignee(AssignStrategy),
    CurrentNotAssignee(MemberId),
}

impl Display for AssignmentError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyAssignees => write!(f, "chore has no eligible assignees"),
            Self::DuplicateAssignee(id) => write!(f, "member {id} is listed twice as assignee"),
            Self::MissingCurrentAssignee(strategy) => {
                write!(f, "{strategy} strategy requires a current assignee")
            }
            Self::CurrentNotAssignee(id) => {
                write!(f, "current assignee {id} is not an eligible assignee")
            }
        }
    }
}

impl Error for AssignmentError {}
