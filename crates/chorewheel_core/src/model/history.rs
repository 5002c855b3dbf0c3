//! Chore history model.
//!
//! # Responsibility
//! - Define the append-only audit record written for every completion/skip.
//!
//! # Invariants
//! - Entries are immutable once written; core only ever appends.
//! - "Most recent" means largest `performed_at`; callers pass history
//!   most-recent-first.

use crate::model::chore::ChoreId;
use crate::model::circle::MemberId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome recorded by one history entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryStatus {
    Pending,
    Completed,
    Skipped,
}

/// One lifecycle event of a chore.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChoreHistory {
    pub chore_id: ChoreId,
    pub performed_at: DateTime<Utc>,
    pub completed_by: MemberId,
    /// Snapshot of who was responsible when the event happened.
    pub assigned_to: Option<MemberId>,
    /// Snapshot of what was due when the event happened.
    pub due_date: Option<DateTime<Utc>>,
    pub status: HistoryStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points: Option<i32>,
    #[serde(default, rename = "notes", skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl ChoreHistory {
    pub fn is_completed(&self) -> bool {
        self.status == HistoryStatus::Completed
    }
}

/// Completion timestamps, most recent first, capped at `limit`.
pub fn recent_completion_times(history: &[ChoreHistory], limit: usize) -> Vec<DateTime<Utc>> {
    let mut times = history
        .iter()
        .filter(|entry| entry.is_completed())
        .map(|entry| entry.performed_at)
        .collect::<Vec<_>>();
    // Input order is not trusted here.
    times.sort_unstable_by(|a, b| b.cmp(a));
    times.truncate(limit);
    times
}
