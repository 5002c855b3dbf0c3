//! Optimistic-concurrency guard for chore edits.
//!
//! # Responsibility
//! - Decide whether an actor may edit a chore.
//! - Reject writes based on a stale copy of the chore.
//!
//! # Invariants
//! - Never blocks and never locks; it only rejects.
//! - Permission is checked before staleness.
//! - Pair with a storage-level compare-and-swap on `updated_at`; this check
//!   alone does not serialize concurrent writers.

use crate::model::chore::Chore;
use crate::model::circle::{is_circle_admin, CircleMember, MemberId};
use crate::service::error::{ChoreError, ChoreResult};
use chrono::{DateTime, Utc};
use log::warn;

/// Checks that `actor` may edit `chore` given what the client last saw.
///
/// # Contract
/// - Creator or admin of the chore's circle may edit; nobody else.
/// - `client_seen_updated_at = None` skips the staleness check.
/// - A chore updated strictly after `client_seen_updated_at` is a conflict.
pub fn check_edit_allowed(
    chore: &Chore,
    actor: MemberId,
    circle_members: &[CircleMember],
    client_seen_updated_at: Option<DateTime<Utc>>,
) -> ChoreResult<()> {
    let permitted =
        chore.created_by == actor || is_circle_admin(circle_members, chore.circle_id, actor);
    if !permitted {
        warn!(
            "event=chore_edit_rejected module=edit_guard status=denied chore_id={} actor={}",
            chore.id, actor
        );
        return Err(ChoreError::PermissionDenied {
            actor,
            chore_id: chore.id,
        });
    }

    if let Some(seen) = client_seen_updated_at {
        if chore.updated_at > seen {
            warn!(
                "event=chore_edit_rejected module=edit_guard status=conflict chore_id={} actor={}",
                chore.id, actor
            );
            return Err(ChoreError::EditConflict {
                chore_id: chore.id,
                current_updated_at: chore.updated_at,
            });
        }
    }
    Ok(())
}
