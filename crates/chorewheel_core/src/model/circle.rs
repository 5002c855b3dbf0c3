//! Circle membership model used for permission checks.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of a member (user) inside a circle.
pub type MemberId = i64;

/// Stable circle identifier.
pub type CircleId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircleRole {
    Admin,
    Member,
}

/// One member's role in one circle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CircleMember {
    pub circle_id: CircleId,
    pub user_id: MemberId,
    pub role: CircleRole,
}

impl CircleMember {
    pub fn new(circle_id: CircleId, user_id: MemberId, role: CircleRole) -> Self {
        Self {
            circle_id,
            user_id,
            role,
        }
    }
}

/// Returns whether `user_id` holds the admin role in `circle_id`.
pub fn is_circle_admin(members: &[CircleMember], circle_id: CircleId, user_id: MemberId) -> bool {
    members.iter().any(|member| {
        member.circle_id == circle_id
            && member.user_id == user_id
            && member.role == CircleRole::Admin
    })
}
