//! Workspace membership checks.
//!
//! Every operation that reads or writes a workspace's tasks goes through
//! [`authorize`], which resolves the caller's membership and optionally
//! requires a minimum role.

use std::future::Future;

use serde::{Deserialize, Serialize};
use taskboard_proto::task::{UserId, WorkspaceId};

/// Role of a member within a workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberRole {
    /// Can manage the workspace and its members.
    Admin,
    /// Regular member.
    Member,
}

impl MemberRole {
    /// Returns `true` if a holder of this role meets `required`.
    #[must_use]
    pub const fn satisfies(self, required: Self) -> bool {
        matches!((self, required), (Self::Admin, _) | (Self::Member, Self::Member))
    }
}

impl std::fmt::Display for MemberRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Admin => write!(f, "admin"),
            Self::Member => write!(f, "member"),
        }
    }
}

/// A user's membership in one workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    /// Workspace the membership is in.
    pub workspace_id: WorkspaceId,
    /// The member.
    pub user_id: UserId,
    /// The member's role.
    pub role: MemberRole,
}

/// Looks up workspace memberships.
pub trait MembershipDirectory: Send + Sync {
    /// Returns the membership of `user_id` in `workspace_id`, if any.
    fn get_membership(
        &self,
        workspace_id: &WorkspaceId,
        user_id: &UserId,
    ) -> impl Future<Output = Option<Member>> + Send;
}

/// Why a caller was denied.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// The caller has no membership in the workspace.
    #[error("user {user_id} is not a member of workspace {workspace_id}")]
    NotMember {
        /// Workspace that was checked.
        workspace_id: WorkspaceId,
        /// Caller.
        user_id: UserId,
    },
    /// The caller is a member but with too weak a role.
    #[error("role {actual} does not satisfy required role {required}")]
    InsufficientRole {
        /// Role the operation needs.
        required: MemberRole,
        /// Role the caller holds.
        actual: MemberRole,
    },
}

/// Allows or denies `user_id` access to `workspace_id`.
///
/// With `required_role` set, the membership must also satisfy that role.
///
/// # Errors
///
/// Returns [`AuthError`] when the caller is not a member or lacks the role.
pub async fn authorize<D: MembershipDirectory>(
    directory: &D,
    workspace_id: &WorkspaceId,
    user_id: &UserId,
    required_role: Option<MemberRole>,
) -> Result<Member, AuthError> {
    let Some(member) = directory.get_membership(workspace_id, user_id).await else {
        tracing::warn!(
            workspace_id = %workspace_id,
            user_id = %user_id,
            "membership check failed"
        );
        return Err(AuthError::NotMember {
            workspace_id: workspace_id.clone(),
            user_id: user_id.clone(),
        });
    };
    if let Some(required) = required_role
        && !member.role.satisfies(required)
    {
        return Err(AuthError::InsufficientRole {
            required,
            actual: member.role,
        });
    }
    Ok(member)
}
