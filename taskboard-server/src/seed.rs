//! Initial data loaded at startup from a TOML file.
//!
//! ```toml
//! [[members]]
//! workspace_id = "w1"
//! user_id = "alice"
//! role = "admin"
//!
//! [[tasks]]
//! id = "t1"
//! workspace_id = "w1"
//! project_id = "p1"
//! name = "Write docs"
//! status = "todo"
//! position = 1000
//! ```
//!
//! Tasks without an `id` get a generated one; tasks without a `position`
//! are appended to their column.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use taskboard_proto::batch::position_in_range;
use taskboard_proto::task::{ParseStatusError, Task, TaskId, TaskStatus, UserId, WorkspaceId};

use crate::auth::{Member, MemberRole};

/// Errors that can occur when loading a seed file.
#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    /// Failed to read the seed file.
    #[error("failed to read seed file {path}: {source}")]
    ReadFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to parse the TOML.
    #[error("failed to parse seed file: {0}")]
    ParseToml(#[from] toml::de::Error),

    /// A task names an unknown status.
    #[error("seed task {name:?}: {source}")]
    InvalidStatus {
        /// Name of the offending task.
        name: String,
        /// Parse failure.
        source: ParseStatusError,
    },

    /// A task's position is outside the allowed range.
    #[error("seed task {name:?}: position {position} out of range")]
    PositionOutOfRange {
        /// Name of the offending task.
        name: String,
        /// The rejected position.
        position: u32,
    },

    /// Two tasks share an id, or the store refused a task.
    #[error("seed task {name:?}: {reason}")]
    Rejected {
        /// Name of the offending task.
        name: String,
        /// Why the store refused it.
        reason: String,
    },
}

/// Parsed seed file.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Seed {
    /// Workspace memberships.
    pub members: Vec<SeedMember>,
    /// Tasks.
    pub tasks: Vec<SeedTask>,
}

/// `[[members]]` entry.
#[derive(Debug, Deserialize)]
pub struct SeedMember {
    /// Workspace.
    pub workspace_id: String,
    /// User.
    pub user_id: String,
    /// Role, `member` when omitted.
    #[serde(default = "default_role")]
    pub role: MemberRole,
}

const fn default_role() -> MemberRole {
    MemberRole::Member
}

/// `[[tasks]]` entry.
#[derive(Debug, Deserialize)]
pub struct SeedTask {
    /// Task id, generated when omitted.
    pub id: Option<String>,
    /// Owning workspace.
    pub workspace_id: String,
    /// Owning project.
    pub project_id: String,
    /// Display name.
    pub name: String,
    /// Status name, e.g. `in_progress`.
    pub status: String,
    /// Sort key within the column, appended when omitted.
    pub position: Option<u32>,
    /// Assigned user.
    #[serde(default)]
    pub assignee_id: Option<String>,
    /// Due date as written in the file.
    #[serde(default)]
    pub due_date: Option<String>,
    /// Free-form description.
    #[serde(default)]
    pub description: Option<String>,
}

impl Seed {
    /// Reads and parses a seed file.
    ///
    /// # Errors
    ///
    /// Returns [`SeedError`] if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, SeedError> {
        let contents = std::fs::read_to_string(path).map_err(|e| SeedError::ReadFile {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(toml::from_str(&contents)?)
    }
}

impl SeedMember {
    /// Converts to a directory entry.
    #[must_use]
    pub fn to_member(&self) -> Member {
        Member {
            workspace_id: WorkspaceId::new(&self.workspace_id),
            user_id: UserId::new(&self.user_id),
            role: self.role,
        }
    }
}

impl SeedTask {
    /// Converts to a task. The flag is `false` when the entry carries no
    /// position and the task should be appended to its column.
    ///
    /// # Errors
    ///
    /// Fails on an unknown status or an out-of-range position.
    pub fn to_task(&self) -> Result<(Task, bool), SeedError> {
        let status: TaskStatus = self
            .status
            .parse()
            .map_err(|source| SeedError::InvalidStatus {
                name: self.name.clone(),
                source,
            })?;
        if let Some(position) = self.position
            && !position_in_range(position)
        {
            return Err(SeedError::PositionOutOfRange {
                name: self.name.clone(),
                position,
            });
        }
        let task = Task {
            id: self
                .id
                .as_deref()
                .map_or_else(TaskId::generate, TaskId::new),
            workspace_id: WorkspaceId::new(&self.workspace_id),
            project_id: self.project_id.clone(),
            name: self.name.clone(),
            assignee_id: self.assignee_id.clone(),
            due_date: self.due_date.clone(),
            description: self.description.clone(),
            status,
            position: self.position.unwrap_or_default(),
        };
        Ok((task, self.position.is_some()))
    }
}
