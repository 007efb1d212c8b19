//! Task model shared by the board client and the bulk-update server.
//!
//! A task lives in exactly one status column and carries an integer
//! `position` that orders it within that column. Positions are only unique
//! per column; two tasks in different columns may share a value.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Smallest position value a task may be persisted with.
pub const MIN_POSITION: u32 = 1000;

/// Largest position value a task may be persisted with.
pub const MAX_POSITION: u32 = 1_000_000;

/// Gap between the keys of neighbouring tasks in a freshly laid out column.
pub const POSITION_STEP: u32 = 1000;

/// Opaque, unique task identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskId(String);

impl TaskId {
    /// Wraps an existing identifier string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a fresh time-ordered identifier (UUID v7 text form).
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of the workspace that owns a task.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WorkspaceId(String);

impl WorkspaceId {
    /// Wraps an existing workspace identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for WorkspaceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of an authenticated user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    /// Wraps an existing user identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Board column a task belongs to.
///
/// The declaration order is the display order of the columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TaskStatus {
    /// Not yet planned.
    Backlog,
    /// Planned, not started.
    Todo,
    /// Actively being worked on.
    InProgress,
    /// Waiting for review.
    InReview,
    /// Finished.
    Done,
}

impl TaskStatus {
    /// Every column, in display order.
    pub const ALL: [Self; 5] = [
        Self::Backlog,
        Self::Todo,
        Self::InProgress,
        Self::InReview,
        Self::Done,
    ];

    /// Zero-based index of this column in [`TaskStatus::ALL`].
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Backlog => 0,
            Self::Todo => 1,
            Self::InProgress => 2,
            Self::InReview => 3,
            Self::Done => 4,
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Backlog => write!(f, "backlog"),
            Self::Todo => write!(f, "todo"),
            Self::InProgress => write!(f, "in_progress"),
            Self::InReview => write!(f, "in_review"),
            Self::Done => write!(f, "done"),
        }
    }
}

/// Error returned when a string does not name a [`TaskStatus`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown task status: {0}")]
pub struct ParseStatusError(String);

impl std::str::FromStr for TaskStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "backlog" => Ok(Self::Backlog),
            "todo" => Ok(Self::Todo),
            "in_progress" | "inprogress" => Ok(Self::InProgress),
            "in_review" | "inreview" => Ok(Self::InReview),
            "done" => Ok(Self::Done),
            _ => Err(ParseStatusError(s.to_string())),
        }
    }
}

/// A task as persisted by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Unique task identifier. Immutable.
    pub id: TaskId,
    /// Owning workspace. Immutable.
    pub workspace_id: WorkspaceId,
    /// Project the task is filed under.
    pub project_id: String,
    /// Display name.
    pub name: String,
    /// Member the task is assigned to, if any.
    pub assignee_id: Option<String>,
    /// Due date as an ISO-8601 calendar date.
    pub due_date: Option<String>,
    /// Free-form description.
    pub description: Option<String>,
    /// Column the task is in.
    pub status: TaskStatus,
    /// Sort key within the column.
    pub position: u32,
}

/// Fields supplied by a client when creating a task.
///
/// The server picks the id and the position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTask {
    /// Owning workspace.
    pub workspace_id: WorkspaceId,
    /// Project the task is filed under.
    pub project_id: String,
    /// Display name.
    pub name: String,
    /// Initial column.
    pub status: TaskStatus,
    /// Assigned member, if any.
    pub assignee_id: Option<String>,
    /// Due date as an ISO-8601 calendar date.
    pub due_date: Option<String>,
    /// Free-form description.
    pub description: Option<String>,
}

/// One entry of an update batch: the new placement of a single task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskUpdate {
    /// Task being moved.
    pub id: TaskId,
    /// Column the task should end up in.
    pub status: TaskStatus,
    /// Sort key the task should end up with.
    pub position: u32,
}

impl TaskUpdate {
    /// Creates a placement update.
    #[must_use]
    pub const fn new(id: TaskId, status: TaskStatus, position: u32) -> Self {
        Self {
            id,
            status,
            position,
        }
    }
}
