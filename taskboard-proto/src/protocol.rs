//! Request/response messages exchanged between the board client and server.
//!
//! Each message travels as one postcard-encoded WebSocket binary frame. The
//! first client frame must be [`ClientMessage::Hello`]; every later request
//! carries a `request_id` that the server echoes in its reply.

use serde::{Deserialize, Serialize};

use crate::filter::TaskFilter;
use crate::task::{NewTask, Task, TaskId, TaskUpdate, UserId};

/// `request_id` of a [`ServerMessage::Failed`] that answers no particular
/// request, because the frame could not be decoded or arrived out of
/// sequence. Clients never assign it.
pub const UNCORRELATED_REQUEST_ID: u64 = 0;

/// Messages sent by a board client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClientMessage {
    /// Opens a session for the given user.
    ///
    /// The server answers with [`ServerMessage::Welcome`].
    Hello {
        /// Identity the session acts as.
        user_id: UserId,
    },
    /// Fetches the tasks matching a filter.
    ListTasks {
        /// Correlation id echoed in the reply.
        request_id: u64,
        /// Which tasks to list.
        filter: TaskFilter,
    },
    /// Persists the placements computed for one board move.
    BulkUpdate {
        /// Correlation id echoed in the reply.
        request_id: u64,
        /// New `{id, status, position}` for every task that changed.
        updates: Vec<TaskUpdate>,
    },
    /// Appends a new task to the end of its column.
    CreateTask {
        /// Correlation id echoed in the reply.
        request_id: u64,
        /// Fields of the task to create.
        task: NewTask,
    },
}

/// Messages sent by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServerMessage {
    /// Session accepted.
    Welcome {
        /// Identity the session acts as (echoed back).
        user_id: UserId,
    },
    /// Reply to [`ClientMessage::ListTasks`].
    Tasks {
        /// Correlation id of the request.
        request_id: u64,
        /// Matching tasks, in no particular order.
        tasks: Vec<Task>,
    },
    /// Reply to [`ClientMessage::BulkUpdate`].
    Updated {
        /// Correlation id of the request.
        request_id: u64,
        /// Updated records, in the order of the request's entries.
        tasks: Vec<Task>,
    },
    /// Reply to [`ClientMessage::CreateTask`].
    Created {
        /// Correlation id of the request.
        request_id: u64,
        /// The stored task.
        task: Task,
    },
    /// A request failed.
    Failed {
        /// Correlation id of the request, `0` when the frame was unreadable.
        request_id: u64,
        /// What went wrong.
        error: RemoteError,
    },
}

impl ServerMessage {
    /// Returns the correlation id this message answers, if any.
    #[must_use]
    pub const fn request_id(&self) -> Option<u64> {
        match self {
            Self::Welcome { .. } => None,
            Self::Tasks { request_id, .. }
            | Self::Updated { request_id, .. }
            | Self::Created { request_id, .. }
            | Self::Failed { request_id, .. } => Some(*request_id),
        }
    }
}

/// Category of a server-side failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemoteErrorKind {
    /// The request was malformed or inconsistent; nothing was written.
    Validation,
    /// The caller is not a member of the workspace; nothing was written.
    Unauthorized,
    /// Some updates were written before a later one failed.
    PartialPersistence {
        /// Tasks whose new placement was stored.
        applied: Vec<TaskId>,
    },
    /// A referenced record does not exist.
    NotFound,
    /// The frame could not be decoded or was out of sequence.
    ///
    /// Sent with [`UNCORRELATED_REQUEST_ID`], so a client cannot tell which
    /// of its in-flight requests caused it.
    Protocol,
    /// The store failed before anything was written.
    Storage,
}

/// A failure reported by the server, passed to the client verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{reason}")]
pub struct RemoteError {
    /// Failure category.
    pub kind: RemoteErrorKind,
    /// Human-readable description.
    pub reason: String,
}

impl RemoteError {
    /// Creates a remote error.
    pub fn new(kind: RemoteErrorKind, reason: impl Into<String>) -> Self {
        Self {
            kind,
            reason: reason.into(),
        }
    }
}
