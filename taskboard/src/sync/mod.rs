//! Bridges locally computed moves to the server.
//!
//! A [`BoardSession`] applies every move to its [`Board`] synchronously
//! (optimistic update), sends the resulting batch once, and on success
//! reloads the board from the server so the canonical order wins. A failed
//! batch is never retried: the session is marked stale and the next
//! interaction refetches first.

pub mod invalidation;

pub use invalidation::{QueryKey, invalidated_keys};

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use taskboard_proto::batch::{BatchError, validate_batch};
use taskboard_proto::filter::TaskFilter;
use taskboard_proto::protocol::RemoteErrorKind;
use taskboard_proto::task::{NewTask, Task, TaskId, TaskUpdate};

use crate::board::{Board, MoveIntent, reorder};
use crate::transport::{BoardTransport, TransportError};

/// Why a batch or refetch did not go through.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// The request never got an answer (network failure, timeout, closed socket).
    #[error("could not reach the server: {0}")]
    Transport(TransportError),

    /// The server refused the batch before writing anything.
    #[error("update rejected: {0}")]
    Validation(String),

    /// The user is not a member of the batch's workspace.
    #[error("not authorized: {0}")]
    Unauthorized(String),

    /// The server wrote part of the batch before failing.
    ///
    /// Local state may be ahead of, behind, or divergent from the server.
    #[error("server stored {} update(s) before failing: {reason}", applied.len())]
    PartialPersistence {
        /// Tasks the server did update.
        applied: Vec<TaskId>,
        /// Server's description of the failure.
        reason: String,
    },

    /// The server failed for another reason.
    #[error("server error: {0}")]
    Server(String),

    /// The batch was malformed and was not sent.
    #[error("invalid batch: {0}")]
    InvalidBatch(#[from] BatchError),
}

impl From<TransportError> for SyncError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Remote(remote) => match remote.kind {
                RemoteErrorKind::Validation => Self::Validation(remote.reason),
                RemoteErrorKind::Unauthorized => Self::Unauthorized(remote.reason),
                RemoteErrorKind::PartialPersistence { applied } => Self::PartialPersistence {
                    applied,
                    reason: remote.reason,
                },
                RemoteErrorKind::NotFound
                | RemoteErrorKind::Protocol
                | RemoteErrorKind::Storage => Self::Server(remote.reason),
            },
            other => Self::Transport(other),
        }
    }
}

/// What a successful batch round-trip did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    /// Records returned by the server, in batch order.
    pub updated: Vec<Task>,
    /// Cached result sets that are now out of date.
    pub invalidated: Vec<QueryKey>,
    /// Whether the board was reloaded from the server afterwards.
    pub refreshed: bool,
}

/// One user's live board view over a transport.
pub struct BoardSession<T> {
    transport: T,
    filter: TaskFilter,
    board: Mutex<Board>,
    stale: AtomicBool,
}

impl<T: BoardTransport> BoardSession<T> {
    /// Creates a session showing the tasks matched by `filter`.
    ///
    /// The board starts empty and stale; call [`refresh`](Self::refresh)
    /// to load it.
    pub fn new(transport: T, filter: TaskFilter) -> Self {
        Self {
            transport,
            filter,
            board: Mutex::new(Board::new()),
            stale: AtomicBool::new(true),
        }
    }

    /// The filter this session lists tasks with.
    pub const fn filter(&self) -> &TaskFilter {
        &self.filter
    }

    /// The underlying transport.
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// A copy of the board as currently rendered.
    pub fn board(&self) -> Board {
        self.board.lock().snapshot()
    }

    /// Returns `true` if local state should not be trusted until refetched.
    pub fn needs_refetch(&self) -> bool {
        self.stale.load(Ordering::Acquire)
    }

    /// Reloads the board from the server.
    ///
    /// Returns the number of tasks loaded.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError`] if the listing fails; the board is left as is
    /// and stays stale.
    pub async fn refresh(&self) -> Result<usize, SyncError> {
        let tasks = match self.transport.list_tasks(&self.filter).await {
            Ok(tasks) => tasks,
            Err(e) => {
                self.stale.store(true, Ordering::Release);
                tracing::warn!(error = %e, "task list refetch failed");
                return Err(e.into());
            }
        };
        let count = tasks.len();
        self.board.lock().load(tasks);
        self.stale.store(false, Ordering::Release);
        tracing::debug!(count, workspace_id = %self.filter.workspace_id, "board refreshed");
        Ok(count)
    }

    /// Applies a drag gesture to the local board.
    ///
    /// Returns the batch to persist, or `None` when the gesture changed
    /// nothing. Never touches the network.
    pub fn on_drag_end(&self, intent: &MoveIntent) -> Option<Vec<TaskUpdate>> {
        let mut board = self.board.lock();
        let result = reorder(&board, intent);
        if result.is_noop() {
            return None;
        }
        *board = result.board;
        Some(result.batch)
    }

    /// Sends a batch as one request.
    ///
    /// On success the affected query keys are reported and the board is
    /// reloaded from the server. On failure the session is marked stale and
    /// the optimistic board is kept until the next refetch.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError`] if the batch is malformed or the server does not
    /// confirm it.
    pub async fn sync(&self, batch: Vec<TaskUpdate>) -> Result<SyncReport, SyncError> {
        if let Err(e) = validate_batch(&batch) {
            self.stale.store(true, Ordering::Release);
            tracing::error!(error = %e, "refusing to send malformed batch");
            return Err(e.into());
        }

        let updated = match self.transport.bulk_update(&batch).await {
            Ok(updated) => updated,
            Err(e) => {
                self.stale.store(true, Ordering::Release);
                let err = SyncError::from(e);
                tracing::warn!(error = %err, count = batch.len(), "bulk update failed");
                return Err(err);
            }
        };
        tracing::info!(count = updated.len(), "bulk update confirmed");

        let invalidated = invalidated_keys(&updated);
        let refreshed = self.refresh().await.is_ok();
        Ok(SyncReport {
            updated,
            invalidated,
            refreshed,
        })
    }

    /// Handles one drag gesture end to end.
    ///
    /// Refetches first if an earlier request failed, then applies the move
    /// and syncs it. Returns `None` when the gesture changed nothing.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError`] if the preliminary refetch or the sync fails.
    pub async fn drag(&self, intent: &MoveIntent) -> Result<Option<SyncReport>, SyncError> {
        if self.needs_refetch() {
            self.refresh().await?;
        }
        match self.on_drag_end(intent) {
            Some(batch) => self.sync(batch).await.map(Some),
            None => Ok(None),
        }
    }

    /// Creates a task and reloads the board.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError`] if the server refuses the task.
    pub async fn create_task(&self, task: &NewTask) -> Result<Task, SyncError> {
        let created = self.transport.create_task(task).await?;
        tracing::info!(task_id = %created.id, status = %created.status, "task created");
        if let Err(e) = self.refresh().await {
            tracing::warn!(error = %e, "refetch after create failed");
        }
        Ok(created)
    }
}
