//! Authorization-checked task operations.
//!
//! [`BoardService::bulk_update`] is the authoritative write path for board
//! moves. It validates the whole batch, resolves every task, insists they
//! all live in one workspace and that the caller is a member there, and
//! only then touches the repository.

use std::collections::BTreeSet;

use taskboard_proto::batch::{BatchError, validate_batch};
use taskboard_proto::filter::TaskFilter;
use taskboard_proto::protocol::{RemoteError, RemoteErrorKind};
use taskboard_proto::task::{NewTask, Task, TaskId, TaskUpdate, UserId, WorkspaceId};

use crate::auth::{AuthError, MembershipDirectory, authorize};
use crate::store::{StoreError, TaskRepository};

/// Why a bulk update was refused or only partly stored.
#[derive(Debug, thiserror::Error)]
pub enum BulkUpdateError {
    /// The batch is malformed; nothing was written.
    #[error(transparent)]
    InvalidBatch(#[from] BatchError),

    /// Some ids do not name an existing task; nothing was written.
    #[error("unknown task id(s): {}", join_ids(.0))]
    UnknownTasks(Vec<TaskId>),

    /// The tasks span more than one workspace; nothing was written.
    #[error("All tasks must belong to the same workspace")]
    MixedWorkspaces(Vec<WorkspaceId>),

    /// The caller may not modify the workspace; nothing was written.
    #[error("Unauthorized: {0}")]
    Unauthorized(#[from] AuthError),

    /// A write failed after earlier writes of the batch were stored.
    #[error("stored {} of {total} update(s) before failing: {source}", .applied.len())]
    PartialPersistence {
        /// Tasks whose placement was stored.
        applied: Vec<TaskId>,
        /// Batch size.
        total: usize,
        /// The failed write.
        source: StoreError,
    },

    /// The store failed before anything was written.
    #[error("storage failure: {0}")]
    Store(StoreError),
}

/// Why a list or create request failed.
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    /// The caller is not a member of the workspace.
    #[error("Unauthorized: {0}")]
    Unauthorized(#[from] AuthError),

    /// The new task's fields are unusable.
    #[error("invalid task: {0}")]
    InvalidTask(String),

    /// The store failed.
    #[error("storage failure: {0}")]
    Store(#[from] StoreError),
}

fn join_ids(ids: &[TaskId]) -> String {
    ids.iter()
        .map(TaskId::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

fn store_error_kind(err: &StoreError) -> RemoteErrorKind {
    match err {
        StoreError::TaskNotFound(_) => RemoteErrorKind::NotFound,
        StoreError::DuplicateTask(_) => RemoteErrorKind::Validation,
        StoreError::Backend(_) => RemoteErrorKind::Storage,
    }
}

impl From<&BulkUpdateError> for RemoteError {
    fn from(err: &BulkUpdateError) -> Self {
        let kind = match err {
            BulkUpdateError::InvalidBatch(_)
            | BulkUpdateError::UnknownTasks(_)
            | BulkUpdateError::MixedWorkspaces(_) => RemoteErrorKind::Validation,
            BulkUpdateError::Unauthorized(_) => RemoteErrorKind::Unauthorized,
            BulkUpdateError::PartialPersistence { applied, .. } => {
                RemoteErrorKind::PartialPersistence {
                    applied: applied.clone(),
                }
            }
            BulkUpdateError::Store(e) => store_error_kind(e),
        };
        Self::new(kind, err.to_string())
    }
}

impl From<&RequestError> for RemoteError {
    fn from(err: &RequestError) -> Self {
        let kind = match err {
            RequestError::Unauthorized(_) => RemoteErrorKind::Unauthorized,
            RequestError::InvalidTask(_) => RemoteErrorKind::Validation,
            RequestError::Store(e) => store_error_kind(e),
        };
        Self::new(kind, err.to_string())
    }
}

/// Task operations over a repository and a membership directory.
pub struct BoardService<R, D> {
    repo: R,
    directory: D,
}

impl<R: TaskRepository, D: MembershipDirectory> BoardService<R, D> {
    /// Creates a service.
    pub const fn new(repo: R, directory: D) -> Self {
        Self { repo, directory }
    }

    /// The task repository.
    pub const fn repo(&self) -> &R {
        &self.repo
    }

    /// The membership directory.
    pub const fn directory(&self) -> &D {
        &self.directory
    }

    /// Lists the tasks matching `filter`.
    ///
    /// # Errors
    ///
    /// Fails if `user_id` is not a member of the filter's workspace or the
    /// store fails.
    pub async fn list_tasks(
        &self,
        user_id: &UserId,
        filter: &TaskFilter,
    ) -> Result<Vec<Task>, RequestError> {
        authorize(&self.directory, &filter.workspace_id, user_id, None).await?;
        let tasks = self.repo.list(filter).await?;
        tracing::debug!(
            user_id = %user_id,
            workspace_id = %filter.workspace_id,
            count = tasks.len(),
            "listed tasks"
        );
        Ok(tasks)
    }

    /// Creates a task at the end of its status column.
    ///
    /// # Errors
    ///
    /// Fails if the name is blank, the caller is not a member of the
    /// workspace, or the store fails.
    pub async fn create_task(&self, user_id: &UserId, new: NewTask) -> Result<Task, RequestError> {
        let name = new.name.trim();
        if name.is_empty() {
            return Err(RequestError::InvalidTask("name must not be empty".into()));
        }
        if new.project_id.is_empty() {
            return Err(RequestError::InvalidTask("project id must not be empty".into()));
        }
        authorize(&self.directory, &new.workspace_id, user_id, None).await?;

        let task = Task {
            id: TaskId::generate(),
            workspace_id: new.workspace_id,
            project_id: new.project_id,
            name: name.to_string(),
            assignee_id: new.assignee_id,
            due_date: new.due_date,
            description: new.description,
            status: new.status,
            position: 0,
        };
        let task = self.repo.append(task).await?;
        tracing::info!(
            user_id = %user_id,
            task_id = %task.id,
            workspace_id = %task.workspace_id,
            status = %task.status,
            position = task.position,
            "task created"
        );
        Ok(task)
    }

    /// Stores a batch of `{id, status, position}` placements.
    ///
    /// Every check runs before the first write: batch shape, existence of
    /// every task, a single common workspace, and membership of the caller
    /// in it. Returns the updated records in batch order.
    ///
    /// # Errors
    ///
    /// See [`BulkUpdateError`]. Only
    /// [`BulkUpdateError::PartialPersistence`] implies that some writes
    /// were stored.
    pub async fn bulk_update(
        &self,
        user_id: &UserId,
        updates: &[TaskUpdate],
    ) -> Result<Vec<Task>, BulkUpdateError> {
        validate_batch(updates)?;

        let ids: Vec<TaskId> = updates.iter().map(|u| u.id.clone()).collect();
        let existing = self
            .repo
            .get_many(&ids)
            .await
            .map_err(BulkUpdateError::Store)?;

        let missing: Vec<TaskId> = ids
            .iter()
            .filter(|id| !existing.iter().any(|t| &t.id == *id))
            .cloned()
            .collect();
        if !missing.is_empty() {
            tracing::warn!(user_id = %user_id, count = missing.len(), "bulk update names unknown tasks");
            return Err(BulkUpdateError::UnknownTasks(missing));
        }

        let workspaces: BTreeSet<&WorkspaceId> = existing.iter().map(|t| &t.workspace_id).collect();
        let workspace_id = match workspaces.iter().next() {
            Some(ws) if workspaces.len() == 1 => (*ws).clone(),
            _ => {
                tracing::warn!(
                    user_id = %user_id,
                    workspaces = workspaces.len(),
                    "bulk update spans several workspaces"
                );
                return Err(BulkUpdateError::MixedWorkspaces(
                    workspaces.into_iter().cloned().collect(),
                ));
            }
        };

        authorize(&self.directory, &workspace_id, user_id, None).await?;

        let updated = if let Some(result) = self.repo.apply_placements(updates).await {
            result.map_err(BulkUpdateError::Store)?
        } else {
            self.apply_one_by_one(updates).await?
        };

        tracing::info!(
            user_id = %user_id,
            workspace_id = %workspace_id,
            count = updated.len(),
            "bulk update applied"
        );
        Ok(updated)
    }

    async fn apply_one_by_one(&self, updates: &[TaskUpdate]) -> Result<Vec<Task>, BulkUpdateError> {
        let mut updated = Vec::with_capacity(updates.len());
        for update in updates {
            match self.repo.update_placement(update).await {
                Ok(task) => updated.push(task),
                Err(e) if updated.is_empty() => return Err(BulkUpdateError::Store(e)),
                Err(e) => {
                    let applied: Vec<TaskId> = updated.iter().map(|t| t.id.clone()).collect();
                    tracing::error!(
                        task_id = %update.id,
                        applied = applied.len(),
                        total = updates.len(),
                        error = %e,
                        "bulk update partially persisted"
                    );
                    return Err(BulkUpdateError::PartialPersistence {
                        applied,
                        total: updates.len(),
                        source: e,
                    });
                }
            }
        }
        Ok(updated)
    }
}
