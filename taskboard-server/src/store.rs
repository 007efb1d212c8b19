//! Task persistence and membership storage.
//!
//! [`TaskRepository`] is the seam the bulk-update service writes through.
//! [`InMemoryTaskStore`] applies whole batches under a single write lock,
//! so it reports all-or-nothing support via
//! [`TaskRepository::apply_placements`].

use std::collections::HashMap;
use std::future::Future;

use taskboard_proto::filter::TaskFilter;
use taskboard_proto::task::{
    MAX_POSITION, MIN_POSITION, POSITION_STEP, Task, TaskId, TaskStatus, TaskUpdate, UserId,
    WorkspaceId,
};
use tokio::sync::RwLock;

use crate::auth::{Member, MembershipDirectory};

/// Failures of the storage backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The task does not exist.
    #[error("task {0} not found")]
    TaskNotFound(TaskId),
    /// The task id is already taken.
    #[error("task {0} already exists")]
    DuplicateTask(TaskId),
    /// The backend could not complete the operation.
    #[error("storage backend failure: {0}")]
    Backend(String),
}

/// Position for a task appended after a column whose last key is `last`.
#[must_use]
pub fn append_position(last: Option<u32>) -> u32 {
    last.map_or(MIN_POSITION, |p| {
        p.saturating_add(POSITION_STEP).min(MAX_POSITION)
    })
}

/// Storage for tasks.
pub trait TaskRepository: Send + Sync {
    /// Loads the tasks with the given ids. Unknown ids are skipped.
    fn get_many(
        &self,
        ids: &[TaskId],
    ) -> impl Future<Output = Result<Vec<Task>, StoreError>> + Send;

    /// Lists the tasks matching `filter`.
    fn list(&self, filter: &TaskFilter)
    -> impl Future<Output = Result<Vec<Task>, StoreError>> + Send;

    /// Stores a new task at the end of its column, overwriting its position.
    fn append(&self, task: Task) -> impl Future<Output = Result<Task, StoreError>> + Send;

    /// Stores a task exactly as given.
    fn insert(&self, task: Task) -> impl Future<Output = Result<Task, StoreError>> + Send;

    /// Overwrites one task's status and position.
    fn update_placement(
        &self,
        update: &TaskUpdate,
    ) -> impl Future<Output = Result<Task, StoreError>> + Send;

    /// Applies every placement as one unit of work.
    ///
    /// Returns `None` if the backend cannot do so, in which case callers
    /// fall back to [`update_placement`](Self::update_placement) per entry.
    fn apply_placements(
        &self,
        _updates: &[TaskUpdate],
    ) -> impl Future<Output = Option<Result<Vec<Task>, StoreError>>> + Send {
        async { None }
    }
}

/// In-memory task table.
#[derive(Default)]
pub struct InMemoryTaskStore {
    tasks: RwLock<HashMap<TaskId, Task>>,
}

impl InMemoryTaskStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored tasks.
    pub async fn len(&self) -> usize {
        self.tasks.read().await.len()
    }

    /// Returns `true` if no task is stored.
    pub async fn is_empty(&self) -> bool {
        self.tasks.read().await.is_empty()
    }

    /// Returns a copy of one task.
    pub async fn get(&self, id: &TaskId) -> Option<Task> {
        self.tasks.read().await.get(id).cloned()
    }
}

fn last_position(
    tasks: &HashMap<TaskId, Task>,
    workspace_id: &WorkspaceId,
    status: TaskStatus,
) -> Option<u32> {
    tasks
        .values()
        .filter(|t| t.workspace_id == *workspace_id && t.status == status)
        .map(|t| t.position)
        .max()
}

impl TaskRepository for InMemoryTaskStore {
    async fn get_many(&self, ids: &[TaskId]) -> Result<Vec<Task>, StoreError> {
        let tasks = self.tasks.read().await;
        Ok(ids.iter().filter_map(|id| tasks.get(id).cloned()).collect())
    }

    async fn list(&self, filter: &TaskFilter) -> Result<Vec<Task>, StoreError> {
        let tasks = self.tasks.read().await;
        Ok(tasks.values().filter(|t| filter.matches(t)).cloned().collect())
    }

    async fn append(&self, mut task: Task) -> Result<Task, StoreError> {
        let mut tasks = self.tasks.write().await;
        if tasks.contains_key(&task.id) {
            return Err(StoreError::DuplicateTask(task.id));
        }
        task.position = append_position(last_position(&tasks, &task.workspace_id, task.status));
        tasks.insert(task.id.clone(), task.clone());
        drop(tasks);
        Ok(task)
    }

    async fn insert(&self, task: Task) -> Result<Task, StoreError> {
        let mut tasks = self.tasks.write().await;
        if tasks.contains_key(&task.id) {
            return Err(StoreError::DuplicateTask(task.id));
        }
        tasks.insert(task.id.clone(), task.clone());
        drop(tasks);
        Ok(task)
    }

    async fn update_placement(&self, update: &TaskUpdate) -> Result<Task, StoreError> {
        let mut tasks = self.tasks.write().await;
        let task = tasks
            .get_mut(&update.id)
            .ok_or_else(|| StoreError::TaskNotFound(update.id.clone()))?;
        task.status = update.status;
        task.position = update.position;
        Ok(task.clone())
    }

    async fn apply_placements(
        &self,
        updates: &[TaskUpdate],
    ) -> Option<Result<Vec<Task>, StoreError>> {
        let mut tasks = self.tasks.write().await;
        if let Some(missing) = updates.iter().find(|u| !tasks.contains_key(&u.id)) {
            return Some(Err(StoreError::TaskNotFound(missing.id.clone())));
        }
        let mut updated = Vec::with_capacity(updates.len());
        for update in updates {
            if let Some(task) = tasks.get_mut(&update.id) {
                task.status = update.status;
                task.position = update.position;
                updated.push(task.clone());
            }
        }
        drop(tasks);
        Some(Ok(updated))
    }
}

/// In-memory membership table.
#[derive(Default)]
pub struct InMemoryDirectory {
    members: RwLock<HashMap<(WorkspaceId, UserId), Member>>,
}

impl InMemoryDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a membership.
    pub async fn add_member(&self, member: Member) {
        let key = (member.workspace_id.clone(), member.user_id.clone());
        self.members.write().await.insert(key, member);
    }

    /// Removes a membership, returning it if it existed.
    pub async fn remove_member(
        &self,
        workspace_id: &WorkspaceId,
        user_id: &UserId,
    ) -> Option<Member> {
        self.members
            .write()
            .await
            .remove(&(workspace_id.clone(), user_id.clone()))
    }
}

impl MembershipDirectory for InMemoryDirectory {
    async fn get_membership(&self, workspace_id: &WorkspaceId, user_id: &UserId) -> Option<Member> {
        self.members
            .read()
            .await
            .get(&(workspace_id.clone(), user_id.clone()))
            .cloned()
    }
}
