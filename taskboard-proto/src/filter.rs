//! Task list filters.

use serde::{Deserialize, Serialize};

use crate::task::{Task, TaskStatus, WorkspaceId};

/// Narrows a task listing. Only `workspace_id` is mandatory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskFilter {
    /// Workspace to list tasks from.
    pub workspace_id: WorkspaceId,
    /// Keep only tasks filed under this project.
    pub project_id: Option<String>,
    /// Keep only tasks assigned to this member.
    pub assignee_id: Option<String>,
    /// Keep only tasks in this column.
    pub status: Option<TaskStatus>,
    /// Case-insensitive substring of the task name.
    pub search: Option<String>,
    /// Exact due date.
    pub due_date: Option<String>,
}

impl TaskFilter {
    /// A filter matching every task of a workspace.
    #[must_use]
    pub const fn workspace(workspace_id: WorkspaceId) -> Self {
        Self {
            workspace_id,
            project_id: None,
            assignee_id: None,
            status: None,
            search: None,
            due_date: None,
        }
    }

    /// Restricts the filter to one project.
    #[must_use]
    pub fn with_project(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }

    /// Restricts the filter to one assignee.
    #[must_use]
    pub fn with_assignee(mut self, assignee_id: impl Into<String>) -> Self {
        self.assignee_id = Some(assignee_id.into());
        self
    }

    /// Restricts the filter to one column.
    #[must_use]
    pub const fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Restricts the filter to names containing `search`.
    #[must_use]
    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    /// Returns `true` if `task` passes every criterion.
    #[must_use]
    pub fn matches(&self, task: &Task) -> bool {
        if task.workspace_id != self.workspace_id {
            return false;
        }
        if self
            .project_id
            .as_ref()
            .is_some_and(|p| *p != task.project_id)
        {
            return false;
        }
        if self
            .assignee_id
            .as_ref()
            .is_some_and(|a| task.assignee_id.as_ref() != Some(a))
        {
            return false;
        }
        if self.status.is_some_and(|s| s != task.status) {
            return false;
        }
        if self
            .due_date
            .as_ref()
            .is_some_and(|d| task.due_date.as_ref() != Some(d))
        {
            return false;
        }
        self.search.as_ref().is_none_or(|needle| {
            task.name
                .to_lowercase()
                .contains(&needle.to_lowercase())
        })
    }
}
