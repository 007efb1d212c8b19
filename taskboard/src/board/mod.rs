//! Column-partitioned board state for one board view.
//!
//! [`Board`] holds one ordered sequence per [`TaskStatus`]. It is rebuilt
//! with [`Board::load`] every time the server's task list changes, and
//! mutated only through [`reorder`] in between.

pub mod allocator;
pub mod reorder;

pub use allocator::{position_for_index, rekey_column};
pub use reorder::{ColumnSlot, MoveIntent, Reorder, reorder};

use taskboard_proto::task::{Task, TaskId, TaskStatus};

/// Tasks grouped by status, each column sorted by ascending position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Board {
    columns: [Vec<Task>; TaskStatus::ALL.len()],
}

impl Board {
    /// Creates an empty board.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a board from a server task list.
    #[must_use]
    pub fn from_tasks(tasks: Vec<Task>) -> Self {
        let mut board = Self::new();
        board.load(tasks);
        board
    }

    /// Replaces the board contents with `tasks`.
    ///
    /// Every task lands in the column named by its status; columns are then
    /// sorted by position. The sort is stable, so tasks sharing a position
    /// keep their input order.
    pub fn load(&mut self, tasks: Vec<Task>) {
        for column in &mut self.columns {
            column.clear();
        }
        for task in tasks {
            self.columns[task.status.index()].push(task);
        }
        for column in &mut self.columns {
            column.sort_by_key(|task| task.position);
        }
        tracing::debug!(tasks = self.len(), "board loaded");
    }

    /// Returns a copy of the current arrangement.
    ///
    /// Used both for rendering and as a rollback point.
    #[must_use]
    pub fn snapshot(&self) -> Self {
        self.clone()
    }

    /// Tasks of one column, in display order.
    #[must_use]
    pub fn column(&self, status: TaskStatus) -> &[Task] {
        &self.columns[status.index()]
    }

    pub(crate) fn column_mut(&mut self, status: TaskStatus) -> &mut Vec<Task> {
        &mut self.columns[status.index()]
    }

    /// Iterates over `(status, column)` pairs in display order.
    pub fn columns(&self) -> impl Iterator<Item = (TaskStatus, &[Task])> {
        TaskStatus::ALL
            .into_iter()
            .map(|status| (status, self.column(status)))
    }

    /// Iterates over every task, column by column.
    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.columns.iter().flatten()
    }

    /// Locates a task by id, returning its status and column index.
    #[must_use]
    pub fn find(&self, id: &TaskId) -> Option<(TaskStatus, usize)> {
        self.columns().find_map(|(status, column)| {
            column
                .iter()
                .position(|task| task.id == *id)
                .map(|index| (status, index))
        })
    }

    /// Total number of tasks on the board.
    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.iter().map(Vec::len).sum()
    }

    /// Returns `true` if no column holds a task.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.iter().all(Vec::is_empty)
    }
}
