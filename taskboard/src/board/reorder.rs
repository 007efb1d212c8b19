//! Realizes a drag-and-drop move as a new board plus a minimal update batch.
//!
//! [`reorder`] is a pure function of the prior [`Board`] and a
//! [`MoveIntent`]: it never touches the network, the clock, or any state
//! outside its arguments, so the caller can render the result immediately
//! and send the batch afterwards.

use serde::{Deserialize, Serialize};
use taskboard_proto::task::{TaskStatus, TaskUpdate};

use super::Board;
use super::allocator::{position_for_index, rekey_column};

/// A zero-based slot inside one column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnSlot {
    /// Column the slot belongs to.
    pub status: TaskStatus,
    /// Index within the column's display order.
    pub index: usize,
}

impl ColumnSlot {
    /// Creates a slot.
    #[must_use]
    pub const fn new(status: TaskStatus, index: usize) -> Self {
        Self { status, index }
    }
}

/// The outcome of a drag gesture, independent of any UI event shape.
///
/// `destination` is `None` when the task was released outside every column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveIntent {
    /// Where the task was picked up.
    pub source: ColumnSlot,
    /// Where the task was dropped, if anywhere.
    pub destination: Option<ColumnSlot>,
}

impl MoveIntent {
    /// A move from `source` to `destination`.
    #[must_use]
    pub const fn new(source: ColumnSlot, destination: ColumnSlot) -> Self {
        Self {
            source,
            destination: Some(destination),
        }
    }

    /// A drag released outside any column.
    #[must_use]
    pub const fn dropped_outside(source: ColumnSlot) -> Self {
        Self {
            source,
            destination: None,
        }
    }

    /// Returns `true` if the move crosses columns.
    #[must_use]
    pub fn is_cross_column(&self) -> bool {
        self.destination
            .is_some_and(|dest| dest.status != self.source.status)
    }
}

/// Result of [`reorder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reorder {
    /// The arrangement after the move.
    pub board: Board,
    /// Placements to persist, moved task first.
    pub batch: Vec<TaskUpdate>,
}

impl Reorder {
    fn unchanged(board: &Board) -> Self {
        Self {
            board: board.snapshot(),
            batch: Vec::new(),
        }
    }

    /// Returns `true` if the move changed nothing.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.batch.is_empty()
    }
}

/// Applies `intent` to a copy of `board`.
///
/// The moved task is always the first batch entry. Every other task of the
/// destination column, and of the source column on a cross-column move, is
/// included only if its recomputed key differs from its stored position.
///
/// The board is returned unchanged with an empty batch when the drag has
/// no destination, or when the source index does not name a task (stale
/// client state).
///
/// A drop onto the task's own slot still emits the moved task, so a column
/// whose stored keys drifted from the allocator's spacing is rekeyed. A
/// destination index past the end of the column appends.
#[must_use]
pub fn reorder(board: &Board, intent: &MoveIntent) -> Reorder {
    let Some(destination) = intent.destination else {
        return Reorder::unchanged(board);
    };
    let source = intent.source;
    let source_len = board.column(source.status).len();
    if source.index >= source_len {
        tracing::warn!(
            status = %source.status,
            index = source.index,
            "move source does not name a task, ignoring"
        );
        return Reorder::unchanged(board);
    }

    let same_column = source.status == destination.status;
    let dest_index = if same_column {
        destination.index.min(source_len - 1)
    } else {
        destination.index.min(board.column(destination.status).len())
    };

    let mut next = board.snapshot();
    let mut moved = next.column_mut(source.status).remove(source.index);
    moved.status = destination.status;

    let dest_column = next.column_mut(destination.status);
    moved.position = position_for_index(dest_index);
    let moved_id = moved.id.clone();

    let mut batch = vec![TaskUpdate::new(
        moved_id.clone(),
        moved.status,
        moved.position,
    )];
    dest_column.insert(dest_index, moved);
    rekey_column(dest_column, Some(&moved_id), &mut batch);

    if intent.is_cross_column() {
        rekey_column(next.column_mut(source.status), None, &mut batch);
    }

    tracing::debug!(
        task_id = %moved_id,
        from = %source.status,
        to = %destination.status,
        index = dest_index,
        updates = batch.len(),
        "computed reorder"
    );

    Reorder { board: next, batch }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::tests::task;
    use taskboard_proto::task::TaskId;

    fn ids(board: &Board, status: TaskStatus) -> Vec<&str> {
        board.column(status).iter().map(|t| t.id.as_str()).collect()
    }

    fn update(id: &str, status: TaskStatus, position: u32) -> TaskUpdate {
        TaskUpdate::new(TaskId::new(id), status, position)
    }

    fn todo_abc() -> Board {
        Board::from_tasks(vec![
            task("A", TaskStatus::Todo, 1000),
            task("B", TaskStatus::Todo, 2000),
            task("C", TaskStatus::Todo, 3000),
        ])
    }

    #[test]
    fn move_first_to_last_within_column() {
        let board = todo_abc();
        let intent = MoveIntent::new(
            ColumnSlot::new(TaskStatus::Todo, 0),
            ColumnSlot::new(TaskStatus::Todo, 2),
        );
        let result = reorder(&board, &intent);

        assert_eq!(ids(&result.board, TaskStatus::Todo), vec!["B", "C", "A"]);
        assert_eq!(
            result.batch,
            vec![
                update("A", TaskStatus::Todo, 3000),
                update("B", TaskStatus::Todo, 1000),
                update("C", TaskStatus::Todo, 2000),
            ]
        );
        let positions: Vec<u32> = result
            .board
            .column(TaskStatus::Todo)
            .iter()
            .map(|t| t.position)
            .collect();
        assert_eq!(positions, vec![1000, 2000, 3000]);
    }

    #[test]
    fn move_only_task_into_empty_column() {
        let board = Board::from_tasks(vec![task("T", TaskStatus::Backlog, 1000)]);
        let intent = MoveIntent::new(
            ColumnSlot::new(TaskStatus::Backlog, 0),
            ColumnSlot::new(TaskStatus::Done, 0),
        );
        let result = reorder(&board, &intent);

        assert_eq!(result.batch, vec![update("T", TaskStatus::Done, 1000)]);
        assert!(result.board.column(TaskStatus::Backlog).is_empty());
        assert_eq!(ids(&result.board, TaskStatus::Done), vec!["T"]);
        assert_eq!(result.board.column(TaskStatus::Done)[0].status, TaskStatus::Done);
    }

    #[test]
    fn dropped_outside_is_noop() {
        let board = todo_abc();
        let intent = MoveIntent::dropped_outside(ColumnSlot::new(TaskStatus::Todo, 1));
        let result = reorder(&board, &intent);

        assert!(result.is_noop());
        assert_eq!(result.board, board);
    }

    #[test]
    fn stale_source_index_is_noop() {
        let board = todo_abc();
        let intent = MoveIntent::new(
            ColumnSlot::new(TaskStatus::Todo, 3),
            ColumnSlot::new(TaskStatus::Done, 0),
        );
        let result = reorder(&board, &intent);

        assert!(result.is_noop());
        assert_eq!(result.board, board);
    }

    #[test]
    fn drop_on_own_slot_sends_only_moved_task() {
        let board = todo_abc();
        let slot = ColumnSlot::new(TaskStatus::Todo, 1);
        let result = reorder(&board, &MoveIntent::new(slot, slot));

        assert_eq!(result.batch, vec![update("B", TaskStatus::Todo, 2000)]);
        assert_eq!(result.board, board);
    }

    #[test]
    fn drop_on_own_slot_rekeys_drifted_column() {
        let board = Board::from_tasks(vec![
            task("A", TaskStatus::Todo, 1500),
            task("B", TaskStatus::Todo, 7000),
        ]);
        let slot = ColumnSlot::new(TaskStatus::Todo, 1);
        let result = reorder(&board, &MoveIntent::new(slot, slot));

        assert_eq!(ids(&result.board, TaskStatus::Todo), vec!["A", "B"]);
        assert_eq!(
            result.batch,
            vec![
                update("B", TaskStatus::Todo, 2000),
                update("A", TaskStatus::Todo, 1000),
            ]
        );
    }

    #[test]
    fn last_task_dropped_past_own_end_stays_last() {
        let board = todo_abc();
        let intent = MoveIntent::new(
            ColumnSlot::new(TaskStatus::Todo, 2),
            ColumnSlot::new(TaskStatus::Todo, 9),
        );
        let result = reorder(&board, &intent);

        assert_eq!(ids(&result.board, TaskStatus::Todo), vec!["A", "B", "C"]);
        assert_eq!(result.batch, vec![update("C", TaskStatus::Todo, 3000)]);
    }

    #[test]
    fn same_column_past_end_moves_to_last() {
        let board = todo_abc();
        let intent = MoveIntent::new(
            ColumnSlot::new(TaskStatus::Todo, 0),
            ColumnSlot::new(TaskStatus::Todo, 9),
        );
        let result = reorder(&board, &intent);
        assert_eq!(ids(&result.board, TaskStatus::Todo), vec!["B", "C", "A"]);
        assert_eq!(result.batch[0], update("A", TaskStatus::Todo, 3000));
    }

    #[test]
    fn cross_column_rekeys_both_columns() {
        let board = Board::from_tasks(vec![
            task("A", TaskStatus::Todo, 1000),
            task("B", TaskStatus::Todo, 2000),
            task("C", TaskStatus::Todo, 3000),
            task("X", TaskStatus::Done, 1000),
            task("Y", TaskStatus::Done, 2000),
        ]);
        let intent = MoveIntent::new(
            ColumnSlot::new(TaskStatus::Todo, 0),
            ColumnSlot::new(TaskStatus::Done, 1),
        );
        let result = reorder(&board, &intent);

        assert_eq!(ids(&result.board, TaskStatus::Todo), vec!["B", "C"]);
        assert_eq!(ids(&result.board, TaskStatus::Done), vec!["X", "A", "Y"]);
        assert_eq!(
            result.batch,
            vec![
                update("A", TaskStatus::Done, 2000),
                update("Y", TaskStatus::Done, 3000),
                update("B", TaskStatus::Todo, 1000),
                update("C", TaskStatus::Todo, 2000),
            ]
        );
    }

    #[test]
    fn destination_past_end_appends() {
        let board = todo_abc();
        let intent = MoveIntent::new(
            ColumnSlot::new(TaskStatus::Todo, 0),
            ColumnSlot::new(TaskStatus::InReview, 42),
        );
        let result = reorder(&board, &intent);

        assert_eq!(ids(&result.board, TaskStatus::InReview), vec!["A"]);
        assert_eq!(result.batch[0], update("A", TaskStatus::InReview, 1000));
    }

    #[test]
    fn untouched_tasks_stay_out_of_batch() {
        let board = Board::from_tasks(vec![
            task("A", TaskStatus::Todo, 1000),
            task("B", TaskStatus::Todo, 2000),
            task("C", TaskStatus::Todo, 3000),
            task("D", TaskStatus::Todo, 4000),
        ]);
        let intent = MoveIntent::new(
            ColumnSlot::new(TaskStatus::Todo, 3),
            ColumnSlot::new(TaskStatus::Todo, 2),
        );
        let result = reorder(&board, &intent);

        assert_eq!(ids(&result.board, TaskStatus::Todo), vec!["A", "B", "D", "C"]);
        assert_eq!(
            result.batch,
            vec![
                update("D", TaskStatus::Todo, 3000),
                update("C", TaskStatus::Todo, 4000),
            ]
        );
    }

    #[test]
    fn reorder_does_not_mutate_input() {
        let board = todo_abc();
        let before = board.snapshot();
        let intent = MoveIntent::new(
            ColumnSlot::new(TaskStatus::Todo, 2),
            ColumnSlot::new(TaskStatus::Backlog, 0),
        );
        let _ = reorder(&board, &intent);
        assert_eq!(board, before);
    }

    #[test]
    fn is_cross_column() {
        let src = ColumnSlot::new(TaskStatus::Todo, 0);
        assert!(MoveIntent::new(src, ColumnSlot::new(TaskStatus::Done, 0)).is_cross_column());
        assert!(!MoveIntent::new(src, ColumnSlot::new(TaskStatus::Todo, 2)).is_cross_column());
        assert!(!MoveIntent::dropped_outside(src).is_cross_column());
    }
}
