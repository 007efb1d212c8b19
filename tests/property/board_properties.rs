//! Property-based tests for board loading and reordering.
//!
//! Uses proptest to verify:
//! 1. `load` partitions any task set without loss or duplication.
//! 2. Every loaded column is sorted by position.
//! 3. `reorder` is a pure function of board and intent.
//! 4. Same-column batches lead with the moved task and otherwise carry only
//!    neighbours whose key changed.
//! 5. Emitted positions stay within `[1000, 1_000_000]` for columns up to 1000 tasks.
//! 6. A drag without a destination changes nothing.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::collections::HashMap;

use proptest::prelude::*;
use taskboard::board::{Board, ColumnSlot, MoveIntent, reorder};
use taskboard_proto::task::{
    MAX_POSITION, MIN_POSITION, Task, TaskId, TaskStatus, WorkspaceId,
};

// --- Strategies ---

fn make_task(n: usize, status: TaskStatus, position: u32) -> Task {
    Task {
        id: TaskId::new(format!("t{n}")),
        workspace_id: WorkspaceId::new("w1"),
        project_id: "p1".to_string(),
        name: format!("task {n}"),
        assignee_id: None,
        due_date: None,
        description: None,
        status,
        position,
    }
}

fn arb_status() -> impl Strategy<Value = TaskStatus> {
    prop::sample::select(TaskStatus::ALL.to_vec())
}

/// Any set of tasks with unique ids, spread over random columns.
fn arb_tasks(max: usize) -> impl Strategy<Value = Vec<Task>> {
    prop::collection::vec((arb_status(), MIN_POSITION..=MAX_POSITION), 0..max).prop_map(
        |entries| {
            entries
                .into_iter()
                .enumerate()
                .map(|(n, (status, position))| make_task(n, status, position))
                .collect()
        },
    )
}

/// A single `Todo` column of `len` tasks keyed the way a rekeyed column is.
fn canonical_column(len: usize) -> Board {
    Board::from_tasks(
        (0..len)
            .map(|n| {
                let position = u32::try_from((n + 1) * 1000).unwrap().min(MAX_POSITION);
                make_task(n, TaskStatus::Todo, position)
            })
            .collect(),
    )
}

fn arb_slot(max_index: usize) -> impl Strategy<Value = ColumnSlot> {
    (arb_status(), 0..max_index).prop_map(|(status, index)| ColumnSlot::new(status, index))
}

fn arb_intent(max_index: usize) -> impl Strategy<Value = MoveIntent> {
    (arb_slot(max_index), prop::option::of(arb_slot(max_index))).prop_map(
        |(source, destination)| MoveIntent {
            source,
            destination,
        },
    )
}

fn stored_positions(board: &Board) -> HashMap<TaskId, u32> {
    board.tasks().map(|t| (t.id.clone(), t.position)).collect()
}

// --- Properties ---

proptest! {
    #[test]
    fn load_partitions_without_loss(tasks in arb_tasks(64)) {
        let board = Board::from_tasks(tasks.clone());

        let mut loaded: Vec<&str> = board.tasks().map(|t| t.id.as_str()).collect();
        let mut expected: Vec<&str> = tasks.iter().map(|t| t.id.as_str()).collect();
        loaded.sort_unstable();
        expected.sort_unstable();
        prop_assert_eq!(loaded, expected);

        for (status, column) in board.columns() {
            prop_assert!(column.iter().all(|t| t.status == status));
        }
    }

    #[test]
    fn load_sorts_each_column(tasks in arb_tasks(64)) {
        let board = Board::from_tasks(tasks);
        for (_, column) in board.columns() {
            prop_assert!(column.windows(2).all(|w| w[0].position <= w[1].position));
        }
    }

    #[test]
    fn reorder_is_deterministic(tasks in arb_tasks(32), intent in arb_intent(40)) {
        let board = Board::from_tasks(tasks);
        let first = reorder(&board, &intent);
        let second = reorder(&board, &intent);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn same_column_batch_is_minimal(
        tasks in arb_tasks(32),
        status in arb_status(),
        from in 0usize..40,
        to in 0usize..40,
    ) {
        let board = Board::from_tasks(tasks);
        let len = board.column(status).len();
        let intent = MoveIntent::new(ColumnSlot::new(status, from), ColumnSlot::new(status, to));
        let result = reorder(&board, &intent);
        let before = stored_positions(&board);

        prop_assert!(result.batch.len() <= len);
        for update in result.batch.iter().skip(1) {
            prop_assert_ne!(before[&update.id], update.position);
        }
    }

    #[test]
    fn rekeyed_column_never_resends_unchanged(
        len in 1usize..60,
        from in 0usize..60,
        to in 0usize..60,
    ) {
        let board = canonical_column(len);
        let intent = MoveIntent::new(
            ColumnSlot::new(TaskStatus::Todo, from),
            ColumnSlot::new(TaskStatus::Todo, to),
        );
        let result = reorder(&board, &intent);
        let before = stored_positions(&board);

        prop_assert!(result.batch.len() <= len);
        if from < len {
            prop_assert_eq!(&result.batch[0].id, &TaskId::new(format!("t{from}")));
        }
        for update in result.batch.iter().skip(1) {
            prop_assert_ne!(before[&update.id], update.position);
        }
    }

    #[test]
    fn emitted_positions_stay_in_range(
        len in 0usize..=1000,
        from in 0usize..1000,
        to in arb_slot(1100),
    ) {
        let board = canonical_column(len);
        let intent = MoveIntent::new(ColumnSlot::new(TaskStatus::Todo, from), to);
        let result = reorder(&board, &intent);
        for update in &result.batch {
            prop_assert!((MIN_POSITION..=MAX_POSITION).contains(&update.position));
        }
    }

    #[test]
    fn no_destination_changes_nothing(tasks in arb_tasks(32), source in arb_slot(40)) {
        let board = Board::from_tasks(tasks);
        let result = reorder(&board, &MoveIntent::dropped_outside(source));
        prop_assert!(result.batch.is_empty());
        prop_assert_eq!(result.board, board);
    }
}

#[test]
fn own_slot_drop_on_canonical_column_sends_one_update() {
    let board = canonical_column(4);
    let slot = ColumnSlot::new(TaskStatus::Todo, 2);
    let result = reorder(&board, &MoveIntent::new(slot, slot));
    assert_eq!(result.batch.len(), 1);
    assert_eq!(result.batch[0].id, TaskId::new("t2"));
    assert_eq!(result.batch[0].position, 3000);
}

#[test]
fn every_reorder_moves_exactly_one_task_first() {
    let board = canonical_column(5);
    let intent = MoveIntent::new(
        ColumnSlot::new(TaskStatus::Todo, 4),
        ColumnSlot::new(TaskStatus::Done, 0),
    );
    let result = reorder(&board, &intent);
    assert_eq!(result.batch[0].id, TaskId::new("t4"));
    assert_eq!(result.batch[0].status, TaskStatus::Done);
    assert_eq!(result.batch.len(), 1);
}
