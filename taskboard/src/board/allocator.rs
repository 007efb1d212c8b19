//! Spaced position keys for tasks within a column.
//!
//! The task at column index `i` is keyed `min((i + 1) * 1000, 1_000_000)`.
//! Columns are always rekeyed deterministically from their order; no attempt
//! is made to squeeze a new key between two neighbours.
//!
//! Columns longer than 1000 tasks collide at the ceiling: every task from
//! index 999 onward computes `1_000_000`.

use taskboard_proto::task::{MAX_POSITION, POSITION_STEP, Task, TaskId, TaskUpdate};

/// Computes the position key for column index `index`.
#[must_use]
pub fn position_for_index(index: usize) -> u32 {
    let ordinal = u64::try_from(index).unwrap_or(u64::MAX).saturating_add(1);
    let key = ordinal.saturating_mul(u64::from(POSITION_STEP));
    u32::try_from(key.min(u64::from(MAX_POSITION))).unwrap_or(MAX_POSITION)
}

/// Rekeys every task in `column` except `skip`, recording the ones that changed.
///
/// A task is rewritten, and an update appended to `batch`, only when its
/// computed key differs from its stored position.
pub fn rekey_column(column: &mut [Task], skip: Option<&TaskId>, batch: &mut Vec<TaskUpdate>) {
    for (index, task) in column.iter_mut().enumerate() {
        if skip.is_some_and(|id| *id == task.id) {
            continue;
        }
        let key = position_for_index(index);
        if task.position != key {
            task.position = key;
            batch.push(TaskUpdate::new(task.id.clone(), task.status, key));
        }
    }
}
