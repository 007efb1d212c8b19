//! Wholesale validation of update batches.
//!
//! A batch is rejected as a unit: if any entry is malformed nothing in it
//! may be persisted.

use std::collections::HashSet;

use crate::task::{MAX_POSITION, MIN_POSITION, TaskId, TaskUpdate};

/// Reasons a batch is rejected before any task is touched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BatchError {
    /// The batch contains no entries.
    #[error("update batch is empty")]
    Empty,
    /// A position lies outside the persisted key range.
    #[error(
        "position {position} for task {task_id} is outside [{min}, {max}]",
        min = MIN_POSITION,
        max = MAX_POSITION
    )]
    PositionOutOfRange {
        /// Offending task.
        task_id: TaskId,
        /// Offending position.
        position: u32,
    },
    /// The same task is placed twice.
    #[error("task {0} appears more than once in the batch")]
    DuplicateTask(TaskId),
}

/// Returns `true` if `position` may be persisted.
#[must_use]
pub const fn position_in_range(position: u32) -> bool {
    position >= MIN_POSITION && position <= MAX_POSITION
}

/// Checks every entry of a batch.
///
/// # Errors
///
/// Returns the first [`BatchError`] found, scanning entries in order.
pub fn validate_batch(updates: &[TaskUpdate]) -> Result<(), BatchError> {
    if updates.is_empty() {
        return Err(BatchError::Empty);
    }
    let mut seen = HashSet::with_capacity(updates.len());
    for update in updates {
        if !position_in_range(update.position) {
            return Err(BatchError::PositionOutOfRange {
                task_id: update.id.clone(),
                position: update.position,
            });
        }
        if !seen.insert(&update.id) {
            return Err(BatchError::DuplicateTask(update.id.clone()));
        }
    }
    Ok(())
}
