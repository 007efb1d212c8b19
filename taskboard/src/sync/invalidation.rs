//! Cached result sets that a confirmed batch makes stale.
//!
//! Instead of flipping global cache state, a successful sync returns the
//! explicit list of keys the caller should refetch.

use serde::Serialize;
use taskboard_proto::task::{Task, TaskId};

/// Name of a cached, refetchable result set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum QueryKey {
    /// Any task listing.
    Tasks,
    /// The detail view of one task.
    Task(TaskId),
    /// Per-workspace analytics counts.
    WorkspaceAnalytics,
    /// Per-project analytics counts.
    ProjectAnalytics,
}

impl std::fmt::Display for QueryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Tasks => write!(f, "tasks"),
            Self::Task(id) => write!(f, "task/{id}"),
            Self::WorkspaceAnalytics => write!(f, "workspace-analytics"),
            Self::ProjectAnalytics => write!(f, "project-analytics"),
        }
    }
}

/// Keys invalidated by a batch that updated `updated`.
///
/// Aggregates come first, then one detail key per distinct task.
#[must_use]
pub fn invalidated_keys(updated: &[Task]) -> Vec<QueryKey> {
    let mut keys = vec![
        QueryKey::Tasks,
        QueryKey::WorkspaceAnalytics,
        QueryKey::ProjectAnalytics,
    ];
    for task in updated {
        let key = QueryKey::Task(task.id.clone());
        if !keys.contains(&key) {
            keys.push(key);
        }
    }
    keys
}
