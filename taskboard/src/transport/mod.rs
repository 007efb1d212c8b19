//! Transport layer between the board client and the task server.
//!
//! Defines the [`BoardTransport`] trait the sync client talks through.
//! [`ws::WsTransport`] is the production implementation; tests substitute
//! their own.

pub mod ws;

use std::future::Future;

use taskboard_proto::codec::CodecError;
use taskboard_proto::filter::TaskFilter;
use taskboard_proto::protocol::RemoteError;
use taskboard_proto::task::{NewTask, Task, TaskUpdate};

/// Errors that can occur during transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The connection to the server has been closed.
    #[error("connection closed")]
    ConnectionClosed,

    /// The operation timed out before completing.
    #[error("transport operation timed out")]
    Timeout,

    /// The server could not be reached.
    #[error("server {0} is unreachable")]
    Unreachable(String),

    /// An underlying I/O error occurred.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A frame could not be encoded or decoded.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// The server answered a request with an unexpected message.
    #[error("unexpected reply: {0}")]
    UnexpectedReply(String),

    /// The server processed the request and reported a failure.
    #[error("server rejected request: {0}")]
    Remote(#[from] RemoteError),
}

/// Request/response access to the task server.
///
/// Every call is a single request; implementations never retry.
pub trait BoardTransport: Send + Sync {
    /// Fetches the tasks matching `filter`.
    fn list_tasks(
        &self,
        filter: &TaskFilter,
    ) -> impl Future<Output = Result<Vec<Task>, TransportError>> + Send;

    /// Persists a batch of placements as one request.
    ///
    /// Returns the updated records in batch order.
    fn bulk_update(
        &self,
        updates: &[TaskUpdate],
    ) -> impl Future<Output = Result<Vec<Task>, TransportError>> + Send;

    /// Creates a task at the end of its column.
    fn create_task(
        &self,
        task: &NewTask,
    ) -> impl Future<Output = Result<Task, TransportError>> + Send;
}
