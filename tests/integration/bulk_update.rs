//! Integration tests for board moves persisted through the server.
//!
//! Each test starts an in-process server on an OS-assigned port, connects
//! real WebSocket clients, and checks the server's store directly to tell
//! clean rejections from writes.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;

use taskboard::board::{ColumnSlot, MoveIntent};
use taskboard::sync::{BoardSession, QueryKey, SyncError};
use taskboard::transport::ws::WsTransport;
use taskboard::transport::{BoardTransport, TransportError};
use taskboard_proto::filter::TaskFilter;
use taskboard_proto::protocol::RemoteErrorKind;
use taskboard_proto::task::{NewTask, Task, TaskId, TaskStatus, TaskUpdate, UserId, WorkspaceId};
use taskboard_server::seed::Seed;
use taskboard_server::server::{self, ServerState};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const SEED: &str = r#"
[[members]]
workspace_id = "w1"
user_id = "alice"
role = "admin"

[[members]]
workspace_id = "w2"
user_id = "alice"

[[members]]
workspace_id = "w1"
user_id = "bob"

[[tasks]]
id = "A"
workspace_id = "w1"
project_id = "p1"
name = "Alpha"
status = "todo"
position = 1000

[[tasks]]
id = "B"
workspace_id = "w1"
project_id = "p1"
name = "Bravo"
status = "todo"
position = 2000

[[tasks]]
id = "C"
workspace_id = "w1"
project_id = "p1"
name = "Charlie"
status = "todo"
position = 3000

[[tasks]]
id = "T"
workspace_id = "w1"
project_id = "p1"
name = "Tango"
status = "backlog"
position = 1000

[[tasks]]
id = "X"
workspace_id = "w2"
project_id = "p9"
name = "X-ray"
status = "todo"
position = 1000
"#;

/// Starts a seeded server and returns its state and WebSocket URL.
async fn start_server() -> (Arc<ServerState>, String) {
    let seed: Seed = toml::from_str(SEED).unwrap();
    let state = Arc::new(ServerState::from_seed(seed).await.unwrap());
    let (addr, _handle) = server::start_server_with_state("127.0.0.1:0", Arc::clone(&state))
        .await
        .unwrap();
    (state, format!("ws://{addr}/ws"))
}

async fn connect(url: &str, user: &str) -> WsTransport {
    WsTransport::connect(url, UserId::new(user)).await.unwrap()
}

/// Opens a session on workspace `w1` and loads the board.
async fn open_session(url: &str, user: &str) -> BoardSession<WsTransport> {
    let session = BoardSession::new(
        connect(url, user).await,
        TaskFilter::workspace(WorkspaceId::new("w1")),
    );
    session.refresh().await.unwrap();
    session
}

async fn stored(state: &ServerState, id: &str) -> Task {
    state.service.repo().get(&TaskId::new(id)).await.unwrap()
}

fn column_ids(session: &BoardSession<WsTransport>, status: TaskStatus) -> Vec<String> {
    session
        .board()
        .column(status)
        .iter()
        .map(|t| t.id.to_string())
        .collect()
}

fn update(id: &str, status: TaskStatus, position: u32) -> TaskUpdate {
    TaskUpdate::new(TaskId::new(id), status, position)
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[tokio::test]
async fn reorder_within_column_is_persisted() {
    let (state, url) = start_server().await;
    let session = open_session(&url, "alice").await;

    let intent = MoveIntent::new(
        ColumnSlot::new(TaskStatus::Todo, 0),
        ColumnSlot::new(TaskStatus::Todo, 2),
    );
    let report = session.drag(&intent).await.unwrap().unwrap();

    let updated: Vec<(String, u32)> = report
        .updated
        .iter()
        .map(|t| (t.id.to_string(), t.position))
        .collect();
    assert_eq!(
        updated,
        vec![
            ("A".to_string(), 3000),
            ("B".to_string(), 1000),
            ("C".to_string(), 2000),
        ]
    );
    assert_eq!(column_ids(&session, TaskStatus::Todo), ["B", "C", "A"]);
    assert_eq!(stored(&state, "A").await.position, 3000);
    assert_eq!(stored(&state, "B").await.position, 1000);
}

#[tokio::test]
async fn move_into_empty_column_touches_only_that_task() {
    let (state, url) = start_server().await;
    let session = open_session(&url, "alice").await;

    let intent = MoveIntent::new(
        ColumnSlot::new(TaskStatus::Backlog, 0),
        ColumnSlot::new(TaskStatus::Done, 0),
    );
    let batch = session.on_drag_end(&intent).unwrap();
    assert_eq!(batch, vec![update("T", TaskStatus::Done, 1000)]);

    let report = session.sync(batch).await.unwrap();
    assert_eq!(report.updated.len(), 1);
    assert!(session.board().column(TaskStatus::Backlog).is_empty());
    assert_eq!(column_ids(&session, TaskStatus::Done), ["T"]);

    let t = stored(&state, "T").await;
    assert_eq!((t.status, t.position), (TaskStatus::Done, 1000));
    assert_eq!(stored(&state, "A").await.position, 1000);
}

#[tokio::test]
async fn drop_outside_sends_nothing() {
    let (state, url) = start_server().await;
    let session = open_session(&url, "alice").await;
    let before = session.board();

    let intent = MoveIntent::dropped_outside(ColumnSlot::new(TaskStatus::Todo, 1));
    assert!(session.drag(&intent).await.unwrap().is_none());
    assert_eq!(session.board(), before);
    assert_eq!(stored(&state, "B").await.position, 2000);
}

#[tokio::test]
async fn mixed_workspace_batch_is_rejected_without_writes() {
    let (state, url) = start_server().await;
    let session = open_session(&url, "alice").await;

    let err = session
        .sync(vec![
            update("A", TaskStatus::Done, 1000),
            update("X", TaskStatus::Done, 2000),
        ])
        .await
        .unwrap_err();

    let SyncError::Validation(ref reason) = err else {
        panic!("expected validation error, got {err:?}");
    };
    assert_eq!(reason, "All tasks must belong to the same workspace");
    assert!(session.needs_refetch());
    assert_eq!(stored(&state, "A").await.status, TaskStatus::Todo);
    assert_eq!(stored(&state, "X").await.status, TaskStatus::Todo);
}

#[tokio::test]
async fn non_member_is_rejected_without_writes() {
    let (state, url) = start_server().await;
    let transport = connect(&url, "mallory").await;

    let err = transport
        .bulk_update(&[update("A", TaskStatus::Done, 1000)])
        .await
        .unwrap_err();
    let TransportError::Remote(ref remote) = err else {
        panic!("expected remote error, got {err:?}");
    };
    assert_eq!(remote.kind, RemoteErrorKind::Unauthorized);
    assert_eq!(stored(&state, "A").await.status, TaskStatus::Todo);
}

#[tokio::test]
async fn out_of_range_position_is_rejected_wholesale() {
    let (state, url) = start_server().await;
    let transport = connect(&url, "alice").await;

    let err = transport
        .bulk_update(&[
            update("A", TaskStatus::Done, 1000),
            update("B", TaskStatus::Done, 1_000_001),
        ])
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        TransportError::Remote(ref r) if r.kind == RemoteErrorKind::Validation
    ));
    assert_eq!(stored(&state, "A").await.status, TaskStatus::Todo);
}

// ---------------------------------------------------------------------------
// Reconciliation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn success_reports_invalidated_keys_and_refetches() {
    let (_state, url) = start_server().await;
    let alice = open_session(&url, "alice").await;
    let bob = open_session(&url, "bob").await;

    // Bob moves C to the top; Alice's board has not seen it yet.
    bob.drag(&MoveIntent::new(
        ColumnSlot::new(TaskStatus::Todo, 2),
        ColumnSlot::new(TaskStatus::Todo, 0),
    ))
    .await
    .unwrap()
    .unwrap();
    assert_eq!(column_ids(&alice, TaskStatus::Todo), ["A", "B", "C"]);

    // Alice's unrelated move pulls in the server's order on success.
    let report = alice
        .drag(&MoveIntent::new(
            ColumnSlot::new(TaskStatus::Backlog, 0),
            ColumnSlot::new(TaskStatus::InProgress, 0),
        ))
        .await
        .unwrap()
        .unwrap();

    assert!(report.refreshed);
    assert!(report.invalidated.contains(&QueryKey::Tasks));
    assert!(report.invalidated.contains(&QueryKey::WorkspaceAnalytics));
    assert!(report.invalidated.contains(&QueryKey::ProjectAnalytics));
    assert!(report.invalidated.contains(&QueryKey::Task(TaskId::new("T"))));
    assert_eq!(column_ids(&alice, TaskStatus::Todo), ["C", "A", "B"]);
    assert!(!alice.needs_refetch());
}

#[tokio::test]
async fn failed_batch_marks_stale_and_next_drag_refetches() {
    let (state, url) = start_server().await;
    let alice = open_session(&url, "alice").await;

    let err = alice
        .sync(vec![update("A", TaskStatus::Done, 1000), update("X", TaskStatus::Done, 1000)])
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::Validation(_)));
    assert!(alice.needs_refetch());

    // Meanwhile the server order changes underneath.
    let bob = open_session(&url, "bob").await;
    bob.drag(&MoveIntent::new(
        ColumnSlot::new(TaskStatus::Todo, 0),
        ColumnSlot::new(TaskStatus::Done, 0),
    ))
    .await
    .unwrap()
    .unwrap();

    // Alice's next drag works against the refetched board: index 0 is now B.
    alice
        .drag(&MoveIntent::new(
            ColumnSlot::new(TaskStatus::Todo, 0),
            ColumnSlot::new(TaskStatus::InReview, 0),
        ))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(stored(&state, "B").await.status, TaskStatus::InReview);
    assert_eq!(stored(&state, "A").await.status, TaskStatus::Done);
    assert!(!alice.needs_refetch());
}

#[tokio::test]
async fn created_task_lands_at_end_of_column() {
    let (state, url) = start_server().await;
    let session = open_session(&url, "bob").await;

    let task = session
        .create_task(&NewTask {
            workspace_id: WorkspaceId::new("w1"),
            project_id: "p1".to_string(),
            name: "Delta".to_string(),
            status: TaskStatus::Todo,
            assignee_id: None,
            due_date: None,
            description: None,
        })
        .await
        .unwrap();

    assert_eq!(task.position, 4000);
    assert_eq!(stored(&state, task.id.as_str()).await.name, "Delta");
    assert_eq!(
        column_ids(&session, TaskStatus::Todo).last().map(String::as_str),
        Some(task.id.as_str())
    );
}

#[tokio::test]
async fn second_drag_builds_on_unconfirmed_batch() {
    let (state, url) = start_server().await;
    let session = open_session(&url, "alice").await;

    let first = session
        .on_drag_end(&MoveIntent::new(
            ColumnSlot::new(TaskStatus::Todo, 0),
            ColumnSlot::new(TaskStatus::Todo, 2),
        ))
        .unwrap();
    // Computed against [B, C, A] before the first batch is confirmed.
    let second = session
        .on_drag_end(&MoveIntent::new(
            ColumnSlot::new(TaskStatus::Todo, 0),
            ColumnSlot::new(TaskStatus::Done, 0),
        ))
        .unwrap();
    assert_eq!(second[0], update("B", TaskStatus::Done, 1000));

    let (r1, r2) = tokio::join!(session.sync(first), session.sync(second));
    r1.unwrap();
    r2.unwrap();

    session.refresh().await.unwrap();
    for task in session.board().tasks() {
        let server_copy = stored(&state, task.id.as_str()).await;
        assert_eq!((task.status, task.position), (server_copy.status, server_copy.position));
    }
}
