//! WebSocket endpoint: session handshake and request dispatch.
//!
//! Each connection opens with a `Hello`, after which every binary frame is
//! one request answered by exactly one reply carrying the same
//! `request_id`. Requests on one connection are served in arrival order.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use taskboard_proto::codec;
use taskboard_proto::protocol::{
    ClientMessage, RemoteError, RemoteErrorKind, ServerMessage, UNCORRELATED_REQUEST_ID,
};
use taskboard_proto::task::UserId;

use crate::seed::{Seed, SeedError};
use crate::service::BoardService;
use crate::store::{InMemoryDirectory, InMemoryTaskStore, TaskRepository};

/// Service type backing the server.
pub type InMemoryBoardService = BoardService<InMemoryTaskStore, InMemoryDirectory>;

/// Shared server state.
pub struct ServerState {
    /// Task operations.
    pub service: InMemoryBoardService,
}

impl Default for ServerState {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerState {
    /// Creates a state with no tasks and no members.
    #[must_use]
    pub fn new() -> Self {
        Self {
            service: BoardService::new(InMemoryTaskStore::new(), InMemoryDirectory::new()),
        }
    }

    /// Creates a state populated from a seed file.
    ///
    /// # Errors
    ///
    /// Returns [`SeedError`] if a task entry is invalid or duplicated.
    pub async fn from_seed(seed: Seed) -> Result<Self, SeedError> {
        let state = Self::new();
        for member in &seed.members {
            state
                .service
                .directory()
                .add_member(member.to_member())
                .await;
        }
        for entry in &seed.tasks {
            let (task, positioned) = entry.to_task()?;
            let repo = state.service.repo();
            let stored = if positioned {
                repo.insert(task).await
            } else {
                repo.append(task).await
            };
            stored.map_err(|e| SeedError::Rejected {
                name: entry.name.clone(),
                reason: e.to_string(),
            })?;
        }
        tracing::info!(
            members = seed.members.len(),
            tasks = seed.tasks.len(),
            "seed data loaded"
        );
        Ok(state)
    }
}

/// Handles an upgraded WebSocket connection for one client.
///
/// The connection lifecycle:
/// 1. Wait for `Hello` and answer `Welcome`.
/// 2. Answer each request frame in order.
/// 3. Stop on close or on a failed write.
pub async fn handle_socket(socket: WebSocket, state: Arc<ServerState>) {
    let (mut ws_sender, mut ws_receiver) = socket.split();

    let Some(user_id) = wait_for_hello(&mut ws_receiver).await else {
        tracing::warn!("connection closed before hello");
        return;
    };

    let welcome = ServerMessage::Welcome {
        user_id: user_id.clone(),
    };
    if let Err(e) = send_server_msg(&mut ws_sender, &welcome).await {
        tracing::error!(user_id = %user_id, error = %e, "failed to send welcome");
        return;
    }
    tracing::info!(user_id = %user_id, "session opened");

    while let Some(Ok(msg)) = ws_receiver.next().await {
        match msg {
            Message::Binary(data) => {
                let reply = handle_frame(&user_id, &data, &state).await;
                if let Err(e) = send_server_msg(&mut ws_sender, &reply).await {
                    tracing::warn!(user_id = %user_id, error = %e, "reply write failed");
                    break;
                }
            }
            Message::Close(_) => {
                tracing::info!(user_id = %user_id, "received close frame");
                break;
            }
            _ => {}
        }
    }

    tracing::info!(user_id = %user_id, "session closed");
}

/// Waits for the `Hello` frame and returns the identity it presents.
///
/// Returns `None` if the connection closes or the first binary frame is
/// anything else.
async fn wait_for_hello(
    receiver: &mut (impl StreamExt<Item = Result<Message, axum::Error>> + Unpin),
) -> Option<UserId> {
    while let Some(Ok(msg)) = receiver.next().await {
        match msg {
            Message::Binary(data) => match codec::decode::<ClientMessage>(&data) {
                Ok(ClientMessage::Hello { user_id }) => {
                    if user_id.as_str().is_empty() {
                        tracing::warn!("received Hello with empty user_id");
                        return None;
                    }
                    return Some(user_id);
                }
                Ok(other) => {
                    tracing::warn!(msg = ?other, "expected Hello, got different message");
                    return None;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "failed to decode hello");
                    return None;
                }
            },
            Message::Close(_) => return None,
            _ => {}
        }
    }
    None
}

/// Decodes one request frame and produces its reply.
async fn handle_frame(user_id: &UserId, data: &[u8], state: &ServerState) -> ServerMessage {
    let msg = match codec::decode::<ClientMessage>(data) {
        Ok(m) => m,
        Err(e) => {
            tracing::warn!(user_id = %user_id, error = %e, "failed to decode request");
            return protocol_failure(format!("malformed request: {e}"));
        }
    };

    let service = &state.service;
    match msg {
        ClientMessage::Hello { .. } => protocol_failure("session already open"),
        ClientMessage::ListTasks { request_id, filter } => {
            match service.list_tasks(user_id, &filter).await {
                Ok(tasks) => ServerMessage::Tasks { request_id, tasks },
                Err(e) => failure(request_id, RemoteError::from(&e)),
            }
        }
        ClientMessage::BulkUpdate {
            request_id,
            updates,
        } => match service.bulk_update(user_id, &updates).await {
            Ok(tasks) => ServerMessage::Updated { request_id, tasks },
            Err(e) => {
                tracing::warn!(
                    user_id = %user_id,
                    request_id,
                    count = updates.len(),
                    error = %e,
                    "bulk update rejected"
                );
                failure(request_id, RemoteError::from(&e))
            }
        },
        ClientMessage::CreateTask { request_id, task } => {
            match service.create_task(user_id, task).await {
                Ok(task) => ServerMessage::Created { request_id, task },
                Err(e) => failure(request_id, RemoteError::from(&e)),
            }
        }
    }
}

const fn failure(request_id: u64, error: RemoteError) -> ServerMessage {
    ServerMessage::Failed { request_id, error }
}

fn protocol_failure(reason: impl Into<String>) -> ServerMessage {
    failure(
        UNCORRELATED_REQUEST_ID,
        RemoteError::new(RemoteErrorKind::Protocol, reason),
    )
}

/// Encodes and sends a server message on a WebSocket sender.
async fn send_server_msg(
    ws_sender: &mut (impl SinkExt<Message, Error = axum::Error> + Unpin),
    msg: &ServerMessage,
) -> Result<(), String> {
    let bytes = codec::encode(msg).map_err(|e| e.to_string())?;
    ws_sender
        .send(Message::Binary(bytes.into()))
        .await
        .map_err(|e| format!("WebSocket send error: {e}"))
}

/// Starts an empty server on the given address and returns the bound
/// address and a join handle.
///
/// # Errors
///
/// Returns an error if the TCP listener cannot bind to the given address.
pub async fn start_server(
    addr: &str,
) -> Result<
    (std::net::SocketAddr, tokio::task::JoinHandle<()>),
    Box<dyn std::error::Error + Send + Sync>,
> {
    start_server_with_state(addr, Arc::new(ServerState::new())).await
}

/// Starts the server with a pre-populated [`ServerState`].
///
/// # Errors
///
/// Returns an error if the TCP listener cannot bind to the given address.
pub async fn start_server_with_state(
    addr: &str,
    state: Arc<ServerState>,
) -> Result<
    (std::net::SocketAddr, tokio::task::JoinHandle<()>),
    Box<dyn std::error::Error + Send + Sync>,
> {
    let app = axum::Router::new()
        .route("/ws", axum::routing::get(ws_handler))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let bound_addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(error = %e, "board server error");
        }
    });

    Ok((bound_addr, handle))
}

/// axum handler that upgrades an HTTP request to a WebSocket connection.
async fn ws_handler(
    ws: axum::extract::ws::WebSocketUpgrade,
    axum::extract::State(state): axum::extract::State<Arc<ServerState>>,
) -> impl axum::response::IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}
