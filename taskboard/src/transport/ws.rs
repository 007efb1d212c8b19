//! WebSocket transport to the task server.
//!
//! Requests are postcard-encoded [`ClientMessage`] frames. A background
//! reader task decodes [`ServerMessage`] replies and hands each one to the
//! caller waiting on its `request_id`.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::{Mutex, oneshot};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use taskboard_proto::codec;
use taskboard_proto::filter::TaskFilter;
use taskboard_proto::protocol::{ClientMessage, ServerMessage, UNCORRELATED_REQUEST_ID};
use taskboard_proto::task::{NewTask, Task, TaskUpdate, UserId};

use super::{BoardTransport, TransportError};

/// Type alias for the write half of a WebSocket connection.
type WsSender = futures_util::stream::SplitSink<
    WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>,
    Message,
>;

/// Type alias for the read half of a WebSocket connection.
type WsReader =
    futures_util::stream::SplitStream<WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>>;

/// Requests awaiting a reply, keyed by `request_id`.
type PendingReplies = Arc<parking_lot::Mutex<HashMap<u64, oneshot::Sender<ServerMessage>>>>;

/// Default timeout for connecting to the server.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Timeout for waiting for a `Welcome` after `Hello`.
const HELLO_TIMEOUT: Duration = Duration::from_secs(5);

/// Default time a request may wait for its reply.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// WebSocket connection to a task server, acting as one user.
///
/// Created via [`WsTransport::connect`], which opens the socket, performs
/// the `Hello`/`Welcome` exchange, and spawns the reader task.
pub struct WsTransport {
    /// Identity this connection acts as.
    user_id: UserId,
    /// Server URL (ws:// or wss://).
    server_url: String,
    /// Write half of the WebSocket connection (shared for concurrent requests).
    ws_sender: Arc<Mutex<WsSender>>,
    /// Callers waiting for replies.
    pending: PendingReplies,
    /// Next correlation id, starting above [`UNCORRELATED_REQUEST_ID`].
    next_request_id: AtomicU64,
    /// Whether the connection is still open.
    connected: Arc<AtomicBool>,
    /// How long a request waits for its reply.
    request_timeout: Duration,
    /// Handle to the background reader task.
    _reader_handle: tokio::task::JoinHandle<()>,
}

impl WsTransport {
    /// Connects to `server_url` and opens a session for `user_id`.
    ///
    /// # Errors
    ///
    /// - [`TransportError::Timeout`] if connecting or the hello exchange times out.
    /// - [`TransportError::Unreachable`] if the server refuses the connection.
    /// - [`TransportError::ConnectionClosed`] if the server hangs up during the hello.
    /// - [`TransportError::UnexpectedReply`] if the server answers with anything but `Welcome`.
    pub async fn connect(server_url: &str, user_id: UserId) -> Result<Self, TransportError> {
        Self::connect_with_timeout(server_url, user_id, DEFAULT_REQUEST_TIMEOUT).await
    }

    /// Like [`connect`](Self::connect) with a custom per-request timeout.
    ///
    /// # Errors
    ///
    /// See [`connect`](Self::connect).
    pub async fn connect_with_timeout(
        server_url: &str,
        user_id: UserId,
        request_timeout: Duration,
    ) -> Result<Self, TransportError> {
        let (ws_stream, _response) =
            tokio::time::timeout(CONNECT_TIMEOUT, connect_async(server_url))
                .await
                .map_err(|_| {
                    tracing::warn!(url = server_url, "server WebSocket connect timed out");
                    TransportError::Timeout
                })?
                .map_err(|e| {
                    tracing::warn!(url = server_url, err = %e, "server WebSocket connect failed");
                    map_ws_connect_error(server_url, e)
                })?;

        let (mut ws_sender, mut ws_reader) = ws_stream.split();

        let hello = codec::encode(&ClientMessage::Hello {
            user_id: user_id.clone(),
        })?;
        ws_sender
            .send(Message::Binary(hello.into()))
            .await
            .map_err(|e| {
                tracing::warn!(err = %e, "failed to send Hello");
                TransportError::ConnectionClosed
            })?;

        let reply = tokio::time::timeout(HELLO_TIMEOUT, ws_reader.next())
            .await
            .map_err(|_| {
                tracing::warn!(url = server_url, "server hello acknowledgment timed out");
                TransportError::Timeout
            })?;

        match reply {
            Some(Ok(Message::Binary(data))) => match codec::decode::<ServerMessage>(&data)? {
                ServerMessage::Welcome { user_id: echoed } => {
                    tracing::info!(user_id = %echoed, url = server_url, "session opened");
                }
                ServerMessage::Failed { error, .. } => {
                    tracing::warn!(reason = %error.reason, "server rejected session");
                    return Err(TransportError::Remote(error));
                }
                other => {
                    return Err(TransportError::UnexpectedReply(format!(
                        "expected Welcome, got {other:?}"
                    )));
                }
            },
            Some(Ok(Message::Close(_))) | None => {
                tracing::warn!("server closed connection during hello");
                return Err(TransportError::ConnectionClosed);
            }
            Some(Ok(_)) => {
                return Err(TransportError::UnexpectedReply(
                    "non-binary frame during hello".to_string(),
                ));
            }
            Some(Err(e)) => {
                tracing::warn!(err = %e, "WebSocket error during hello");
                return Err(TransportError::Io(std::io::Error::other(e.to_string())));
            }
        }

        let pending: PendingReplies = Arc::default();
        let connected = Arc::new(AtomicBool::new(true));
        let reader_handle = tokio::spawn(reader_loop(
            ws_reader,
            Arc::clone(&pending),
            Arc::clone(&connected),
        ));

        Ok(Self {
            user_id,
            server_url: server_url.to_string(),
            ws_sender: Arc::new(Mutex::new(ws_sender)),
            pending,
            next_request_id: AtomicU64::new(1),
            connected,
            request_timeout,
            _reader_handle: reader_handle,
        })
    }

    /// Return the server URL this transport is connected to.
    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    /// Return the identity this transport acts as.
    pub const fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// Returns `true` while the connection is open.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    /// Sends one request and waits for the reply carrying the same id.
    ///
    /// A `Failed` reply is turned into [`TransportError::Remote`].
    async fn request(
        &self,
        build: impl FnOnce(u64) -> ClientMessage + Send,
    ) -> Result<ServerMessage, TransportError> {
        if !self.is_connected() {
            return Err(TransportError::ConnectionClosed);
        }

        let request_id = self.next_request_id.fetch_add(1, Ordering::Relaxed);
        let bytes = codec::encode(&build(request_id))?;
        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(request_id, tx);

        let sent = {
            let mut sender = self.ws_sender.lock().await;
            sender.send(Message::Binary(bytes.into())).await
        };
        if let Err(e) = sent {
            tracing::warn!(err = %e, request_id, "request send failed");
            self.pending.lock().remove(&request_id);
            self.connected.store(false, Ordering::Relaxed);
            return Err(TransportError::ConnectionClosed);
        }

        let reply = match tokio::time::timeout(self.request_timeout, rx).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(_)) => return Err(TransportError::ConnectionClosed),
            Err(_) => {
                self.pending.lock().remove(&request_id);
                tracing::warn!(request_id, "request timed out");
                return Err(TransportError::Timeout);
            }
        };

        match reply {
            ServerMessage::Failed { error, .. } => Err(TransportError::Remote(error)),
            other => Ok(other),
        }
    }
}

impl BoardTransport for WsTransport {
    async fn list_tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>, TransportError> {
        let filter = filter.clone();
        match self
            .request(|request_id| ClientMessage::ListTasks { request_id, filter })
            .await?
        {
            ServerMessage::Tasks { tasks, .. } => Ok(tasks),
            other => Err(TransportError::UnexpectedReply(format!("{other:?}"))),
        }
    }

    async fn bulk_update(&self, updates: &[TaskUpdate]) -> Result<Vec<Task>, TransportError> {
        let updates = updates.to_vec();
        match self
            .request(|request_id| ClientMessage::BulkUpdate {
                request_id,
                updates,
            })
            .await?
        {
            ServerMessage::Updated { tasks, .. } => Ok(tasks),
            other => Err(TransportError::UnexpectedReply(format!("{other:?}"))),
        }
    }

    async fn create_task(&self, task: &NewTask) -> Result<Task, TransportError> {
        let task = task.clone();
        match self
            .request(|request_id| ClientMessage::CreateTask { request_id, task })
            .await?
        {
            ServerMessage::Created { task, .. } => Ok(task),
            other => Err(TransportError::UnexpectedReply(format!("{other:?}"))),
        }
    }
}

/// Background task that reads replies and routes them to waiting callers.
///
/// Malformed frames are logged and skipped. When the socket closes every
/// pending caller is released with [`TransportError::ConnectionClosed`].
async fn reader_loop(mut ws_reader: WsReader, pending: PendingReplies, connected: Arc<AtomicBool>) {
    while let Some(msg_result) = ws_reader.next().await {
        match msg_result {
            Ok(Message::Binary(data)) => match codec::decode::<ServerMessage>(&data) {
                Ok(reply) => route_reply(reply, &pending),
                Err(e) => tracing::warn!(err = %e, "malformed server frame, skipping"),
            },
            Ok(Message::Close(_)) => {
                tracing::info!("server closed the connection");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(err = %e, "server WebSocket read error");
                break;
            }
        }
    }
    connected.store(false, Ordering::Relaxed);
    pending.lock().clear();
    tracing::info!("server reader task exiting");
}

/// Hands `reply` to the caller waiting on its `request_id`.
///
/// An uncorrelated failure cannot be pinned on one request, so every caller
/// still waiting receives it rather than running into its timeout.
fn route_reply(reply: ServerMessage, pending: &PendingReplies) {
    match reply.request_id() {
        Some(UNCORRELATED_REQUEST_ID) => {
            let waiters: Vec<_> = pending.lock().drain().collect();
            tracing::warn!(?reply, waiting = waiters.len(), "uncorrelated server failure");
            for (_, tx) in waiters {
                let _ = tx.send(reply.clone());
            }
        }
        Some(request_id) => {
            let waiter = pending.lock().remove(&request_id);
            match waiter {
                Some(tx) => {
                    let _ = tx.send(reply);
                }
                None => {
                    tracing::debug!(request_id, "reply for unknown or expired request");
                }
            }
        }
        None => tracing::debug!(?reply, "unsolicited server message"),
    }
}

/// Map a `tokio_tungstenite` connection error to a [`TransportError`].
fn map_ws_connect_error(
    server_url: &str,
    err: tokio_tungstenite::tungstenite::Error,
) -> TransportError {
    use tokio_tungstenite::tungstenite::Error as WsError;
    match err {
        WsError::Io(io_err) => {
            if io_err.kind() == std::io::ErrorKind::ConnectionRefused
                || io_err.kind() == std::io::ErrorKind::AddrNotAvailable
            {
                TransportError::Unreachable(server_url.to_string())
            } else {
                TransportError::Io(io_err)
            }
        }
        WsError::Http(response) => TransportError::Io(std::io::Error::other(format!(
            "server HTTP error: status {}",
            response.status()
        ))),
        other => TransportError::Io(std::io::Error::other(format!(
            "server connection error: {other}"
        ))),
    }
}
