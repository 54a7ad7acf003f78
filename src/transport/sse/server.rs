use super::session::SessionManager;
use super::sse_stream::SseEventStream;
use super::{MESSAGE_PATH, SSE_PATH};
use crate::error::MCPError;
use crate::transport::{CloseCallback, ErrorCallback, MessageCallback, Transport};
use async_trait::async_trait;
use log::{debug, info, warn};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::convert::Infallible;
use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use url::Url;
use warp::http::StatusCode;
use warp::{Filter, Reply};

/// Largest JSON-RPC message accepted on the message endpoint
const MAX_MESSAGE_BYTES: u64 = 1024 * 1024;

/// A message posted by a client, tagged with the session it came from
type IncomingMessage = (String, String);

/// Where a response for a rewritten request ID has to go
#[derive(Debug, Clone)]
struct PendingRoute {
    session_id: String,
    original_id: Value,
}

/// Server-Sent Events (SSE) Server Transport
///
/// Requests from different sessions may reuse the same JSON-RPC ID, so each
/// incoming request ID is swapped for a transport-unique one on `receive`
/// and swapped back on `send`, which also tells `send` which session the
/// response belongs to. Messages with no known origin are broadcast.
pub struct SSEServerTransport {
    /// The address the server binds to
    url: Url,

    /// Connection status
    is_connected: bool,

    /// Close callback
    on_close: Option<CloseCallback>,

    /// Error callback
    on_error: Option<ErrorCallback>,

    /// Message callback
    on_message: Option<MessageCallback>,

    /// Server handle
    server_handle: Option<JoinHandle<()>>,

    /// Session manager
    session_manager: SessionManager,

    /// Shutdown channel
    server_shutdown_tx: Option<mpsc::Sender<()>>,

    /// Channel for receiving messages
    message_rx: Option<mpsc::Receiver<IncomingMessage>>,

    /// Sender for the message channel
    message_sender: mpsc::Sender<IncomingMessage>,

    /// Rewritten request IDs awaiting a response
    pending_routes: Arc<Mutex<HashMap<i64, PendingRoute>>>,

    /// Next transport-unique request ID
    next_id: Arc<AtomicI64>,

    /// Address the server actually bound to, once started
    bound_addr: Arc<std::sync::Mutex<Option<SocketAddr>>>,
}

impl SSEServerTransport {
    /// Create a new SSE transport in server mode
    pub fn new(url: &str) -> Result<Self, MCPError> {
        let url = Url::parse(url)
            .map_err(|e| MCPError::Transport(format!("Invalid server URL: {}", e)))?;

        let (message_sender, message_rx) = mpsc::channel::<IncomingMessage>(100);

        Ok(Self {
            url,
            is_connected: false,
            on_close: None,
            on_error: None,
            on_message: None,
            server_handle: None,
            session_manager: SessionManager::new(),
            server_shutdown_tx: None,
            message_rx: Some(message_rx),
            message_sender,
            pending_routes: Arc::new(Mutex::new(HashMap::new())),
            next_id: Arc::new(AtomicI64::new(1)),
            bound_addr: Arc::new(std::sync::Mutex::new(None)),
        })
    }

    /// Address the server is listening on, once started
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.bound_addr.lock().ok().and_then(|addr| *addr)
    }

    /// Session manager shared by every clone of this transport
    pub fn sessions(&self) -> &SessionManager {
        &self.session_manager
    }

    fn socket_addr(&self) -> Result<SocketAddr, MCPError> {
        let host = self.url.host_str().unwrap_or("127.0.0.1");
        let port = self.url.port_or_known_default().unwrap_or(8080);
        (host, port)
            .to_socket_addrs()
            .map_err(|e| MCPError::Transport(format!("Invalid address {}:{}: {}", host, port, e)))?
            .next()
            .ok_or_else(|| MCPError::Transport(format!("No address found for {}:{}", host, port)))
    }

    /// Start the SSE server
    async fn start_server(&mut self) -> Result<(), MCPError> {
        if self.is_connected {
            return Ok(());
        }

        let addr = self.socket_addr()?;

        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        let sse_route = warp::path(SSE_PATH)
            .and(warp::path::end())
            .and(warp::get())
            .and(with_data(self.session_manager.clone()))
            .and_then(handle_sse_connection);

        let messages_route = warp::path(MESSAGE_PATH)
            .and(warp::path::end())
            .and(warp::post())
            .and(warp::query::<SessionQuery>())
            .and(warp::body::content_length_limit(MAX_MESSAGE_BYTES))
            .and(warp::body::json())
            .and(with_data(self.session_manager.clone()))
            .and(with_data(self.message_sender.clone()))
            .and_then(handle_message);

        let routes = sse_route.or(messages_route).with(
            warp::cors()
                .allow_any_origin()
                .allow_methods(vec!["GET", "POST"])
                .allow_headers(vec!["content-type"]),
        );

        let (addr, server) = warp::serve(routes)
            .try_bind_with_graceful_shutdown(addr, async move {
                let _ = shutdown_rx.recv().await;
                debug!("SSE server shutting down");
            })
            .map_err(|e| MCPError::Transport(format!("Failed to bind {}: {}", addr, e)))?;

        if let Ok(mut bound) = self.bound_addr.lock() {
            *bound = Some(addr);
        }

        info!("SSE server listening on http://{}", addr);
        info!("  - GET  http://{}/{}     (event stream)", addr, SSE_PATH);
        info!("  - POST http://{}/{} (message endpoint)", addr, MESSAGE_PATH);

        self.server_handle = Some(tokio::spawn(server));
        self.server_shutdown_tx = Some(shutdown_tx);
        self.is_connected = true;

        Ok(())
    }

    /// Handle an error by calling the error callback if set
    fn handle_error(&self, error: &MCPError) {
        if let Some(callback) = &self.on_error {
            callback(error);
        }
    }

    /// Broadcast a message to all SSE clients
    pub async fn broadcast<T: Serialize + Send + Sync>(&self, message: &T) -> Result<(), MCPError> {
        let json = serde_json::to_string(message).map_err(|e| {
            let error = MCPError::Serialization(e.to_string());
            self.handle_error(&error);
            error
        })?;

        let delivered = self.session_manager.broadcast(&json).await;
        debug!("Broadcast message to {} session(s)", delivered);
        Ok(())
    }

    /// Send a response to a specific client session
    pub async fn send_to_session<T: Serialize + Send + Sync>(
        &self,
        session_id: &str,
        message: &T,
    ) -> Result<(), MCPError> {
        let json = serde_json::to_string(message).map_err(|e| {
            let error = MCPError::Serialization(e.to_string());
            self.handle_error(&error);
            error
        })?;

        self.session_manager
            .send_to_session(session_id, &json)
            .await
            .map_err(|e| {
                let error = MCPError::Transport(e);
                self.handle_error(&error);
                error
            })
    }

    /// Swap the ID of an incoming request for a transport-unique one
    async fn tag_request(&self, session_id: String, message: &mut Value) -> Option<i64> {
        if message.get("method").is_none() {
            return None;
        }
        let original_id = message.get("id").cloned()?;
        let internal_id = self.next_id.fetch_add(1, Ordering::Relaxed);

        self.pending_routes.lock().await.insert(
            internal_id,
            PendingRoute {
                session_id,
                original_id,
            },
        );
        message["id"] = json!(internal_id);
        Some(internal_id)
    }

    /// Find and restore the origin of an outgoing response
    async fn untag_response(&self, message: &mut Value) -> Option<String> {
        if message.get("method").is_some() {
            return None;
        }
        let internal_id = message.get("id").and_then(Value::as_i64)?;
        let route = self.pending_routes.lock().await.remove(&internal_id)?;

        message["id"] = route.original_id;
        Some(route.session_id)
    }
}

impl Clone for SSEServerTransport {
    fn clone(&self) -> Self {
        Self {
            url: self.url.clone(),
            is_connected: self.is_connected,
            on_close: None,      // Callbacks are not cloned
            on_error: None,      // Callbacks are not cloned
            on_message: None,    // Callbacks are not cloned
            server_handle: None, // The handle is not cloned
            session_manager: self.session_manager.clone(),
            server_shutdown_tx: self.server_shutdown_tx.clone(),
            message_rx: None, // The receiver is not cloned
            message_sender: self.message_sender.clone(),
            pending_routes: self.pending_routes.clone(),
            next_id: self.next_id.clone(),
            bound_addr: self.bound_addr.clone(),
        }
    }
}

#[async_trait]
impl Transport for SSEServerTransport {
    async fn start(&mut self) -> Result<(), MCPError> {
        self.start_server().await
    }

    async fn send<T: Serialize + Send + Sync>(&mut self, message: &T) -> Result<(), MCPError> {
        if !self.is_connected {
            let error = MCPError::Transport("Transport not connected".to_string());
            self.handle_error(&error);
            return Err(error);
        }

        let mut value = serde_json::to_value(message).map_err(|e| {
            let error = MCPError::Serialization(e.to_string());
            self.handle_error(&error);
            error
        })?;

        match self.untag_response(&mut value).await {
            Some(session_id) => self.send_to_session(&session_id, &value).await,
            None => self.broadcast(&value).await,
        }
    }

    async fn receive<T: DeserializeOwned + Send + Sync>(&mut self) -> Result<T, MCPError> {
        if !self.is_connected {
            let error = MCPError::Transport("Transport not connected".to_string());
            self.handle_error(&error);
            return Err(error);
        }

        let mut message_rx = match self.message_rx.take() {
            Some(rx) => rx,
            None => {
                let error = MCPError::Transport("Message receiver unavailable".to_string());
                self.handle_error(&error);
                return Err(error);
            }
        };

        let received = message_rx.recv().await;
        self.message_rx = Some(message_rx);
        let (session_id, raw) = received.ok_or(MCPError::ConnectionClosed)?;

        if let Some(callback) = &self.on_message {
            callback(&raw);
        }

        let mut value: Value = serde_json::from_str(&raw).map_err(|e| {
            let error = MCPError::Deserialization(e.to_string());
            self.handle_error(&error);
            error
        })?;

        let tagged = self.tag_request(session_id, &mut value).await;

        match serde_json::from_value(value) {
            Ok(message) => Ok(message),
            Err(e) => {
                if let Some(internal_id) = tagged {
                    self.pending_routes.lock().await.remove(&internal_id);
                }
                let error = MCPError::Deserialization(e.to_string());
                self.handle_error(&error);
                Err(error)
            }
        }
    }

    async fn close(&mut self) -> Result<(), MCPError> {
        if !self.is_connected {
            return Ok(());
        }

        if let Some(tx) = self.server_shutdown_tx.take() {
            let _ = tx.send(()).await;
        }

        if let Some(handle) = self.server_handle.take() {
            let _ = handle.await;
        }

        self.is_connected = false;

        if let Some(callback) = &self.on_close {
            callback();
        }

        Ok(())
    }

    fn supports_shutdown(&self) -> bool {
        false
    }

    fn set_on_close(&mut self, callback: Option<CloseCallback>) {
        self.on_close = callback;
    }

    fn set_on_error(&mut self, callback: Option<ErrorCallback>) {
        self.on_error = callback;
    }

    fn set_on_message<F>(&mut self, callback: Option<F>)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.on_message = callback.map(|f| Box::new(f) as MessageCallback);
    }
}

/// Session query struct for the message endpoint
#[derive(Debug, serde::Deserialize)]
struct SessionQuery {
    #[serde(rename = "sessionId")]
    session_id: Option<String>,
}

/// Open a new event stream
async fn handle_sse_connection(session_manager: SessionManager) -> Result<impl Reply, Infallible> {
    let (session_id, rx) = session_manager.create_session().await;
    let endpoint = format!("/{}?sessionId={}", MESSAGE_PATH, session_id);
    info!("SSE client connected with session {}", session_id);

    let stream = SseEventStream::new(session_manager, session_id, endpoint, rx);
    let response = warp::reply::Response::new(warp::hyper::Body::wrap_stream(stream));

    Ok(warp::reply::with_header(
        warp::reply::with_header(response, "content-type", "text/event-stream"),
        "cache-control",
        "no-cache",
    ))
}

/// Handle incoming messages from clients
async fn handle_message(
    query: SessionQuery,
    message: Value,
    session_manager: SessionManager,
    message_tx: mpsc::Sender<IncomingMessage>,
) -> Result<warp::reply::Response, Infallible> {
    let session_id = match query.session_id {
        Some(id) => id,
        None => {
            return Ok(status_reply(
                StatusCode::BAD_REQUEST,
                "Missing sessionId query parameter",
            ))
        }
    };

    if !session_manager.session_exists(&session_id).await {
        warn!("Message for unknown session {}", session_id);
        return Ok(status_reply(StatusCode::NOT_FOUND, "Session not found"));
    }

    if message_tx
        .send((session_id, message.to_string()))
        .await
        .is_err()
    {
        return Ok(status_reply(
            StatusCode::SERVICE_UNAVAILABLE,
            "Server is not accepting messages",
        ));
    }

    Ok(warp::reply::with_status(
        warp::reply::json(&json!({ "status": "accepted" })),
        StatusCode::ACCEPTED,
    )
    .into_response())
}

fn status_reply(status: StatusCode, message: &str) -> warp::reply::Response {
    warp::reply::with_status(warp::reply::json(&json!({ "error": message })), status)
        .into_response()
}

/// Helper filter to extract data
fn with_data<T: Clone + Send>(data: T) -> impl Filter<Extract = (T,), Error = Infallible> + Clone {
    warp::any().map(move || data.clone())
}
