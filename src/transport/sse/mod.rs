//! Server-Sent Events transport
//!
//! Clients open `GET /sse` and receive an `endpoint` event naming the URL
//! they must `POST` their JSON-RPC messages to. Responses come back as
//! `message` events on the stream that sent the request.

mod server;
mod session;
mod sse_stream;

pub use server::SSEServerTransport;
pub use session::SessionManager;

/// Path of the event stream endpoint
pub const SSE_PATH: &str = "sse";

/// Path of the message endpoint
pub const MESSAGE_PATH: &str = "message";
