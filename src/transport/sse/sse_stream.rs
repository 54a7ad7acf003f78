use super::SessionManager;
use bytes::Bytes;
use futures::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;

/// A Stream that produces SSE frames for one session
///
/// The first frame announces the message endpoint; every later frame wraps
/// one outgoing JSON-RPC message. Dropping the stream (client disconnect)
/// unregisters the session.
pub struct SseEventStream {
    session_manager: SessionManager,
    session_id: String,
    endpoint: String,
    rx: mpsc::Receiver<String>,
    init_sent: bool,
}

impl SseEventStream {
    pub(crate) fn new(
        session_manager: SessionManager,
        session_id: String,
        endpoint: String,
        rx: mpsc::Receiver<String>,
    ) -> Self {
        Self {
            session_manager,
            session_id,
            endpoint,
            rx,
            init_sent: false,
        }
    }
}

/// Format one SSE frame
pub(crate) fn sse_frame(event: &str, data: &str) -> String {
    format!("event: {}\ndata: {}\n\n", event, data)
}

impl Stream for SseEventStream {
    type Item = Result<Bytes, warp::Error>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if !self.init_sent {
            self.init_sent = true;
            let frame = sse_frame("endpoint", &self.endpoint);
            return Poll::Ready(Some(Ok(Bytes::from(frame))));
        }

        match self.rx.poll_recv(cx) {
            Poll::Ready(Some(message)) => {
                let frame = sse_frame("message", &message);
                Poll::Ready(Some(Ok(Bytes::from(frame))))
            }
            Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for SseEventStream {
    fn drop(&mut self) {
        let session_manager = self.session_manager.clone();
        let session_id = std::mem::take(&mut self.session_id);
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                session_manager.remove_session(&session_id).await;
            });
        }
    }
}
