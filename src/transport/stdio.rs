use crate::error::MCPError;
use crate::transport::{CloseCallback, ErrorCallback, MessageCallback, Transport};
use async_trait::async_trait;
use log::{debug, error, warn};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

/// How long `close` waits for queued output to reach the writer
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

type SharedReader = Arc<Mutex<BufReader<Box<dyn AsyncRead + Send + Sync + Unpin>>>>;

/// Newline-delimited JSON over stdin / stdout
///
/// Writes go through a single writer task so concurrent senders never
/// interleave partial lines. Clones share both the reader and the writer;
/// the writer task exits once every clone has dropped its sender.
pub struct StdioTransport {
    reader: SharedReader,
    writer_tx: Option<mpsc::Sender<String>>,
    writer_handle: Option<JoinHandle<()>>,
    is_connected: bool,
    on_close: Option<CloseCallback>,
    on_error: Option<ErrorCallback>,
    on_message: Option<MessageCallback>,
}

impl Default for StdioTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl StdioTransport {
    /// Create a new stdio transport using stdin and stdout
    pub fn new() -> Self {
        Self::with_reader_writer(Box::new(tokio::io::stdin()), tokio::io::stdout())
    }

    /// Create a transport over an arbitrary reader and writer
    pub fn with_reader_writer<W>(
        reader: Box<dyn AsyncRead + Send + Sync + Unpin>,
        writer: W,
    ) -> Self
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let (writer_tx, mut writer_rx) = mpsc::channel::<String>(32);

        let writer_handle = tokio::spawn(async move {
            let mut writer = tokio::io::BufWriter::new(writer);
            while let Some(message) = writer_rx.recv().await {
                if let Err(e) = writer.write_all(message.as_bytes()).await {
                    error!("Error writing message: {}", e);
                    continue;
                }
                if let Err(e) = writer.write_all(b"\n").await {
                    error!("Error writing newline: {}", e);
                }
                if let Err(e) = writer.flush().await {
                    error!("Error flushing writer: {}", e);
                }
            }
        });

        Self {
            reader: Arc::new(Mutex::new(BufReader::new(reader))),
            writer_tx: Some(writer_tx),
            writer_handle: Some(writer_handle),
            is_connected: false,
            on_close: None,
            on_error: None,
            on_message: None,
        }
    }

    /// Handle an error by calling the error callback if set
    fn handle_error(&self, error: &MCPError) {
        if let Some(callback) = &self.on_error {
            callback(error);
        }
    }

    /// Read the next non-blank line, or `None` at end of input
    async fn read_message_line(&self) -> Result<Option<String>, MCPError> {
        let mut reader = self.reader.lock().await;
        loop {
            let mut line = String::new();
            let read = reader
                .read_line(&mut line)
                .await
                .map_err(|e| MCPError::Transport(format!("Failed to read: {}", e)))?;
            if read == 0 {
                return Ok(None);
            }
            if !line.trim().is_empty() {
                return Ok(Some(line));
            }
        }
    }
}

impl Clone for StdioTransport {
    fn clone(&self) -> Self {
        Self {
            reader: self.reader.clone(),
            writer_tx: self.writer_tx.clone(),
            writer_handle: None, // Only the original waits for the writer
            is_connected: self.is_connected,
            on_close: None, // Callbacks cannot be cloned
            on_error: None,
            on_message: None,
        }
    }
}

#[async_trait]
impl Transport for StdioTransport {
    async fn start(&mut self) -> Result<(), MCPError> {
        self.is_connected = true;
        Ok(())
    }

    async fn send<T: Serialize + Send + Sync>(&mut self, message: &T) -> Result<(), MCPError> {
        if !self.is_connected {
            let error = MCPError::Transport("Transport not connected".to_string());
            self.handle_error(&error);
            return Err(error);
        }

        let json = serde_json::to_string(message).map_err(|e| {
            let error = MCPError::Serialization(e.to_string());
            self.handle_error(&error);
            error
        })?;

        let writer_tx = self.writer_tx.as_ref().ok_or_else(|| {
            let error = MCPError::Transport("Writer already closed".to_string());
            self.handle_error(&error);
            error
        })?;

        writer_tx.send(json).await.map_err(|e| {
            let error = MCPError::Transport(format!("Failed to send message to writer: {}", e));
            self.handle_error(&error);
            error
        })
    }

    async fn receive<T: DeserializeOwned + Send + Sync>(&mut self) -> Result<T, MCPError> {
        if !self.is_connected {
            let error = MCPError::Transport("Transport not connected".to_string());
            self.handle_error(&error);
            return Err(error);
        }

        let line = match self.read_message_line().await {
            Ok(Some(line)) => line,
            Ok(None) => {
                debug!("Reached end of input");
                return Err(MCPError::ConnectionClosed);
            }
            Err(error) => {
                self.handle_error(&error);
                return Err(error);
            }
        };

        if let Some(callback) = &self.on_message {
            callback(&line);
        }

        serde_json::from_str(&line).map_err(|e| {
            let error = MCPError::Deserialization(e.to_string());
            self.handle_error(&error);
            error
        })
    }

    async fn close(&mut self) -> Result<(), MCPError> {
        if !self.is_connected {
            return Ok(());
        }

        self.is_connected = false;

        // The writer drains its queue once the last sender is gone
        self.writer_tx = None;
        if let Some(handle) = self.writer_handle.take() {
            match tokio::time::timeout(WRITER_DRAIN_TIMEOUT, handle).await {
                Ok(Ok(())) => debug!("Writer drained"),
                Ok(Err(e)) => error!("Writer task failed: {}", e),
                Err(_) => warn!("Writer still has open senders; not all output may be flushed"),
            }
        }

        if let Some(callback) = &self.on_close {
            callback();
        }

        Ok(())
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
