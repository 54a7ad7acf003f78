use log::{debug, warn};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use uuid::Uuid;

/// Outgoing queue depth per session
const SESSION_BUFFER: usize = 100;

/// Tracks the live SSE connections, keyed by session ID
#[derive(Clone, Default)]
pub struct SessionManager {
    active_sessions: Arc<Mutex<HashMap<String, mpsc::Sender<String>>>>,
}

impl SessionManager {
    /// Create a new session manager
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new session and register it
    ///
    /// Returns the session ID and the receiving half of its outgoing queue.
    pub async fn create_session(&self) -> (String, mpsc::Receiver<String>) {
        let session_id = Uuid::new_v4().to_string();
        let (session_tx, session_rx) = mpsc::channel::<String>(SESSION_BUFFER);

        let mut sessions = self.active_sessions.lock().await;
        sessions.insert(session_id.clone(), session_tx);
        debug!("Opened SSE session {}", session_id);

        (session_id, session_rx)
    }

    /// Remove a session by ID
    pub async fn remove_session(&self, session_id: &str) {
        let mut sessions = self.active_sessions.lock().await;
        if sessions.remove(session_id).is_some() {
            debug!("Closed SSE session {}", session_id);
        }
    }

    /// Send a message to a specific session
    pub async fn send_to_session(&self, session_id: &str, message: &str) -> Result<(), String> {
        let sender = {
            let sessions = self.active_sessions.lock().await;
            sessions.get(session_id).cloned()
        };
        match sender {
            Some(tx) => tx
                .send(message.to_string())
                .await
                .map_err(|e| format!("Failed to send to session {}: {}", session_id, e)),
            None => Err(format!("Session {} not found", session_id)),
        }
    }

    /// Broadcast a message to all sessions, returning how many received it
    pub async fn broadcast(&self, message: &str) -> usize {
        let senders: Vec<(String, mpsc::Sender<String>)> = {
            let sessions = self.active_sessions.lock().await;
            sessions
                .iter()
                .map(|(id, tx)| (id.clone(), tx.clone()))
                .collect()
        };

        let mut delivered = 0;
        for (id, tx) in senders {
            match tx.send(message.to_string()).await {
                Ok(()) => delivered += 1,
                Err(e) => warn!("Dropping broadcast for session {}: {}", id, e),
            }
        }
        delivered
    }

    /// Check if a session exists
    pub async fn session_exists(&self, session_id: &str) -> bool {
        let sessions = self.active_sessions.lock().await;
        sessions.contains_key(session_id)
    }

    /// Get the number of active sessions
    pub async fn session_count(&self) -> usize {
        let sessions = self.active_sessions.lock().await;
        sessions.len()
    }
}
