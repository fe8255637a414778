//! The live transport connection bound to a session.

use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{RwLock, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use deskline_core::error::AppError;
use deskline_core::result::AppResult;
use deskline_core::types::TransportId;

/// A handle to the session's current connection.
///
/// Holds the sender channel feeding the transport writer plus metadata
/// about the link. Only the connection manager owns one.
#[derive(Debug)]
pub struct ConnectionHandle {
    /// Server-assigned transport ID
    pub id: TransportId,
    /// Connection epoch within the session; bumps on every (re)connect
    pub epoch: u64,
    /// Sender for outbound frames
    sender: mpsc::Sender<String>,
    /// When the connection was established
    pub connected_at: DateTime<Utc>,
    /// Last inbound activity
    last_activity: RwLock<DateTime<Utc>>,
    /// Whether the connection is still alive
    alive: AtomicBool,
    /// Closes the underlying link
    shutdown: CancellationToken,
}

impl ConnectionHandle {
    /// Create a new connection handle
    pub fn new(
        id: TransportId,
        epoch: u64,
        sender: mpsc::Sender<String>,
        shutdown: CancellationToken,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            epoch,
            sender,
            connected_at: now,
            last_activity: RwLock::new(now),
            alive: AtomicBool::new(true),
            shutdown,
        }
    }

    /// Queue a text frame for the transport writer.
    ///
    /// Never waits: a full buffer drops the frame and reports a transport
    /// error, a closed writer marks the connection dead.
    pub fn send(&self, frame: String) -> AppResult<()> {
        if !self.is_alive() {
            return Err(AppError::not_connected("Connection is closed"));
        }
        match self.sender.try_send(frame) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(transport_id = %self.id, "Send buffer full, dropping frame");
                Err(AppError::transport("Send buffer full"))
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.mark_dead();
                Err(AppError::not_connected("Connection is closed"))
            }
        }
    }

    /// Check if connection is alive
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Mark connection as dead
    pub fn mark_dead(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }

    /// Mark dead and close the underlying link.
    pub fn close(&self) {
        self.mark_dead();
        self.shutdown.cancel();
    }

    /// Update last activity timestamp
    pub async fn touch(&self) {
        let mut la = self.last_activity.write().await;
        *la = Utc::now();
    }

    /// Get a snapshot of connection info
    pub async fn info(&self) -> ConnectionInfo {
        ConnectionInfo {
            transport_id: self.id.clone(),
            epoch: self.epoch,
            connected_at: self.connected_at,
            last_activity: *self.last_activity.read().await,
            alive: self.is_alive(),
        }
    }
}

/// Snapshot of connection info (serializable)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionInfo {
    /// Transport ID
    pub transport_id: TransportId,
    /// Connection epoch
    pub epoch: u64,
    /// Connected at
    pub connected_at: DateTime<Utc>,
    /// Last activity
    pub last_activity: DateTime<Utc>,
    /// Is alive
    pub alive: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use deskline_core::ErrorKind;

    fn handle(capacity: usize) -> (ConnectionHandle, mpsc::Receiver<String>, CancellationToken) {
        let (tx, rx) = mpsc::channel(capacity);
        let shutdown = CancellationToken::new();
        let h = ConnectionHandle::new(TransportId::from("t-1"), 1, tx, shutdown.clone());
        (h, rx, shutdown)
    }

    #[tokio::test]
    async fn test_send_queues_frame() {
        let (h, mut rx, _) = handle(4);
        h.send("a".to_string()).unwrap();
        assert_eq!(rx.recv().await.as_deref(), Some("a"));
    }

    #[tokio::test]
    async fn test_full_buffer_is_transport_error() {
        let (h, _rx, _) = handle(1);
        h.send("a".to_string()).unwrap();
        let err = h.send("b".to_string()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Transport);
        assert!(h.is_alive());
    }

    #[tokio::test]
    async fn test_closed_writer_marks_dead() {
        let (h, rx, _) = handle(1);
        drop(rx);
        assert!(h.send("a".to_string()).unwrap_err().is_not_connected());
        assert!(!h.is_alive());
    }

    #[tokio::test]
    async fn test_close_cancels_link() {
        let (h, _rx, shutdown) = handle(1);
        h.close();
        assert!(shutdown.is_cancelled());
        assert!(h.send("a".to_string()).is_err());
        assert!(!h.info().await.alive);
    }
}
