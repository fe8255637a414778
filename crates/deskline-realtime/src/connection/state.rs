//! Observable connection state.

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::debug;

use crate::update::{SessionUpdate, UpdateHub};

/// Lifecycle state of the session's transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// No transport and none being opened.
    Disconnected,
    /// First handshake in progress.
    Connecting,
    /// A live transport is bound to the session.
    Connected,
    /// The transport dropped and a new one is being opened.
    Reconnecting,
}

impl ConnectionState {
    /// Converts to string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Reconnecting => "reconnecting",
        }
    }

    /// True only for [`ConnectionState::Connected`].
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }
}

/// Holder of the current [`ConnectionState`].
///
/// Shared by the connection manager and the event bridge; every change is
/// mirrored to the watch channel and the update hub.
#[derive(Debug)]
pub struct ConnectionStatus {
    tx: watch::Sender<ConnectionState>,
    updates: UpdateHub,
}

impl ConnectionStatus {
    /// Starts in [`ConnectionState::Disconnected`].
    pub fn new(updates: UpdateHub) -> Self {
        let (tx, _) = watch::channel(ConnectionState::Disconnected);
        Self { tx, updates }
    }

    /// Current state.
    pub fn get(&self) -> ConnectionState {
        *self.tx.borrow()
    }

    /// True while a live connection is bound.
    pub fn is_connected(&self) -> bool {
        self.get().is_connected()
    }

    /// Moves to `next`. Returns false when the state was already `next`.
    pub fn set(&self, next: ConnectionState) -> bool {
        let changed = self.tx.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });

        if changed {
            debug!(state = next.as_str(), "Connection state changed");
            self.updates.publish(SessionUpdate::Connection(next));
        }
        changed
    }

    /// Returns a receiver that observes every state change.
    pub fn watch(&self) -> watch::Receiver<ConnectionState> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_publishes_only_changes() {
        let hub = UpdateHub::new(8);
        let mut rx = hub.subscribe();
        let status = ConnectionStatus::new(hub);

        assert!(!status.set(ConnectionState::Disconnected));
        assert!(status.set(ConnectionState::Connecting));
        assert!(status.set(ConnectionState::Connected));
        assert!(status.is_connected());

        assert_eq!(
            rx.try_recv().unwrap(),
            SessionUpdate::Connection(ConnectionState::Connecting)
        );
        assert_eq!(
            rx.try_recv().unwrap(),
            SessionUpdate::Connection(ConnectionState::Connected)
        );
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_watch_sees_latest() {
        let status = ConnectionStatus::new(UpdateHub::new(1));
        let rx = status.watch();
        status.set(ConnectionState::Reconnecting);
        assert_eq!(*rx.borrow(), ConnectionState::Reconnecting);
    }
}
