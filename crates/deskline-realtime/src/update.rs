//! Reactive state updates published to UI consumers.

use tokio::sync::broadcast;

use deskline_core::types::{RoomId, UserId};

use crate::connection::state::ConnectionState;

/// A change in session state that a UI may want to re-render for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionUpdate {
    /// The connection state changed.
    Connection(ConnectionState),
    /// A user joined or left the online set.
    Presence {
        /// The user.
        user_id: UserId,
        /// New membership.
        online: bool,
    },
    /// The online set was emptied.
    PresenceCleared,
    /// The typing list of a room changed.
    Typing {
        /// The room whose list changed.
        room_id: RoomId,
    },
    /// All typing entries were dropped.
    TypingCleared,
}

/// Fan-out point for [`SessionUpdate`]s.
///
/// Publishing never blocks and never fails; updates sent while nobody
/// is subscribed are dropped.
#[derive(Debug, Clone)]
pub struct UpdateHub {
    tx: broadcast::Sender<SessionUpdate>,
}

impl UpdateHub {
    /// Creates a hub with the given buffer capacity.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publishes an update to all current subscribers.
    pub fn publish(&self, update: SessionUpdate) {
        let _ = self.tx.send(update);
    }

    /// Returns a new subscriber.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionUpdate> {
        self.tx.subscribe()
    }
}
