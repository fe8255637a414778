//! Transport abstraction between the connection manager and the wire.
//!
//! A [`Connector`] opens one bidirectional, message-oriented link per
//! call. The link is a pair of channels plus a cancellation token; the
//! connector's own pump tasks translate between those channels and the
//! underlying socket.

pub mod memory;
pub mod websocket;

use std::fmt;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use deskline_core::config::RealtimeConfig;
use deskline_core::result::AppResult;
use deskline_core::types::TransportId;

use crate::connection::identity::AuthToken;

pub use memory::{MemoryConnector, MemoryListener, MemoryServerEnd};
pub use websocket::WebSocketConnector;

/// Something the transport delivered to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportFrame {
    /// A text frame.
    Text(String),
    /// The peer closed the link.
    Closed {
        /// Close reason, if any.
        reason: String,
    },
    /// The link failed.
    Failed {
        /// Error description.
        error: String,
    },
}

/// A freshly opened transport link.
pub struct TransportLink {
    /// Identifier assigned by the server during the handshake.
    pub transport_id: TransportId,
    /// Text frames queued here are written to the peer in order.
    pub outbound: mpsc::Sender<String>,
    /// Frames and close/failure notifications from the peer.
    pub inbound: mpsc::Receiver<TransportFrame>,
    /// Cancelling this closes the link and stops its pump tasks.
    pub shutdown: CancellationToken,
}

impl fmt::Debug for TransportLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportLink")
            .field("transport_id", &self.transport_id)
            .finish()
    }
}

/// Opens authenticated transport links.
#[async_trait]
pub trait Connector: Send + Sync + fmt::Debug + 'static {
    /// Opens a link to `url`, presenting `token` during the handshake.
    async fn open(
        &self,
        url: &str,
        token: &AuthToken,
        config: &RealtimeConfig,
    ) -> AppResult<TransportLink>;
}
