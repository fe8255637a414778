//! # deskline-realtime
//!
//! Realtime coordination layer for Deskline chat. Provides:
//!
//! - One authenticated WebSocket connection per session, with reconnection
//! - Presence mirror of other users' online status
//! - Per-room typing indicators with automatic expiry
//! - Message, read-receipt, and typing intents
//! - Reactive state updates for UI consumers

pub mod bridge;
pub mod connection;
pub mod dispatcher;
pub mod message;
pub mod metrics;
pub mod presence;
pub mod session;
pub mod transport;
pub mod typing;
pub mod update;

pub use bridge::EventBridge;
pub use connection::identity::{AuthToken, SessionIdentity};
pub use connection::manager::ConnectionManager;
pub use connection::state::ConnectionState;
pub use dispatcher::MessageDispatcher;
pub use message::types::MessageType;
pub use presence::tracker::PresenceTracker;
pub use session::RealtimeSession;
pub use transport::{Connector, MemoryConnector, WebSocketConnector};
pub use typing::coordinator::TypingCoordinator;
pub use update::SessionUpdate;
