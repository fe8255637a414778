//! Inbound event and outbound intent definitions.

use std::fmt;

use serde::{Deserialize, Serialize, Serializer};

use deskline_core::types::{RoomId, TransportId, UserId};

/// Events consumed by the event bridge.
///
/// The first three variants are lifecycle events synthesized by the
/// transport layer; the rest arrive as frames pushed by the server.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    /// `connect`: the transport finished its handshake.
    Connected {
        /// Server-assigned transport identifier.
        transport_id: TransportId,
    },
    /// `disconnect`: the transport went away.
    Disconnected {
        /// Why the transport closed.
        reason: String,
    },
    /// `connect_error`: the handshake failed.
    ConnectError {
        /// Failure description.
        error: String,
    },
    /// `user-online`
    UserOnline(PresencePayload),
    /// `user-offline`
    UserOffline(PresencePayload),
    /// `user-typing`
    UserTyping(TypingPayload),
    /// `user-stopped-typing`
    UserStoppedTyping(StoppedTypingPayload),
    /// `error`: server-reported error, logged only.
    Error {
        /// Error payload rendered as text.
        error: String,
    },
}

impl InboundEvent {
    /// The wire name of the event.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Connected { .. } => "connect",
            Self::Disconnected { .. } => "disconnect",
            Self::ConnectError { .. } => "connect_error",
            Self::UserOnline(_) => "user-online",
            Self::UserOffline(_) => "user-offline",
            Self::UserTyping(_) => "user-typing",
            Self::UserStoppedTyping(_) => "user-stopped-typing",
            Self::Error { .. } => "error",
        }
    }
}

/// Payload of `user-online` / `user-offline`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresencePayload {
    /// The user whose status changed.
    pub user_id: UserId,
    /// Display name, when the server includes it.
    #[serde(default)]
    pub user_name: Option<String>,
}

/// Payload of `user-typing`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingPayload {
    /// Conversation the user is typing in.
    pub chat_room_id: RoomId,
    /// The typing user.
    pub user_id: UserId,
    /// Display name shown in "X is typing…".
    #[serde(default)]
    pub user_name: String,
}

/// Payload of `user-stopped-typing`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoppedTypingPayload {
    /// Conversation the user stopped typing in.
    pub chat_room_id: RoomId,
    /// The user who stopped.
    pub user_id: UserId,
}

/// Intents sent by this session to the server.
///
/// Serialized as `{"event": "<kebab-name>", "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum OutboundIntent {
    /// Subscribe this session to its rooms. Sent after every handshake.
    JoinRooms,
    /// Post a message to a room.
    SendMessage(SendMessagePayload),
    /// Read receipt for everything in a room.
    MarkMessagesRead(RoomPayload),
    /// The local user started typing.
    TypingStart(RoomPayload),
    /// The local user stopped typing.
    TypingStop(RoomPayload),
}

impl OutboundIntent {
    /// The wire name of the intent.
    pub fn name(&self) -> &'static str {
        match self {
            Self::JoinRooms => "join-rooms",
            Self::SendMessage(_) => "send-message",
            Self::MarkMessagesRead(_) => "mark-messages-read",
            Self::TypingStart(_) => "typing-start",
            Self::TypingStop(_) => "typing-stop",
        }
    }
}

/// Payload of `send-message`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessagePayload {
    /// Target room.
    pub chat_room_id: RoomId,
    /// Message body.
    pub content: String,
    /// Kind of content.
    pub message_type: MessageType,
    /// Client-generated id used to reconcile the optimistic local copy.
    pub temp_id: Option<String>,
}

/// Payload carrying only a room id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomPayload {
    /// Target room.
    pub chat_room_id: RoomId,
}

impl RoomPayload {
    /// Wraps a room id.
    pub fn new(chat_room_id: RoomId) -> Self {
        Self { chat_room_id }
    }
}

/// Kind of message content. Serialized as a lowercase string.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum MessageType {
    /// Plain text.
    #[default]
    Text,
    /// Image reference.
    Image,
    /// File attachment reference.
    File,
    /// Any other type the backend understands.
    Custom(String),
}

impl MessageType {
    /// Converts to string.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::File => "file",
            Self::Custom(name) => name,
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for MessageType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}
