//! Message dispatcher: application intents onto the live connection.
//!
//! Stateless apart from the manager reference. Each call makes at most
//! one transmission attempt; nothing is queued or retried, so a caller
//! that gets `NotConnected` must resubmit after reconnecting.

use std::sync::Arc;

use uuid::Uuid;

use deskline_core::result::AppResult;
use deskline_core::types::RoomId;

use crate::connection::manager::ConnectionManager;
use crate::message::types::{MessageType, OutboundIntent, RoomPayload, SendMessagePayload};
use crate::message::validator::{validate_content, validate_room_id};

/// Sends messages, read receipts, and local typing signals.
#[derive(Debug, Clone)]
pub struct MessageDispatcher {
    connections: Arc<ConnectionManager>,
}

impl MessageDispatcher {
    /// Creates a dispatcher bound to a connection manager.
    pub fn new(connections: Arc<ConnectionManager>) -> Self {
        Self { connections }
    }

    /// Emits `send-message`.
    ///
    /// When `temp_id` is `None` a UUID v7 is generated. Returns the temp id
    /// that went out, for reconciling the server-confirmed message with the
    /// caller's optimistic copy.
    pub async fn send_message(
        &self,
        room_id: impl Into<RoomId>,
        content: impl Into<String>,
        message_type: MessageType,
        temp_id: Option<String>,
    ) -> AppResult<String> {
        let chat_room_id = room_id.into();
        let content = content.into();
        validate_room_id(&chat_room_id)?;
        validate_content(&content)?;

        let temp_id = temp_id.unwrap_or_else(|| Uuid::now_v7().to_string());
        self.connections
            .emit(&OutboundIntent::SendMessage(SendMessagePayload {
                chat_room_id,
                content,
                message_type,
                temp_id: Some(temp_id.clone()),
            }))
            .await?;
        Ok(temp_id)
    }

    /// Emits `mark-messages-read`.
    pub async fn mark_read(&self, room_id: impl Into<RoomId>) -> AppResult<()> {
        let payload = room(room_id)?;
        self.connections
            .emit(&OutboundIntent::MarkMessagesRead(payload))
            .await
    }

    /// Emits `typing-start` for the local user. Expiry is the peers' concern.
    pub async fn start_typing(&self, room_id: impl Into<RoomId>) -> AppResult<()> {
        let payload = room(room_id)?;
        self.connections
            .emit(&OutboundIntent::TypingStart(payload))
            .await
    }

    /// Emits `typing-stop` for the local user.
    pub async fn stop_typing(&self, room_id: impl Into<RoomId>) -> AppResult<()> {
        let payload = room(room_id)?;
        self.connections
            .emit(&OutboundIntent::TypingStop(payload))
            .await
    }
}

fn room(room_id: impl Into<RoomId>) -> AppResult<RoomPayload> {
    let room_id = room_id.into();
    validate_room_id(&room_id)?;
    Ok(RoomPayload::new(room_id))
}
