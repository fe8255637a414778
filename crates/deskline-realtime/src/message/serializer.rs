//! JSON framing for realtime events.
//!
//! Every frame is `{"event": <name>, "data": <payload>}`. Inbound frames
//! are decoded in two steps so unknown event names can be skipped without
//! treating them as errors.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use deskline_core::error::AppError;
use deskline_core::result::AppResult;

use super::types::{InboundEvent, OutboundIntent};

/// Untyped frame envelope.
#[derive(Debug, Deserialize)]
struct RawFrame {
    event: String,
    #[serde(default)]
    data: Value,
}

/// Serialize an outbound intent to a text frame.
pub fn encode_intent(intent: &OutboundIntent) -> Result<String, serde_json::Error> {
    serde_json::to_string(intent)
}

/// Decode a text frame pushed by the server.
///
/// Returns `Ok(None)` for event names this client does not handle,
/// including the lifecycle names (`connect`, `disconnect`,
/// `connect_error`) that only the transport layer may produce.
pub fn decode_frame(text: &str) -> AppResult<Option<InboundEvent>> {
    let raw: RawFrame = serde_json::from_str(text)?;

    let event = match raw.event.as_str() {
        "user-online" => InboundEvent::UserOnline(payload(&raw.event, raw.data)?),
        "user-offline" => InboundEvent::UserOffline(payload(&raw.event, raw.data)?),
        "user-typing" => InboundEvent::UserTyping(payload(&raw.event, raw.data)?),
        "user-stopped-typing" => InboundEvent::UserStoppedTyping(payload(&raw.event, raw.data)?),
        "error" => InboundEvent::Error {
            error: render_error(raw.data),
        },
        _ => return Ok(None),
    };

    Ok(Some(event))
}

fn payload<T: DeserializeOwned>(event: &str, data: Value) -> AppResult<T> {
    serde_json::from_value(data).map_err(|e| {
        AppError::with_source(
            deskline_core::ErrorKind::Serialization,
            format!("Malformed '{event}' payload: {e}"),
            e,
        )
    })
}

fn render_error(data: Value) -> String {
    match data {
        Value::String(s) => s,
        Value::Object(ref map) => map
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| data.to_string()),
        Value::Null => "unspecified error".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::types::{MessageType, RoomPayload, SendMessagePayload};
    use deskline_core::types::{RoomId, UserId};
    use serde_json::json;

    #[test]
    fn test_encode_join_rooms_has_no_data() {
        let text = encode_intent(&OutboundIntent::JoinRooms).unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value, json!({"event": "join-rooms"}));
    }

    #[test]
    fn test_encode_send_message() {
        let intent = OutboundIntent::SendMessage(SendMessagePayload {
            chat_room_id: RoomId::from("r1"),
            content: "hello".to_string(),
            message_type: MessageType::Text,
            temp_id: Some("tmp-1".to_string()),
        });
        let value: Value = serde_json::from_str(&encode_intent(&intent).unwrap()).unwrap();
        assert_eq!(
            value,
            json!({
                "event": "send-message",
                "data": {
                    "chatRoomId": "r1",
                    "content": "hello",
                    "messageType": "text",
                    "tempId": "tmp-1"
                }
            })
        );
    }

    #[test]
    fn test_encode_room_intents() {
        let room = RoomPayload::new(RoomId::from("r9"));
        let read = encode_intent(&OutboundIntent::MarkMessagesRead(room.clone())).unwrap();
        assert!(read.contains("\"mark-messages-read\""));
        let start = encode_intent(&OutboundIntent::TypingStart(room.clone())).unwrap();
        assert!(start.contains("\"typing-start\""));
        let stop = encode_intent(&OutboundIntent::TypingStop(room)).unwrap();
        assert!(stop.contains("\"typing-stop\""));
        assert!(stop.contains("\"chatRoomId\":\"r9\""));
    }

    #[test]
    fn test_decode_user_typing() {
        let frame = r#"{"event":"user-typing","data":{"chatRoomId":"r1","userId":"u2","userName":"Bob"}}"#;
        match decode_frame(frame).unwrap() {
            Some(InboundEvent::UserTyping(p)) => {
                assert_eq!(p.chat_room_id, RoomId::from("r1"));
                assert_eq!(p.user_id, UserId::from("u2"));
                assert_eq!(p.user_name, "Bob");
            }
            other => panic!("unexpected decode result: {other:?}"),
        }
    }

    #[test]
    fn test_decode_presence_with_extra_fields() {
        let frame = r#"{"event":"user-online","data":{"userId":"u1","email":"a@b.c"}}"#;
        let event = decode_frame(frame).unwrap().unwrap();
        assert_eq!(event.name(), "user-online");
    }

    #[test]
    fn test_decode_unknown_event_is_ignored() {
        let frame = r#"{"event":"new-message","data":{"id":1}}"#;
        assert!(decode_frame(frame).unwrap().is_none());
    }

    #[test]
    fn test_decode_lifecycle_names_are_ignored() {
        assert!(decode_frame(r#"{"event":"disconnect","data":"bye"}"#).unwrap().is_none());
        assert!(decode_frame(r#"{"event":"connect"}"#).unwrap().is_none());
    }

    #[test]
    fn test_decode_malformed_payload_is_error() {
        let frame = r#"{"event":"user-typing","data":{"userId":"u2"}}"#;
        let err = decode_frame(frame).unwrap_err();
        assert_eq!(err.kind, deskline_core::ErrorKind::Serialization);
    }

    #[test]
    fn test_decode_error_event_renders_message() {
        let frame = r#"{"event":"error","data":{"message":"room not found"}}"#;
        match decode_frame(frame).unwrap() {
            Some(InboundEvent::Error { error }) => assert_eq!(error, "room not found"),
            other => panic!("unexpected decode result: {other:?}"),
        }
    }
}
