//! Wire message types, serialization, and validation.

pub mod serializer;
pub mod types;
pub mod validator;

pub use serializer::{decode_frame, encode_intent};
pub use types::{
    InboundEvent, MessageType, OutboundIntent, PresencePayload, RoomPayload, SendMessagePayload,
    StoppedTypingPayload, TypingPayload,
};
