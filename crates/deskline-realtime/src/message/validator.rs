//! Message validation rules.

use deskline_core::error::AppError;
use deskline_core::types::RoomId;

/// Maximum length of a room identifier.
const MAX_ROOM_ID_LEN: usize = 256;

/// Validates an inbound frame before decoding.
pub fn validate_frame(raw: &str, max_bytes: usize) -> Result<(), AppError> {
    if raw.len() > max_bytes {
        return Err(AppError::validation(format!(
            "Frame exceeds maximum size of {max_bytes} bytes"
        )));
    }

    if raw.trim().is_empty() {
        return Err(AppError::validation("Empty frame"));
    }

    Ok(())
}

/// Validates a room id supplied by the caller.
pub fn validate_room_id(room_id: &RoomId) -> Result<(), AppError> {
    if room_id.is_blank() || room_id.as_str().len() > MAX_ROOM_ID_LEN {
        return Err(AppError::validation("Invalid room id"));
    }
    Ok(())
}

/// Validates message content supplied by the caller.
pub fn validate_content(content: &str) -> Result<(), AppError> {
    if content.trim().is_empty() {
        return Err(AppError::validation("Message content must not be empty"));
    }
    Ok(())
}
