//! Per-room typing indicators with automatic expiry.

pub mod coordinator;
pub mod timer;

pub use coordinator::{TypingCoordinator, TypingUser};
pub use timer::ExpiryTimer;
