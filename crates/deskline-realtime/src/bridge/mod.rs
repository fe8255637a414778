//! Bridges the transport's inbound stream into session state.

pub mod event_bridge;

pub use event_bridge::EventBridge;
