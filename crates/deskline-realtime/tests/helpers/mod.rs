//! Shared test helpers for integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use deskline_core::config::{RealtimeConfig, ReconnectConfig};
use deskline_realtime::transport::{MemoryConnector, MemoryListener, MemoryServerEnd};
use deskline_realtime::{AuthToken, RealtimeSession, SessionIdentity};

/// The session's own user id.
pub const LOCAL_USER: &str = "u-me";

/// Test session context
pub struct TestSession {
    /// The session under test
    pub session: RealtimeSession,
    /// Connector backing the session
    pub connector: MemoryConnector,
    /// Receives the server side of every link the session opens
    pub listener: MemoryListener,
}

impl TestSession {
    /// Create a session with the test configuration
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    /// Create a session with a custom configuration
    pub fn with_config(config: RealtimeConfig) -> Self {
        let (connector, listener) = MemoryConnector::new();
        let identity = SessionIdentity::new(LOCAL_USER, "Me", AuthToken::new("token-1"))
            .expect("valid identity");
        let session = RealtimeSession::new(config, identity, Arc::new(connector.clone()))
            .expect("valid config");
        Self {
            session,
            connector,
            listener,
        }
    }

    /// Start the session and return the server end, after checking the
    /// rejoin handshake arrived.
    pub async fn connect(&mut self) -> MemoryServerEnd {
        self.session.start().await.expect("connect succeeds");
        self.accept().await
    }

    /// Accept the next link and consume its `join-rooms`.
    pub async fn accept(&mut self) -> MemoryServerEnd {
        let mut server = self.listener.accept().await.expect("link opened");
        let join = server.recv_intent().await.expect("join-rooms sent");
        assert_eq!(join["event"], "join-rooms");
        server
    }
}

/// Config with short reconnect delays.
pub fn test_config() -> RealtimeConfig {
    RealtimeConfig {
        url: "mem://test".to_string(),
        reconnect: ReconnectConfig {
            initial_delay_ms: 100,
            max_delay_ms: 1000,
            ..ReconnectConfig::default()
        },
        ..RealtimeConfig::default()
    }
}

/// Polls `check` once per virtual millisecond until it holds.
pub async fn eventually<F: Fn() -> bool>(what: &str, check: F) {
    for _ in 0..10_000 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    panic!("timed out waiting for {what}");
}

/// Advance virtual time.
pub async fn advance(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

/// Push `user-online` for `user_id`.
pub async fn push_online(server: &MemoryServerEnd, user_id: &str) {
    server
        .push("user-online", serde_json::json!({ "userId": user_id }))
        .await;
}

/// Push `user-typing`.
pub async fn push_typing(server: &MemoryServerEnd, room: &str, user_id: &str, name: &str) {
    server
        .push(
            "user-typing",
            serde_json::json!({ "chatRoomId": room, "userId": user_id, "userName": name }),
        )
        .await;
}

/// Push `user-stopped-typing`.
pub async fn push_stopped(server: &MemoryServerEnd, room: &str, user_id: &str) {
    server
        .push(
            "user-stopped-typing",
            serde_json::json!({ "chatRoomId": room, "userId": user_id }),
        )
        .await;
}

/// The `data` object of an intent.
pub fn data(intent: &Value) -> &Value {
    &intent["data"]
}
