//! Integration tests for connection loss, reconnection, and replacement.

mod helpers;

use deskline_core::ErrorKind;
use deskline_core::config::ReconnectConfig;
use deskline_realtime::{AuthToken, ConnectionState};

use helpers::{TestSession, advance, eventually, push_online, push_typing, test_config};

#[tokio::test(start_paused = true)]
async fn test_dropped_connection_reconnects_and_rejoins() {
    let mut t = TestSession::new();
    let server = t.connect().await;

    push_online(&server, "u1").await;
    push_typing(&server, "r1", "u2", "Bob").await;
    eventually("state populated", || t.session.typing().entry_count() == 1).await;

    server.close("server restart").await;
    eventually("state cleared", || {
        !t.session.is_online("u1") && t.session.typing().entry_count() == 0
    })
    .await;
    assert_eq!(t.session.typing().pending_timers(), 0);

    // `accept` checks the rejoin handshake on the new link.
    let second = t.accept().await;
    assert_ne!(second.transport_id, server.transport_id);
    eventually("reconnected", || t.session.is_connected()).await;

    let info = t.session.connection_info().await.unwrap();
    assert_eq!(info.transport_id, second.transport_id);
    assert_eq!(info.epoch, 2);
    assert_eq!(t.session.metrics().connections_established, 2);

    push_online(&second, "u1").await;
    eventually("u1 online again", || t.session.is_online("u1")).await;
}

#[tokio::test(start_paused = true)]
async fn test_transport_failure_moves_through_reconnecting() {
    let mut t = TestSession::new();
    let server = t.connect().await;
    let mut state = t.session.watch_state();

    server.fail("connection reset").await;
    state
        .wait_for(|s| *s == ConnectionState::Reconnecting)
        .await
        .unwrap();

    let _second = t.accept().await;
    state
        .wait_for(|s| *s == ConnectionState::Connected)
        .await
        .unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_reconnect_retries_with_backoff() {
    let mut t = TestSession::new();
    let server = t.connect().await;

    t.connector.refuse_next(2);
    server.close("gone").await;

    let _second = t.accept().await;
    eventually("reconnected", || t.session.is_connected()).await;
    assert_eq!(t.session.metrics().reconnect_attempts, 3);
    assert_eq!(t.connector.opened(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_reconnect_gives_up_after_max_attempts() {
    let mut config = test_config();
    config.reconnect.max_attempts = Some(2);
    let mut t = TestSession::with_config(config);
    let server = t.connect().await;

    t.connector.refuse_next(10);
    server.close("gone").await;

    eventually("attempts exhausted", || {
        t.session.metrics().reconnect_attempts == 2
            && t.session.state() == ConnectionState::Disconnected
    })
    .await;

    advance(60_000).await;
    assert_eq!(t.session.state(), ConnectionState::Disconnected);
    assert_eq!(t.connector.opened(), 1);
    assert!(t.listener.try_accept().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_reconnect_disabled_stays_disconnected() {
    let mut config = test_config();
    config.reconnect = ReconnectConfig {
        enabled: false,
        ..ReconnectConfig::default()
    };
    let mut t = TestSession::with_config(config);
    let server = t.connect().await;

    server.close("gone").await;
    eventually("disconnected", || {
        t.session.state() == ConnectionState::Disconnected
    })
    .await;

    advance(60_000).await;
    assert_eq!(t.session.state(), ConnectionState::Disconnected);
    assert_eq!(t.connector.opened(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_cancels_pending_reconnect() {
    let mut t = TestSession::new();
    let server = t.connect().await;

    t.connector.refuse_next(usize::MAX);
    server.close("gone").await;
    eventually("reconnecting", || {
        t.session.state() == ConnectionState::Reconnecting
    })
    .await;

    t.session.shutdown().await;
    assert_eq!(t.session.state(), ConnectionState::Disconnected);

    let attempts = t.session.metrics().reconnect_attempts;
    advance(60_000).await;
    assert_eq!(t.session.metrics().reconnect_attempts, attempts);
    assert_eq!(t.session.state(), ConnectionState::Disconnected);
}

#[tokio::test(start_paused = true)]
async fn test_initial_connect_failure_is_not_retried() {
    let mut t = TestSession::new();
    t.connector.refuse_next(1);

    let err = t.session.start().await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Transport);
    assert_eq!(t.session.state(), ConnectionState::Disconnected);

    advance(60_000).await;
    assert_eq!(t.connector.opened(), 0);
    assert_eq!(t.session.metrics().reconnect_attempts, 0);
    assert!(t.listener.try_accept().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_refresh_token_replaces_connection() {
    let mut t = TestSession::new();
    let first = t.connect().await;
    push_online(&first, "u1").await;
    eventually("u1 online", || t.session.is_online("u1")).await;

    t.session
        .refresh_token(AuthToken::new("token-2"))
        .await
        .unwrap();
    assert!(first.is_closed_by_client());
    assert!(!t.session.is_online("u1"));

    let second = t.accept().await;
    assert_eq!(second.token.expose(), "token-2");
    assert!(t.session.is_connected());

    // Frames on the replaced link no longer reach the session.
    push_online(&first, "ghost").await;
    push_online(&second, "u2").await;
    eventually("u2 online", || t.session.is_online("u2")).await;
    assert!(!t.session.is_online("ghost"));
}

#[tokio::test(start_paused = true)]
async fn test_refresh_token_rejects_blank() {
    let t = TestSession::new();
    let err = t
        .session
        .refresh_token(AuthToken::new(""))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Authentication);
}

#[tokio::test(start_paused = true)]
async fn test_reconnect_uses_refreshed_token() {
    let mut t = TestSession::new();
    let _first = t.connect().await;

    t.session
        .refresh_token(AuthToken::new("token-2"))
        .await
        .unwrap();
    let second = t.accept().await;

    second.close("gone").await;
    let third = t.accept().await;
    assert_eq!(third.token.expose(), "token-2");
}
