//! Top-level realtime session that ties together all subsystems.

use std::sync::Arc;

use tokio::sync::{Mutex, broadcast, watch};
use tracing::info;

use deskline_core::config::RealtimeConfig;
use deskline_core::error::AppError;
use deskline_core::result::AppResult;
use deskline_core::types::{TransportId, UserId};

use crate::bridge::event_bridge::EventBridge;
use crate::connection::handle::ConnectionInfo;
use crate::connection::identity::{AuthToken, SessionIdentity};
use crate::connection::manager::ConnectionManager;
use crate::connection::state::{ConnectionState, ConnectionStatus};
use crate::dispatcher::MessageDispatcher;
use crate::metrics::{MetricsSnapshot, RealtimeMetrics};
use crate::presence::tracker::{OnlineUser, PresenceTracker};
use crate::transport::{Connector, WebSocketConnector};
use crate::typing::coordinator::{TypingCoordinator, TypingUser};
use crate::update::{SessionUpdate, UpdateHub};

/// One authenticated user's realtime context.
///
/// Built when an identity becomes available and shut down at logout.
/// Owns at most one live connection; dropping the session stops its
/// connection driver.
pub struct RealtimeSession {
    user_id: UserId,
    display_name: String,
    /// Token used by the next connect; replaced on refresh.
    token: Mutex<AuthToken>,
    /// Connection manager.
    pub connections: Arc<ConnectionManager>,
    /// Message dispatcher.
    pub dispatcher: MessageDispatcher,
    presence: Arc<PresenceTracker>,
    typing: TypingCoordinator,
    status: Arc<ConnectionStatus>,
    metrics: Arc<RealtimeMetrics>,
    updates: UpdateHub,
}

impl std::fmt::Debug for RealtimeSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeSession")
            .field("user_id", &self.user_id)
            .field("state", &self.status.get())
            .finish()
    }
}

impl RealtimeSession {
    /// Creates a session that connects through `connector`.
    pub fn new(
        config: RealtimeConfig,
        identity: SessionIdentity,
        connector: Arc<dyn Connector>,
    ) -> AppResult<Self> {
        config.validate()?;

        let SessionIdentity {
            user_id,
            display_name,
            auth_token,
        } = identity;

        let updates = UpdateHub::new(config.update_buffer_size);
        let metrics = Arc::new(RealtimeMetrics::new());
        let status = Arc::new(ConnectionStatus::new(updates.clone()));
        let presence = Arc::new(PresenceTracker::new(updates.clone()));
        let typing = TypingCoordinator::new(config.typing_expiry(), updates.clone());
        let bridge = Arc::new(EventBridge::new(
            status.clone(),
            presence.clone(),
            typing.clone(),
            metrics.clone(),
            user_id.clone(),
        ));
        let connections = Arc::new(ConnectionManager::new(
            config,
            connector,
            bridge,
            status.clone(),
            metrics.clone(),
        ));
        let dispatcher = MessageDispatcher::new(connections.clone());

        info!(user_id = %user_id, "Realtime session created");

        Ok(Self {
            user_id,
            display_name,
            token: Mutex::new(auth_token),
            connections,
            dispatcher,
            presence,
            typing,
            status,
            metrics,
            updates,
        })
    }

    /// Creates a session over WebSocket.
    pub fn websocket(config: RealtimeConfig, identity: SessionIdentity) -> AppResult<Self> {
        Self::new(config, identity, Arc::new(WebSocketConnector::new()))
    }

    /// Connects with the current token.
    pub async fn start(&self) -> AppResult<TransportId> {
        let token = self.token.lock().await.clone();
        self.connections.connect(token).await
    }

    /// Tears the connection down and rebuilds it with `token`.
    pub async fn refresh_token(&self, token: AuthToken) -> AppResult<TransportId> {
        if token.is_blank() {
            return Err(AppError::authentication("Auth token must not be empty"));
        }
        *self.token.lock().await = token.clone();
        info!(user_id = %self.user_id, "Auth token refreshed, reconnecting");
        self.connections.connect(token).await
    }

    /// Disconnects and clears all state.
    pub async fn shutdown(&self) {
        info!(user_id = %self.user_id, "Shutting down realtime session");
        self.connections.disconnect().await;
    }

    /// The session's user.
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// The session's display name.
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn is_connected(&self) -> bool {
        self.status.is_connected()
    }

    pub fn state(&self) -> ConnectionState {
        self.status.get()
    }

    /// Receiver that always holds the latest connection state.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.status.watch()
    }

    /// Receiver of every connection, presence, and typing change.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionUpdate> {
        self.updates.subscribe()
    }

    pub fn is_online(&self, user_id: &str) -> bool {
        self.presence.is_online(user_id)
    }

    /// Online users in arrival order.
    pub fn online_users(&self) -> Vec<OnlineUser> {
        self.presence.online_users()
    }

    /// Users typing in `room_id`, in arrival order.
    pub fn typing_users_for(&self, room_id: &str) -> Vec<TypingUser> {
        self.typing.typing_users_for(room_id)
    }

    /// Presence tracker, for read-only inspection.
    pub fn presence(&self) -> &PresenceTracker {
        &self.presence
    }

    /// Typing coordinator, for read-only inspection.
    pub fn typing(&self) -> &TypingCoordinator {
        &self.typing
    }

    pub async fn connection_info(&self) -> Option<ConnectionInfo> {
        self.connections.connection_info().await
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

impl Drop for RealtimeSession {
    fn drop(&mut self) {
        self.connections.abort();
    }
}
