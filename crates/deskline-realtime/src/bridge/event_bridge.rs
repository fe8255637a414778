//! Inbound event → state update routing.
//!
//! Every decoded event maps to exactly one handler. Frames that name an
//! event this client does not know are counted and dropped.

use std::sync::Arc;

use tracing::{debug, error, info, trace, warn};

use deskline_core::types::UserId;

use crate::connection::state::{ConnectionState, ConnectionStatus};
use crate::message::serializer::decode_frame;
use crate::message::types::{InboundEvent, PresencePayload, StoppedTypingPayload, TypingPayload};
use crate::message::validator::validate_frame;
use crate::metrics::RealtimeMetrics;
use crate::presence::tracker::PresenceTracker;
use crate::typing::coordinator::TypingCoordinator;

/// Routes inbound events into connection status, presence, and typing state.
#[derive(Debug)]
pub struct EventBridge {
    /// Connection status
    status: Arc<ConnectionStatus>,
    /// Presence tracker
    presence: Arc<PresenceTracker>,
    /// Typing coordinator
    typing: TypingCoordinator,
    /// Metrics
    metrics: Arc<RealtimeMetrics>,
    /// The session's own user; typing signals from it are not mirrored
    local_user: UserId,
}

impl EventBridge {
    /// Create a new event bridge
    pub fn new(
        status: Arc<ConnectionStatus>,
        presence: Arc<PresenceTracker>,
        typing: TypingCoordinator,
        metrics: Arc<RealtimeMetrics>,
        local_user: UserId,
    ) -> Self {
        Self {
            status,
            presence,
            typing,
            metrics,
            local_user,
        }
    }

    /// Validates, decodes, and routes one raw text frame.
    ///
    /// Oversize, empty, and malformed frames are logged and counted; they
    /// never fail the connection.
    pub fn route_frame(&self, raw: &str, max_bytes: usize) {
        if let Err(e) = validate_frame(raw, max_bytes) {
            self.metrics.frame_rejected();
            warn!(error = %e, len = raw.len(), "Rejected inbound frame");
            return;
        }

        match decode_frame(raw) {
            Ok(Some(event)) => {
                self.metrics.frame_received();
                self.route(event);
            }
            Ok(None) => {
                self.metrics.frame_ignored();
                debug!("Ignoring unhandled inbound event");
            }
            Err(e) => {
                self.metrics.frame_rejected();
                warn!(error = %e, "Failed to decode inbound frame");
            }
        }
    }

    /// Routes one event to its handler.
    pub fn route(&self, event: InboundEvent) {
        trace!(event = event.name(), "Routing inbound event");
        match event {
            InboundEvent::Connected { transport_id } => {
                if self.status.set(ConnectionState::Connected) {
                    info!(transport_id = %transport_id, "Realtime connection established");
                }
            }
            InboundEvent::Disconnected { reason } => self.on_disconnected(&reason),
            InboundEvent::ConnectError { error } => {
                error!(error = %error, "Realtime connection failed");
                self.status.set(ConnectionState::Disconnected);
                self.reset();
            }
            InboundEvent::UserOnline(payload) => self.on_user_online(payload),
            InboundEvent::UserOffline(payload) => self.on_user_offline(payload),
            InboundEvent::UserTyping(payload) => self.on_user_typing(payload),
            InboundEvent::UserStoppedTyping(payload) => self.on_user_stopped_typing(payload),
            InboundEvent::Error { error } => {
                warn!(error = %error, "Server reported an error");
            }
        }
    }

    /// Clears presence and typing state, cancelling every typing timer.
    pub fn reset(&self) {
        let users = self.presence.clear();
        let entries = self.typing.clear();
        if users > 0 || entries > 0 {
            debug!(users, entries, "Cleared session state");
        }
    }

    fn on_disconnected(&self, reason: &str) {
        if self.status.set(ConnectionState::Disconnected) {
            info!(reason = %reason, "Realtime connection closed");
        }
        self.reset();
    }

    fn on_user_online(&self, payload: PresencePayload) {
        let user_id = payload.user_id.clone();
        if self.presence.on_user_online(payload) {
            debug!(user_id = %user_id, "User online");
        }
    }

    fn on_user_offline(&self, payload: PresencePayload) {
        if self.presence.on_user_offline(&payload.user_id) {
            debug!(user_id = %payload.user_id, "User offline");
        }
    }

    fn on_user_typing(&self, payload: TypingPayload) {
        if self.is_local(&payload.user_id) {
            return;
        }
        self.typing.on_user_typing(payload);
    }

    fn on_user_stopped_typing(&self, payload: StoppedTypingPayload) {
        if self.is_local(&payload.user_id) {
            return;
        }
        self.typing
            .on_user_stopped_typing(&payload.chat_room_id, &payload.user_id);
    }

    fn is_local(&self, user_id: &UserId) -> bool {
        *user_id == self.local_user
    }
}
