//! Connection manager: owns the session's single transport connection.
//!
//! `connect` opens a link and spawns one driver task for it. The driver
//! pumps inbound frames into the event bridge and, when the link drops,
//! runs the reconnect loop in place. Every lifecycle change (connect,
//! disconnect, loss, reinstall) happens under the lifecycle lock, and a
//! driver re-checks its cancellation token after taking the lock, so a
//! cancelled driver never touches state that a newer connection owns.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{Mutex, RwLock, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use deskline_core::config::RealtimeConfig;
use deskline_core::error::AppError;
use deskline_core::result::AppResult;
use deskline_core::types::TransportId;

use crate::bridge::event_bridge::EventBridge;
use crate::message::serializer::encode_intent;
use crate::message::types::{InboundEvent, OutboundIntent};
use crate::metrics::RealtimeMetrics;
use crate::transport::{Connector, TransportFrame, TransportLink};

use super::backoff::ReconnectPolicy;
use super::handle::{ConnectionHandle, ConnectionInfo};
use super::identity::AuthToken;
use super::state::{ConnectionState, ConnectionStatus};

#[derive(Debug, Default)]
struct Lifecycle {
    /// Cancels the driver of the current connection.
    driver: Option<CancellationToken>,
}

/// Manages the session's one live connection.
#[derive(Debug)]
pub struct ConnectionManager {
    /// Configuration.
    config: RealtimeConfig,
    /// Opens transport links.
    connector: Arc<dyn Connector>,
    /// Reconnect schedule.
    policy: ReconnectPolicy,
    /// Event bridge.
    bridge: Arc<EventBridge>,
    /// Connection status.
    status: Arc<ConnectionStatus>,
    /// Metrics.
    metrics: Arc<RealtimeMetrics>,
    lifecycle: Mutex<Lifecycle>,
    current: RwLock<Option<Arc<ConnectionHandle>>>,
    epochs: AtomicU64,
    /// Parent of every driver token; cancelled when the owner goes away.
    root: CancellationToken,
}

impl ConnectionManager {
    /// Creates a new connection manager.
    pub fn new(
        config: RealtimeConfig,
        connector: Arc<dyn Connector>,
        bridge: Arc<EventBridge>,
        status: Arc<ConnectionStatus>,
        metrics: Arc<RealtimeMetrics>,
    ) -> Self {
        Self {
            policy: ReconnectPolicy::from_config(&config.reconnect),
            config,
            connector,
            bridge,
            status,
            metrics,
            lifecycle: Mutex::new(Lifecycle::default()),
            current: RwLock::new(None),
            epochs: AtomicU64::new(0),
            root: CancellationToken::new(),
        }
    }

    /// Opens a connection, replacing any existing one.
    ///
    /// On success the state is `Connected` and `join-rooms` has been
    /// queued. A failed handshake leaves the state `Disconnected` and is
    /// returned to the caller without retry.
    pub async fn connect(self: &Arc<Self>, token: AuthToken) -> AppResult<TransportId> {
        if token.is_blank() {
            return Err(AppError::authentication("Auth token must not be empty"));
        }

        let mut lifecycle = self.lifecycle.lock().await;
        if self.teardown(&mut lifecycle).await {
            info!("Replacing existing realtime connection");
        }
        self.bridge.reset();
        self.status.set(ConnectionState::Connecting);
        info!(url = %self.config.url, "Opening realtime connection");

        let link = match self.connector.open(&self.config.url, &token, &self.config).await {
            Ok(link) => link,
            Err(e) => {
                self.bridge.route(InboundEvent::ConnectError {
                    error: e.to_string(),
                });
                return Err(e);
            }
        };

        let (handle, inbound) = self.install(link).await;
        let cancel = self.root.child_token();
        lifecycle.driver = Some(cancel.clone());
        drop(lifecycle);

        let transport_id = handle.id.clone();
        tokio::spawn(Arc::clone(self).drive(token, handle, inbound, cancel));
        Ok(transport_id)
    }

    /// Closes the connection and clears presence and typing state.
    ///
    /// Idempotent; cancels any pending reconnection.
    pub async fn disconnect(&self) {
        let mut lifecycle = self.lifecycle.lock().await;
        self.teardown(&mut lifecycle).await;
        self.bridge.route(InboundEvent::Disconnected {
            reason: "client disconnect".to_string(),
        });
    }

    /// Stops every driver without waiting for the lifecycle lock.
    pub fn abort(&self) {
        self.root.cancel();
    }

    /// Encodes and queues an intent on the live connection.
    pub async fn emit(&self, intent: &OutboundIntent) -> AppResult<()> {
        let handle = self.current.read().await.clone();
        let handle = match handle {
            Some(h) if h.is_alive() && self.status.is_connected() => h,
            _ => {
                self.metrics.intent_rejected();
                debug!(event = intent.name(), "Dropping intent while disconnected");
                return Err(AppError::not_connected(format!(
                    "Cannot send '{}' while disconnected",
                    intent.name()
                )));
            }
        };
        self.emit_on(&handle, intent)
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        self.status.get()
    }

    /// True while a live connection is bound.
    pub fn is_connected(&self) -> bool {
        self.status.is_connected()
    }

    /// Snapshot of the live connection, if any.
    pub async fn connection_info(&self) -> Option<ConnectionInfo> {
        let handle = self.current.read().await.clone()?;
        Some(handle.info().await)
    }

    fn emit_on(&self, handle: &ConnectionHandle, intent: &OutboundIntent) -> AppResult<()> {
        let frame = encode_intent(intent)?;
        match handle.send(frame) {
            Ok(()) => {
                self.metrics.intent_sent();
                debug!(event = intent.name(), transport_id = %handle.id, "Intent sent");
                Ok(())
            }
            Err(e) => {
                if e.is_not_connected() {
                    self.metrics.intent_rejected();
                }
                Err(e)
            }
        }
    }

    /// Cancels the driver and closes the current handle. Returns true if a
    /// connection was open.
    async fn teardown(&self, lifecycle: &mut Lifecycle) -> bool {
        if let Some(driver) = lifecycle.driver.take() {
            driver.cancel();
        }
        match self.current.write().await.take() {
            Some(handle) => {
                handle.close();
                debug!(transport_id = %handle.id, epoch = handle.epoch, "Connection closed");
                true
            }
            None => false,
        }
    }

    /// Binds a freshly opened link as the current connection and sends
    /// the rejoin handshake. Caller holds the lifecycle lock.
    async fn install(
        &self,
        link: TransportLink,
    ) -> (Arc<ConnectionHandle>, mpsc::Receiver<TransportFrame>) {
        let TransportLink {
            transport_id,
            outbound,
            inbound,
            shutdown,
        } = link;

        let epoch = self.epochs.fetch_add(1, Ordering::SeqCst) + 1;
        let handle = Arc::new(ConnectionHandle::new(
            transport_id.clone(),
            epoch,
            outbound,
            shutdown,
        ));
        *self.current.write().await = Some(handle.clone());
        self.metrics.connection_established();
        self.bridge.route(InboundEvent::Connected { transport_id });

        if let Err(e) = self.emit_on(&handle, &OutboundIntent::JoinRooms) {
            warn!(transport_id = %handle.id, error = %e, "Failed to send join-rooms");
        }

        (handle, inbound)
    }

    async fn drive(
        self: Arc<Self>,
        token: AuthToken,
        mut handle: Arc<ConnectionHandle>,
        mut inbound: mpsc::Receiver<TransportFrame>,
        cancel: CancellationToken,
    ) {
        loop {
            let Some(reason) = self.pump(&handle, &mut inbound, &cancel).await else {
                handle.close();
                break;
            };

            {
                let _lifecycle = self.lifecycle.lock().await;
                if cancel.is_cancelled() {
                    break;
                }
                let mut current = self.current.write().await;
                if current.as_ref().is_some_and(|c| Arc::ptr_eq(c, &handle)) {
                    current.take();
                }
                drop(current);
                handle.close();
                warn!(
                    transport_id = %handle.id,
                    epoch = handle.epoch,
                    reason = %reason,
                    "Realtime connection lost"
                );
                self.bridge.route(InboundEvent::Disconnected { reason });
            }

            match self.reconnect(&token, &cancel).await {
                Some((next, next_inbound)) => {
                    handle = next;
                    inbound = next_inbound;
                }
                None => break,
            }
        }
        debug!("Connection driver stopped");
    }

    /// Feeds inbound frames to the bridge until the link ends. Returns the
    /// reason the link ended, or `None` when cancelled.
    async fn pump(
        &self,
        handle: &ConnectionHandle,
        inbound: &mut mpsc::Receiver<TransportFrame>,
        cancel: &CancellationToken,
    ) -> Option<String> {
        loop {
            let frame = tokio::select! {
                biased;
                _ = cancel.cancelled() => return None,
                frame = inbound.recv() => frame,
            };

            match frame {
                Some(TransportFrame::Text(text)) => {
                    handle.touch().await;
                    let _lifecycle = self.lifecycle.lock().await;
                    if cancel.is_cancelled() {
                        return None;
                    }
                    self.bridge.route_frame(&text, self.config.max_frame_bytes);
                }
                Some(TransportFrame::Closed { reason }) => return Some(reason),
                Some(TransportFrame::Failed { error }) => return Some(error),
                None => return Some("transport closed".to_string()),
            }
        }
    }

    /// Runs the reconnect schedule. Returns the new connection, or `None`
    /// when cancelled, disabled, or out of attempts.
    async fn reconnect(
        &self,
        token: &AuthToken,
        cancel: &CancellationToken,
    ) -> Option<(Arc<ConnectionHandle>, mpsc::Receiver<TransportFrame>)> {
        if !self.policy.is_enabled() {
            return None;
        }

        let mut attempt: u32 = 0;
        while self.policy.allows(attempt) {
            {
                let _lifecycle = self.lifecycle.lock().await;
                if cancel.is_cancelled() {
                    return None;
                }
                self.status.set(ConnectionState::Reconnecting);
            }

            let delay = self.policy.delay_for(attempt);
            info!(attempt = attempt + 1, delay_ms = delay.as_millis() as u64, "Reconnecting");
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return None,
                _ = tokio::time::sleep(delay) => {}
            }

            self.metrics.reconnect_attempted();
            let opened = tokio::select! {
                biased;
                _ = cancel.cancelled() => return None,
                opened = self.connector.open(&self.config.url, token, &self.config) => opened,
            };

            match opened {
                Ok(link) => {
                    let _lifecycle = self.lifecycle.lock().await;
                    if cancel.is_cancelled() {
                        link.shutdown.cancel();
                        return None;
                    }
                    info!(attempt = attempt + 1, "Reconnected");
                    return Some(self.install(link).await);
                }
                Err(e) => {
                    warn!(attempt = attempt + 1, error = %e, "Reconnect attempt failed");
                }
            }
            attempt = attempt.saturating_add(1);
        }

        let _lifecycle = self.lifecycle.lock().await;
        if !cancel.is_cancelled() {
            warn!(attempts = attempt, "Giving up on reconnection");
            self.status.set(ConnectionState::Disconnected);
        }
        None
    }
}
