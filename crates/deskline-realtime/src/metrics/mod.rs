//! Realtime session metrics.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Session-level metrics counters.
#[derive(Debug, Default)]
pub struct RealtimeMetrics {
    /// Frames decoded into a known event
    frames_received: AtomicU64,
    /// Frames naming an event this client does not handle
    frames_ignored: AtomicU64,
    /// Oversize or malformed frames
    frames_rejected: AtomicU64,
    /// Intents handed to the transport
    intents_sent: AtomicU64,
    /// Intents refused because no connection was live
    intents_rejected: AtomicU64,
    /// Connections established, including reconnects
    connections_established: AtomicU64,
    /// Reconnect attempts started
    reconnect_attempts: AtomicU64,
}

impl RealtimeMetrics {
    /// Create new zeroed metrics
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frame_received(&self) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn frame_ignored(&self) {
        self.frames_ignored.fetch_add(1, Ordering::Relaxed);
    }

    pub fn frame_rejected(&self) {
        self.frames_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn intent_sent(&self) {
        self.intents_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn intent_rejected(&self) {
        self.intents_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_established(&self) {
        self.connections_established.fetch_add(1, Ordering::Relaxed);
    }

    pub fn reconnect_attempted(&self) {
        self.reconnect_attempts.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            frames_received: self.frames_received.load(Ordering::Relaxed),
            frames_ignored: self.frames_ignored.load(Ordering::Relaxed),
            frames_rejected: self.frames_rejected.load(Ordering::Relaxed),
            intents_sent: self.intents_sent.load(Ordering::Relaxed),
            intents_rejected: self.intents_rejected.load(Ordering::Relaxed),
            connections_established: self.connections_established.load(Ordering::Relaxed),
            reconnect_attempts: self.reconnect_attempts.load(Ordering::Relaxed),
        }
    }
}

/// Serializable metrics snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Frames decoded into a known event
    pub frames_received: u64,
    /// Frames with an unhandled event name
    pub frames_ignored: u64,
    /// Oversize or malformed frames
    pub frames_rejected: u64,
    /// Intents handed to the transport
    pub intents_sent: u64,
    /// Intents refused while disconnected
    pub intents_rejected: u64,
    /// Connections established
    pub connections_established: u64,
    /// Reconnect attempts started
    pub reconnect_attempts: u64,
}
