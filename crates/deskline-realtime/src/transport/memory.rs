//! In-process transport.
//!
//! [`MemoryConnector`] hands the server side of every link it opens to a
//! [`MemoryListener`], which lets tests and embedding applications play
//! the server: push events, read intents, and drop the link.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use deskline_core::config::RealtimeConfig;
use deskline_core::error::AppError;
use deskline_core::result::AppResult;
use deskline_core::types::TransportId;

use crate::connection::identity::AuthToken;

use super::{Connector, TransportFrame, TransportLink};

/// Connector whose links terminate in this process.
#[derive(Debug, Clone)]
pub struct MemoryConnector {
    accepted: mpsc::UnboundedSender<MemoryServerEnd>,
    refusals: Arc<AtomicUsize>,
    opened: Arc<AtomicU64>,
}

/// Receives the server end of every link a [`MemoryConnector`] opens.
#[derive(Debug)]
pub struct MemoryListener {
    accepted: mpsc::UnboundedReceiver<MemoryServerEnd>,
}

/// The server side of one in-memory link.
#[derive(Debug)]
pub struct MemoryServerEnd {
    /// Transport id handed to the client.
    pub transport_id: TransportId,
    /// URL the client asked for.
    pub url: String,
    /// Token presented by the client.
    pub token: AuthToken,
    to_client: mpsc::Sender<TransportFrame>,
    from_client: mpsc::Receiver<String>,
    shutdown: CancellationToken,
}

impl MemoryConnector {
    /// Creates a connector and the listener that receives its links.
    pub fn new() -> (Self, MemoryListener) {
        let (tx, rx) = mpsc::unbounded_channel();
        let connector = Self {
            accepted: tx,
            refusals: Arc::new(AtomicUsize::new(0)),
            opened: Arc::new(AtomicU64::new(0)),
        };
        (connector, MemoryListener { accepted: rx })
    }

    /// Makes the next `count` open attempts fail.
    pub fn refuse_next(&self, count: usize) {
        self.refusals.store(count, Ordering::SeqCst);
    }

    /// Number of links opened so far.
    pub fn opened(&self) -> u64 {
        self.opened.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn open(
        &self,
        url: &str,
        token: &AuthToken,
        config: &RealtimeConfig,
    ) -> AppResult<TransportLink> {
        let refused = self
            .refusals
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if refused {
            return Err(AppError::transport("connection refused"));
        }

        let sequence = self.opened.fetch_add(1, Ordering::SeqCst) + 1;
        let transport_id = TransportId::new(format!("mem-{sequence}"));
        let (outbound_tx, outbound_rx) = mpsc::channel(config.outbound_buffer_size);
        let (inbound_tx, inbound_rx) = mpsc::channel(config.inbound_buffer_size);
        let shutdown = CancellationToken::new();

        let server = MemoryServerEnd {
            transport_id: transport_id.clone(),
            url: url.to_string(),
            token: token.clone(),
            to_client: inbound_tx,
            from_client: outbound_rx,
            shutdown: shutdown.clone(),
        };
        self.accepted
            .send(server)
            .map_err(|_| AppError::transport("memory listener dropped"))?;

        Ok(TransportLink {
            transport_id,
            outbound: outbound_tx,
            inbound: inbound_rx,
            shutdown,
        })
    }
}

impl MemoryListener {
    /// Waits for the next opened link.
    pub async fn accept(&mut self) -> Option<MemoryServerEnd> {
        self.accepted.recv().await
    }

    /// Returns an already opened link, if any.
    pub fn try_accept(&mut self) -> Option<MemoryServerEnd> {
        self.accepted.try_recv().ok()
    }
}

impl MemoryServerEnd {
    /// Pushes `{"event": event, "data": data}` to the client.
    pub async fn push(&self, event: &str, data: Value) -> bool {
        let frame = serde_json::json!({ "event": event, "data": data });
        self.push_raw(frame.to_string()).await
    }

    /// Pushes a raw text frame to the client.
    pub async fn push_raw(&self, text: impl Into<String>) -> bool {
        self.to_client
            .send(TransportFrame::Text(text.into()))
            .await
            .is_ok()
    }

    /// Next intent the client sent, parsed as JSON.
    pub async fn recv_intent(&mut self) -> Option<Value> {
        let text = self.from_client.recv().await?;
        serde_json::from_str(&text).ok()
    }

    /// Next intent if one is already queued.
    pub fn try_recv_intent(&mut self) -> Option<Value> {
        let text = self.from_client.try_recv().ok()?;
        serde_json::from_str(&text).ok()
    }

    /// Closes the link from the server side.
    pub async fn close(&self, reason: &str) {
        let _ = self
            .to_client
            .send(TransportFrame::Closed {
                reason: reason.to_string(),
            })
            .await;
    }

    /// Fails the link from the server side.
    pub async fn fail(&self, error: &str) {
        let _ = self
            .to_client
            .send(TransportFrame::Failed {
                error: error.to_string(),
            })
            .await;
    }

    /// True once the client has closed its side.
    pub fn is_closed_by_client(&self) -> bool {
        self.shutdown.is_cancelled()
    }
}
