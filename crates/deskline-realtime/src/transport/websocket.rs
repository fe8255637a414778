//! WebSocket transport built on `tokio-tungstenite`.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

use deskline_core::ErrorKind;
use deskline_core::config::RealtimeConfig;
use deskline_core::error::AppError;
use deskline_core::result::AppResult;
use deskline_core::types::TransportId;

use crate::connection::identity::AuthToken;

use super::{Connector, TransportFrame, TransportLink};

/// Response header carrying the server-assigned transport id.
pub const TRANSPORT_ID_HEADER: &str = "x-transport-id";

/// Opens WebSocket links, authenticating with a bearer token on the upgrade request.
#[derive(Debug, Default, Clone)]
pub struct WebSocketConnector;

impl WebSocketConnector {
    /// Creates a new WebSocket connector.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Connector for WebSocketConnector {
    async fn open(
        &self,
        url: &str,
        token: &AuthToken,
        config: &RealtimeConfig,
    ) -> AppResult<TransportLink> {
        let mut request = url.into_client_request().map_err(|e| {
            AppError::with_source(
                ErrorKind::Configuration,
                format!("Invalid realtime URL '{url}': {e}"),
                e,
            )
        })?;

        let bearer = HeaderValue::from_str(&format!("Bearer {}", token.expose()))
            .map_err(|_| AppError::authentication("Auth token is not a valid header value"))?;
        request.headers_mut().insert(AUTHORIZATION, bearer);

        let (stream, response) = tokio::time::timeout(config.connect_timeout(), connect_async(request))
            .await
            .map_err(|_| {
                AppError::timeout(format!(
                    "Handshake with {url} timed out after {}s",
                    config.connect_timeout_seconds
                ))
            })?
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::Transport,
                    format!("WebSocket handshake failed: {e}"),
                    e,
                )
            })?;

        let transport_id = response
            .headers()
            .get(TRANSPORT_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(TransportId::from)
            .unwrap_or_else(|| TransportId::new(Uuid::new_v4().to_string()));

        let (mut sink, mut source) = stream.split();
        let (outbound_tx, mut outbound_rx) = mpsc::channel::<String>(config.outbound_buffer_size);
        let (inbound_tx, inbound_rx) = mpsc::channel(config.inbound_buffer_size);
        let shutdown = CancellationToken::new();

        let writer_shutdown = shutdown.clone();
        let writer_errors = inbound_tx.clone();
        let writer_id = transport_id.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = writer_shutdown.cancelled() => {
                        // Frames already accepted by `send` still go out before the close.
                        outbound_rx.close();
                        while let Some(text) = outbound_rx.recv().await {
                            if sink.send(Message::Text(text.into())).await.is_err() {
                                break;
                            }
                        }
                        let _ = sink.send(Message::Close(None)).await;
                        break;
                    }
                    next = outbound_rx.recv() => match next {
                        Some(text) => {
                            if let Err(e) = sink.send(Message::Text(text.into())).await {
                                let _ = writer_errors
                                    .send(TransportFrame::Failed { error: e.to_string() })
                                    .await;
                                break;
                            }
                        }
                        None => {
                            let _ = sink.send(Message::Close(None)).await;
                            break;
                        }
                    }
                }
            }
            debug!(transport_id = %writer_id, "WebSocket writer stopped");
        });

        let reader_shutdown = shutdown.clone();
        let reader_id = transport_id.clone();
        tokio::spawn(async move {
            loop {
                let next = tokio::select! {
                    biased;
                    _ = reader_shutdown.cancelled() => break,
                    next = source.next() => next,
                };

                let frame = match next {
                    Some(Ok(Message::Text(text))) => TransportFrame::Text(text.as_str().to_owned()),
                    Some(Ok(Message::Binary(data))) => match String::from_utf8(data.to_vec()) {
                        Ok(text) => TransportFrame::Text(text),
                        Err(_) => {
                            warn!(transport_id = %reader_id, "Dropping non-UTF-8 binary frame");
                            continue;
                        }
                    },
                    Some(Ok(Message::Close(frame))) => TransportFrame::Closed {
                        reason: frame
                            .map(|f| f.reason.as_str().to_owned())
                            .filter(|r| !r.is_empty())
                            .unwrap_or_else(|| "server closed connection".to_string()),
                    },
                    // Ping/pong are answered by tungstenite itself.
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => TransportFrame::Failed {
                        error: e.to_string(),
                    },
                    None => TransportFrame::Closed {
                        reason: "stream ended".to_string(),
                    },
                };

                let terminal = !matches!(frame, TransportFrame::Text(_));
                if inbound_tx.send(frame).await.is_err() || terminal {
                    break;
                }
            }
            debug!(transport_id = %reader_id, "WebSocket reader stopped");
        });

        Ok(TransportLink {
            transport_id,
            outbound: outbound_tx,
            inbound: inbound_rx,
            shutdown,
        })
    }
}
