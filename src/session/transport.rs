//! Websocket transport to the live coaching endpoint.
//!
//! [`LiveTransport::connect`] dials the endpoint, performs the setup
//! handshake, then splits the socket: the write half stays behind the
//! [`CoachTransport`] trait for the session loop to send capture chunks, and
//! the read half is drained by a pump task that translates every inbound
//! frame into a [`ServerEvent`] on an mpsc channel.
//!
//! The trait seam exists so the session loop can be exercised in tests with
//! a mock transport instead of a network connection.

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::audio::MediaChunk;
use crate::config::{ApiConfig, CoachConfig};
use crate::session::wire::{self, ServerMessage};

type RawWs = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<RawWs, Message>;
type WsSource = SplitStream<RawWs>;

// ---------------------------------------------------------------------------
// TransportError
// ---------------------------------------------------------------------------

/// Errors raised by the websocket transport.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to reach the coaching endpoint: {0}")]
    Connect(String),

    #[error("session setup was not acknowledged: {0}")]
    Handshake(String),

    #[error("failed to send audio chunk: {0}")]
    Send(String),

    /// The sink is gone (session closed); callers log and move on rather
    /// than crashing the capture path.
    #[error("session is not connected")]
    NotConnected,
}

// ---------------------------------------------------------------------------
// ServerEvent
// ---------------------------------------------------------------------------

/// Inbound events delivered by the read pump, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    /// A base64 PCM payload of synthesized speech for the scheduler.
    Audio(String),
    /// The remote wants all queued playback discarded (barge-in).
    Interrupted,
    /// The remote closed the connection without an error.
    Closed,
    /// The transport failed.
    Error(String),
}

// ---------------------------------------------------------------------------
// CoachTransport
// ---------------------------------------------------------------------------

/// Write side of the session transport.
///
/// Implementors must be `Send + Sync` so the session loop can hold them as
/// `Arc<dyn CoachTransport>`.
#[async_trait]
pub trait CoachTransport: Send + Sync {
    /// Transmit one encoded capture chunk.
    async fn send_chunk(&self, chunk: MediaChunk) -> Result<(), TransportError>;

    /// Close the connection; idempotent and best-effort.
    async fn close(&self);
}

// ---------------------------------------------------------------------------
// LiveTransport
// ---------------------------------------------------------------------------

/// The production transport: one websocket to the coaching endpoint.
pub struct LiveTransport {
    sink: Arc<Mutex<Option<WsSink>>>,
}

/// Websocket URL of the bidirectional generation endpoint.
pub fn endpoint_url(base_url: &str, api_key: &str) -> String {
    format!(
        "{}/ws/google.ai.generativelanguage.v1beta.GenerativeService.BidiGenerateContent?key={}",
        base_url.trim_end_matches('/'),
        api_key
    )
}

impl LiveTransport {
    /// Dial the endpoint, send the setup message, and wait for the server's
    /// acknowledgement.
    ///
    /// Returns the transport plus the receiver of inbound [`ServerEvent`]s.
    /// The capture side may start sending as soon as this returns.
    pub async fn connect(
        api: &ApiConfig,
        coach: &CoachConfig,
        api_key: &str,
    ) -> Result<(Self, mpsc::Receiver<ServerEvent>), TransportError> {
        let url = endpoint_url(&api.base_url, api_key);
        log::info!("dialing coaching endpoint");

        let (mut ws, _response) = connect_async(url.as_str())
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;

        let setup = wire::setup_message(&api.model, &coach.voice, &coach.system_instruction);
        let json =
            serde_json::to_string(&setup).map_err(|e| TransportError::Handshake(e.to_string()))?;
        ws.send(Message::Text(json))
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;

        Self::await_setup_ack(&mut ws).await?;
        log::info!("session setup acknowledged");

        let (sink, stream) = ws.split();
        let (events_tx, events_rx) = mpsc::channel(64);
        tokio::spawn(read_pump(stream, events_tx));

        Ok((
            Self {
                sink: Arc::new(Mutex::new(Some(sink))),
            },
            events_rx,
        ))
    }

    /// Read frames until the setup acknowledgement arrives.
    async fn await_setup_ack(ws: &mut RawWs) -> Result<(), TransportError> {
        loop {
            let text = match ws.next().await {
                Some(Ok(Message::Text(text))) => text,
                Some(Ok(Message::Binary(bytes))) => String::from_utf8(bytes)
                    .map_err(|e| TransportError::Handshake(e.to_string()))?,
                Some(Ok(Message::Close(_))) | None => {
                    return Err(TransportError::Handshake(
                        "connection closed before acknowledgement".into(),
                    ));
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(TransportError::Connect(e.to_string())),
            };

            let msg: ServerMessage = serde_json::from_str(&text)
                .map_err(|e| TransportError::Handshake(e.to_string()))?;
            if msg.is_setup_complete() {
                return Ok(());
            }
            return Err(TransportError::Handshake(
                "unexpected first message from endpoint".into(),
            ));
        }
    }
}

#[async_trait]
impl CoachTransport for LiveTransport {
    async fn send_chunk(&self, chunk: MediaChunk) -> Result<(), TransportError> {
        let json = serde_json::to_string(&wire::realtime_input(chunk))
            .map_err(|e| TransportError::Send(e.to_string()))?;

        let mut guard = self.sink.lock().await;
        let sink = guard.as_mut().ok_or(TransportError::NotConnected)?;
        sink.send(Message::Text(json))
            .await
            .map_err(|e| TransportError::Send(e.to_string()))
    }

    async fn close(&self) {
        if let Some(mut sink) = self.sink.lock().await.take() {
            let _ = sink.send(Message::Close(None)).await;
            log::debug!("transport closed");
        }
    }
}

// ---------------------------------------------------------------------------
// Read pump
// ---------------------------------------------------------------------------

/// Drain the read half, translating frames into [`ServerEvent`]s.
///
/// A message carrying both audio and the interrupted flag emits the audio
/// event first, then the interruption.  Unparseable frames are dropped with
/// a warning; they never take the session down.
async fn read_pump(mut stream: WsSource, events_tx: mpsc::Sender<ServerEvent>) {
    loop {
        let text = match stream.next().await {
            Some(Ok(Message::Text(text))) => text,
            Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes) {
                Ok(text) => text,
                Err(e) => {
                    log::warn!("dropping non-UTF-8 frame: {e}");
                    continue;
                }
            },
            Some(Ok(Message::Close(_))) => break,
            Some(Ok(_)) => continue,
            Some(Err(e)) => {
                let _ = events_tx.send(ServerEvent::Error(e.to_string())).await;
                return;
            }
            None => break,
        };

        let msg: ServerMessage = match serde_json::from_str(&text) {
            Ok(msg) => msg,
            Err(e) => {
                log::warn!("dropping unparseable server message: {e}");
                continue;
            }
        };

        if let Some(payload) = msg.audio_payload() {
            if events_tx
                .send(ServerEvent::Audio(payload.to_string()))
                .await
                .is_err()
            {
                log::debug!("event receiver dropped, closing read pump");
                return;
            }
        }

        if msg.is_interrupted() && events_tx.send(ServerEvent::Interrupted).await.is_err() {
            return;
        }
    }

    let _ = events_tx.send(ServerEvent::Closed).await;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_url_embeds_service_path_and_key() {
        let url = endpoint_url("wss://example.test", "k-123");
        assert!(url.starts_with("wss://example.test/ws/"));
        assert!(url.contains("BidiGenerateContent"));
        assert!(url.ends_with("?key=k-123"));
    }

    #[test]
    fn endpoint_url_tolerates_trailing_slash() {
        let url = endpoint_url("wss://example.test/", "k");
        assert!(!url.contains(".test//"));
    }

    #[test]
    fn transport_trait_is_object_safe() {
        fn assert_dyn(_t: &dyn CoachTransport) {}
        let _ = assert_dyn;
    }
}
