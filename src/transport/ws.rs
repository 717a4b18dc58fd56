use super::event::TransportEvent;
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, trace, warn};

/// Transport-level errors. Only connection establishment is fallible from
/// the caller's point of view; everything after that surfaces as a
/// [`TransportEvent`].
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid stream URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("connection failed: {0}")]
    Connect(String),
}

/// Commands consumed by a transport's writer half.
#[derive(Debug)]
pub enum WireCommand {
    /// One outbound binary frame of encoded capture audio.
    Frame(Vec<u8>),
    /// Close the connection politely and stop the writer.
    Shutdown,
}

/// Fire-and-forget sending half of a transport.
///
/// `send` never blocks and never fails: while the link is not in a
/// ready state the frame is dropped on the floor. No buffering, no retry.
#[derive(Clone)]
pub struct TransportSender {
    commands: mpsc::UnboundedSender<WireCommand>,
    ready: Arc<AtomicBool>,
    dropped: Arc<AtomicU64>,
}

impl TransportSender {
    /// Create a sender plus the command receiver its writer half consumes.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<WireCommand>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let sender = Self {
            commands: tx,
            ready: Arc::new(AtomicBool::new(true)),
            dropped: Arc::new(AtomicU64::new(0)),
        };
        (sender, rx)
    }

    /// Send one encoded audio frame, dropping it silently if the link is
    /// not ready.
    pub fn send(&self, frame: Vec<u8>) {
        if !self.ready.load(Ordering::SeqCst) {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            trace!("transport not ready, dropped {} byte frame", frame.len());
            return;
        }

        if self.commands.send(WireCommand::Frame(frame)).is_err() {
            // Writer is gone; the link is dead even if no event landed yet.
            self.ready.store(false, Ordering::SeqCst);
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Whether the link currently accepts frames.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    /// Number of frames dropped because the link was not ready.
    pub fn dropped_frames(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Mark the link not-ready and ask the writer to close the connection.
    /// Safe to call more than once.
    pub fn close(&self) {
        self.ready.store(false, Ordering::SeqCst);
        let _ = self.commands.send(WireCommand::Shutdown);
    }

    pub(crate) fn mark_not_ready(&self) {
        self.ready.store(false, Ordering::SeqCst);
    }
}

/// A live duplex connection: the sending half plus the inbound event stream.
///
/// One instance per successful dial. Once `events` yields a terminal event
/// the instance is spent; reconnecting means dialing a fresh one.
pub struct Transport {
    pub sender: TransportSender,
    pub events: mpsc::Receiver<TransportEvent>,
}

/// Seam between the session and the concrete wire protocol.
///
/// The session only ever dials through this trait, which is what lets the
/// state-machine tests script connections without a network.
#[async_trait]
pub trait TransportConnector: Send + Sync {
    async fn connect(&self, url: &str) -> Result<Transport, TransportError>;
}

/// Production connector: a binary WebSocket to the voice service.
#[derive(Debug, Default)]
pub struct WsConnector;

#[async_trait]
impl TransportConnector for WsConnector {
    async fn connect(&self, url: &str) -> Result<Transport, TransportError> {
        info!("Connecting to voice stream at {}", url);

        let (ws, _response) = connect_async(url).await.map_err(|e| match e {
            tokio_tungstenite::tungstenite::Error::Url(reason) => TransportError::InvalidUrl {
                url: url.to_string(),
                reason: reason.to_string(),
            },
            other => TransportError::Connect(other.to_string()),
        })?;

        info!("Voice stream connected");

        let (mut ws_tx, mut ws_rx) = ws.split();
        let (sender, mut commands) = TransportSender::channel();
        let (event_tx, event_rx) = mpsc::channel(64);

        // Writer: drains outbound frames until shutdown or a dead socket.
        // Failures are not reported from here; the reader owns the single
        // error/closed report for this transport instance.
        let writer_sender = sender.clone();
        tokio::spawn(async move {
            while let Some(cmd) = commands.recv().await {
                match cmd {
                    WireCommand::Frame(frame) => {
                        if let Err(e) = ws_tx.send(Message::Binary(frame)).await {
                            debug!("WebSocket write failed: {}", e);
                            writer_sender.mark_not_ready();
                            break;
                        }
                    }
                    WireCommand::Shutdown => {
                        let _ = ws_tx.send(Message::Close(None)).await;
                        let _ = ws_tx.flush().await;
                        break;
                    }
                }
            }
            debug!("Transport writer stopped");
        });

        // Reader: turns inbound messages into events. Emits exactly one
        // terminal event (Error or Closed) and exits.
        let reader_sender = sender.clone();
        tokio::spawn(async move {
            loop {
                match ws_rx.next().await {
                    Some(Ok(Message::Binary(payload))) => {
                        if event_tx.send(TransportEvent::Chunk(payload)).await.is_err() {
                            // Session stopped listening; nothing left to do.
                            break;
                        }
                    }
                    Some(Ok(Message::Text(text))) => {
                        // Non-binary messages are outside the protocol.
                        debug!("Ignoring {} byte text message on voice stream", text.len());
                    }
                    Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => {
                        trace!("WebSocket keepalive");
                    }
                    Some(Ok(Message::Close(frame))) => {
                        info!("Voice stream closed by remote: {:?}", frame);
                        reader_sender.mark_not_ready();
                        let _ = event_tx.send(TransportEvent::Closed).await;
                        break;
                    }
                    Some(Ok(Message::Frame(_))) => {
                        // Raw frames never surface from a configured stream.
                        warn!("Unexpected raw frame on voice stream");
                    }
                    Some(Err(e)) => {
                        warn!("Voice stream error: {}", e);
                        reader_sender.mark_not_ready();
                        let _ = event_tx.send(TransportEvent::Error(e.to_string())).await;
                        break;
                    }
                    None => {
                        reader_sender.mark_not_ready();
                        let _ = event_tx.send(TransportEvent::Closed).await;
                        break;
                    }
                }
            }
            debug!("Transport reader stopped");
        });

        Ok(Transport {
            sender,
            events: event_rx,
        })
    }
}
