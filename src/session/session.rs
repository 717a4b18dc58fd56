use super::config::SessionConfig;
use super::state::{ConnectionState, RecordingState};
use super::stats::SessionStatus;
use crate::audio::{AudioChunk, AudioSink, CaptureBackend, CaptureError, PlaybackQueue};
use crate::feedback::{Role, TranscriptEntry};
use crate::transport::{TransportConnector, TransportEvent, TransportSender};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Errors returned by session operations that reject illegal transitions.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("cannot connect while {0}")]
    AlreadyActive(&'static str),

    #[error("not connected to the voice service")]
    NotConnected,

    #[error("already recording")]
    AlreadyRecording,

    #[error(transparent)]
    Capture(#[from] CaptureError),
}

/// The voice session: one duplex audio interaction with the remote service.
///
/// Owns the transport (exclusively, one instance per connect), the capture
/// backend, and the playback queue. All operations are safe to call in any
/// state; illegal transitions are rejected with [`SessionError`] and
/// teardown paths are idempotent.
///
/// A generation counter guards every transport callback: `connect()` and
/// `disconnect()` each bump it, and a dial result or transport event
/// carrying a stale generation is discarded. That is what keeps a connect
/// attempt that succeeds *after* a disconnect from resurrecting the
/// session.
pub struct VoiceSession {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    config: SessionConfig,

    connector: Arc<dyn TransportConnector>,

    /// Capture backend; the device is only held open while recording.
    capture: Mutex<Box<dyn CaptureBackend>>,

    playback: PlaybackQueue,

    /// Lock order: `connection` before `sender` before task slots.
    /// Generation checks and state commits happen under the `connection`
    /// write lock so a stale dial can never interleave with a disconnect.
    connection: RwLock<ConnectionState>,

    recording: AtomicBool,

    generation: AtomicU64,

    sender: Mutex<Option<TransportSender>>,

    last_error: Mutex<Option<String>>,

    /// Role-tagged message log, shared with the feedback call.
    transcript: Mutex<Vec<TranscriptEntry>>,

    pump_task: Mutex<Option<JoinHandle<()>>>,

    forward_task: Mutex<Option<JoinHandle<()>>>,
}

impl VoiceSession {
    pub fn new(
        config: SessionConfig,
        connector: Arc<dyn TransportConnector>,
        capture: Box<dyn CaptureBackend>,
        sink: Arc<dyn AudioSink>,
    ) -> Self {
        info!("Creating voice session: {}", config.session_id);

        Self {
            inner: Arc::new(SessionInner {
                config,
                connector,
                capture: Mutex::new(capture),
                playback: PlaybackQueue::new(sink),
                connection: RwLock::new(ConnectionState::Disconnected),
                recording: AtomicBool::new(false),
                generation: AtomicU64::new(0),
                sender: Mutex::new(None),
                last_error: Mutex::new(None),
                transcript: Mutex::new(Vec::new()),
                pump_task: Mutex::new(None),
                forward_task: Mutex::new(None),
            }),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.inner.config.session_id
    }

    /// Open the voice stream. Legal only from `Disconnected` or `Failed`;
    /// the session moves to `Connecting` immediately and to `Connected`
    /// (or `Failed`) when the dial resolves.
    pub async fn connect(&self) -> Result<(), SessionError> {
        let generation = {
            let mut connection = self.inner.connection.write().await;
            match *connection {
                ConnectionState::Connected => return Err(SessionError::AlreadyActive("connected")),
                ConnectionState::Connecting => {
                    return Err(SessionError::AlreadyActive("connecting"))
                }
                _ => {}
            }
            *connection = ConnectionState::Connecting;
            self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1
        };

        *self.inner.last_error.lock().await = None;

        info!(
            "Session {} connecting to {}",
            self.inner.config.session_id, self.inner.config.stream_url
        );

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move { inner.dial(generation).await });

        Ok(())
    }

    /// Tear the session down. Legal from any state, idempotent, and never
    /// an error: capture stops first, then the transport closes, then
    /// pending playback is dropped.
    pub async fn disconnect(&self) {
        {
            let mut connection = self.inner.connection.write().await;
            // Invalidate any in-flight dial and any live event pump.
            self.inner.generation.fetch_add(1, Ordering::SeqCst);
            *connection = ConnectionState::Disconnected;
        }

        if let Some(pump) = self.inner.pump_task.lock().await.take() {
            pump.abort();
            let _ = pump.await;
        }

        self.inner.stop_capture().await;

        if let Some(sender) = self.inner.sender.lock().await.take() {
            sender.close();
        }

        self.inner.playback.clear().await;

        info!("Session {} disconnected", self.inner.config.session_id);
    }

    /// Start streaming microphone audio. Legal only while `Connected` and
    /// not already recording. Device access happens here, so this is the
    /// call that can fail with a permission denial, in which case the
    /// session stays connected and idle, with the denial in the status.
    pub async fn start_recording(&self) -> Result<(), SessionError> {
        if *self.inner.connection.read().await != ConnectionState::Connected {
            return Err(SessionError::NotConnected);
        }

        if self.inner.recording.swap(true, Ordering::SeqCst) {
            return Err(SessionError::AlreadyRecording);
        }

        let frames = {
            let mut capture = self.inner.capture.lock().await;
            match capture.start().await {
                Ok(rx) => rx,
                Err(e) => {
                    self.inner.recording.store(false, Ordering::SeqCst);
                    let message = match &e {
                        CaptureError::PermissionDenied => {
                            "microphone permission denied".to_string()
                        }
                        other => format!("capture failed: {}", other),
                    };
                    warn!("Session {}: {}", self.inner.config.session_id, message);
                    *self.inner.last_error.lock().await = Some(message);
                    return Err(SessionError::Capture(e));
                }
            }
        };

        // The connection may have dropped while the device was opening.
        let sender = match self.inner.sender.lock().await.clone() {
            Some(sender) if *self.inner.connection.read().await == ConnectionState::Connected => {
                sender
            }
            _ => {
                self.inner.recording.store(false, Ordering::SeqCst);
                let mut capture = self.inner.capture.lock().await;
                if let Err(e) = capture.stop().await {
                    warn!("Failed to stop capture after lost connection: {}", e);
                }
                return Err(SessionError::NotConnected);
            }
        };

        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(async move { inner.forward_frames(frames, sender).await });
        *self.inner.forward_task.lock().await = Some(handle);

        info!("Session {} recording", self.inner.config.session_id);

        Ok(())
    }

    /// Stop streaming microphone audio. A no-op when not recording.
    pub async fn stop_recording(&self) {
        if !self.inner.recording.load(Ordering::SeqCst) {
            debug!("stop_recording: not recording");
            return;
        }

        self.inner.stop_capture().await;
        info!("Session {} stopped recording", self.inner.config.session_id);
    }

    pub async fn connection_state(&self) -> ConnectionState {
        *self.inner.connection.read().await
    }

    pub fn is_recording(&self) -> bool {
        self.inner.recording.load(Ordering::SeqCst)
    }

    /// Snapshot of the session for status surfaces.
    pub async fn status(&self) -> SessionStatus {
        let connection = *self.inner.connection.read().await;
        let recording = if self.inner.recording.load(Ordering::SeqCst) {
            RecordingState::Recording
        } else {
            RecordingState::Idle
        };
        let dropped_frames = self
            .inner
            .sender
            .lock()
            .await
            .as_ref()
            .map(|s| s.dropped_frames())
            .unwrap_or(0);

        SessionStatus {
            session_id: self.inner.config.session_id.clone(),
            connection,
            recording,
            pending_chunks: self.inner.playback.pending_chunks().await,
            chunks_played: self.inner.playback.chunks_played(),
            chunks_discarded: self.inner.playback.chunks_discarded(),
            dropped_frames,
            last_error: self.inner.last_error.lock().await.clone(),
        }
    }

    /// The single human-readable status line.
    pub async fn status_line(&self) -> String {
        self.status().await.describe()
    }

    /// Append a role-tagged message to the session transcript.
    pub async fn log_message(&self, role: Role, text: impl Into<String>) {
        self.inner
            .transcript
            .lock()
            .await
            .push(TranscriptEntry::new(role, text));
    }

    /// Snapshot of the transcript accumulated so far.
    pub async fn transcript(&self) -> Vec<TranscriptEntry> {
        self.inner.transcript.lock().await.clone()
    }
}

impl SessionInner {
    /// Resolve one connect attempt. Runs detached; everything it commits is
    /// generation-guarded so a disconnect issued mid-dial wins.
    async fn dial(self: Arc<Self>, generation: u64) {
        let result = self.connector.connect(&self.config.stream_url).await;

        let mut connection = self.connection.write().await;
        if self.generation.load(Ordering::SeqCst) != generation {
            debug!("Discarding superseded dial result");
            if let Ok(transport) = result {
                transport.sender.close();
            }
            return;
        }

        match result {
            Ok(transport) => {
                *self.sender.lock().await = Some(transport.sender);
                *connection = ConnectionState::Connected;
                info!("Session {} connected", self.config.session_id);

                let inner = Arc::clone(&self);
                let events = transport.events;
                let pump =
                    tokio::spawn(async move { inner.pump_events(generation, events).await });
                *self.pump_task.lock().await = Some(pump);
            }
            Err(e) => {
                warn!("Session {} connection failed: {}", self.config.session_id, e);
                *self.last_error.lock().await = Some(format!("connection failed: {}", e));
                *connection = ConnectionState::Failed;
            }
        }
    }

    /// Consume transport events until a terminal one arrives or this
    /// generation is superseded. Inbound chunks feed the playback queue in
    /// arrival order.
    async fn pump_events(
        self: Arc<Self>,
        generation: u64,
        mut events: mpsc::Receiver<TransportEvent>,
    ) {
        while let Some(event) = events.recv().await {
            if self.generation.load(Ordering::SeqCst) != generation {
                debug!("Ignoring event from superseded transport");
                break;
            }

            match event {
                TransportEvent::Chunk(payload) => {
                    self.playback.enqueue(AudioChunk::new(payload)).await;
                }
                TransportEvent::Error(e) => {
                    warn!("Session {} transport error: {}", self.config.session_id, e);
                    *self.last_error.lock().await = Some(format!("connection error: {}", e));
                    self.teardown(generation, ConnectionState::Failed).await;
                    break;
                }
                TransportEvent::Closed => {
                    info!("Session {} stream closed", self.config.session_id);
                    self.teardown(generation, ConnectionState::Disconnected).await;
                    break;
                }
            }
        }

        debug!("Event pump stopped");
    }

    /// Transport-initiated teardown. Skipped entirely if a newer
    /// generation (a user disconnect or reconnect) already took over.
    async fn teardown(self: &Arc<Self>, generation: u64, final_state: ConnectionState) {
        {
            let mut connection = self.connection.write().await;
            if self.generation.load(Ordering::SeqCst) != generation {
                return;
            }
            self.generation.fetch_add(1, Ordering::SeqCst);
            *connection = final_state;
        }

        self.stop_capture().await;

        if let Some(sender) = self.sender.lock().await.take() {
            sender.close();
        }

        self.playback.clear().await;
    }

    /// Forward captured frames to the transport until capture ends.
    /// Frames produced while the link is not ready are dropped inside
    /// `send`: at most once, no buffering.
    async fn forward_frames(
        self: Arc<Self>,
        mut frames: mpsc::Receiver<crate::audio::AudioFrame>,
        sender: TransportSender,
    ) {
        let mut forwarded: u64 = 0;

        while let Some(frame) = frames.recv().await {
            if !self.recording.load(Ordering::SeqCst) {
                break;
            }
            sender.send(frame.payload);
            forwarded += 1;
        }

        debug!("Frame forwarding stopped after {} frames", forwarded);
    }

    /// Stop capture and reap the forwarding task. Idempotent; used by
    /// `stop_recording`, `disconnect`, and transport teardown.
    async fn stop_capture(&self) {
        self.recording.store(false, Ordering::SeqCst);

        {
            let mut capture = self.capture.lock().await;
            if capture.is_capturing() {
                if let Err(e) = capture.stop().await {
                    warn!("Failed to stop capture backend: {}", e);
                }
            }
        }

        // The frame channel closes with the backend, which ends the
        // forwarding task; joining it here keeps shutdown deterministic.
        if let Some(task) = self.forward_task.lock().await.take() {
            let _ = task.await;
        }
    }
}
