pub mod audio;
pub mod config;
pub mod feedback;
pub mod http;
pub mod session;
pub mod transport;

pub use audio::{
    AudioChunk, AudioFrame, AudioSink, CaptureBackend, CaptureConfig, CaptureError, MicBackend,
    NullSink, PlaybackQueue, RenderError,
};
pub use config::Config;
pub use feedback::{FeedbackClient, Role, TranscriptEntry, CANNED_FEEDBACK};
pub use http::{create_router, AppState};
pub use session::{
    ConnectionState, RecordingState, SessionConfig, SessionError, SessionStatus, VoiceSession,
};
pub use transport::{
    Transport, TransportConnector, TransportError, TransportEvent, TransportSender, WsConnector,
};
