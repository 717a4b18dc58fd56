//! Voice session management
//!
//! This module provides the `VoiceSession` abstraction that manages:
//! - Connection lifecycle for the duplex voice stream
//! - Microphone capture and frame forwarding
//! - Ordered playback of inbound synthesized audio
//! - Transcript collection shared with the feedback call
//! - Session status reporting

mod config;
mod session;
mod state;
mod stats;

pub use config::SessionConfig;
pub use session::{SessionError, VoiceSession};
pub use state::{ConnectionState, RecordingState};
pub use stats::SessionStatus;
