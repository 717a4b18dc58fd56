use super::state::{ConnectionState, RecordingState};
use serde::{Deserialize, Serialize};

/// Point-in-time snapshot of a voice session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStatus {
    /// Session identifier
    pub session_id: String,

    /// Current connection state
    pub connection: ConnectionState,

    /// Current recording state
    pub recording: RecordingState,

    /// Chunks waiting behind the one currently playing
    pub pending_chunks: usize,

    /// Chunks rendered to completion so far
    pub chunks_played: u64,

    /// Chunks discarded because they could not be decoded
    pub chunks_discarded: u64,

    /// Outbound frames dropped while the transport was not ready
    pub dropped_frames: u64,

    /// Last error, if any (connection failure, permission denial)
    pub last_error: Option<String>,
}

impl SessionStatus {
    /// Single human-readable status line for the caller's UI.
    pub fn describe(&self) -> String {
        let mut line = self.connection.as_str().to_string();
        if self.recording == RecordingState::Recording {
            line.push_str(", recording");
        }
        if let Some(err) = &self.last_error {
            line.push_str(&format!(" ({})", err));
        }
        line
    }
}
