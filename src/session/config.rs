use serde::{Deserialize, Serialize};

/// Configuration for a voice session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Unique session identifier (e.g., "voice-2026-08-07-coaching")
    pub session_id: String,

    /// WebSocket URL of the voice streaming endpoint
    pub stream_url: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_id: format!("voice-{}", uuid::Uuid::new_v4()),
            stream_url: "ws://localhost:8090/voice-stream".to_string(),
        }
    }
}
