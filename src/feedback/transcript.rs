use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who produced a transcript message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The trainee speaking into the microphone
    User,
    /// The synthesized voice coming back over the stream
    Assistant,
}

/// A single role-tagged message in the session's transcript
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub role: Role,

    pub text: String,

    /// When this message was logged
    pub timestamp: DateTime<Utc>,
}

impl TranscriptEntry {
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }
}
