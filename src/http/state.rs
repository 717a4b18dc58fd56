use crate::feedback::FeedbackClient;
use crate::session::VoiceSession;
use std::sync::Arc;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// The one voice session this process drives
    pub session: Arc<VoiceSession>,

    /// Client for the feedback endpoint
    pub feedback: Arc<FeedbackClient>,
}

impl AppState {
    pub fn new(session: Arc<VoiceSession>, feedback: Arc<FeedbackClient>) -> Self {
        Self { session, feedback }
    }
}
