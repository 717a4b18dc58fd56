use super::transcript::TranscriptEntry;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

/// Shown whenever the feedback service cannot be reached or answers with
/// something unusable. The caller always gets text back.
pub const CANNED_FEEDBACK: &str = "Feedback is not available right now. \
Review the transcript of this session and compare your responses against \
the scenario objectives before your next attempt.";

const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// Feedback client errors (internal; the public API degrades to canned
/// content instead of surfacing these)
#[derive(Debug, Error)]
enum FeedbackError {
    #[error("network error: {0}")]
    Network(String),

    #[error("feedback service returned HTTP {0}")]
    Api(u16),

    #[error("malformed feedback response: {0}")]
    Parse(String),

    #[error("feedback service returned empty text")]
    Empty,
}

#[derive(Debug, Serialize)]
struct FeedbackRequest<'a> {
    messages: &'a [TranscriptEntry],
}

#[derive(Debug, Deserialize)]
struct FeedbackResponse {
    text: String,
}

/// Posts a session transcript to the feedback endpoint and returns the
/// textual result, falling back to [`CANNED_FEEDBACK`] on any failure.
pub struct FeedbackClient {
    http: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

impl FeedbackClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Request feedback for a transcript. Never fails: any error path
    /// degrades to the canned fallback text.
    pub async fn request_feedback(&self, transcript: &[TranscriptEntry]) -> String {
        match self.try_fetch(transcript).await {
            Ok(text) => {
                info!("Received {} bytes of feedback", text.len());
                text
            }
            Err(e) => {
                warn!("Feedback request failed, using canned content: {}", e);
                CANNED_FEEDBACK.to_string()
            }
        }
    }

    async fn try_fetch(&self, transcript: &[TranscriptEntry]) -> Result<String, FeedbackError> {
        let response = self
            .http
            .post(&self.endpoint)
            .timeout(self.timeout)
            .json(&FeedbackRequest {
                messages: transcript,
            })
            .send()
            .await
            .map_err(|e| FeedbackError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedbackError::Api(status.as_u16()));
        }

        let body: FeedbackResponse = response
            .json()
            .await
            .map_err(|e| FeedbackError::Parse(e.to_string()))?;

        if body.text.trim().is_empty() {
            return Err(FeedbackError::Empty);
        }

        Ok(body.text)
    }
}
