use super::state::AppState;
use crate::feedback::{Role, TranscriptEntry};
use crate::session::{SessionError, SessionStatus};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use tracing::info;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session_id: String,
    pub status: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    /// Single human-readable status line
    pub message: String,
    pub status: SessionStatus,
}

#[derive(Debug, Deserialize)]
pub struct LogMessageRequest {
    pub role: Role,
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct FeedbackTextResponse {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn session_error_status(e: &SessionError) -> StatusCode {
    match e {
        SessionError::AlreadyActive(_) | SessionError::AlreadyRecording => StatusCode::CONFLICT,
        SessionError::NotConnected => StatusCode::CONFLICT,
        SessionError::Capture(crate::audio::CaptureError::PermissionDenied) => {
            StatusCode::FORBIDDEN
        }
        SessionError::Capture(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /voice/connect
/// Open the voice stream; the session reports Connecting immediately
pub async fn connect_session(State(state): State<AppState>) -> impl IntoResponse {
    match state.session.connect().await {
        Ok(()) => (
            StatusCode::OK,
            Json(SessionResponse {
                session_id: state.session.session_id().to_string(),
                status: state.session.status_line().await,
                message: "Connecting to voice stream".to_string(),
            }),
        )
            .into_response(),
        Err(e) => (
            session_error_status(&e),
            Json(ErrorResponse {
                error: e.to_string(),
            }),
        )
            .into_response(),
    }
}

/// POST /voice/disconnect
/// Tear the session down; always succeeds, safe to repeat
pub async fn disconnect_session(State(state): State<AppState>) -> impl IntoResponse {
    state.session.disconnect().await;

    (
        StatusCode::OK,
        Json(SessionResponse {
            session_id: state.session.session_id().to_string(),
            status: state.session.status_line().await,
            message: "Disconnected".to_string(),
        }),
    )
}

/// POST /voice/record/start
/// Start streaming microphone audio
pub async fn start_recording(State(state): State<AppState>) -> impl IntoResponse {
    match state.session.start_recording().await {
        Ok(()) => (
            StatusCode::OK,
            Json(SessionResponse {
                session_id: state.session.session_id().to_string(),
                status: state.session.status_line().await,
                message: "Recording started".to_string(),
            }),
        )
            .into_response(),
        Err(e) => (
            session_error_status(&e),
            Json(ErrorResponse {
                error: e.to_string(),
            }),
        )
            .into_response(),
    }
}

/// POST /voice/record/stop
/// Stop streaming microphone audio; a no-op when idle
pub async fn stop_recording(State(state): State<AppState>) -> impl IntoResponse {
    state.session.stop_recording().await;

    (
        StatusCode::OK,
        Json(SessionResponse {
            session_id: state.session.session_id().to_string(),
            status: state.session.status_line().await,
            message: "Recording stopped".to_string(),
        }),
    )
}

/// GET /voice/status
/// Current session snapshot plus the human-readable status line
pub async fn get_status(State(state): State<AppState>) -> impl IntoResponse {
    let status = state.session.status().await;

    (
        StatusCode::OK,
        Json(StatusResponse {
            message: status.describe(),
            status,
        }),
    )
}

/// GET /voice/transcript
/// The role-tagged transcript accumulated so far
pub async fn get_transcript(State(state): State<AppState>) -> impl IntoResponse {
    let transcript: Vec<TranscriptEntry> = state.session.transcript().await;
    (StatusCode::OK, Json(transcript))
}

/// POST /voice/transcript
/// Append one role-tagged message to the transcript
pub async fn log_message(
    State(state): State<AppState>,
    Json(req): Json<LogMessageRequest>,
) -> impl IntoResponse {
    state.session.log_message(req.role, req.text).await;
    StatusCode::NO_CONTENT
}

/// POST /voice/feedback
/// Post the transcript to the feedback service; degrades to canned text
pub async fn request_feedback(State(state): State<AppState>) -> impl IntoResponse {
    let transcript = state.session.transcript().await;

    info!(
        "Requesting feedback for {} transcript messages",
        transcript.len()
    );

    let text = state.feedback.request_feedback(&transcript).await;

    (StatusCode::OK, Json(FeedbackTextResponse { text }))
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
