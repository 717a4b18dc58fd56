// Tests for the feedback client and transcript types

use std::time::Duration;
use voicelink::{FeedbackClient, Role, SessionStatus, TranscriptEntry, CANNED_FEEDBACK};
use voicelink::{ConnectionState, RecordingState};

#[test]
fn transcript_entry_serializes_role_lowercase() {
    let entry = TranscriptEntry::new(Role::User, "hello coach");

    let json = serde_json::to_string(&entry).unwrap();
    assert!(json.contains("\"role\":\"user\""));
    assert!(json.contains("hello coach"));

    let back: TranscriptEntry = serde_json::from_str(&json).unwrap();
    assert_eq!(back.role, Role::User);
    assert_eq!(back.text, "hello coach");
}

#[test]
fn transcript_deserializes_assistant_role() {
    let json = r#"{
        "role": "assistant",
        "text": "Let's review your opening.",
        "timestamp": "2026-08-07T14:30:05Z"
    }"#;

    let entry: TranscriptEntry = serde_json::from_str(json).unwrap();
    assert_eq!(entry.role, Role::Assistant);
    assert_eq!(entry.text, "Let's review your opening.");
}

#[tokio::test]
async fn unreachable_endpoint_falls_back_to_canned_content() {
    // Nothing listens on the discard port.
    let client = FeedbackClient::new("http://127.0.0.1:9/feedback")
        .with_timeout(Duration::from_secs(1));

    let transcript = vec![
        TranscriptEntry::new(Role::User, "hello"),
        TranscriptEntry::new(Role::Assistant, "hi"),
    ];

    let text = client.request_feedback(&transcript).await;
    assert_eq!(text, CANNED_FEEDBACK);
}

#[test]
fn status_line_reflects_connection_recording_and_error() {
    let mut status = SessionStatus {
        session_id: "s".to_string(),
        connection: ConnectionState::Connected,
        recording: RecordingState::Recording,
        pending_chunks: 0,
        chunks_played: 0,
        chunks_discarded: 0,
        dropped_frames: 0,
        last_error: None,
    };
    assert_eq!(status.describe(), "connected, recording");

    status.recording = RecordingState::Idle;
    assert_eq!(status.describe(), "connected");

    status.connection = ConnectionState::Failed;
    status.last_error = Some("connection failed: refused".to_string());
    assert_eq!(
        status.describe(),
        "connection failed (connection failed: refused)"
    );
}
