use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::info;
use voicelink::{
    CaptureConfig, ConnectionState, MicBackend, NullSink, SessionConfig, VoiceSession, WsConnector,
};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    info!("🎙️  Starting live voice session test");

    // 1. Build a session against a local voice service
    let config = SessionConfig {
        session_id: format!("live-test-{}", chrono::Utc::now().timestamp()),
        stream_url: "ws://localhost:8090/voice-stream".to_string(),
    };

    let session = Arc::new(VoiceSession::new(
        config,
        Arc::new(WsConnector),
        Box::new(MicBackend::new(CaptureConfig::default())),
        Arc::new(NullSink),
    ));

    // 2. Connect and wait for the dial to resolve
    session.connect().await?;
    info!("⏳ Connecting...");

    for _ in 0..50 {
        match session.connection_state().await {
            ConnectionState::Connected => break,
            ConnectionState::Failed => {
                info!("❌ {}", session.status_line().await);
                return Ok(());
            }
            _ => sleep(Duration::from_millis(100)).await,
        }
    }

    if session.connection_state().await != ConnectionState::Connected {
        info!("⏱️  Connection timed out");
        return Ok(());
    }
    info!("✅ Connected");

    // 3. Stream the microphone for 15 seconds
    info!("🎤 Recording for 15 seconds...");
    info!("💬 Please speak into your microphone!");
    session.start_recording().await?;

    sleep(Duration::from_secs(15)).await;

    session.stop_recording().await;
    info!("⏹️  Recording stopped");

    // 4. Let any queued synthesized audio drain before tearing down
    sleep(Duration::from_secs(2)).await;

    let status = session.status().await;
    info!(
        "📊 Played {} chunks, discarded {}, dropped {} outbound frames",
        status.chunks_played, status.chunks_discarded, status.dropped_frames
    );

    session.disconnect().await;
    info!("🏁 Live session test complete!");

    Ok(())
}
