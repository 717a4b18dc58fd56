use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing::info;
use voicelink::{
    create_router, AppState, Config, FeedbackClient, MicBackend, NullSink, VoiceSession,
    WsConnector,
};

#[derive(Debug, Parser)]
#[command(name = "voicelink", about = "Voice streaming session engine")]
struct Args {
    /// Path to the configuration file (extension optional)
    #[arg(short, long, default_value = "config/voicelink")]
    config: String,

    /// Override the control API port from the config file
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let cfg = Config::load(&args.config)
        .with_context(|| format!("Failed to load config '{}'", args.config))?;

    let port = args.port.unwrap_or(cfg.service.http.port);

    info!("Voicelink v0.1.0");
    info!("Loaded config: {}", cfg.service.name);
    info!("Voice stream endpoint: {}", cfg.voice.stream_url);

    let session = Arc::new(VoiceSession::new(
        cfg.session_config(),
        Arc::new(WsConnector),
        Box::new(MicBackend::new(cfg.capture_config())),
        Arc::new(NullSink),
    ));
    let feedback = Arc::new(FeedbackClient::new(cfg.feedback.endpoint.as_str()));

    let state = AppState::new(session, feedback);
    let router = create_router(state);

    let addr = format!("{}:{}", cfg.service.http.bind, port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind control API to {}", addr))?;

    info!("Control API listening on {}", addr);

    axum::serve(listener, router)
        .await
        .context("Control API server failed")?;

    Ok(())
}
