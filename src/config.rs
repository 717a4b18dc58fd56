use crate::audio::CaptureConfig;
use crate::session::SessionConfig;
use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub voice: VoiceConfig,
    pub audio: AudioConfig,
    pub feedback: FeedbackConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Deserialize)]
pub struct VoiceConfig {
    /// WebSocket URL of the voice streaming endpoint
    pub stream_url: String,
}

#[derive(Debug, Deserialize)]
pub struct AudioConfig {
    pub sample_rate: u32,
    pub channels: u16,
    pub frame_duration_ms: u64,
}

#[derive(Debug, Deserialize)]
pub struct FeedbackConfig {
    /// HTTP endpoint that turns a transcript into feedback text
    pub endpoint: String,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    pub fn capture_config(&self) -> CaptureConfig {
        CaptureConfig {
            sample_rate: self.audio.sample_rate,
            channels: self.audio.channels,
            frame_duration_ms: self.audio.frame_duration_ms,
        }
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            stream_url: self.voice.stream_url.clone(),
            ..SessionConfig::default()
        }
    }
}
