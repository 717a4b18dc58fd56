use thiserror::Error;
use tokio::sync::mpsc;

/// One unit of outbound encoded audio produced by capture.
///
/// The payload is opaque to everything downstream: the session forwards it
/// to the transport byte-for-byte.
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Encoded audio bytes (little-endian i16 PCM from the mic backend).
    pub payload: Vec<u8>,
    /// Milliseconds since capture started.
    pub timestamp_ms: u64,
}

/// Configuration for a capture backend
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Target sample rate (will downsample if the device differs)
    pub sample_rate: u32,
    /// Target channel count (1 = mono, 2 = stereo)
    pub channels: u16,
    /// Frame size in milliseconds (affects latency)
    pub frame_duration_ms: u64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000, // 16kHz voice band
            channels: 1,        // Mono
            frame_duration_ms: 20,
        }
    }
}

/// Errors raised when starting or running capture.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// The platform refused microphone access.
    #[error("microphone permission denied")]
    PermissionDenied,

    #[error("no input device available")]
    NoDevice,

    #[error("unsupported sample format: {0}")]
    FormatNotSupported(String),

    #[error("capture is already running")]
    AlreadyRunning,

    #[error("capture stream error: {0}")]
    Stream(String),
}

/// Audio capture backend trait
///
/// Implementations own the device specifics; the session only starts and
/// stops them and forwards the frames they emit. `start` is where device
/// access is requested, so it is the call that can fail with
/// [`CaptureError::PermissionDenied`].
#[async_trait::async_trait]
pub trait CaptureBackend: Send + Sync {
    /// Start capturing audio
    ///
    /// Returns a channel receiver that will receive encoded audio frames
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>, CaptureError>;

    /// Stop capturing audio
    async fn stop(&mut self) -> Result<(), CaptureError>;

    /// Check if backend is currently capturing
    fn is_capturing(&self) -> bool;

    /// Get backend name for logging
    fn name(&self) -> &str;
}
