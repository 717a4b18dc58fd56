pub mod capture;
pub mod mic;
pub mod playback;
pub mod sink;

pub use capture::{AudioFrame, CaptureBackend, CaptureConfig, CaptureError};
pub use mic::MicBackend;
pub use playback::{AudioChunk, PlaybackQueue};
pub use sink::{AudioSink, NullSink, RenderError};
