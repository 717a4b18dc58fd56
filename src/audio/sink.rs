use thiserror::Error;
use tracing::trace;

/// Errors from the decode/output capability.
///
/// These never abort playback: the queue discards the failed chunk and
/// moves on to the next one.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("empty audio payload")]
    EmptyPayload,

    #[error("decode failed: {0}")]
    Decode(String),

    #[error("audio output unavailable: {0}")]
    Output(String),
}

/// The opaque decode-and-play capability.
///
/// Given one encoded chunk, either produce an audible result or fail with a
/// decode error; the returned future resolves when playback of that chunk
/// has completed. The playback queue relies on that completion signal for
/// gapless sequencing, so implementations must not resolve early.
#[async_trait::async_trait]
pub trait AudioSink: Send + Sync {
    async fn render(&self, payload: Vec<u8>) -> Result<(), RenderError>;
}

/// Headless placeholder sink: accepts every well-formed chunk without
/// producing sound. Used by the control binary when no audio output is
/// wired up, and handy for soak-testing the session against a live service.
#[derive(Debug, Default)]
pub struct NullSink;

#[async_trait::async_trait]
impl AudioSink for NullSink {
    async fn render(&self, payload: Vec<u8>) -> Result<(), RenderError> {
        if payload.is_empty() {
            return Err(RenderError::EmptyPayload);
        }
        trace!("Discarding {} byte chunk (null sink)", payload.len());
        Ok(())
    }
}
