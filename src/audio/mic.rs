// Microphone capture backend built on cpal.
//
// The cpal stream is not Send, so it lives on a dedicated OS thread for the
// whole capture; the async world only sees the frame channel and a shutdown
// flag.

use super::capture::{AudioFrame, CaptureBackend, CaptureConfig, CaptureError};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, Stream, StreamConfig};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

/// How many frames may sit unread before the capture side starts dropping.
const FRAME_CHANNEL_CAPACITY: usize = 32;

pub struct MicBackend {
    config: CaptureConfig,
    shutdown: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
    capturing: bool,
}

impl MicBackend {
    pub fn new(config: CaptureConfig) -> Self {
        Self {
            config,
            shutdown: Arc::new(AtomicBool::new(false)),
            thread: None,
            capturing: false,
        }
    }
}

#[async_trait::async_trait]
impl CaptureBackend for MicBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>, CaptureError> {
        if self.capturing {
            return Err(CaptureError::AlreadyRunning);
        }

        let (frame_tx, frame_rx) = mpsc::channel(FRAME_CHANNEL_CAPACITY);
        let (ready_tx, ready_rx) = oneshot::channel();

        self.shutdown.store(false, Ordering::SeqCst);
        let shutdown = Arc::clone(&self.shutdown);
        let config = self.config.clone();

        let handle = thread::Builder::new()
            .name("mic-capture".to_string())
            .spawn(move || capture_thread(config, frame_tx, ready_tx, shutdown))
            .map_err(|e| CaptureError::Stream(format!("failed to spawn capture thread: {}", e)))?;

        self.thread = Some(handle);

        match ready_rx.await {
            Ok(Ok(())) => {
                self.capturing = true;
                Ok(frame_rx)
            }
            Ok(Err(e)) => {
                self.join_thread().await;
                Err(e)
            }
            Err(_) => {
                self.join_thread().await;
                Err(CaptureError::Stream("capture thread exited early".to_string()))
            }
        }
    }

    async fn stop(&mut self) -> Result<(), CaptureError> {
        if !self.capturing && self.thread.is_none() {
            return Ok(());
        }

        self.shutdown.store(true, Ordering::SeqCst);
        self.join_thread().await;
        self.capturing = false;
        info!("Microphone capture stopped");

        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing
    }

    fn name(&self) -> &str {
        "cpal microphone"
    }
}

impl MicBackend {
    async fn join_thread(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(handle) = self.thread.take() {
            let _ = tokio::task::spawn_blocking(move || handle.join()).await;
        }
    }
}

/// Body of the dedicated capture thread: opens the default input device,
/// keeps the stream alive until shutdown, and reports startup success or
/// failure through `ready_tx`.
fn capture_thread(
    config: CaptureConfig,
    frame_tx: mpsc::Sender<AudioFrame>,
    ready_tx: oneshot::Sender<Result<(), CaptureError>>,
    shutdown: Arc<AtomicBool>,
) {
    let stream = match open_stream(&config, frame_tx) {
        Ok(s) => s,
        Err(e) => {
            let _ = ready_tx.send(Err(e));
            return;
        }
    };

    if let Err(e) = stream.play() {
        let _ = ready_tx.send(Err(map_play_error(e)));
        return;
    }

    let _ = ready_tx.send(Ok(()));

    while !shutdown.load(Ordering::SeqCst) {
        thread::sleep(Duration::from_millis(50));
    }

    drop(stream);
    debug!("Capture thread exiting");
}

fn open_stream(
    config: &CaptureConfig,
    frame_tx: mpsc::Sender<AudioFrame>,
) -> Result<Stream, CaptureError> {
    let host = cpal::default_host();
    let device = host.default_input_device().ok_or(CaptureError::NoDevice)?;

    let device_name = device.name().unwrap_or_else(|_| "<unknown>".to_string());

    let supported = device.default_input_config().map_err(|e| match e {
        cpal::DefaultStreamConfigError::DeviceNotAvailable => CaptureError::PermissionDenied,
        cpal::DefaultStreamConfigError::StreamTypeNotSupported => {
            CaptureError::FormatNotSupported("no supported input stream type".to_string())
        }
        other => CaptureError::Stream(other.to_string()),
    })?;

    let sample_format = supported.sample_format();
    let stream_config: StreamConfig = supported.config();

    info!(
        "Opening microphone '{}': {} Hz, {} channels, {:?}",
        device_name, stream_config.sample_rate.0, stream_config.channels, sample_format
    );

    if stream_config.sample_rate.0 < config.sample_rate {
        warn!(
            "Device rate {} Hz below target {} Hz; frames will keep the device rate",
            stream_config.sample_rate.0, config.sample_rate
        );
    }

    let assembler = FrameAssembler::new(config, &stream_config, frame_tx);

    let err_fn = |e: cpal::StreamError| warn!("Capture stream error: {}", e);

    let stream = match sample_format {
        SampleFormat::I16 => {
            let mut asm = assembler;
            device.build_input_stream(
                &stream_config,
                move |data: &[i16], _: &cpal::InputCallbackInfo| asm.push(data),
                err_fn,
                None,
            )
        }
        SampleFormat::F32 => {
            let mut asm = assembler;
            let mut scratch: Vec<i16> = Vec::new();
            device.build_input_stream(
                &stream_config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    scratch.clear();
                    scratch.extend(
                        data.iter()
                            .map(|&s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16),
                    );
                    asm.push(&scratch);
                },
                err_fn,
                None,
            )
        }
        SampleFormat::U16 => {
            let mut asm = assembler;
            let mut scratch: Vec<i16> = Vec::new();
            device.build_input_stream(
                &stream_config,
                move |data: &[u16], _: &cpal::InputCallbackInfo| {
                    scratch.clear();
                    scratch.extend(data.iter().map(|&s| (s as i32 - 32768) as i16));
                    asm.push(&scratch);
                },
                err_fn,
                None,
            )
        }
        other => return Err(CaptureError::FormatNotSupported(format!("{:?}", other))),
    };

    stream.map_err(|e| match e {
        cpal::BuildStreamError::DeviceNotAvailable => CaptureError::PermissionDenied,
        other => CaptureError::Stream(other.to_string()),
    })
}

fn map_play_error(e: cpal::PlayStreamError) -> CaptureError {
    match e {
        cpal::PlayStreamError::DeviceNotAvailable => CaptureError::PermissionDenied,
        other => CaptureError::Stream(other.to_string()),
    }
}

/// Accumulates interleaved device samples into fixed-duration mono frames
/// at the target rate: fold channels, decimate, slice, emit.
struct FrameAssembler {
    buf: Vec<i16>,
    frame_samples: usize,
    channels: usize,
    decimation: usize,
    phase: usize,
    started: Instant,
    emitted_ms: u64,
    frame_duration_ms: u64,
    tx: mpsc::Sender<AudioFrame>,
    dropped: u64,
}

impl FrameAssembler {
    fn new(config: &CaptureConfig, device: &StreamConfig, tx: mpsc::Sender<AudioFrame>) -> Self {
        let device_rate = device.sample_rate.0;
        let decimation = if device_rate > config.sample_rate {
            (device_rate / config.sample_rate).max(1) as usize
        } else {
            1
        };
        let effective_rate = device_rate as usize / decimation;
        let frame_samples =
            (effective_rate as u64 * config.frame_duration_ms / 1000).max(1) as usize;

        Self {
            buf: Vec::with_capacity(frame_samples * 2),
            frame_samples,
            channels: device.channels.max(1) as usize,
            decimation,
            phase: 0,
            started: Instant::now(),
            emitted_ms: 0,
            frame_duration_ms: config.frame_duration_ms,
            tx,
            dropped: 0,
        }
    }

    fn push(&mut self, interleaved: &[i16]) {
        for frame in interleaved.chunks_exact(self.channels) {
            // Sum channels to mono with clamping, then decimate.
            let sum: i32 = frame.iter().map(|&s| s as i32).sum();
            let mono = sum.clamp(i16::MIN as i32, i16::MAX as i32) as i16;

            if self.phase == 0 {
                self.buf.push(mono);
            }
            self.phase = (self.phase + 1) % self.decimation;
        }

        while self.buf.len() >= self.frame_samples {
            self.emit();
        }
    }

    fn emit(&mut self) {
        let payload: Vec<u8> = self
            .buf
            .drain(..self.frame_samples)
            .flat_map(|s| s.to_le_bytes())
            .collect();

        let frame = AudioFrame {
            payload,
            timestamp_ms: self.emitted_ms,
        };
        self.emitted_ms += self.frame_duration_ms;

        if self.tx.try_send(frame).is_err() {
            self.dropped += 1;
            if self.dropped % 50 == 1 {
                debug!(
                    "Frame channel full, {} frames dropped since capture start ({}s)",
                    self.dropped,
                    self.started.elapsed().as_secs()
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cpal::SampleRate;

    fn assembler(
        target_rate: u32,
        frame_ms: u64,
        device_rate: u32,
        device_channels: u16,
    ) -> (FrameAssembler, mpsc::Receiver<AudioFrame>) {
        let (tx, rx) = mpsc::channel(8);
        let config = CaptureConfig {
            sample_rate: target_rate,
            channels: 1,
            frame_duration_ms: frame_ms,
        };
        let device = StreamConfig {
            channels: device_channels,
            sample_rate: SampleRate(device_rate),
            buffer_size: cpal::BufferSize::Default,
        };
        (FrameAssembler::new(&config, &device, tx), rx)
    }

    #[test]
    fn emits_fixed_size_frames() {
        let (mut asm, mut rx) = assembler(16000, 20, 16000, 1);
        // 20ms at 16kHz mono = 320 samples = 640 bytes.
        asm.push(&vec![1i16; 500]);

        let frame = rx.try_recv().expect("one frame emitted");
        assert_eq!(frame.payload.len(), 640);
        assert_eq!(frame.timestamp_ms, 0);
        assert!(rx.try_recv().is_err(), "remainder stays buffered");

        asm.push(&vec![1i16; 140]);
        let frame = rx.try_recv().expect("second frame emitted");
        assert_eq!(frame.timestamp_ms, 20);
    }

    #[test]
    fn folds_stereo_to_mono() {
        let (mut asm, mut rx) = assembler(16000, 20, 16000, 2);
        // 320 interleaved stereo pairs -> 320 mono samples -> one frame.
        let interleaved: Vec<i16> = (0..320).flat_map(|_| [100i16, 200i16]).collect();
        asm.push(&interleaved);

        let frame = rx.try_recv().expect("one frame emitted");
        let first = i16::from_le_bytes([frame.payload[0], frame.payload[1]]);
        assert_eq!(first, 300, "channels are summed");
    }

    #[test]
    fn decimates_to_target_rate() {
        // 48kHz device, 16kHz target: keep every 3rd sample.
        let (mut asm, mut rx) = assembler(16000, 20, 48000, 1);
        asm.push(&vec![7i16; 960]); // 20ms at 48kHz -> 320 samples after decimation

        let frame = rx.try_recv().expect("one frame emitted");
        assert_eq!(frame.payload.len(), 640);
    }

    #[test]
    fn mono_fold_clamps_overflow() {
        let (mut asm, mut rx) = assembler(16000, 20, 16000, 2);
        let interleaved: Vec<i16> = (0..320).flat_map(|_| [i16::MAX, i16::MAX]).collect();
        asm.push(&interleaved);

        let frame = rx.try_recv().expect("one frame emitted");
        let first = i16::from_le_bytes([frame.payload[0], frame.payload[1]]);
        assert_eq!(first, i16::MAX);
    }
}
