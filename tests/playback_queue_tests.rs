// Tests for the ordered playback queue
//
// These drive the queue through a scripted sink that records every render
// attempt, injects decode failures on demand, and flags any overlapping
// renders.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::sleep;
use voicelink::{AudioChunk, AudioSink, PlaybackQueue, RenderError};

/// Payload that the scripted sink refuses to decode.
const BAD: &[u8] = b"bad";

struct ScriptedSink {
    /// Every payload handed to render, in order, successes and failures alike
    attempts: Mutex<Vec<Vec<u8>>>,
    /// Set while a render is in progress
    in_flight: AtomicBool,
    /// Latched if two renders ever overlapped
    overlapped: AtomicBool,
    render_delay: Duration,
}

impl ScriptedSink {
    fn new(render_delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            attempts: Mutex::new(Vec::new()),
            in_flight: AtomicBool::new(false),
            overlapped: AtomicBool::new(false),
            render_delay,
        })
    }

    fn attempts(&self) -> Vec<Vec<u8>> {
        self.attempts.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl AudioSink for ScriptedSink {
    async fn render(&self, payload: Vec<u8>) -> Result<(), RenderError> {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            self.overlapped.store(true, Ordering::SeqCst);
        }

        sleep(self.render_delay).await;
        self.attempts.lock().unwrap().push(payload.clone());

        self.in_flight.store(false, Ordering::SeqCst);

        if payload.is_empty() {
            Err(RenderError::EmptyPayload)
        } else if payload == BAD {
            Err(RenderError::Decode("scripted failure".to_string()))
        } else {
            Ok(())
        }
    }
}

async fn wait_for_idle(queue: &PlaybackQueue) {
    for _ in 0..500 {
        if queue.is_idle().await {
            return;
        }
        sleep(Duration::from_millis(10)).await;
    }
    panic!("playback queue did not return to idle");
}

#[tokio::test]
async fn plays_chunks_in_arrival_order_without_overlap() {
    let sink = ScriptedSink::new(Duration::from_millis(10));
    let queue = PlaybackQueue::new(sink.clone());

    let payloads: Vec<Vec<u8>> = (0u8..10).map(|i| vec![i; 4]).collect();
    for payload in &payloads {
        queue.enqueue(AudioChunk::new(payload.clone())).await;
    }

    wait_for_idle(&queue).await;

    assert_eq!(sink.attempts(), payloads, "render order must be arrival order");
    assert!(
        !sink.overlapped.load(Ordering::SeqCst),
        "renders must never overlap"
    );
    assert_eq!(queue.chunks_played(), 10);
    assert_eq!(queue.chunks_discarded(), 0);
}

#[tokio::test]
async fn enqueue_while_idle_starts_immediately_and_later_chunks_append() {
    let sink = ScriptedSink::new(Duration::from_millis(50));
    let queue = PlaybackQueue::new(sink.clone());

    queue.enqueue(AudioChunk::new(b"first".to_vec())).await;
    assert!(queue.is_playing(), "first chunk must start playback");

    // Arrives mid-playback: must append, not preempt.
    queue.enqueue(AudioChunk::new(b"second".to_vec())).await;
    assert_eq!(queue.pending_chunks().await, 1);

    wait_for_idle(&queue).await;

    assert_eq!(sink.attempts(), vec![b"first".to_vec(), b"second".to_vec()]);
    assert!(!sink.overlapped.load(Ordering::SeqCst));
}

#[tokio::test]
async fn decode_failure_discards_chunk_and_continues() {
    let sink = ScriptedSink::new(Duration::from_millis(5));
    let queue = PlaybackQueue::new(sink.clone());

    queue.enqueue(AudioChunk::new(b"one".to_vec())).await;
    queue.enqueue(AudioChunk::new(BAD.to_vec())).await;
    queue.enqueue(AudioChunk::new(b"three".to_vec())).await;

    wait_for_idle(&queue).await;

    assert_eq!(
        sink.attempts(),
        vec![b"one".to_vec(), BAD.to_vec(), b"three".to_vec()],
        "the failed chunk must not block the ones behind it"
    );
    assert_eq!(queue.chunks_played(), 2);
    assert_eq!(queue.chunks_discarded(), 1);
    assert!(queue.is_idle().await);
}

#[tokio::test]
async fn queue_resumes_after_going_idle() {
    let sink = ScriptedSink::new(Duration::from_millis(5));
    let queue = PlaybackQueue::new(sink.clone());

    queue.enqueue(AudioChunk::new(b"early".to_vec())).await;
    wait_for_idle(&queue).await;

    // The queue is a reopenable sequence: a later arrival must restart it.
    queue.enqueue(AudioChunk::new(b"late".to_vec())).await;
    wait_for_idle(&queue).await;

    assert_eq!(sink.attempts(), vec![b"early".to_vec(), b"late".to_vec()]);
}

#[tokio::test]
async fn zero_length_payload_takes_decode_failure_path() {
    let sink = ScriptedSink::new(Duration::from_millis(5));
    let queue = PlaybackQueue::new(sink.clone());

    queue.enqueue(AudioChunk::new(Vec::new())).await;
    wait_for_idle(&queue).await;

    assert_eq!(queue.chunks_played(), 0);
    assert_eq!(queue.chunks_discarded(), 1);
}

#[tokio::test]
async fn burst_enqueue_keeps_order() {
    let sink = ScriptedSink::new(Duration::from_millis(1));
    let queue = PlaybackQueue::new(sink.clone());

    let payloads: Vec<Vec<u8>> = (0u16..50).map(|i| i.to_le_bytes().to_vec()).collect();
    for payload in &payloads {
        queue.enqueue(AudioChunk::new(payload.clone())).await;
    }

    wait_for_idle(&queue).await;

    assert_eq!(sink.attempts(), payloads);
    assert!(!sink.overlapped.load(Ordering::SeqCst));
}

#[tokio::test]
async fn clear_drops_pending_but_not_the_active_chunk() {
    let sink = ScriptedSink::new(Duration::from_millis(200));
    let queue = PlaybackQueue::new(sink.clone());

    for i in 0u8..5 {
        queue.enqueue(AudioChunk::new(vec![i])).await;
    }

    // First chunk is mid-render; the other four are pending.
    sleep(Duration::from_millis(50)).await;
    let dropped = queue.clear().await;
    assert_eq!(dropped, 4);

    wait_for_idle(&queue).await;

    assert_eq!(sink.attempts(), vec![vec![0u8]], "only the active chunk finishes");
    assert_eq!(queue.pending_chunks().await, 0);
}
