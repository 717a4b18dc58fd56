// Ordered playback of inbound synthesized audio.
//
// Chunks arrive whenever the transport delivers them; playback must be
// strictly one-at-a-time in arrival order with no gap between a chunk
// finishing and the next starting. The queue owns that sequencing so no
// caller ever schedules playback directly.

use super::sink::AudioSink;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// One unit of inbound synthesized audio, consumed exactly once.
#[derive(Debug)]
pub struct AudioChunk {
    pub payload: Vec<u8>,
}

impl AudioChunk {
    pub fn new(payload: Vec<u8>) -> Self {
        Self { payload }
    }
}

/// Ordered buffer of not-yet-played chunks plus a single active playback
/// slot.
///
/// `enqueue` is the only input. Internally the `playing` flag is claimed by
/// exactly one drain task at a time; that task pops the head, renders it
/// through the sink, and repeats until the queue is empty. New arrivals
/// while a chunk is playing append and never preempt. A chunk the sink
/// cannot decode is discarded with a warning and the queue moves on.
#[derive(Clone)]
pub struct PlaybackQueue {
    inner: Arc<QueueInner>,
}

struct QueueInner {
    pending: Mutex<VecDeque<AudioChunk>>,
    playing: AtomicBool,
    sink: Arc<dyn AudioSink>,
    played: AtomicU64,
    discarded: AtomicU64,
}

impl PlaybackQueue {
    pub fn new(sink: Arc<dyn AudioSink>) -> Self {
        Self {
            inner: Arc::new(QueueInner {
                pending: Mutex::new(VecDeque::new()),
                playing: AtomicBool::new(false),
                sink,
                played: AtomicU64::new(0),
                discarded: AtomicU64::new(0),
            }),
        }
    }

    /// Append a chunk and start playback if the queue is idle.
    pub async fn enqueue(&self, chunk: AudioChunk) {
        self.inner.pending.lock().await.push_back(chunk);

        if !self.inner.playing.swap(true, Ordering::SeqCst) {
            let inner = Arc::clone(&self.inner);
            tokio::spawn(async move { inner.drain().await });
        }
    }

    /// Drop every pending chunk. The chunk already handed to the sink (if
    /// any) finishes on its own; render completion is not cancellable.
    pub async fn clear(&self) -> usize {
        let mut pending = self.inner.pending.lock().await;
        let dropped = pending.len();
        pending.clear();
        if dropped > 0 {
            debug!("Cleared {} pending chunks", dropped);
        }
        dropped
    }

    /// Whether a chunk is currently being rendered.
    pub fn is_playing(&self) -> bool {
        self.inner.playing.load(Ordering::SeqCst)
    }

    /// Number of chunks waiting behind the active one.
    pub async fn pending_chunks(&self) -> usize {
        self.inner.pending.lock().await.len()
    }

    pub fn chunks_played(&self) -> u64 {
        self.inner.played.load(Ordering::Relaxed)
    }

    pub fn chunks_discarded(&self) -> u64 {
        self.inner.discarded.load(Ordering::Relaxed)
    }

    /// True when nothing is playing and nothing is pending.
    pub async fn is_idle(&self) -> bool {
        !self.is_playing() && self.inner.pending.lock().await.is_empty()
    }
}

impl QueueInner {
    /// Serialized playback loop. Exactly one drain runs at a time: only the
    /// caller that flipped `playing` from false to true spawns it, and it
    /// keeps sole possession until it hands the flag back.
    async fn drain(self: Arc<Self>) {
        loop {
            let next = self.pending.lock().await.pop_front();

            let Some(chunk) = next else {
                self.playing.store(false, Ordering::SeqCst);

                // An enqueue may have appended between the empty pop and the
                // flag clearing above, seen the flag still set, and not
                // spawned a drain. Re-claim and keep going if so.
                if self.pending.lock().await.is_empty()
                    || self.playing.swap(true, Ordering::SeqCst)
                {
                    return;
                }
                continue;
            };

            let len = chunk.payload.len();
            match self.sink.render(chunk.payload).await {
                Ok(()) => {
                    self.played.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => {
                    // Never stall the stream over one bad chunk.
                    warn!("Discarding undecodable {} byte chunk: {}", len, e);
                    self.discarded.fetch_add(1, Ordering::Relaxed);
                }
            }
        }
    }
}
