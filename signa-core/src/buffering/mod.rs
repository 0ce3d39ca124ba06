//! Frame and vote buffers.
//!
//! - [`FrameQueue`]: bounded hand-off between the transport and a session
//!   worker. When the worker falls behind the oldest frame is overwritten,
//!   so latency stays bounded instead of growing with the backlog.
//! - [`prediction::RollingPredictionBuffer`]: the stabilizer's vote window.
//! - [`window::LandmarkWindow`]: recent validated frames kept for diagnostics.

pub mod prediction;
pub mod window;

use parking_lot::Mutex;
use ringbuf::{
    traits::{Consumer, Observer, RingBuffer},
    HeapRb,
};

pub use prediction::{RollingPredictionBuffer, Vote};
pub use window::LandmarkWindow;

/// Default per-session queue depth.
pub const DEFAULT_QUEUE_CAPACITY: usize = 4;

/// A frame waiting in a [`FrameQueue`], tagged with its submission number.
#[derive(Debug, Clone, PartialEq)]
pub struct QueuedFrame {
    /// 1-based position in the session's submission order.
    pub ticket: u64,
    pub values: Vec<f32>,
}

struct QueueState {
    ring: HeapRb<QueuedFrame>,
    submitted: u64,
}

/// Bounded, drop-oldest queue of raw frames awaiting `ingest`.
///
/// Frames stay unvalidated here so shape errors are reported by the session
/// with the rest of its per-frame diagnostics. Every pushed frame gets the
/// next ticket, including frames that are later evicted, so a control
/// stamped with [`FrameQueue::submitted`] can be ordered against them.
pub struct FrameQueue {
    state: Mutex<QueueState>,
    capacity: usize,
}

impl FrameQueue {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            state: Mutex::new(QueueState {
                ring: HeapRb::new(capacity),
                submitted: 0,
            }),
            capacity,
        }
    }

    /// Enqueue a frame, returning the frame it evicted if the queue was full.
    pub fn push(&self, values: Vec<f32>) -> Option<QueuedFrame> {
        let mut state = self.state.lock();
        state.submitted += 1;
        let ticket = state.submitted;
        state.ring.push_overwrite(QueuedFrame { ticket, values })
    }

    /// Take the oldest pending frame.
    pub fn pop(&self) -> Option<QueuedFrame> {
        self.state.lock().ring.try_pop()
    }

    /// Number of frames ever pushed; the ticket of the newest one.
    pub fn submitted(&self) -> u64 {
        self.state.lock().submitted
    }

    pub fn len(&self) -> usize {
        self.state.lock().ring.occupied_len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drop every pending frame, returning how many were discarded.
    pub fn clear(&self) -> usize {
        let mut state = self.state.lock();
        let mut dropped = 0;
        while state.ring.try_pop().is_some() {
            dropped += 1;
        }
        dropped
    }
}

impl Default for FrameQueue {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_CAPACITY)
    }
}

impl std::fmt::Debug for FrameQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameQueue")
            .field("len", &self.len())
            .field("capacity", &self.capacity)
            .finish()
    }
}
