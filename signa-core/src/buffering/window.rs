//! Short window of recent validated frames.

use std::collections::VecDeque;

use crate::frame::FeatureFrame;

/// Retains copies of the last `capacity` frames a session accepted.
#[derive(Debug, Clone)]
pub struct LandmarkWindow {
    frames: VecDeque<FeatureFrame>,
    capacity: usize,
}

impl LandmarkWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            frames: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, frame: FeatureFrame) {
        if self.frames.len() == self.capacity {
            self.frames.pop_front();
        }
        self.frames.push_back(frame);
    }

    pub fn latest(&self) -> Option<&FeatureFrame> {
        self.frames.back()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }
}
