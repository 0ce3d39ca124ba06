//! Typed feature frame produced by the external landmark extractor.
//!
//! ## Layout (226 values)
//!
//! | Block | Offset | Points | Values per point |
//! |-------|--------|--------|------------------|
//! | pose | 0 | 25 | x, y, z, visibility |
//! | right hand | 100 | 21 | x, y, z |
//! | left hand | 163 | 21 | x, y, z |
//!
//! A point whose x, y and z are all exactly `0.0` was not detected. The
//! extractor never emits partially-zero points, so every consumer treats an
//! all-zero triplet as absent and nothing else.

use crate::error::{Result, SignaError};

/// Total number of values in one frame.
pub const FRAME_LEN: usize = 226;

pub const POSE_POINTS: usize = 25;
pub const POSE_STRIDE: usize = 4;
pub const POSE_LEN: usize = POSE_POINTS * POSE_STRIDE;

pub const HAND_POINTS: usize = 21;
pub const HAND_STRIDE: usize = 3;
pub const HAND_LEN: usize = HAND_POINTS * HAND_STRIDE;

pub const RIGHT_HAND_OFFSET: usize = POSE_LEN;
pub const LEFT_HAND_OFFSET: usize = POSE_LEN + HAND_LEN;

/// Pose landmark indices used by the heuristics.
pub mod pose {
    pub const NOSE: usize = 0;
    pub const LEFT_SHOULDER: usize = 11;
    pub const RIGHT_SHOULDER: usize = 12;
    pub const LEFT_WRIST: usize = 15;
    pub const RIGHT_WRIST: usize = 16;
}

/// Which hand block of the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hand {
    Right,
    Left,
}

impl Hand {
    fn offset(self) -> usize {
        match self {
            Hand::Right => RIGHT_HAND_OFFSET,
            Hand::Left => LEFT_HAND_OFFSET,
        }
    }
}

/// One pose landmark.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PosePoint {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub visibility: f32,
}

impl PosePoint {
    pub fn is_absent(&self) -> bool {
        self.x == 0.0 && self.y == 0.0 && self.z == 0.0
    }
}

/// One hand landmark.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HandPoint {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl HandPoint {
    pub fn is_absent(&self) -> bool {
        self.x == 0.0 && self.y == 0.0 && self.z == 0.0
    }
}

/// A validated, fixed-length feature vector.
///
/// Construction is the only place the length and finiteness are checked;
/// everything downstream indexes without bounds anxiety.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureFrame {
    values: Vec<f32>,
}

impl FeatureFrame {
    /// Validate and wrap an owned vector.
    ///
    /// # Errors
    /// - `SignaError::InputShape` if the length is not [`FRAME_LEN`].
    /// - `SignaError::NonFiniteValue` if any value is NaN or infinite.
    pub fn from_vec(values: Vec<f32>) -> Result<Self> {
        if values.len() != FRAME_LEN {
            return Err(SignaError::InputShape {
                expected: FRAME_LEN,
                got: values.len(),
            });
        }
        if let Some(index) = values.iter().position(|v| !v.is_finite()) {
            return Err(SignaError::NonFiniteValue { index });
        }
        Ok(Self { values })
    }

    pub fn from_slice(values: &[f32]) -> Result<Self> {
        Self::from_vec(values.to_vec())
    }

    /// A frame with every point absent.
    pub fn empty() -> Self {
        Self {
            values: vec![0.0; FRAME_LEN],
        }
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }

    pub fn pose_point(&self, index: usize) -> PosePoint {
        let base = index * POSE_STRIDE;
        PosePoint {
            x: self.values[base],
            y: self.values[base + 1],
            z: self.values[base + 2],
            visibility: self.values[base + 3],
        }
    }

    pub fn hand_point(&self, hand: Hand, index: usize) -> HandPoint {
        let base = hand.offset() + index * HAND_STRIDE;
        HandPoint {
            x: self.values[base],
            y: self.values[base + 1],
            z: self.values[base + 2],
        }
    }

    /// True if at least one landmark of the given hand was detected.
    pub fn has_hand(&self, hand: Hand) -> bool {
        (0..HAND_POINTS).any(|i| !self.hand_point(hand, i).is_absent())
    }

    pub(crate) fn values_mut(&mut self) -> &mut [f32] {
        &mut self.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_wrong_length() {
        let err = FeatureFrame::from_vec(vec![0.0; 10]).unwrap_err();
        assert!(matches!(
            err,
            SignaError::InputShape {
                expected: FRAME_LEN,
                got: 10
            }
        ));
    }

    #[test]
    fn rejects_nan() {
        let mut values = vec![0.0; FRAME_LEN];
        values[120] = f32::NAN;
        let err = FeatureFrame::from_vec(values).unwrap_err();
        assert!(matches!(err, SignaError::NonFiniteValue { index: 120 }));
    }

    #[test]
    fn block_accessors_follow_layout() {
        let mut values = vec![0.0; FRAME_LEN];
        // Right shoulder: pose point 12 → offset 48.
        values[48] = 0.25;
        values[49] = 0.5;
        values[51] = 0.9;
        // Left hand point 2 → 163 + 6.
        values[169] = 0.75;
        let frame = FeatureFrame::from_vec(values).expect("valid frame");

        let shoulder = frame.pose_point(pose::RIGHT_SHOULDER);
        assert_eq!(shoulder.x, 0.25);
        assert_eq!(shoulder.y, 0.5);
        assert_eq!(shoulder.visibility, 0.9);
        assert!(!shoulder.is_absent());

        assert_eq!(frame.hand_point(Hand::Left, 2).x, 0.75);
        assert!(frame.has_hand(Hand::Left));
        assert!(!frame.has_hand(Hand::Right));
    }

    #[test]
    fn visibility_alone_does_not_make_a_point_present() {
        let mut values = vec![0.0; FRAME_LEN];
        values[pose::LEFT_SHOULDER * POSE_STRIDE + 3] = 1.0;
        let frame = FeatureFrame::from_vec(values).expect("valid frame");
        assert!(frame.pose_point(pose::LEFT_SHOULDER).is_absent());
    }
}
