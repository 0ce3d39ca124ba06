//! Wrist motion tracking.
//!
//! Exponentially smoothed displacement of one tracked point:
//! `v_t = v_{t-1} * smoothing + displacement * (1 - smoothing)`.
//! The static/dynamic classification is advisory only; it is reported with
//! each decision and does not gate the stabilizer.

use serde::{Deserialize, Serialize};

use crate::frame::{pose, FeatureFrame, Hand};

/// Point whose motion is tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TrackedPoint {
    /// Pose landmark 16.
    PoseRightWrist,
    /// Pose landmark 15.
    PoseLeftWrist,
    /// Landmark 0 of the right-hand block.
    RightHandWrist,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MotionState {
    Static,
    Dynamic,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct MotionConfig {
    pub tracked_point: TrackedPoint,
    /// Weight of the previous velocity. Default: 0.7.
    pub smoothing: f32,
    /// Velocities above this are `Dynamic`. Default: 0.015.
    pub dynamic_threshold: f32,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            tracked_point: TrackedPoint::PoseRightWrist,
            smoothing: 0.7,
            dynamic_threshold: 0.015,
        }
    }
}

impl MotionConfig {
    pub fn normalize(&mut self) {
        self.smoothing = self.smoothing.clamp(0.0, 0.99);
        self.dynamic_threshold = self.dynamic_threshold.max(0.0);
    }
}

#[derive(Debug, Clone)]
pub struct MotionTracker {
    config: MotionConfig,
    previous: Option<(f32, f32)>,
    velocity: f32,
}

impl MotionTracker {
    pub fn new(config: MotionConfig) -> Self {
        Self {
            config,
            previous: None,
            velocity: 0.0,
        }
    }

    /// Fold one frame into the estimate and classify the result.
    ///
    /// An absent tracked point breaks the chain: the next detection starts a
    /// fresh displacement instead of jumping from a stale position.
    pub fn update(&mut self, frame: &FeatureFrame) -> MotionState {
        match self.tracked_xy(frame) {
            Some(current) => {
                if let Some((px, py)) = self.previous {
                    let displacement = (current.0 - px).hypot(current.1 - py);
                    self.velocity = self.velocity * self.config.smoothing
                        + displacement * (1.0 - self.config.smoothing);
                }
                self.previous = Some(current);
            }
            None => self.previous = None,
        }
        self.state()
    }

    pub fn velocity(&self) -> f32 {
        self.velocity
    }

    pub fn state(&self) -> MotionState {
        if self.velocity > self.config.dynamic_threshold {
            MotionState::Dynamic
        } else {
            MotionState::Static
        }
    }

    pub fn reset(&mut self) {
        self.previous = None;
        self.velocity = 0.0;
    }

    fn tracked_xy(&self, frame: &FeatureFrame) -> Option<(f32, f32)> {
        match self.config.tracked_point {
            TrackedPoint::PoseRightWrist => {
                let p = frame.pose_point(pose::RIGHT_WRIST);
                (!p.is_absent()).then_some((p.x, p.y))
            }
            TrackedPoint::PoseLeftWrist => {
                let p = frame.pose_point(pose::LEFT_WRIST);
                (!p.is_absent()).then_some((p.x, p.y))
            }
            TrackedPoint::RightHandWrist => {
                let p = frame.hand_point(Hand::Right, 0);
                (!p.is_absent()).then_some((p.x, p.y))
            }
        }
    }
}

impl Default for MotionTracker {
    fn default() -> Self {
        Self::new(MotionConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{FRAME_LEN, POSE_STRIDE};
    use approx::assert_abs_diff_eq;

    fn wrist_at(x: f32, y: f32) -> FeatureFrame {
        let mut values = vec![0.0; FRAME_LEN];
        let base = pose::RIGHT_WRIST * POSE_STRIDE;
        values[base] = x;
        values[base + 1] = y;
        values[base + 3] = 1.0;
        FeatureFrame::from_vec(values).unwrap()
    }

    #[test]
    fn first_frame_has_no_velocity() {
        let mut tracker = MotionTracker::default();
        assert_eq!(tracker.update(&wrist_at(0.5, 0.5)), MotionState::Static);
        assert_eq!(tracker.velocity(), 0.0);
    }

    #[test]
    fn velocity_is_exponentially_smoothed() {
        let mut tracker = MotionTracker::default();
        tracker.update(&wrist_at(0.5, 0.5));
        tracker.update(&wrist_at(0.6, 0.5));
        assert_abs_diff_eq!(tracker.velocity(), 0.03, epsilon = 1e-6);
        tracker.update(&wrist_at(0.6, 0.5));
        assert_abs_diff_eq!(tracker.velocity(), 0.021, epsilon = 1e-6);
    }

    #[test]
    fn fast_wrist_is_dynamic_then_settles() {
        let mut tracker = MotionTracker::default();
        tracker.update(&wrist_at(0.2, 0.5));
        assert_eq!(tracker.update(&wrist_at(0.4, 0.5)), MotionState::Dynamic);
        let mut state = MotionState::Dynamic;
        for _ in 0..20 {
            state = tracker.update(&wrist_at(0.4, 0.5));
        }
        assert_eq!(state, MotionState::Static);
    }

    #[test]
    fn absent_wrist_breaks_the_chain() {
        let mut tracker = MotionTracker::default();
        tracker.update(&wrist_at(0.1, 0.1));
        tracker.update(&FeatureFrame::empty());
        tracker.update(&wrist_at(0.9, 0.9));
        assert_eq!(tracker.velocity(), 0.0);
    }
}
