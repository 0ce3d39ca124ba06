//! Shoulder-width presence monitor.
//!
//! ## Algorithm
//!
//! 1. Read the left (11) and right (12) shoulder pose points.
//! 2. If either is absent or below the visibility floor:
//!    both shoulder x = 0 → `NoUser`, otherwise no signal.
//! 3. Width = 2-D distance between the shoulders.
//! 4. Width < epsilon → `NoUser`; < far → `TooFar`; > close → `TooClose`;
//!    otherwise `Ok`.

use super::{DistanceAlert, PresenceConfig, PresenceMonitor};
use crate::frame::{pose, FeatureFrame};

/// Stateless framing check based on apparent shoulder width.
#[derive(Debug, Clone, Default)]
pub struct ShoulderWidthMonitor {
    config: PresenceConfig,
}

impl ShoulderWidthMonitor {
    pub fn new(config: PresenceConfig) -> Self {
        Self { config }
    }

    /// Apparent shoulder width, if both shoulders are usable.
    pub fn shoulder_width(&self, frame: &FeatureFrame) -> Option<f32> {
        let left = frame.pose_point(pose::LEFT_SHOULDER);
        let right = frame.pose_point(pose::RIGHT_SHOULDER);
        if left.is_absent() || right.is_absent() {
            return None;
        }
        if left.visibility < self.config.visibility_floor
            || right.visibility < self.config.visibility_floor
        {
            return None;
        }
        Some((left.x - right.x).hypot(left.y - right.y))
    }
}

impl PresenceMonitor for ShoulderWidthMonitor {
    fn check(&self, frame: &FeatureFrame) -> Option<DistanceAlert> {
        let Some(width) = self.shoulder_width(frame) else {
            // A single missing or occluded shoulder says nothing about distance.
            let left = frame.pose_point(pose::LEFT_SHOULDER);
            let right = frame.pose_point(pose::RIGHT_SHOULDER);
            return (left.x == 0.0 && right.x == 0.0).then_some(DistanceAlert::NoUser);
        };

        let alert = if width < self.config.no_user_epsilon {
            DistanceAlert::NoUser
        } else if width < self.config.far_threshold {
            DistanceAlert::TooFar
        } else if width > self.config.close_threshold {
            DistanceAlert::TooClose
        } else {
            DistanceAlert::Ok
        };
        Some(alert)
    }

    fn reset(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{FRAME_LEN, POSE_STRIDE};

    /// Shoulders centred at x = 0.5, y = 0.5, `width` apart.
    fn frame_with_shoulders(width: f32, visibility: f32) -> FeatureFrame {
        let mut values = vec![0.0; FRAME_LEN];
        let left = pose::LEFT_SHOULDER * POSE_STRIDE;
        let right = pose::RIGHT_SHOULDER * POSE_STRIDE;
        values[left] = 0.5 - width / 2.0;
        values[left + 1] = 0.5;
        values[left + 3] = visibility;
        values[right] = 0.5 + width / 2.0;
        values[right + 1] = 0.5;
        values[right + 3] = visibility;
        FeatureFrame::from_vec(values).unwrap()
    }

    #[test]
    fn width_bands_map_to_alerts() {
        let monitor = ShoulderWidthMonitor::default();
        let cases = [
            (0.10, Some(DistanceAlert::TooFar)),
            (0.17, Some(DistanceAlert::TooFar)),
            (0.30, Some(DistanceAlert::Ok)),
            (0.49, Some(DistanceAlert::Ok)),
            (0.55, Some(DistanceAlert::TooClose)),
            (0.0, Some(DistanceAlert::NoUser)),
        ];
        for (width, expected) in cases {
            let frame = frame_with_shoulders(width, 1.0);
            assert_eq!(monitor.check(&frame), expected, "width={width}");
        }
    }

    #[test]
    fn low_visibility_gives_no_signal() {
        let monitor = ShoulderWidthMonitor::default();
        let frame = frame_with_shoulders(0.10, 0.1);
        assert_eq!(monitor.check(&frame), None);
    }

    #[test]
    fn empty_frame_is_no_user() {
        let monitor = ShoulderWidthMonitor::default();
        assert_eq!(
            monitor.check(&FeatureFrame::empty()),
            Some(DistanceAlert::NoUser)
        );
    }

    #[test]
    fn one_absent_shoulder_never_reports_ok() {
        let mut values = vec![0.0; FRAME_LEN];
        let right = pose::RIGHT_SHOULDER * POSE_STRIDE;
        values[right] = 0.3;
        values[right + 1] = 0.5;
        values[right + 3] = 1.0;
        // Left shoulder absent but claims full visibility.
        values[pose::LEFT_SHOULDER * POSE_STRIDE + 3] = 1.0;
        let frame = FeatureFrame::from_vec(values).unwrap();

        let monitor = ShoulderWidthMonitor::default();
        assert_eq!(monitor.check(&frame), None);
        assert_eq!(monitor.shoulder_width(&frame), None);
    }

    #[test]
    fn shoulder_width_is_euclidean() {
        let monitor = ShoulderWidthMonitor::default();
        let width = monitor
            .shoulder_width(&frame_with_shoulders(0.3, 1.0))
            .expect("both shoulders visible");
        assert!((width - 0.3).abs() < 1e-6);
    }
}
