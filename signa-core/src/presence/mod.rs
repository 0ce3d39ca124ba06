//! Presence / framing detection.
//!
//! The `PresenceMonitor` trait is the swap point: `ShoulderWidthMonitor` is
//! the default, and any other liveness heuristic can replace it without
//! touching the stabilizer.

pub mod shoulder;

pub use shoulder::ShoulderWidthMonitor;

use serde::{Deserialize, Serialize};

use crate::frame::FeatureFrame;

/// Framing signal derived from one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DistanceAlert {
    /// No person in frame.
    NoUser,
    /// Person too small in frame.
    TooFar,
    /// Person too large in frame.
    TooClose,
    /// Acceptable framing.
    Ok,
}

impl DistanceAlert {
    /// Alerts that count toward the stabilizer's absence grace period.
    pub fn counts_as_absent(self) -> bool {
        matches!(self, DistanceAlert::NoUser | DistanceAlert::TooFar)
    }
}

/// Tunable thresholds, all in the normalised image coordinate space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct PresenceConfig {
    /// Shoulders below this visibility are not trusted. Default: 0.5.
    pub visibility_floor: f32,
    /// Shoulder widths below this mean nobody is framed. Default: 1e-3.
    pub no_user_epsilon: f32,
    /// Shoulder widths below this are `TooFar`. Default: 0.18.
    pub far_threshold: f32,
    /// Shoulder widths above this are `TooClose`. Default: 0.50.
    pub close_threshold: f32,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            visibility_floor: 0.5,
            no_user_epsilon: 1e-3,
            far_threshold: 0.18,
            close_threshold: 0.50,
        }
    }
}

impl PresenceConfig {
    pub fn normalize(&mut self) {
        self.visibility_floor = self.visibility_floor.clamp(0.0, 1.0);
        self.no_user_epsilon = self.no_user_epsilon.clamp(0.0, 0.1);
        self.far_threshold = self.far_threshold.clamp(self.no_user_epsilon, 2.0);
        self.close_threshold = self.close_threshold.clamp(self.far_threshold, 2.0);
    }
}

/// Trait for all presence heuristics.
///
/// Assessment and state updates are split so a frame that later fails
/// classification leaves the monitor untouched: `check` reads, `observe`
/// commits.
pub trait PresenceMonitor: Send + 'static {
    /// Inspect a frame. `None` means the frame carries no usable signal and
    /// must not raise or clear any alert.
    fn check(&self, frame: &FeatureFrame) -> Option<DistanceAlert>;

    /// Called once the frame that produced `alert` has been committed.
    fn observe(&mut self, _alert: Option<DistanceAlert>) {}

    /// Reset any internal state.
    fn reset(&mut self);
}
