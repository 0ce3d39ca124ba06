//! Per-session stabilizer: turns boosted per-frame labels into at most one
//! confirmed label per frame.
//!
//! ## Frame flow
//!
//! ```text
//! distance alert ──► absence streak ≥ grace ? ──► clear, WaitingUser
//!                              │ no
//!                              ▼
//! boosted (label, conf) ──► fast-break ──► gate ──► instant win?
//!                                                      │ no
//!                                                      ▼
//!                                               majority vote
//!                                                      │
//!                                                      ▼
//!                                   Confirmed / Accumulating / Filling
//! ```
//!
//! The phase is recomputed on every frame from the buffer contents; only the
//! buffers and the absence streak persist between frames.

pub mod presets;

pub use presets::{preset_catalog, StabilizerPreset};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::buffering::{LandmarkWindow, RollingPredictionBuffer};
use crate::frame::FeatureFrame;
use crate::presence::DistanceAlert;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct StabilizerConfig {
    /// Boosted confidence at or above which a frame votes for its label.
    /// Default: 0.5.
    pub accept_threshold: f32,
    /// Boosted confidence below which a frame casts a null vote. Default: 0.2.
    pub reject_threshold: f32,
    /// Boosted confidence that confirms a label on its own. Default: 0.8.
    pub instant_threshold: f32,
    /// Confidence above which a label that disagrees with the current
    /// majority clears the buffer first. Default: 0.7.
    pub fast_break_threshold: f32,
    /// Share of the whole buffer (nulls included) the majority label needs.
    /// Default: 0.6.
    pub dominance_ratio: f32,
    /// Non-null votes required before majority voting runs. Default: 3.
    pub min_votes: usize,
    /// Rolling prediction buffer length. Default: 10.
    pub prediction_capacity: usize,
    /// Recent-frame window length. Default: 25.
    pub landmark_capacity: usize,
    /// Fill ratio above which an unconfirmed buffer reports `processing`.
    /// Default: 0.05.
    pub processing_fill_floor: f32,
    /// Consecutive `NO_USER` / `TOO_FAR` frames before auto-reset. Default: 5.
    pub no_user_grace: u32,
}

impl Default for StabilizerConfig {
    fn default() -> Self {
        Self {
            accept_threshold: 0.5,
            reject_threshold: 0.2,
            instant_threshold: 0.8,
            fast_break_threshold: 0.7,
            dominance_ratio: 0.6,
            min_votes: 3,
            prediction_capacity: 10,
            landmark_capacity: 25,
            processing_fill_floor: 0.05,
            no_user_grace: 5,
        }
    }
}

impl StabilizerConfig {
    /// Clamp into range and restore `reject <= accept <= fast_break`,
    /// `accept <= instant`.
    pub fn normalize(&mut self) {
        self.accept_threshold = clamp_unit(self.accept_threshold, 0.5);
        self.reject_threshold = clamp_unit(self.reject_threshold, 0.2).min(self.accept_threshold);
        self.instant_threshold = clamp_unit(self.instant_threshold, 0.8).max(self.accept_threshold);
        self.fast_break_threshold =
            clamp_unit(self.fast_break_threshold, 0.7).max(self.accept_threshold);
        self.dominance_ratio = clamp_unit(self.dominance_ratio, 0.6).max(0.01);
        self.prediction_capacity = self.prediction_capacity.clamp(1, 256);
        self.min_votes = self.min_votes.clamp(1, self.prediction_capacity);
        self.landmark_capacity = self.landmark_capacity.clamp(1, 1024);
        self.processing_fill_floor = clamp_unit(self.processing_fill_floor, 0.05);
        self.no_user_grace = self.no_user_grace.max(1);
    }
}

fn clamp_unit(value: f32, fallback: f32) -> f32 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        fallback
    }
}

/// Reported stabilizer state for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StabilizerPhase {
    WaitingUser,
    Filling,
    Accumulating,
    Confirmed,
}

/// How a label was confirmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmPath {
    Instant,
    Majority,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Verdict {
    pub phase: StabilizerPhase,
    /// Present only when `phase` is `Confirmed`.
    pub confirmed: Option<usize>,
    pub path: Option<ConfirmPath>,
    pub buffer_fill: f32,
}

#[derive(Debug)]
pub struct Stabilizer {
    config: StabilizerConfig,
    predictions: RollingPredictionBuffer,
    window: LandmarkWindow,
    absent_streak: u32,
    last_confirmed: Option<usize>,
    confirmations: u64,
}

impl Stabilizer {
    pub fn new(mut config: StabilizerConfig) -> Self {
        config.normalize();
        Self {
            predictions: RollingPredictionBuffer::new(config.prediction_capacity),
            window: LandmarkWindow::new(config.landmark_capacity),
            config,
            absent_streak: 0,
            last_confirmed: None,
            confirmations: 0,
        }
    }

    /// Whether observing `alert` next would reach the no-user grace.
    ///
    /// Does not mutate, so a caller can skip classification for the frame and
    /// still leave state untouched if it bails out.
    pub fn would_auto_reset(&self, alert: Option<DistanceAlert>) -> bool {
        self.next_streak(alert) >= self.config.no_user_grace
    }

    /// Record an absent frame that reached the grace and clear the buffers.
    pub fn enter_waiting(&mut self, alert: Option<DistanceAlert>) -> Verdict {
        self.absent_streak = self.next_streak(alert);
        if !self.predictions.is_empty() || !self.window.is_empty() {
            info!(
                streak = self.absent_streak,
                "no user in frame, clearing buffers"
            );
        }
        self.predictions.clear();
        self.window.clear();
        self.last_confirmed = None;
        Verdict {
            phase: StabilizerPhase::WaitingUser,
            confirmed: None,
            path: None,
            buffer_fill: 0.0,
        }
    }

    /// Run one classified frame through the vote.
    pub fn vote(
        &mut self,
        alert: Option<DistanceAlert>,
        frame: FeatureFrame,
        label: usize,
        confidence: f32,
    ) -> Verdict {
        if self.would_auto_reset(alert) {
            return self.enter_waiting(alert);
        }
        self.absent_streak = self.next_streak(alert);
        self.window.push(frame);

        let cfg = &self.config;
        if confidence > cfg.fast_break_threshold {
            if let Some(majority) = self.predictions.majority() {
                if majority.label != label {
                    debug!(
                        previous = majority.label,
                        label, confidence, "fast-break, clearing prediction buffer"
                    );
                    self.predictions.clear();
                }
            }
        }

        if confidence >= cfg.accept_threshold {
            self.predictions.push(Some(label));
        } else if confidence < cfg.reject_threshold {
            self.predictions.push(None);
        }

        let confirmation = if confidence >= cfg.instant_threshold {
            Some((label, ConfirmPath::Instant))
        } else {
            self.majority_confirmation()
                .map(|label| (label, ConfirmPath::Majority))
        };

        let buffer_fill = self.predictions.fill_ratio();
        match confirmation {
            Some((label, path)) => {
                if self.last_confirmed != Some(label) {
                    info!(label, confidence, ?path, "label confirmed");
                }
                self.last_confirmed = Some(label);
                self.confirmations += 1;
                Verdict {
                    phase: StabilizerPhase::Confirmed,
                    confirmed: Some(label),
                    path: Some(path),
                    buffer_fill,
                }
            }
            None => Verdict {
                phase: if buffer_fill > self.config.processing_fill_floor {
                    StabilizerPhase::Accumulating
                } else {
                    StabilizerPhase::Filling
                },
                confirmed: None,
                path: None,
                buffer_fill,
            },
        }
    }

    fn majority_confirmation(&self) -> Option<usize> {
        if self.predictions.non_null_count() < self.config.min_votes {
            return None;
        }
        let vote = self.predictions.majority()?;
        let share = vote.count as f32 / self.predictions.len() as f32;
        (share >= self.config.dominance_ratio).then_some(vote.label)
    }

    fn next_streak(&self, alert: Option<DistanceAlert>) -> u32 {
        if alert.is_some_and(DistanceAlert::counts_as_absent) {
            self.absent_streak.saturating_add(1)
        } else {
            0
        }
    }

    /// Drop the votes only (after an accepted word).
    pub fn clear_votes(&mut self) {
        self.predictions.clear();
        self.last_confirmed = None;
    }

    /// Drop all transient state.
    pub fn reset(&mut self) {
        self.predictions.clear();
        self.window.clear();
        self.absent_streak = 0;
        self.last_confirmed = None;
    }

    pub fn config(&self) -> &StabilizerConfig {
        &self.config
    }

    pub fn predictions(&self) -> &RollingPredictionBuffer {
        &self.predictions
    }

    pub fn window(&self) -> &LandmarkWindow {
        &self.window
    }

    pub fn absent_streak(&self) -> u32 {
        self.absent_streak
    }

    pub fn last_confirmed(&self) -> Option<usize> {
        self.last_confirmed
    }

    /// Frames that ended `Confirmed` since the stabilizer was built.
    pub fn confirmations(&self) -> u64 {
        self.confirmations
    }
}
