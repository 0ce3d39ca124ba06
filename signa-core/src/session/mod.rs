//! One user's recognition session.
//!
//! A `Session` owns every piece of per-user state: the stabilizer buffers,
//! word history, language cache, category context and the presence/motion
//! trackers. Only the classifier, the language model and the category table
//! are shared, all read-only.
//!
//! ## Per-frame order
//!
//! 1. Validate the frame (wrong length or non-finite → `error`, no mutation).
//! 2. Presence check. If the absence grace is reached, clear and return
//!    `no_user` without calling the classifier.
//! 3. Score original and mirrored frame, keep the more confident.
//! 4. Motion update (advisory).
//! 5. Context boost.
//! 6. Stabilizer vote → status.
//!
//! A classifier failure in step 3 returns `error` before anything in steps
//! 2–6 is committed, so the next frame simply retries.

pub mod config;

pub use config::SessionConfig;

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::context::{CategoryTable, ContextBooster, WordHistory};
use crate::error::{Result, SignaError};
use crate::frame::FeatureFrame;
use crate::inference::{ClassifierHandle, LabelSet, LanguageModelHandle};
use crate::ipc::{Decision, DecisionStatus};
use crate::motion::MotionTracker;
use crate::orientation::{self, Orientation};
use crate::presence::{DistanceAlert, PresenceMonitor, ShoulderWidthMonitor};
use crate::stabilizer::{Stabilizer, Verdict};

/// Snapshot of a session's counters and buffers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStats {
    pub total_frames: u64,
    pub landmark_window_len: usize,
    pub landmark_window_capacity: usize,
    pub prediction_len: usize,
    pub prediction_capacity: usize,
    pub last_confirmed: Option<String>,
    pub confirmations: u64,
    pub absent_streak: u32,
    pub context: Option<String>,
    pub word_history: Vec<String>,
}

pub struct Session {
    config: SessionConfig,
    classifier: ClassifierHandle,
    language_model: Option<LanguageModelHandle>,
    labels: LabelSet,
    booster: ContextBooster,
    history: WordHistory,
    presence: Box<dyn PresenceMonitor>,
    motion: MotionTracker,
    stabilizer: Stabilizer,
    total_frames: u64,
    last_accepted_word: Option<String>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("labels", &self.labels.len())
            .field("total_frames", &self.total_frames)
            .field("context", &self.booster.current_context())
            .field("history", &self.history.len())
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Build a session around shared collaborators.
    ///
    /// # Errors
    /// `SignaError::Config` if the label set is empty or its size differs
    /// from the classifier's output width.
    pub fn new(
        mut config: SessionConfig,
        classifier: ClassifierHandle,
        language_model: Option<LanguageModelHandle>,
        labels: LabelSet,
        categories: Arc<CategoryTable>,
    ) -> Result<Self> {
        if labels.is_empty() {
            return Err(SignaError::Config("label set is empty".into()));
        }
        if classifier.num_labels() != labels.len() {
            return Err(SignaError::Config(format!(
                "classifier has {} outputs, label set has {} names",
                classifier.num_labels(),
                labels.len()
            )));
        }
        config.normalize();
        Ok(Self {
            booster: ContextBooster::new(config.boost.clone(), labels.clone(), categories),
            history: WordHistory::new(config.history_capacity),
            presence: Box::new(ShoulderWidthMonitor::new(config.presence.clone())),
            motion: MotionTracker::new(config.motion.clone()),
            stabilizer: Stabilizer::new(config.stabilizer.clone()),
            config,
            classifier,
            language_model,
            labels,
            total_frames: 0,
            last_accepted_word: None,
        })
    }

    /// Replace the default shoulder-width presence check.
    pub fn with_presence_monitor(mut self, monitor: Box<dyn PresenceMonitor>) -> Self {
        self.presence = monitor;
        self
    }

    /// Process one frame. Never fails: errors become an `error` decision and
    /// leave the session untouched.
    pub fn ingest(&mut self, values: &[f32]) -> Decision {
        match self.try_ingest(values) {
            Ok(decision) => decision,
            Err(e) => {
                if e.is_input_error() {
                    debug!("frame rejected: {e}");
                } else if e.is_classifier_error() {
                    warn!("classifier failed: {e}");
                } else {
                    error!("frame failed: {e}");
                }
                self.error_decision(&e)
            }
        }
    }

    /// The `error` decision reported for a failed frame.
    pub fn error_decision(&self, error: &SignaError) -> Decision {
        let mut decision = Decision::error(error.to_string());
        decision.context = self.booster.current_context().map(str::to_string);
        decision.last_accepted_word = self.last_accepted_word.clone();
        decision
    }

    /// Process one frame, returning per-frame failures as errors.
    ///
    /// # Errors
    /// Input shape errors and classifier failures. No session state is
    /// modified when an error is returned.
    pub fn try_ingest(&mut self, values: &[f32]) -> Result<Decision> {
        let frame = FeatureFrame::from_slice(values)?;
        // Assessed now, committed to the monitor only once the frame is.
        let alert = self.presence.check(&frame);

        if self.stabilizer.would_auto_reset(alert) {
            self.presence.observe(alert);
            let verdict = self.stabilizer.enter_waiting(alert);
            self.motion.reset();
            self.total_frames += 1;
            return Ok(self.decision(verdict, 0.0, alert, None));
        }

        let resolved = orientation::resolve(
            &self.classifier,
            &frame,
            self.labels.len(),
            &self.config.orientation,
        )?;

        self.presence.observe(alert);
        self.total_frames += 1;
        self.motion.update(&frame);
        let boosted = self.booster.boost(&resolved.result);
        let verdict = self
            .stabilizer
            .vote(alert, frame, boosted.label, boosted.confidence);
        debug!(
            frame = self.total_frames,
            label = boosted.label,
            confidence = boosted.confidence,
            boosted = boosted.boosted,
            phase = ?verdict.phase,
            fill = verdict.buffer_fill,
            "frame processed"
        );
        Ok(self.decision(
            verdict,
            boosted.confidence,
            alert,
            Some(resolved.orientation),
        ))
    }

    /// Record a word the user accepted.
    ///
    /// Appends to the history, re-infers the category, refreshes the
    /// language cache and clears the votes so the next sign starts fresh.
    /// Returns the category context in effect afterwards.
    ///
    /// # Errors
    /// `SignaError::EmptyWord` for an empty or whitespace-only word.
    pub fn accept(&mut self, word: &str) -> Result<Option<String>> {
        let word = word.trim();
        if word.is_empty() {
            return Err(SignaError::EmptyWord);
        }
        self.history.push(word.to_string());
        self.booster.infer_from_word(word);
        self.booster
            .refresh_language(&self.history, self.language_model.as_ref());
        self.stabilizer.clear_votes();
        self.last_accepted_word = Some(word.to_string());
        info!(
            word,
            history = self.history.len(),
            context = ?self.booster.current_context(),
            "word accepted"
        );
        Ok(self.booster.current_context().map(str::to_string))
    }

    /// Clear buffers and trackers. Word history and context are kept.
    pub fn reset(&mut self) {
        self.stabilizer.reset();
        self.motion.reset();
        self.presence.reset();
        self.total_frames = 0;
        info!("session buffers reset");
    }

    /// Set or clear the category context; see [`ContextBooster::set_context`].
    ///
    /// # Errors
    /// `SignaError::UnknownCategory` for a name the category table lacks.
    pub fn set_context(&mut self, name: Option<&str>, manual: bool) -> Result<Option<String>> {
        Ok(self
            .booster
            .set_context(name, manual)?
            .map(str::to_string))
    }

    pub fn stats(&self) -> SessionStats {
        SessionStats {
            total_frames: self.total_frames,
            landmark_window_len: self.stabilizer.window().len(),
            landmark_window_capacity: self.stabilizer.window().capacity(),
            prediction_len: self.stabilizer.predictions().len(),
            prediction_capacity: self.stabilizer.predictions().capacity(),
            last_confirmed: self
                .stabilizer
                .last_confirmed()
                .and_then(|l| self.labels.name(l))
                .map(str::to_string),
            confirmations: self.stabilizer.confirmations(),
            absent_streak: self.stabilizer.absent_streak(),
            context: self.booster.current_context().map(str::to_string),
            word_history: self.history.to_vec(),
        }
    }

    pub fn history(&self) -> &WordHistory {
        &self.history
    }

    pub fn stabilizer(&self) -> &Stabilizer {
        &self.stabilizer
    }

    pub fn booster(&self) -> &ContextBooster {
        &self.booster
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn labels(&self) -> &LabelSet {
        &self.labels
    }

    fn decision(
        &mut self,
        verdict: Verdict,
        confidence: f32,
        alert: Option<DistanceAlert>,
        orientation: Option<Orientation>,
    ) -> Decision {
        let status = DecisionStatus::from(verdict.phase);
        let word = verdict
            .confirmed
            .and_then(|label| self.labels.name(label))
            .map(str::to_string);
        Decision {
            status,
            word,
            confidence,
            buffer_fill: verdict.buffer_fill,
            distance_alert: alert,
            context: self.booster.current_context().map(str::to_string),
            context_changed: self.booster.take_context_changed(),
            last_accepted_word: self.last_accepted_word.clone(),
            motion: Some(self.motion.state()),
            velocity: self.motion.velocity(),
            orientation,
            detail: None,
        }
    }
}
