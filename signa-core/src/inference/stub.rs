//! In-process collaborator stubs.
//!
//! Used by tests and the replay binary so the whole decision path can run
//! without a trained network or language model behind it.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::error::{Result, SignaError};
use crate::frame::FeatureFrame;
use crate::inference::{ClassificationResult, Classifier, LanguageModel};

/// Returns the same distribution for every frame.
#[derive(Debug, Clone)]
pub struct FixedClassifier {
    distribution: Vec<f32>,
}

impl FixedClassifier {
    pub fn new(distribution: Vec<f32>) -> Self {
        Self { distribution }
    }
}

impl Classifier for FixedClassifier {
    fn num_labels(&self) -> usize {
        self.distribution.len()
    }

    fn classify(&self, _frame: &FeatureFrame) -> Result<ClassificationResult> {
        ClassificationResult::from_distribution(self.distribution.clone())
    }
}

/// Returns whatever distribution the caller queued last.
///
/// Clones share the same slot, so a test can keep one clone and hand the
/// other to a session. `fail_next` makes the next call report the classifier
/// as unavailable.
#[derive(Debug, Clone)]
pub struct ScriptedClassifier {
    num_labels: usize,
    state: Arc<Mutex<ScriptState>>,
}

#[derive(Debug)]
struct ScriptState {
    current: Vec<f32>,
    fail_next: bool,
    calls: usize,
}

impl ScriptedClassifier {
    /// Starts with a uniform distribution.
    pub fn new(num_labels: usize) -> Self {
        let uniform = if num_labels == 0 {
            Vec::new()
        } else {
            vec![1.0 / num_labels as f32; num_labels]
        };
        Self {
            num_labels,
            state: Arc::new(Mutex::new(ScriptState {
                current: uniform,
                fail_next: false,
                calls: 0,
            })),
        }
    }

    pub fn set(&self, distribution: Vec<f32>) {
        self.state.lock().current = distribution;
    }

    /// Put `confidence` on `label` and spread the rest evenly.
    pub fn set_peak(&self, label: usize, confidence: f32) {
        let n = self.num_labels;
        let rest = if n > 1 {
            (1.0 - confidence).max(0.0) / (n - 1) as f32
        } else {
            0.0
        };
        let mut distribution = vec![rest; n];
        if let Some(slot) = distribution.get_mut(label) {
            *slot = confidence;
        }
        self.set(distribution);
    }

    pub fn fail_next(&self) {
        self.state.lock().fail_next = true;
    }

    pub fn calls(&self) -> usize {
        self.state.lock().calls
    }
}

impl Classifier for ScriptedClassifier {
    fn num_labels(&self) -> usize {
        self.num_labels
    }

    fn classify(&self, _frame: &FeatureFrame) -> Result<ClassificationResult> {
        let mut state = self.state.lock();
        state.calls += 1;
        if std::mem::take(&mut state.fail_next) {
            return Err(SignaError::ClassifierUnavailable("scripted failure".into()));
        }
        ClassificationResult::from_distribution(state.current.clone())
    }
}

/// Table-driven next-word priors keyed on the last accepted word.
#[derive(Debug, Clone, Default)]
pub struct BigramLanguageModel {
    table: HashMap<String, HashMap<String, f32>>,
}

impl BigramLanguageModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `prior` for `next` following `previous` (case-insensitive).
    pub fn with_bigram(mut self, previous: &str, next: &str, prior: f32) -> Self {
        self.table
            .entry(previous.trim().to_lowercase())
            .or_default()
            .insert(next.to_string(), prior);
        self
    }
}

impl LanguageModel for BigramLanguageModel {
    fn score(&self, history: &[String]) -> Result<HashMap<String, f32>> {
        let Some(last) = history.last() else {
            return Ok(HashMap::new());
        };
        let priors = self
            .table
            .get(&last.trim().to_lowercase())
            .cloned()
            .unwrap_or_default();
        debug!(last = %last, candidates = priors.len(), "BigramLanguageModel::score");
        Ok(priors)
    }
}
