//! Collaborator abstractions: sign classifier and language-model scorer.
//!
//! Both are constructed once per process and handed to every session by
//! handle. Model weights are read-only at inference time, so the traits take
//! `&self` and the handles share through a plain `Arc` with no lock.

pub mod labels;
pub mod stub;

pub use labels::LabelSet;

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{Result, SignaError};
use crate::frame::FeatureFrame;

/// How far a distribution's sum may stray from 1.
pub const DISTRIBUTION_SUM_TOLERANCE: f32 = 1e-3;

/// One scored frame: a probability per label plus its arg-max.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationResult {
    /// Index of the most probable label.
    pub label: usize,
    /// Probability of `label`.
    pub confidence: f32,
    /// Probability per label, same order as the session's `LabelSet`.
    pub distribution: Vec<f32>,
}

impl ClassificationResult {
    /// Build a result from a raw distribution, computing the arg-max.
    ///
    /// Ties resolve to the lowest index.
    ///
    /// # Errors
    /// `SignaError::ClassifierUnavailable` if the distribution is empty,
    /// contains a negative or non-finite value, is all zeros, or does not sum
    /// to 1 within [`DISTRIBUTION_SUM_TOLERANCE`].
    pub fn from_distribution(distribution: Vec<f32>) -> Result<Self> {
        if distribution.is_empty() {
            return Err(SignaError::ClassifierUnavailable(
                "classifier returned an empty distribution".into(),
            ));
        }
        if distribution.iter().any(|p| !p.is_finite() || *p < 0.0) {
            return Err(SignaError::ClassifierUnavailable(
                "classifier returned an invalid probability".into(),
            ));
        }
        let sum: f32 = distribution.iter().sum();
        if sum <= 0.0 {
            return Err(SignaError::ClassifierUnavailable(
                "classifier returned an all-zero distribution".into(),
            ));
        }
        if (sum - 1.0).abs() > DISTRIBUTION_SUM_TOLERANCE {
            return Err(SignaError::ClassifierUnavailable(format!(
                "classifier distribution sums to {sum:.4}, expected 1"
            )));
        }
        let (label, confidence) = arg_max(&distribution);
        Ok(Self {
            label,
            confidence,
            distribution,
        })
    }
}

/// Index and value of the largest entry; first wins on ties.
pub(crate) fn arg_max(values: &[f32]) -> (usize, f32) {
    values
        .iter()
        .copied()
        .enumerate()
        .fold((0, f32::MIN), |best, (i, p)| if p > best.1 { (i, p) } else { best })
}

/// Contract for sign classifiers.
pub trait Classifier: Send + Sync + 'static {
    /// Number of labels in every distribution this classifier returns.
    fn num_labels(&self) -> usize;

    /// Score one frame.
    ///
    /// # Errors
    /// Must fail explicitly on malformed input or backend failure, never
    /// return a zero distribution in its place.
    fn classify(&self, frame: &FeatureFrame) -> Result<ClassificationResult>;
}

/// Shared handle to any `Classifier` implementor.
#[derive(Clone)]
pub struct ClassifierHandle(pub Arc<dyn Classifier>);

impl ClassifierHandle {
    pub fn new<C: Classifier>(classifier: C) -> Self {
        Self(Arc::new(classifier))
    }

    pub fn num_labels(&self) -> usize {
        self.0.num_labels()
    }

    /// Score a frame and check the distribution against `expected` labels.
    pub fn classify(&self, frame: &FeatureFrame, expected: usize) -> Result<ClassificationResult> {
        let result = self.0.classify(frame)?;
        if result.distribution.len() != expected {
            return Err(SignaError::DistributionMismatch {
                expected,
                got: result.distribution.len(),
            });
        }
        Ok(result)
    }
}

impl std::fmt::Debug for ClassifierHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassifierHandle").finish_non_exhaustive()
    }
}

/// Contract for next-word prior scorers.
pub trait LanguageModel: Send + Sync + 'static {
    /// Map the accepted-word history to a prior per candidate label name.
    ///
    /// Labels missing from the returned map get no boost.
    fn score(&self, history: &[String]) -> Result<HashMap<String, f32>>;
}

/// Shared handle to any `LanguageModel` implementor.
#[derive(Clone)]
pub struct LanguageModelHandle(pub Arc<dyn LanguageModel>);

impl LanguageModelHandle {
    pub fn new<M: LanguageModel>(model: M) -> Self {
        Self(Arc::new(model))
    }
}

impl std::fmt::Debug for LanguageModelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LanguageModelHandle").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::stub::FixedClassifier;

    #[test]
    fn arg_max_prefers_first_on_tie() {
        let result = ClassificationResult::from_distribution(vec![0.2, 0.4, 0.4]).unwrap();
        assert_eq!(result.label, 1);
        assert_eq!(result.confidence, 0.4);
    }

    #[test]
    fn empty_distribution_is_an_error() {
        let err = ClassificationResult::from_distribution(vec![]).unwrap_err();
        assert!(err.is_classifier_error());
    }

    #[test]
    fn negative_probability_is_an_error() {
        assert!(ClassificationResult::from_distribution(vec![0.5, -0.1]).is_err());
    }

    #[test]
    fn all_zero_distribution_is_a_classifier_error() {
        let err = ClassificationResult::from_distribution(vec![0.0, 0.0, 0.0]).unwrap_err();
        assert!(err.is_classifier_error());
    }

    #[test]
    fn unnormalised_distribution_is_rejected() {
        let err = ClassificationResult::from_distribution(vec![3.0, 1.0, 1.0]).unwrap_err();
        assert!(err.is_classifier_error());
        assert!(ClassificationResult::from_distribution(vec![0.3, 0.3, 0.3]).is_err());
    }

    #[test]
    fn rounding_noise_in_the_sum_is_tolerated() {
        let result =
            ClassificationResult::from_distribution(vec![0.3333, 0.3333, 0.3335]).unwrap();
        assert_eq!(result.label, 2);
    }

    #[test]
    fn handle_rejects_label_count_mismatch() {
        let handle = ClassifierHandle::new(FixedClassifier::new(vec![0.5, 0.5]));
        let err = handle.classify(&FeatureFrame::empty(), 3).unwrap_err();
        assert!(matches!(
            err,
            SignaError::DistributionMismatch {
                expected: 3,
                got: 2
            }
        ));
    }
}
