//! Dual-orientation scoring.
//!
//! Each frame is scored as captured and mirrored; the more confident of the
//! two wins. This is not a rejection point: a low-confidence winner is still
//! returned and left to the stabilizer's gates.

pub mod mirror;

pub use mirror::mirror;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Result;
use crate::frame::FeatureFrame;
use crate::inference::{ClassificationResult, ClassifierHandle};

/// Which variant of the frame produced the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Original,
    Mirrored,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct OrientationConfig {
    /// Score the mirrored frame as well. Default: true.
    pub mirror_rescoring: bool,
}

impl Default for OrientationConfig {
    fn default() -> Self {
        Self {
            mirror_rescoring: true,
        }
    }
}

/// Classifier output tagged with the winning orientation.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    pub result: ClassificationResult,
    pub orientation: Orientation,
}

/// Score `frame` (and its mirror, if enabled) and keep the more confident.
///
/// Ties keep the original. A failure scoring the mirror degrades to the
/// original result; a failure scoring the original is returned.
///
/// # Errors
/// Classifier failures on the original frame, including a distribution whose
/// length differs from `num_labels`.
pub fn resolve(
    classifier: &ClassifierHandle,
    frame: &FeatureFrame,
    num_labels: usize,
    config: &OrientationConfig,
) -> Result<Resolved> {
    let original = classifier.classify(frame, num_labels)?;
    if !config.mirror_rescoring {
        return Ok(Resolved {
            result: original,
            orientation: Orientation::Original,
        });
    }

    let mirrored = match classifier.classify(&mirror(frame), num_labels) {
        Ok(result) => result,
        Err(e) => {
            warn!("mirrored scoring failed ({e}), keeping original orientation");
            return Ok(Resolved {
                result: original,
                orientation: Orientation::Original,
            });
        }
    };

    debug!(
        original = original.confidence,
        mirrored = mirrored.confidence,
        "orientation scores"
    );

    if mirrored.confidence > original.confidence {
        Ok(Resolved {
            result: mirrored,
            orientation: Orientation::Mirrored,
        })
    } else {
        Ok(Resolved {
            result: original,
            orientation: Orientation::Original,
        })
    }
}
