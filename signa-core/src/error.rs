use thiserror::Error;

/// All errors produced by signa-core.
#[derive(Debug, Error)]
pub enum SignaError {
    #[error("invalid frame shape: expected {expected} values, got {got}")]
    InputShape { expected: usize, got: usize },

    #[error("frame value at index {index} is not finite")]
    NonFiniteValue { index: usize },

    #[error("classifier unavailable: {0}")]
    ClassifierUnavailable(String),

    #[error("classifier returned {got} probabilities, label set has {expected}")]
    DistributionMismatch { expected: usize, got: usize },

    #[error("language model error: {0}")]
    LanguageModel(String),

    #[error("unknown category: {0}")]
    UnknownCategory(String),

    #[error("accepted word is empty")]
    EmptyWord,

    #[error("session not found: {0}")]
    SessionNotFound(String),

    #[error("session already open: {0}")]
    SessionExists(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SignaError {
    /// Frame-level rejections: the frame is dropped and no state changes.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            SignaError::InputShape { .. } | SignaError::NonFiniteValue { .. }
        )
    }

    /// Failures of the external classifier for one frame.
    pub fn is_classifier_error(&self) -> bool {
        matches!(
            self,
            SignaError::ClassifierUnavailable(_) | SignaError::DistributionMismatch { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, SignaError>;
