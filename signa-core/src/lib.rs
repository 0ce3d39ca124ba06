//! # signa-core
//!
//! Stream stabilisation for sign-language recognition: turns noisy per-frame
//! classifier output into one confirmed label at a time.
//!
//! ## Architecture
//!
//! ```text
//! submit_frame → FrameQueue (drop-oldest) → worker(spawn_blocking)
//!                                               │
//!                                     Session::try_ingest
//!                                               │
//!        presence ─► orientation (Classifier ×2) ─► motion ─► context boost
//!                                               │
//!                                          Stabilizer
//!                                               │
//!                               broadcast::Sender<SessionEvent>
//! ```
//!
//! `Session` can also be driven directly, without the engine, when the caller
//! already serialises frames itself.

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod buffering;
pub mod context;
pub mod engine;
pub mod error;
pub mod frame;
pub mod inference;
pub mod ipc;
pub mod motion;
pub mod orientation;
pub mod presence;
pub mod session;
pub mod stabilizer;

// Convenience re-exports for downstream crates
pub use context::{BoostConfig, CategoryTable, ContextState, WordHistory};
pub use engine::{DiagnosticsSnapshot, SignaEngine};
pub use error::{Result, SignaError};
pub use frame::{FeatureFrame, FRAME_LEN};
pub use inference::{
    ClassificationResult, Classifier, ClassifierHandle, LabelSet, LanguageModel,
    LanguageModelHandle,
};
pub use ipc::events::{Decision, DecisionStatus, SessionEvent};
pub use presence::{DistanceAlert, PresenceMonitor};
pub use session::{Session, SessionConfig, SessionStats};
pub use stabilizer::{StabilizerConfig, StabilizerPreset};
