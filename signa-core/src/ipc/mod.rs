//! Wire types for decisions and session events.
//!
//! All types derive `serde::Serialize` + `serde::Deserialize` so a transport
//! can forward them as JSON unchanged.

pub mod events;

pub use events::{Decision, DecisionStatus, SessionEvent};
