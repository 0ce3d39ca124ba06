//! Event types returned per frame and broadcast by the engine.
//!
//! | Type | Produced by |
//! |------|-------------|
//! | `Decision` | `Session::ingest`, one per frame |
//! | `SessionEvent` | engine workers, on the broadcast channel |
//!
//! Field names are camelCase on the wire; status tags are snake_case.

use serde::{Deserialize, Serialize};

use crate::motion::MotionState;
use crate::orientation::Orientation;
use crate::presence::DistanceAlert;
use crate::stabilizer::StabilizerPhase;

// ---------------------------------------------------------------------------
// Per-frame decision
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionStatus {
    /// Nobody framed for longer than the grace; buffers were cleared.
    NoUser,
    /// Votes are accumulating but nothing is confirmed yet.
    Processing,
    /// Buffer (nearly) empty, nothing to report.
    Uncertain,
    /// A label was confirmed on this frame.
    Predicting,
    /// The frame was rejected or the classifier failed. No state changed.
    Error,
}

impl From<StabilizerPhase> for DecisionStatus {
    fn from(phase: StabilizerPhase) -> Self {
        match phase {
            StabilizerPhase::WaitingUser => DecisionStatus::NoUser,
            StabilizerPhase::Filling => DecisionStatus::Uncertain,
            StabilizerPhase::Accumulating => DecisionStatus::Processing,
            StabilizerPhase::Confirmed => DecisionStatus::Predicting,
        }
    }
}

/// Output of one `ingest` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Decision {
    pub status: DecisionStatus,
    /// Confirmed label; present only when `status` is `predicting`.
    pub word: Option<String>,
    /// Boosted confidence of this frame's winner, confirmed or not.
    pub confidence: f32,
    /// Prediction buffer length / capacity.
    pub buffer_fill: f32,
    /// Framing alert; `None` when the shoulders were not trustworthy.
    pub distance_alert: Option<DistanceAlert>,
    /// Active category context.
    pub context: Option<String>,
    /// True on the first decision after the category context changed.
    pub context_changed: bool,
    pub last_accepted_word: Option<String>,
    pub motion: Option<MotionState>,
    pub velocity: f32,
    /// Orientation the winning score came from.
    pub orientation: Option<Orientation>,
    /// Error detail when `status` is `error`.
    pub detail: Option<String>,
}

impl Decision {
    /// An `error` decision carrying no prediction.
    pub fn error(detail: impl Into<String>) -> Self {
        Self {
            status: DecisionStatus::Error,
            word: None,
            confidence: 0.0,
            buffer_fill: 0.0,
            distance_alert: None,
            context: None,
            context_changed: false,
            last_accepted_word: None,
            motion: None,
            velocity: 0.0,
            orientation: None,
            detail: Some(detail.into()),
        }
    }

    pub fn is_confirmed(&self) -> bool {
        self.status == DecisionStatus::Predicting && self.word.is_some()
    }
}

// ---------------------------------------------------------------------------
// Engine events
// ---------------------------------------------------------------------------

/// Broadcast by the engine for every session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SessionEvent {
    #[serde(rename_all = "camelCase")]
    Decision {
        /// Monotonically increasing per session.
        seq: u64,
        session_id: String,
        decision: Decision,
    },
    #[serde(rename_all = "camelCase")]
    WordAccepted {
        session_id: String,
        word: String,
        context: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    ResetAck { session_id: String },
    #[serde(rename_all = "camelCase")]
    ContextAck {
        session_id: String,
        current_context: Option<String>,
    },
    /// A control operation failed; the session keeps running.
    #[serde(rename_all = "camelCase")]
    ControlError { session_id: String, message: String },
    #[serde(rename_all = "camelCase")]
    Closed { session_id: String },
}

impl SessionEvent {
    pub fn session_id(&self) -> &str {
        match self {
            SessionEvent::Decision { session_id, .. }
            | SessionEvent::WordAccepted { session_id, .. }
            | SessionEvent::ResetAck { session_id }
            | SessionEvent::ContextAck { session_id, .. }
            | SessionEvent::ControlError { session_id, .. }
            | SessionEvent::Closed { session_id } => session_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn predicting() -> Decision {
        Decision {
            status: DecisionStatus::Predicting,
            word: Some("HOLA".into()),
            confidence: 0.91,
            buffer_fill: 0.3,
            distance_alert: Some(DistanceAlert::Ok),
            context: Some("Saludos".into()),
            context_changed: true,
            last_accepted_word: None,
            motion: Some(MotionState::Static),
            velocity: 0.002,
            orientation: Some(Orientation::Mirrored),
            detail: None,
        }
    }

    #[test]
    fn decision_serializes_with_camel_case_fields() {
        let json = serde_json::to_value(predicting()).expect("serialize decision");
        assert_eq!(json["status"], "predicting");
        assert_eq!(json["word"], "HOLA");
        assert_eq!(json["distanceAlert"], "OK");
        assert_eq!(json["contextChanged"], true);
        assert_eq!(json["orientation"], "mirrored");
        assert_eq!(json["motion"], "static");
        assert!(json["lastAcceptedWord"].is_null());
        let fill = json["bufferFill"].as_f64().expect("bufferFill is a number");
        assert!((fill - 0.3).abs() < 1e-5);
    }

    #[test]
    fn status_tags_are_snake_case() {
        let json = serde_json::to_value(DecisionStatus::NoUser).expect("serialize status");
        assert_eq!(json, "no_user");
        assert!(serde_json::from_str::<DecisionStatus>(r#""NoUser""#).is_err());
    }

    #[test]
    fn error_decision_has_no_word() {
        let decision = Decision::error("expected 226 values, got 3");
        assert_eq!(decision.status, DecisionStatus::Error);
        assert!(!decision.is_confirmed());
        let json = serde_json::to_value(&decision).expect("serialize error decision");
        assert_eq!(json["detail"], "expected 226 values, got 3");
    }

    #[test]
    fn session_event_is_tagged() {
        let event = SessionEvent::ContextAck {
            session_id: "s1".into(),
            current_context: Some("Colores".into()),
        };
        let json = serde_json::to_value(&event).expect("serialize event");
        assert_eq!(json["type"], "contextAck");
        assert_eq!(json["sessionId"], "s1");
        assert_eq!(json["currentContext"], "Colores");

        let round_trip: SessionEvent = serde_json::from_value(json).expect("deserialize event");
        assert_eq!(round_trip, event);
        assert_eq!(round_trip.session_id(), "s1");
    }

    #[test]
    fn decision_event_round_trips() {
        let event = SessionEvent::Decision {
            seq: 4,
            session_id: "s2".into(),
            decision: predicting(),
        };
        let json = serde_json::to_string(&event).expect("serialize decision event");
        let back: SessionEvent = serde_json::from_str(&json).expect("deserialize decision event");
        assert_eq!(back, event);
    }

    #[test]
    fn phase_maps_to_status() {
        assert_eq!(
            DecisionStatus::from(StabilizerPhase::Filling),
            DecisionStatus::Uncertain
        );
        assert_eq!(
            DecisionStatus::from(StabilizerPhase::Accumulating),
            DecisionStatus::Processing
        );
    }
}
