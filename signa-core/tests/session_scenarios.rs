use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use signa_core::frame::{pose, Hand, FRAME_LEN, HAND_STRIDE, LEFT_HAND_OFFSET, POSE_STRIDE};
use signa_core::inference::stub::{FixedClassifier, ScriptedClassifier};
use signa_core::presence::PresenceMonitor;
use signa_core::{
    CategoryTable, ClassificationResult, Classifier, ClassifierHandle, DecisionStatus,
    DistanceAlert, FeatureFrame, LabelSet, Session, SessionConfig, SignaError, StabilizerConfig,
};

const LABELS: [&str; 4] = ["A", "B", "C", "D"];

fn frame_with_shoulder_width(width: f32) -> Vec<f32> {
    let mut values = vec![0.0; FRAME_LEN];
    let left = pose::LEFT_SHOULDER * POSE_STRIDE;
    let right = pose::RIGHT_SHOULDER * POSE_STRIDE;
    let centre = 0.5;
    values[left..left + 4].copy_from_slice(&[centre - width / 2.0, 0.5, 0.0, 0.95]);
    values[right..right + 4].copy_from_slice(&[centre + width / 2.0, 0.5, 0.0, 0.95]);
    values
}

fn framed() -> Vec<f32> {
    frame_with_shoulder_width(0.3)
}

fn session(config: SessionConfig, categories: CategoryTable) -> (Session, ScriptedClassifier) {
    let script = ScriptedClassifier::new(LABELS.len());
    let session = Session::new(
        config,
        ClassifierHandle::new(script.clone()),
        None,
        LabelSet::new(LABELS),
        Arc::new(categories),
    )
    .expect("session builds");
    (session, script)
}

fn config_with(stabilizer: StabilizerConfig) -> SessionConfig {
    SessionConfig {
        stabilizer,
        ..SessionConfig::default()
    }
}

#[test]
fn confident_stream_confirms_on_first_frame() {
    let (mut session, script) = session(
        config_with(StabilizerConfig {
            prediction_capacity: 5,
            ..StabilizerConfig::default()
        }),
        CategoryTable::new(),
    );
    script.set_peak(0, 0.9);

    for i in 0..5 {
        let decision = session.ingest(&framed());
        assert_eq!(decision.status, DecisionStatus::Predicting, "frame {i}");
        assert_eq!(decision.word.as_deref(), Some("A"), "frame {i}");
    }
}

#[test]
fn ambiguous_then_consistent_frames_confirm_b() {
    let (mut session, script) = session(
        config_with(StabilizerConfig {
            accept_threshold: 0.4,
            dominance_ratio: 0.6,
            prediction_capacity: 5,
            ..StabilizerConfig::default()
        }),
        CategoryTable::new(),
    );

    let mut last = None;
    for (label, confidence) in [(0, 0.3), (0, 0.3), (1, 0.6), (1, 0.6), (1, 0.6)] {
        script.set_peak(label, confidence);
        last = Some(session.ingest(&framed()));
    }
    let last = last.expect("five decisions");
    assert_eq!(last.status, DecisionStatus::Predicting);
    assert_eq!(last.word.as_deref(), Some("B"));
    assert_eq!(session.stats().prediction_len, 3);
}

#[test]
fn word_is_only_reported_while_predicting() {
    let (mut session, script) = session(SessionConfig::default(), CategoryTable::new());
    for (label, confidence) in [(2, 0.55), (1, 0.1), (3, 0.35), (2, 0.6)] {
        script.set_peak(label, confidence);
        let decision = session.ingest(&framed());
        assert_eq!(
            decision.word.is_some(),
            decision.status == DecisionStatus::Predicting
        );
    }
}

#[test]
fn accept_then_reset_preserves_history_only() {
    let (mut session, script) = session(SessionConfig::default(), CategoryTable::new());
    script.set_peak(0, 0.6);
    session.ingest(&framed());
    session.ingest(&framed());

    session.accept("HOLA").expect("accept");
    session.reset();

    let stats = session.stats();
    assert_eq!(stats.word_history, vec!["HOLA".to_string()]);
    assert_eq!(stats.prediction_len, 0);
    assert_eq!(stats.landmark_window_len, 0);
}

#[test]
fn user_walking_away_clears_buffers() {
    let (mut session, script) = session(SessionConfig::default(), CategoryTable::new());
    script.set_peak(1, 0.6);
    session.ingest(&framed());
    session.ingest(&framed());
    assert_eq!(session.stats().prediction_len, 2);

    let too_far = frame_with_shoulder_width(0.1);
    let mut statuses = Vec::new();
    for _ in 0..5 {
        let decision = session.ingest(&too_far);
        assert_eq!(decision.distance_alert, Some(DistanceAlert::TooFar));
        statuses.push(decision.status);
    }
    assert_eq!(statuses.last(), Some(&DecisionStatus::NoUser));
    assert_eq!(session.stats().prediction_len, 0);

    // Stepping back into frame starts from an empty buffer.
    let back = session.ingest(&framed());
    assert_ne!(back.status, DecisionStatus::NoUser);
    assert_eq!(session.stats().absent_streak, 0);
}

#[test]
fn too_close_does_not_count_as_absent() {
    let (mut session, script) = session(SessionConfig::default(), CategoryTable::new());
    script.set_peak(1, 0.6);
    for _ in 0..8 {
        let decision = session.ingest(&frame_with_shoulder_width(0.55));
        assert_eq!(decision.distance_alert, Some(DistanceAlert::TooClose));
        assert_ne!(decision.status, DecisionStatus::NoUser);
    }
}

#[test]
fn category_context_breaks_close_call() {
    let categories = CategoryTable::new().with_category("Numeros", ["C", "D"]);
    let (mut session, script) = session(SessionConfig::default(), categories);
    session
        .set_context(Some("Numeros"), true)
        .expect("known category");

    // B 0.50 vs D 0.45: D · 1.5 wins after renormalisation.
    script.set(vec![0.05, 0.5, 0.0, 0.45]);
    let decision = session.ingest(&framed());
    assert_eq!(decision.context.as_deref(), Some("Numeros"));
    assert!(decision.context_changed);
    assert!(decision.confidence > 0.5);
    assert_eq!(session.stabilizer().predictions().majority().map(|v| v.label), Some(3));
}

#[test]
fn weak_raw_signal_is_never_boosted() {
    let mut config = SessionConfig::default();
    config.boost.min_trust = 0.3;
    let categories = CategoryTable::new().with_category("Numeros", ["D"]);
    let (mut session, script) = session(config, categories);
    session.set_context(Some("Numeros"), true).expect("known category");

    // Boosted, D would win: 0.24 · 1.5 = 0.36 against A's 0.28.
    script.set(vec![0.28, 0.24, 0.24, 0.24]);
    let decision = session.ingest(&framed());
    assert!((decision.confidence - 0.28).abs() < 1e-6);
    assert_eq!(session.stabilizer().predictions().majority().map(|v| v.label), Some(0));
}

#[test]
fn disabling_context_awareness_skips_category_boost() {
    let mut config = SessionConfig::default();
    config
        .apply_overrides_from(|key| (key == "SIGNA_CONTEXT_AWARE").then(|| "false".to_string()))
        .expect("valid override");
    let categories = CategoryTable::new().with_category("Numeros", ["C", "D"]);
    let (mut session, script) = session(config, categories);
    session.set_context(Some("Numeros"), true).expect("known category");

    script.set(vec![0.05, 0.5, 0.0, 0.45]);
    let decision = session.ingest(&framed());
    assert!((decision.confidence - 0.5).abs() < 1e-6);
    assert_eq!(session.stabilizer().predictions().majority().map(|v| v.label), Some(1));
}

#[test]
fn malformed_frame_is_an_error_without_side_effects() {
    let (mut session, script) = session(SessionConfig::default(), CategoryTable::new());
    script.set_peak(0, 0.6);
    session.ingest(&framed());
    let before = session.stats();

    let short = session.ingest(&[0.5; 225]);
    assert_eq!(short.status, DecisionStatus::Error);
    let mut nan = framed();
    nan[7] = f32::NAN;
    assert_eq!(session.ingest(&nan).status, DecisionStatus::Error);

    assert_eq!(session.stats(), before);
    assert!(matches!(
        session.try_ingest(&[0.0; 3]),
        Err(SignaError::InputShape { expected: 226, got: 3 })
    ));
}

/// Confident only when a right hand is present.
struct RightHandedClassifier;

impl Classifier for RightHandedClassifier {
    fn num_labels(&self) -> usize {
        LABELS.len()
    }

    fn classify(&self, frame: &FeatureFrame) -> signa_core::Result<ClassificationResult> {
        let distribution = if frame.has_hand(Hand::Right) {
            vec![0.85, 0.05, 0.05, 0.05]
        } else {
            vec![0.25, 0.25, 0.25, 0.25]
        };
        ClassificationResult::from_distribution(distribution)
    }
}

#[test]
fn left_handed_signer_is_recognised_through_mirror() {
    let mut session = Session::new(
        SessionConfig::default(),
        ClassifierHandle::new(RightHandedClassifier),
        None,
        LabelSet::new(LABELS),
        Arc::new(CategoryTable::new()),
    )
    .expect("session builds");

    let mut values = framed();
    for i in 0..21 {
        let at = LEFT_HAND_OFFSET + i * HAND_STRIDE;
        values[at..at + 3].copy_from_slice(&[0.3 + i as f32 * 0.01, 0.6, 0.0]);
    }

    let decision = session.ingest(&values);
    assert_eq!(decision.orientation, Some(signa_core::orientation::Orientation::Mirrored));
    assert_eq!(decision.status, DecisionStatus::Predicting);
    assert_eq!(decision.word.as_deref(), Some("A"));
}

fn session_with(classifier: FixedClassifier) -> Session {
    Session::new(
        SessionConfig::default(),
        ClassifierHandle::new(classifier),
        None,
        LabelSet::new(LABELS),
        Arc::new(CategoryTable::new()),
    )
    .expect("session builds")
}

#[test]
fn all_zero_classifier_output_is_an_error_not_noise() {
    let mut session = session_with(FixedClassifier::new(vec![0.0; 4]));
    let decision = session.ingest(&framed());
    assert_eq!(decision.status, DecisionStatus::Error);
    assert!(decision.detail.is_some());
    assert_eq!(session.stats().prediction_len, 0);
    assert_eq!(session.stats().total_frames, 0);
}

#[test]
fn unnormalised_classifier_output_cannot_confirm() {
    let mut session = session_with(FixedClassifier::new(vec![3.0, 1.0, 1.0, 1.0]));
    let decision = session.ingest(&framed());
    assert_eq!(decision.status, DecisionStatus::Error);
    assert!(decision.word.is_none());
    assert_eq!(session.stats().prediction_len, 0);
}

/// Reports a fixed alert and counts the frames committed to it.
struct CountingMonitor {
    alert: DistanceAlert,
    observed: Arc<AtomicUsize>,
}

impl PresenceMonitor for CountingMonitor {
    fn check(&self, _frame: &FeatureFrame) -> Option<DistanceAlert> {
        Some(self.alert)
    }

    fn observe(&mut self, _alert: Option<DistanceAlert>) {
        self.observed.fetch_add(1, Ordering::SeqCst);
    }

    fn reset(&mut self) {
        self.observed.store(0, Ordering::SeqCst);
    }
}

#[test]
fn custom_presence_monitor_replaces_shoulder_check() {
    let (session, script) = session(SessionConfig::default(), CategoryTable::new());
    let observed = Arc::new(AtomicUsize::new(0));
    let mut session = session.with_presence_monitor(Box::new(CountingMonitor {
        alert: DistanceAlert::TooClose,
        observed: Arc::clone(&observed),
    }));
    script.set_peak(0, 0.9);

    // Well framed by shoulder width, but the custom monitor decides.
    let decision = session.ingest(&framed());
    assert_eq!(decision.distance_alert, Some(DistanceAlert::TooClose));
    assert_eq!(observed.load(Ordering::SeqCst), 1);
}

#[test]
fn classifier_failure_leaves_presence_monitor_untouched() {
    let (session, script) = session(SessionConfig::default(), CategoryTable::new());
    let observed = Arc::new(AtomicUsize::new(0));
    let mut session = session.with_presence_monitor(Box::new(CountingMonitor {
        alert: DistanceAlert::Ok,
        observed: Arc::clone(&observed),
    }));

    script.fail_next();
    assert_eq!(session.ingest(&framed()).status, DecisionStatus::Error);
    assert_eq!(observed.load(Ordering::SeqCst), 0);

    script.set_peak(1, 0.9);
    assert_eq!(session.ingest(&framed()).status, DecisionStatus::Predicting);
    assert_eq!(observed.load(Ordering::SeqCst), 1);
}
