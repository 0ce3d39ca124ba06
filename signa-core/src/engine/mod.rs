//! `SignaEngine`: multi-session runtime.
//!
//! ## Lifecycle
//!
//! ```text
//! SignaEngine::new()
//!     └─► open_session(id)     → Session built, worker spawned (spawn_blocking)
//!         ├─► submit_frame()   → bounded queue, oldest frame dropped when full
//!         ├─► accept / reset / set_context → control channel, applied between
//!         │                                   frames in submission order
//!         └─► close_session()  → running=false, handle removed, late results discarded
//! ```
//!
//! ## Threading
//!
//! Each session has exactly one worker, so no two `ingest` calls for a
//! session overlap. Sessions share only the classifier, language model,
//! label set and category table, all read-only.

pub mod worker;

use std::collections::HashMap;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use crossbeam_channel::{bounded, unbounded, Sender};
use parking_lot::Mutex;
use tokio::sync::{broadcast, oneshot};
use tracing::{info, warn};

use crate::{
    buffering::FrameQueue,
    context::CategoryTable,
    error::{Result, SignaError},
    inference::{ClassifierHandle, LabelSet, LanguageModelHandle},
    ipc::events::SessionEvent,
    session::{Session, SessionConfig, SessionStats},
};

pub use worker::{Control, DiagnosticsSnapshot, QueuedControl, StatsReply, WorkerDiagnostics};

/// Broadcast channel capacity: events buffered for slow consumers.
const BROADCAST_CAP: usize = 256;

/// How long `stats()` / `stats_async()` wait for a busy worker.
const STATS_TIMEOUT: Duration = Duration::from_secs(2);

/// Engine-side handle to one running worker.
struct SessionHandle {
    queue: Arc<FrameQueue>,
    control_tx: Sender<QueuedControl>,
    doorbell_tx: Sender<()>,
    running: Arc<AtomicBool>,
}

impl SessionHandle {
    fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.queue.clear();
    }
}

/// The top-level engine handle.
///
/// `SignaEngine` is `Send + Sync`; wrap it in an `Arc` to share it between
/// transport tasks.
pub struct SignaEngine {
    config: SessionConfig,
    classifier: ClassifierHandle,
    language_model: Option<LanguageModelHandle>,
    labels: LabelSet,
    categories: Arc<CategoryTable>,
    sessions: Mutex<HashMap<String, SessionHandle>>,
    event_tx: broadcast::Sender<SessionEvent>,
    diagnostics: Arc<WorkerDiagnostics>,
}

impl SignaEngine {
    /// Create an engine. No worker runs until `open_session`.
    ///
    /// # Errors
    /// `SignaError::Config` if the label set does not match the classifier.
    pub fn new(
        mut config: SessionConfig,
        classifier: ClassifierHandle,
        language_model: Option<LanguageModelHandle>,
        labels: LabelSet,
        categories: Arc<CategoryTable>,
    ) -> Result<Self> {
        if labels.is_empty() || classifier.num_labels() != labels.len() {
            return Err(SignaError::Config(format!(
                "classifier has {} outputs, label set has {} names",
                classifier.num_labels(),
                labels.len()
            )));
        }
        config.normalize();
        let (event_tx, _) = broadcast::channel(BROADCAST_CAP);
        Ok(Self {
            config,
            classifier,
            language_model,
            labels,
            categories,
            sessions: Mutex::new(HashMap::new()),
            event_tx,
            diagnostics: Arc::new(WorkerDiagnostics::default()),
        })
    }

    /// Start a session and its worker.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    /// - `SignaError::SessionExists` if `id` is already open.
    /// - `SignaError::Other` outside a Tokio runtime.
    pub fn open_session(&self, id: impl Into<String>) -> Result<()> {
        let id = id.into();
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| SignaError::Other(anyhow::anyhow!("no tokio runtime: {e}")))?;

        let mut sessions = self.sessions.lock();
        if sessions.contains_key(&id) {
            return Err(SignaError::SessionExists(id));
        }

        let session = Session::new(
            self.config.clone(),
            self.classifier.clone(),
            self.language_model.clone(),
            self.labels.clone(),
            Arc::clone(&self.categories),
        )?;

        let queue = Arc::new(FrameQueue::new(self.config.queue_capacity));
        let (control_tx, control_rx) = unbounded();
        let (doorbell_tx, doorbell_rx) = bounded(1);
        let running = Arc::new(AtomicBool::new(true));

        let ctx = worker::WorkerContext {
            session_id: id.clone(),
            session,
            queue: Arc::clone(&queue),
            control_rx,
            doorbell_rx,
            running: Arc::clone(&running),
            event_tx: self.event_tx.clone(),
            diagnostics: Arc::clone(&self.diagnostics),
        };
        runtime.spawn_blocking(move || worker::run(ctx));

        sessions.insert(
            id.clone(),
            SessionHandle {
                queue,
                control_tx,
                doorbell_tx,
                running,
            },
        );
        info!(session_id = %id, open = sessions.len(), "session opened");
        Ok(())
    }

    /// Queue a frame for `id`. Returns `true` if an older frame was dropped
    /// to make room.
    ///
    /// # Errors
    /// `SignaError::SessionNotFound` if `id` is not open.
    pub fn submit_frame(&self, id: &str, values: Vec<f32>) -> Result<bool> {
        let sessions = self.sessions.lock();
        let handle = sessions
            .get(id)
            .ok_or_else(|| SignaError::SessionNotFound(id.to_string()))?;

        self.diagnostics.frames_in.fetch_add(1, Ordering::Relaxed);
        let dropped = handle.queue.push(values).is_some();
        if dropped {
            self.diagnostics
                .frames_dropped
                .fetch_add(1, Ordering::Relaxed);
        }
        // Full means the worker is already due to wake.
        let _ = handle.doorbell_tx.try_send(());
        Ok(dropped)
    }

    /// Record an accepted word. Acknowledged with `SessionEvent::WordAccepted`.
    ///
    /// # Errors
    /// `SignaError::EmptyWord`, `SignaError::SessionNotFound`.
    pub fn accept(&self, id: &str, word: &str) -> Result<()> {
        if word.trim().is_empty() {
            return Err(SignaError::EmptyWord);
        }
        self.send_control(id, Control::Accept(word.to_string()))
    }

    /// Clear a session's buffers. Acknowledged with `SessionEvent::ResetAck`.
    pub fn reset(&self, id: &str) -> Result<()> {
        self.send_control(id, Control::Reset)
    }

    /// Set or clear a session's category context. Acknowledged with
    /// `SessionEvent::ContextAck`, or `ControlError` for an unknown category.
    pub fn set_context(&self, id: &str, name: Option<&str>, manual: bool) -> Result<()> {
        if let Some(raw) = name.filter(|n| !n.trim().is_empty()) {
            if self.categories.canonical_name(raw).is_none() {
                return Err(SignaError::UnknownCategory(raw.trim().to_string()));
            }
        }
        self.send_control(
            id,
            Control::SetContext {
                name: name.map(str::to_string),
                manual,
            },
        )
    }

    /// Session statistics, read by the worker after every frame already
    /// submitted.
    ///
    /// Blocks the calling thread until the worker answers; use
    /// [`SignaEngine::stats_async`] from async code.
    ///
    /// # Errors
    /// `SignaError::SessionNotFound`, or `Other` if the worker does not
    /// answer in time.
    pub fn stats(&self, id: &str) -> Result<SessionStats> {
        let (reply_tx, reply_rx) = bounded(1);
        self.send_control(id, Control::Stats(StatsReply::Blocking(reply_tx)))?;
        reply_rx
            .recv_timeout(STATS_TIMEOUT)
            .map_err(|e| SignaError::Other(anyhow::anyhow!("session {id} did not answer: {e}")))
    }

    /// Async form of [`SignaEngine::stats`]; never blocks a runtime thread.
    ///
    /// # Errors
    /// `SignaError::SessionNotFound`, or `Other` if the session closes or
    /// the worker does not answer in time.
    pub async fn stats_async(&self, id: &str) -> Result<SessionStats> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send_control(id, Control::Stats(StatsReply::Async(reply_tx)))?;
        match tokio::time::timeout(STATS_TIMEOUT, reply_rx).await {
            Ok(Ok(stats)) => Ok(stats),
            Ok(Err(_)) => Err(SignaError::Other(anyhow::anyhow!(
                "session {id} closed before answering"
            ))),
            Err(_) => Err(SignaError::Other(anyhow::anyhow!(
                "session {id} did not answer within {STATS_TIMEOUT:?}"
            ))),
        }
    }

    /// End a session. Its state is discarded immediately; a frame already
    /// being scored completes but its decision is dropped.
    ///
    /// # Errors
    /// `SignaError::SessionNotFound` if `id` is not open.
    pub fn close_session(&self, id: &str) -> Result<()> {
        let handle = self
            .sessions
            .lock()
            .remove(id)
            .ok_or_else(|| SignaError::SessionNotFound(id.to_string()))?;
        handle.stop();
        let _ = self.event_tx.send(SessionEvent::Closed {
            session_id: id.to_string(),
        });
        info!(session_id = %id, "session closed");
        Ok(())
    }

    /// Close every session.
    pub fn shutdown(&self) {
        let drained: Vec<(String, SessionHandle)> = self.sessions.lock().drain().collect();
        for (id, handle) in drained {
            handle.stop();
            let _ = self.event_tx.send(SessionEvent::Closed { session_id: id });
        }
    }

    pub fn is_open(&self, id: &str) -> bool {
        self.sessions.lock().contains_key(id)
    }

    pub fn session_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.sessions.lock().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Subscribe to decisions and control acknowledgements of every session.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.event_tx.subscribe()
    }

    /// Snapshot of worker counters, summed over all sessions.
    pub fn diagnostics_snapshot(&self) -> DiagnosticsSnapshot {
        self.diagnostics.snapshot()
    }

    /// Zero the worker counters, e.g. at the start of a measurement window.
    pub fn reset_diagnostics(&self) {
        self.diagnostics.reset();
    }

    pub fn labels(&self) -> &LabelSet {
        &self.labels
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    // ── Internal helpers ─────────────────────────────────────────────────────

    /// Stamp and send a control. Holding the registry lock keeps the stamp
    /// consistent with concurrent `submit_frame` calls.
    fn send_control(&self, id: &str, control: Control) -> Result<()> {
        let sessions = self.sessions.lock();
        let handle = sessions
            .get(id)
            .ok_or_else(|| SignaError::SessionNotFound(id.to_string()))?;
        let queued = QueuedControl::after(&handle.queue, control);
        if handle.control_tx.send(queued).is_err() {
            warn!(session_id = %id, "worker gone, control dropped");
            return Err(SignaError::SessionNotFound(id.to_string()));
        }
        Ok(())
    }
}

impl Drop for SignaEngine {
    fn drop(&mut self) {
        for handle in self.sessions.get_mut().values() {
            handle.stop();
        }
    }
}
