//! Blocking per-session worker loop.
//!
//! ## Iteration
//!
//! ```text
//! 1. Pop the oldest queued frame (ticket t), then collect new controls
//! 2. Apply every pending control stamped before t (all of them when idle)
//! 3. No frame? → wait on control or doorbell
//! 4. Session::try_ingest → Decision (errors become an `error` decision)
//! 5. Session closed meanwhile? → discard, else broadcast SessionEvent
//! ```
//!
//! Controls are applied between frames, never during one, and in submission
//! order: each control carries the number of frames submitted before it, and
//! waits until those frames have been scored or evicted. An `accept` sent
//! after four frames therefore lands after their decisions, and the next sign
//! starts from cleared votes.
//!
//! The loop runs in `spawn_blocking` because classifier calls may block for
//! longer than a frame interval.

use std::collections::VecDeque;
use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc,
};
use std::time::Duration;

use crossbeam_channel::{select, Receiver, Sender};
use serde::Serialize;
use tokio::sync::{broadcast, oneshot};
use tracing::{debug, info, info_span, warn};

use crate::buffering::{FrameQueue, QueuedFrame};
use crate::ipc::events::{Decision, SessionEvent};
use crate::session::{Session, SessionStats};

/// Wait when the queue is empty and nothing rings the doorbell.
const IDLE_WAIT: Duration = Duration::from_millis(5);

/// Control operations, applied in order between frames.
#[derive(Debug)]
pub enum Control {
    Accept(String),
    Reset,
    SetContext { name: Option<String>, manual: bool },
    Stats(StatsReply),
}

/// Where a stats snapshot is delivered.
#[derive(Debug)]
pub enum StatsReply {
    /// A thread blocked on `recv_timeout`.
    Blocking(Sender<SessionStats>),
    /// An async caller awaiting the answer.
    Async(oneshot::Sender<SessionStats>),
}

impl StatsReply {
    fn send(self, stats: SessionStats) {
        // The caller may have timed out and gone.
        match self {
            StatsReply::Blocking(tx) => {
                let _ = tx.send(stats);
            }
            StatsReply::Async(tx) => {
                let _ = tx.send(stats);
            }
        }
    }
}

/// A control stamped with its place in the session's submission order.
#[derive(Debug)]
pub struct QueuedControl {
    /// Frames submitted before this control; they are scored first.
    pub after_frame: u64,
    pub control: Control,
}

impl QueuedControl {
    /// Stamp `control` to run after everything already pushed to `queue`.
    pub fn after(queue: &FrameQueue, control: Control) -> Self {
        Self {
            after_frame: queue.submitted(),
            control,
        }
    }
}

#[derive(Default)]
pub struct WorkerDiagnostics {
    pub frames_in: AtomicUsize,
    pub frames_dropped: AtomicUsize,
    pub frames_processed: AtomicUsize,
    pub frames_rejected: AtomicUsize,
    pub classifier_errors: AtomicUsize,
    pub decisions_emitted: AtomicUsize,
    pub decisions_discarded: AtomicUsize,
    pub confirmations: AtomicUsize,
}

impl WorkerDiagnostics {
    pub fn reset(&self) {
        self.frames_in.store(0, Ordering::Relaxed);
        self.frames_dropped.store(0, Ordering::Relaxed);
        self.frames_processed.store(0, Ordering::Relaxed);
        self.frames_rejected.store(0, Ordering::Relaxed);
        self.classifier_errors.store(0, Ordering::Relaxed);
        self.decisions_emitted.store(0, Ordering::Relaxed);
        self.decisions_discarded.store(0, Ordering::Relaxed);
        self.confirmations.store(0, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> DiagnosticsSnapshot {
        DiagnosticsSnapshot {
            frames_in: self.frames_in.load(Ordering::Relaxed),
            frames_dropped: self.frames_dropped.load(Ordering::Relaxed),
            frames_processed: self.frames_processed.load(Ordering::Relaxed),
            frames_rejected: self.frames_rejected.load(Ordering::Relaxed),
            classifier_errors: self.classifier_errors.load(Ordering::Relaxed),
            decisions_emitted: self.decisions_emitted.load(Ordering::Relaxed),
            decisions_discarded: self.decisions_discarded.load(Ordering::Relaxed),
            confirmations: self.confirmations.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticsSnapshot {
    pub frames_in: usize,
    pub frames_dropped: usize,
    pub frames_processed: usize,
    pub frames_rejected: usize,
    pub classifier_errors: usize,
    pub decisions_emitted: usize,
    pub decisions_discarded: usize,
    pub confirmations: usize,
}

/// Everything one worker owns, passed as one struct so the closure stays tidy.
pub struct WorkerContext {
    pub session_id: String,
    pub session: Session,
    pub queue: Arc<FrameQueue>,
    pub control_rx: Receiver<QueuedControl>,
    /// Rung by the producer after each enqueued frame.
    pub doorbell_rx: Receiver<()>,
    pub running: Arc<AtomicBool>,
    pub event_tx: broadcast::Sender<SessionEvent>,
    pub diagnostics: Arc<WorkerDiagnostics>,
}

/// Run the worker until `ctx.running` becomes false or the engine drops its
/// end of the channels.
pub fn run(mut ctx: WorkerContext) {
    let span = info_span!("session", session_id = %ctx.session_id);
    let _guard = span.enter();
    info!("session worker started");

    let mut seq: u64 = 0;
    let mut processed: u64 = 0;
    let mut pending: VecDeque<QueuedControl> = VecDeque::new();
    // Highest ticket taken off the queue. When the queue is empty every
    // frame up to here has been scored or evicted.
    let mut last_ticket: u64 = 0;

    while ctx.running.load(Ordering::SeqCst) {
        // Pop before collecting controls: a control stamped before this
        // frame's ticket was sent before the frame was pushed.
        let frame = ctx.queue.pop();
        while let Ok(control) = ctx.control_rx.try_recv() {
            pending.push_back(control);
        }

        let horizon = frame
            .as_ref()
            .map_or(last_ticket, |f| f.ticket.saturating_sub(1));
        while pending.front().is_some_and(|c| c.after_frame <= horizon) {
            if let Some(queued) = pending.pop_front() {
                apply_control(&mut ctx, queued.control);
            }
        }
        if !ctx.running.load(Ordering::SeqCst) {
            break;
        }

        let Some(QueuedFrame { ticket, values }) = frame else {
            // Err: the engine dropped its handle.
            let woken: Result<Option<QueuedControl>, ()> = select! {
                recv(ctx.control_rx) -> msg => msg.map(Some).map_err(|_| ()),
                recv(ctx.doorbell_rx) -> msg => msg.map(|_| None).map_err(|_| ()),
                default(IDLE_WAIT) => Ok(None),
            };
            match woken {
                Ok(Some(control)) => pending.push_back(control),
                Ok(None) => {}
                Err(()) => break,
            }
            continue;
        };

        last_ticket = ticket;
        processed += 1;
        process_frame(&mut ctx, &values, &mut seq);
    }

    let dropped = ctx.queue.clear();
    info!(
        frames = processed,
        decisions = seq,
        pending_dropped = dropped,
        "session worker stopped"
    );
}

fn process_frame(ctx: &mut WorkerContext, values: &[f32], seq: &mut u64) {
    ctx.diagnostics
        .frames_processed
        .fetch_add(1, Ordering::Relaxed);

    let decision = match ctx.session.try_ingest(values) {
        Ok(decision) => decision,
        Err(e) => {
            if e.is_input_error() {
                ctx.diagnostics.frames_rejected.fetch_add(1, Ordering::Relaxed);
                debug!("frame rejected: {e}");
            } else if e.is_classifier_error() {
                ctx.diagnostics
                    .classifier_errors
                    .fetch_add(1, Ordering::Relaxed);
                warn!("classifier failed: {e}");
            } else {
                warn!("frame failed: {e}");
            }
            ctx.session.error_decision(&e)
        }
    };

    // Closed while the classifier ran: the result belongs to nobody.
    if !ctx.running.load(Ordering::SeqCst) {
        ctx.diagnostics
            .decisions_discarded
            .fetch_add(1, Ordering::Relaxed);
        debug!("session closed mid-frame, discarding decision");
        return;
    }

    emit_decision(ctx, decision, seq);
}

fn emit_decision(ctx: &WorkerContext, decision: Decision, seq: &mut u64) {
    if decision.is_confirmed() {
        ctx.diagnostics.confirmations.fetch_add(1, Ordering::Relaxed);
    }
    *seq += 1;
    ctx.diagnostics
        .decisions_emitted
        .fetch_add(1, Ordering::Relaxed);
    // No receivers is not an error; the decision is simply unobserved.
    let _ = ctx.event_tx.send(SessionEvent::Decision {
        seq: *seq,
        session_id: ctx.session_id.clone(),
        decision,
    });
}

fn apply_control(ctx: &mut WorkerContext, control: Control) {
    let session_id = ctx.session_id.clone();
    let event = match control {
        Control::Accept(word) => match ctx.session.accept(&word) {
            Ok(context) => SessionEvent::WordAccepted {
                session_id,
                word: word.trim().to_string(),
                context,
            },
            Err(e) => SessionEvent::ControlError {
                session_id,
                message: e.to_string(),
            },
        },
        Control::Reset => {
            ctx.session.reset();
            SessionEvent::ResetAck { session_id }
        }
        Control::SetContext { name, manual } => {
            match ctx.session.set_context(name.as_deref(), manual) {
                Ok(current_context) => SessionEvent::ContextAck {
                    session_id,
                    current_context,
                },
                Err(e) => SessionEvent::ControlError {
                    session_id,
                    message: e.to_string(),
                },
            }
        }
        Control::Stats(reply) => {
            reply.send(ctx.session.stats());
            return;
        }
    };
    let _ = ctx.event_tx.send(event);
}
