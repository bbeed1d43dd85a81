//! Async driver: pumps an event source through a processor under local
//! control, publishing snapshots as it goes.

use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{Result, RuntimeError};
use crate::event::InputResponse;
use crate::processor::{EventProcessor, ProcessorStats};
use crate::session::SessionSnapshot;
use crate::source::EventSource;
use crate::step::StepMode;

/// Local commands for a running session.
#[derive(Debug, Clone)]
pub enum SessionControl {
    /// Release held events.
    Continue,
    SetMode(StepMode),
    Respond(InputResponse),
    Cancel,
}

/// What the runner publishes after every step.
#[derive(Debug, Clone, PartialEq)]
pub struct RunnerState {
    pub snapshot: SessionSnapshot,
    /// Events waiting for a continue.
    pub held: usize,
}

/// Caller side of a [`SessionRunner`].
#[derive(Clone)]
pub struct SessionHandle {
    control: mpsc::Sender<SessionControl>,
    state: watch::Receiver<RunnerState>,
    cancel: CancellationToken,
}

impl SessionHandle {
    pub async fn send(&self, control: SessionControl) -> Result<()> {
        self.control
            .send(control)
            .await
            .map_err(|_| RuntimeError::RunnerStopped)
    }

    pub async fn continue_once(&self) -> Result<()> {
        self.send(SessionControl::Continue).await
    }

    pub async fn respond(&self, response: InputResponse) -> Result<()> {
        self.send(SessionControl::Respond(response)).await
    }

    /// Cancel through the token; takes effect even if the control queue is full.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// The latest published snapshot.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.borrow().snapshot.clone()
    }

    pub fn held(&self) -> usize {
        self.state.borrow().held
    }

    /// A receiver that wakes on every published state.
    pub fn subscribe(&self) -> watch::Receiver<RunnerState> {
        self.state.clone()
    }
}

/// What a finished run leaves behind.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub snapshot: SessionSnapshot,
    pub stats: ProcessorStats,
}

pub struct SessionRunner<S> {
    processor: EventProcessor,
    source: S,
    control_rx: mpsc::Receiver<SessionControl>,
    state_tx: watch::Sender<RunnerState>,
    cancel: CancellationToken,
}

impl<S: EventSource> SessionRunner<S> {
    /// Build a runner, its handle and the receiver of forwarded user responses.
    pub fn new(
        source: S,
        mode: StepMode,
        control_buffer: usize,
        cancel: CancellationToken,
    ) -> (Self, SessionHandle, mpsc::Receiver<InputResponse>) {
        let (processor, response_rx) = EventProcessor::with_mode(mode);
        let (control_tx, control_rx) = mpsc::channel(control_buffer.max(1));
        let (state_tx, state_rx) = watch::channel(state_of(&processor));
        let handle = SessionHandle {
            control: control_tx,
            state: state_rx,
            cancel: cancel.clone(),
        };
        let runner = Self {
            processor,
            source,
            control_rx,
            state_tx,
            cancel,
        };
        (runner, handle, response_rx)
    }

    /// Run until the session is terminal, the source ends with nothing held,
    /// or cancellation.
    pub async fn run(self) -> RunReport {
        let Self {
            mut processor,
            mut source,
            mut control_rx,
            state_tx,
            cancel,
        } = self;
        let session_id = processor.session().id();
        info!(session = %session_id, mode = ?processor.mode(), "session runner started");

        let mut source_open = true;
        let mut control_open = true;

        loop {
            if processor.is_terminal() {
                break;
            }
            let held = processor.held().next().is_some();
            if !source_open && (!held || !control_open) {
                break;
            }

            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    processor.cancel();
                }
                control = control_rx.recv(), if control_open => match control {
                    Some(SessionControl::Continue) => {
                        let released = processor.continue_once();
                        debug!(released, "continue");
                    }
                    Some(SessionControl::SetMode(mode)) => processor.set_mode(mode),
                    Some(SessionControl::Respond(response)) => {
                        // Violations are recorded on the session.
                        let _ = processor.respond(response);
                    }
                    Some(SessionControl::Cancel) => processor.cancel(),
                    None => control_open = false,
                },
                next = source.next_event(), if source_open => match next {
                    Ok(Some(record)) => {
                        processor.submit(record);
                    }
                    Ok(None) => {
                        debug!(session = %session_id, "event source ended");
                        source_open = false;
                    }
                    Err(e) => {
                        warn!(session = %session_id, error = %e, "event source failed");
                        processor.fail(e.to_string());
                        source_open = false;
                    }
                },
            }
            state_tx.send_replace(state_of(&processor));
        }

        if !processor.is_terminal() {
            debug!(session = %session_id, status = %processor.session().status(), "runner stopped with session open");
        }
        let snapshot = processor.snapshot();
        state_tx.send_replace(state_of(&processor));
        let stats = processor.stats();
        info!(
            session = %session_id,
            status = %snapshot.status,
            applied = stats.applied,
            violations = stats.violations,
            "session runner finished"
        );
        RunReport { snapshot, stats }
    }
}

fn state_of(processor: &EventProcessor) -> RunnerState {
    RunnerState {
        snapshot: processor.snapshot(),
        held: processor.held().count(),
    }
}
