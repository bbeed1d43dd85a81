//! The event stream processor: one session, one event at a time.

use std::collections::VecDeque;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, info, warn};

use crate::error::ProtocolViolation;
use crate::event::{EventRecord, InputResponse};
use crate::session::{Session, SessionSnapshot, SessionStatus};
use crate::step::StepMode;

/// Counters over the life of a processor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessorStats {
    pub received: u64,
    pub applied: u64,
    /// Events that had to wait for a continue.
    pub held: u64,
    /// Events dropped because the session was already terminal.
    pub ignored: u64,
    pub out_of_order: u64,
    pub violations: u64,
}

/// What happened to a submitted event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Applied,
    /// Applied but rejected by a transition rule (e.g. a falling cost).
    Rejected,
    Held,
    Ignored,
}

/// Owns a [`Session`] and applies runtime events to it in arrival order.
pub struct EventProcessor {
    session: Session,
    mode: StepMode,
    held: VecDeque<EventRecord>,
    last_seq: Option<u64>,
    stats: ProcessorStats,
    response_tx: mpsc::Sender<InputResponse>,
}

impl EventProcessor {
    /// Create a processor and the single-slot receiver for user responses.
    pub fn new() -> (Self, mpsc::Receiver<InputResponse>) {
        Self::with_mode(StepMode::Run)
    }

    pub fn with_mode(mode: StepMode) -> (Self, mpsc::Receiver<InputResponse>) {
        let (response_tx, response_rx) = mpsc::channel(1);
        let processor = Self {
            session: Session::new(),
            mode,
            held: VecDeque::new(),
            last_seq: None,
            stats: ProcessorStats::default(),
            response_tx,
        };
        (processor, response_rx)
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.session.snapshot()
    }

    pub fn stats(&self) -> ProcessorStats {
        self.stats
    }

    pub fn mode(&self) -> &StepMode {
        &self.mode
    }

    /// Events waiting for a continue.
    pub fn held(&self) -> impl Iterator<Item = &EventRecord> {
        self.held.iter()
    }

    pub fn is_terminal(&self) -> bool {
        self.session.status().is_terminal()
    }

    /// Accept the next event from the transport.
    pub fn submit(&mut self, record: EventRecord) -> Disposition {
        self.stats.received += 1;
        self.check_seq(record.seq);

        if self.is_terminal() {
            return self.ignore(&record);
        }
        // Anything behind a held event waits too, so arrival order holds.
        if !self.held.is_empty() || self.mode.pauses_on(&record) {
            debug!(kind = %record.kind(), seq = ?record.seq, "event held");
            self.stats.held += 1;
            self.held.push_back(record);
            return Disposition::Held;
        }
        self.apply(record)
    }

    /// Release held events: one in step mode; in breakpoint mode the front
    /// one plus everything up to the next breakpoint. Returns how many were
    /// released.
    pub fn continue_once(&mut self) -> usize {
        let Some(first) = self.held.pop_front() else {
            return 0;
        };
        self.release(first);
        let mut released = 1;
        if matches!(self.mode, StepMode::Breakpoints(_)) {
            while let Some(next) = self.held.front() {
                if self.mode.pauses_on(next) {
                    break;
                }
                if let Some(next) = self.held.pop_front() {
                    self.release(next);
                    released += 1;
                }
            }
        }
        released
    }

    /// Change the gating mode. Switching to run flushes held events in order.
    pub fn set_mode(&mut self, mode: StepMode) {
        info!(?mode, held = self.held.len(), "step mode changed");
        self.mode = mode;
        if self.mode == StepMode::Run {
            while let Some(record) = self.held.pop_front() {
                self.release(record);
            }
        }
    }

    /// Answer the active input request and forward the answer outward.
    ///
    /// The request stays active if the answer cannot be delivered. A finished
    /// session takes no answers.
    pub fn respond(&mut self, response: InputResponse) -> Result<(), ProtocolViolation> {
        let active = self.session.active_request().map(|r| r.request_id.clone());
        let outcome = match active {
            _ if self.is_terminal() => Err(ProtocolViolation::AfterTerminal {
                event: "input_response".to_string(),
                status: self.session.status(),
            }),
            None => Err(ProtocolViolation::NoOutstandingRequest {
                request_id: response.request_id.clone(),
            }),
            Some(expected) if expected != response.request_id => {
                Err(ProtocolViolation::RequestMismatch {
                    expected,
                    got: response.request_id.clone(),
                })
            }
            Some(_) => {
                let request_id = response.request_id.clone();
                match self.response_tx.try_send(response) {
                    Ok(()) => self.session.resolve(&request_id).map(|_| ()),
                    Err(TrySendError::Full(_)) => {
                        Err(ProtocolViolation::ResponseSlotFull { request_id })
                    }
                    Err(TrySendError::Closed(_)) => {
                        Err(ProtocolViolation::ResponseChannelClosed { request_id })
                    }
                }
            }
        };
        match outcome {
            Ok(()) => {
                if let Some(next) = self.session.active_request() {
                    debug!(request = %next.request_id, "queued input request promoted");
                }
                Ok(())
            }
            Err(violation) => {
                self.violation(violation.clone());
                Err(violation)
            }
        }
    }

    /// Cancel the session. Held events are dropped.
    pub fn cancel(&mut self) {
        if self.is_terminal() {
            debug!(status = %self.session.status(), "cancel on finished session ignored");
            return;
        }
        let dropped = self.held.len();
        self.held.clear();
        self.session.finish(SessionStatus::Cancelled);
        info!(session = %self.session.id(), dropped, "session cancelled");
    }

    /// Fail the session from outside the event stream (e.g. transport loss).
    pub fn fail(&mut self, message: impl Into<String>) {
        if self.is_terminal() {
            return;
        }
        let message = message.into();
        warn!(session = %self.session.id(), error = %message, "session failed");
        self.held.clear();
        self.session.error = Some(message);
        self.session.finish(SessionStatus::Errored);
    }

    fn release(&mut self, record: EventRecord) {
        if self.is_terminal() {
            self.ignore(&record);
        } else {
            self.apply(record);
        }
    }

    fn apply(&mut self, record: EventRecord) -> Disposition {
        let kind = record.kind();
        match self.session.apply(record.event) {
            Ok(()) => {
                self.stats.applied += 1;
                debug!(%kind, status = %self.session.status(), "event applied");
                if self.is_terminal() {
                    info!(
                        session = %self.session.id(),
                        status = %self.session.status(),
                        messages = self.session.timeline().len(),
                        "session finished"
                    );
                }
                Disposition::Applied
            }
            Err(violation) => {
                self.violation(violation);
                Disposition::Rejected
            }
        }
    }

    fn ignore(&mut self, record: &EventRecord) -> Disposition {
        self.stats.ignored += 1;
        self.violation(ProtocolViolation::AfterTerminal {
            event: record.kind().to_string(),
            status: self.session.status(),
        });
        Disposition::Ignored
    }

    fn check_seq(&mut self, seq: Option<u64>) {
        let Some(seq) = seq else {
            return;
        };
        match self.last_seq {
            Some(last) if seq <= last => {
                self.stats.out_of_order += 1;
                warn!(seq, last, "event arrived out of order; applying in arrival order");
            }
            _ => self.last_seq = Some(seq),
        }
    }

    fn violation(&mut self, violation: ProtocolViolation) {
        warn!(session = %self.session.id(), %violation, "protocol violation");
        self.stats.violations += 1;
        self.session.record(violation);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{CostPoint, EventKind, InputRequest, MessageRole, RuntimeEvent, TimelineMessage};
    use crate::step::Breakpoint;

    fn message(text: &str) -> EventRecord {
        EventRecord::new(RuntimeEvent::Message(TimelineMessage::text(
            "agent",
            MessageRole::Assistant,
            text,
        )))
    }

    fn cost(c: f64) -> EventRecord {
        EventRecord::new(RuntimeEvent::Cost(CostPoint::new(c)))
    }

    fn request(id: &str) -> EventRecord {
        EventRecord::new(RuntimeEvent::InputRequest(InputRequest::new(id, "?")))
    }

    #[test]
    fn non_monotonic_cost_rejected() {
        let (mut p, _rx) = EventProcessor::new();
        assert_eq!(p.submit(message("m1")), Disposition::Applied);
        assert_eq!(p.submit(cost(5.0)), Disposition::Applied);
        assert_eq!(p.submit(cost(3.0)), Disposition::Rejected);

        let s = p.session();
        assert_eq!(s.timeline().len(), 1);
        assert_eq!(s.cost_ledger().len(), 1);
        assert_eq!(s.cost_ledger()[0].cumulative_cost, 5.0);
        assert_eq!(s.status(), SessionStatus::Running);
        assert_eq!(p.stats().violations, 1);
    }

    #[tokio::test]
    async fn respond_forwards_and_promotes() {
        let (mut p, mut rx) = EventProcessor::new();
        p.submit(request("r1"));
        p.submit(request("r2"));
        assert_eq!(p.session().active_request().unwrap().request_id, "r1");

        p.respond(InputResponse::new("r1", "yes")).unwrap();
        assert_eq!(rx.recv().await.unwrap().text, "yes");
        assert_eq!(p.session().active_request().unwrap().request_id, "r2");

        p.respond(InputResponse::new("r2", "no")).unwrap();
        assert!(p.session().active_request().is_none());
        assert_eq!(rx.recv().await.unwrap().request_id, "r2");
    }

    #[test]
    fn respond_without_request_is_reported() {
        let (mut p, _rx) = EventProcessor::new();
        let err = p.respond(InputResponse::new("r1", "hello")).unwrap_err();
        assert!(matches!(err, ProtocolViolation::NoOutstandingRequest { .. }));
        assert_eq!(p.session().violations().len(), 1);
        assert_eq!(p.session().status(), SessionStatus::Idle);
    }

    #[test]
    fn full_slot_keeps_request_active() {
        let (mut p, _rx) = EventProcessor::new();
        p.submit(request("r1"));
        p.submit(request("r2"));
        p.respond(InputResponse::new("r1", "a")).unwrap();
        // Slot still holds the first answer.
        let err = p.respond(InputResponse::new("r2", "b")).unwrap_err();
        assert!(matches!(err, ProtocolViolation::ResponseSlotFull { .. }));
        assert_eq!(p.session().active_request().unwrap().request_id, "r2");
    }

    #[test]
    fn closed_channel_reported() {
        let (mut p, rx) = EventProcessor::new();
        drop(rx);
        p.submit(request("r1"));
        let err = p.respond(InputResponse::new("r1", "a")).unwrap_err();
        assert!(matches!(err, ProtocolViolation::ResponseChannelClosed { .. }));
        assert!(p.session().active_request().is_some());
    }

    #[test]
    fn respond_after_cancel_changes_nothing() {
        let (mut p, mut rx) = EventProcessor::new();
        p.submit(request("r1"));
        p.submit(request("r2"));
        p.cancel();

        let err = p.respond(InputResponse::new("r1", "late")).unwrap_err();
        assert!(matches!(
            err,
            ProtocolViolation::AfterTerminal {
                status: SessionStatus::Cancelled,
                ..
            }
        ));
        assert!(rx.try_recv().is_err());
        assert_eq!(p.session().active_request().unwrap().request_id, "r1");
        assert_eq!(p.session().queued_requests().count(), 1);
        assert_eq!(p.session().violations().len(), 1);
    }

    #[test]
    fn respond_after_completion_is_rejected() {
        let (mut p, mut rx) = EventProcessor::new();
        p.submit(request("r1"));
        p.submit(EventRecord::new(RuntimeEvent::TerminalNotice { reason: None }));
        assert!(p.respond(InputResponse::new("r1", "late")).is_err());
        assert!(rx.try_recv().is_err());
        assert_eq!(p.session().active_request().unwrap().request_id, "r1");
    }

    #[test]
    fn late_events_ignored() {
        let (mut p, _rx) = EventProcessor::new();
        p.submit(EventRecord::new(RuntimeEvent::Error {
            message: "crash".into(),
        }));
        assert_eq!(p.submit(message("late")), Disposition::Ignored);
        assert_eq!(p.session().status(), SessionStatus::Errored);
        assert!(p.session().timeline().is_empty());
        assert_eq!(p.stats().ignored, 1);
    }

    #[test]
    fn cancel_drops_held_and_blocks_further_events() {
        let (mut p, _rx) = EventProcessor::with_mode(StepMode::Step);
        assert_eq!(p.submit(message("a")), Disposition::Held);
        assert_eq!(p.submit(message("b")), Disposition::Held);
        p.cancel();
        assert_eq!(p.session().status(), SessionStatus::Cancelled);
        assert_eq!(p.held().count(), 0);
        assert_eq!(p.submit(message("c")), Disposition::Ignored);
        assert!(p.session().timeline().is_empty());
    }

    #[test]
    fn step_mode_applies_one_per_continue() {
        let (mut p, _rx) = EventProcessor::with_mode(StepMode::Step);
        p.submit(message("a"));
        p.submit(message("b"));
        assert!(p.session().timeline().is_empty());
        assert_eq!(p.continue_once(), 1);
        assert_eq!(p.session().timeline().len(), 1);
        assert_eq!(p.continue_once(), 1);
        assert_eq!(p.continue_once(), 0);
        assert_eq!(p.session().timeline().len(), 2);
    }

    #[test]
    fn switching_to_run_flushes_in_order() {
        let (mut p, _rx) = EventProcessor::with_mode(StepMode::Step);
        p.submit(message("a"));
        p.submit(cost(1.0));
        p.submit(message("b"));
        p.set_mode(StepMode::Run);
        let texts: Vec<_> = p.session().timeline().iter().map(|m| m.content.to_text()).collect();
        assert_eq!(texts, vec!["a", "b"]);
        assert_eq!(p.session().cost_ledger().len(), 1);
        assert_eq!(p.submit(message("c")), Disposition::Applied);
    }

    #[test]
    fn breakpoints_hold_trailing_events() {
        let (mut p, _rx) = EventProcessor::with_mode(StepMode::breakpoints([EventKind::InputRequest]));
        assert_eq!(p.submit(message("a")), Disposition::Applied);
        assert_eq!(p.submit(request("r1")), Disposition::Held);
        assert_eq!(p.submit(message("b")), Disposition::Held);
        assert_eq!(p.submit(request("r2")), Disposition::Held);
        assert_eq!(p.submit(message("c")), Disposition::Held);

        // r1 and the message behind it.
        assert_eq!(p.continue_once(), 2);
        assert_eq!(p.session().timeline().len(), 2);
        assert_eq!(p.held().count(), 2);
        assert_eq!(p.continue_once(), 2);
        assert_eq!(p.session().timeline().len(), 3);
    }

    #[test]
    fn agent_breakpoint_holds_from_first_match() {
        let critic = |text: &str| {
            EventRecord::new(RuntimeEvent::Message(TimelineMessage::text(
                "critic",
                MessageRole::Assistant,
                text,
            )))
        };
        let mode = StepMode::breakpoints([Breakpoint::Agent {
            name: "critic".into(),
        }]);
        let (mut p, _rx) = EventProcessor::with_mode(mode);
        assert_eq!(p.submit(message("a")), Disposition::Applied);
        assert_eq!(p.submit(critic("x")), Disposition::Held);
        assert_eq!(p.submit(message("b")), Disposition::Held);
        assert_eq!(p.submit(critic("y")), Disposition::Held);

        assert_eq!(p.continue_once(), 2);
        assert_eq!(p.session().timeline().len(), 3);
        assert_eq!(p.continue_once(), 1);
        assert_eq!(p.held().count(), 0);
    }

    #[test]
    fn gating_does_not_change_outcome() {
        let script = || vec![message("a"), cost(2.0), request("r1"), cost(1.0), message("b")];

        let (mut run, _rx1) = EventProcessor::new();
        for e in script() {
            run.submit(e);
        }
        let (mut step, _rx2) = EventProcessor::with_mode(StepMode::Step);
        for e in script() {
            step.submit(e);
        }
        while step.continue_once() > 0 {}

        let a = run.snapshot();
        let b = step.snapshot();
        assert_eq!(a.timeline, b.timeline);
        assert_eq!(a.cost_ledger, b.cost_ledger);
        assert_eq!(a.active_request, b.active_request);
        assert_eq!(a.violations, b.violations);
    }

    #[test]
    fn out_of_order_seq_still_applied() {
        let (mut p, _rx) = EventProcessor::new();
        p.submit(EventRecord::with_seq(2, RuntimeEvent::Cost(CostPoint::new(1.0))));
        let late = EventRecord::with_seq(1, RuntimeEvent::Message(TimelineMessage::text(
            "a",
            MessageRole::User,
            "hi",
        )));
        assert_eq!(p.submit(late), Disposition::Applied);
        assert_eq!(p.stats().out_of_order, 1);
        assert_eq!(p.session().timeline().len(), 1);
    }
}
