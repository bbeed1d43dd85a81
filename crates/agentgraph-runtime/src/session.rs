//! Session state and its transition rules.

use std::collections::VecDeque;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ProtocolViolation;
use crate::event::{CostPoint, InputRequest, MessageRole, RuntimeEvent, TimelineMessage};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    #[default]
    Idle,
    Running,
    Completed,
    Errored,
    Cancelled,
}

impl SessionStatus {
    /// Terminal states have no outgoing transition.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Errored | Self::Cancelled)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Errored => "errored",
            Self::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// Accumulated state of one execution.
///
/// Only the event processor mutates a session; everything else reads
/// [`SessionSnapshot`]s.
#[derive(Debug, Clone)]
pub struct Session {
    pub(crate) id: Uuid,
    pub(crate) status: SessionStatus,
    pub(crate) timeline: Vec<TimelineMessage>,
    pub(crate) cost_ledger: Vec<CostPoint>,
    pub(crate) active_request: Option<InputRequest>,
    pub(crate) queued_requests: VecDeque<InputRequest>,
    pub(crate) error: Option<String>,
    pub(crate) violations: Vec<ProtocolViolation>,
    pub(crate) started_at: Option<DateTime<Utc>>,
    pub(crate) finished_at: Option<DateTime<Utc>>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            status: SessionStatus::Idle,
            timeline: Vec::new(),
            cost_ledger: Vec::new(),
            active_request: None,
            queued_requests: VecDeque::new(),
            error: None,
            violations: Vec::new(),
            started_at: None,
            finished_at: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn timeline(&self) -> &[TimelineMessage] {
        &self.timeline
    }

    pub fn cost_ledger(&self) -> &[CostPoint] {
        &self.cost_ledger
    }

    pub fn active_request(&self) -> Option<&InputRequest> {
        self.active_request.as_ref()
    }

    pub fn queued_requests(&self) -> impl Iterator<Item = &InputRequest> {
        self.queued_requests.iter()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn violations(&self) -> &[ProtocolViolation] {
        &self.violations
    }

    /// Latest cumulative cost, zero before the first point.
    pub fn total_cost(&self) -> f64 {
        self.cost_ledger.last().map_or(0.0, |p| p.cumulative_cost)
    }

    /// Apply one runtime event. The caller has already checked that the
    /// session is not terminal.
    pub(crate) fn apply(&mut self, event: RuntimeEvent) -> Result<(), ProtocolViolation> {
        if self.status.is_terminal() {
            return Err(ProtocolViolation::AfterTerminal {
                event: event.kind().to_string(),
                status: self.status,
            });
        }
        if self.status == SessionStatus::Idle {
            self.status = SessionStatus::Running;
            self.started_at = Some(Utc::now());
        }

        match event {
            RuntimeEvent::Message(message) => {
                let terminal = message.role == MessageRole::Termination;
                self.timeline.push(message);
                if terminal {
                    self.finish(SessionStatus::Completed);
                }
            }
            RuntimeEvent::Cost(point) => {
                if let Some(last) = self.cost_ledger.last() {
                    if point.cumulative_cost < last.cumulative_cost {
                        return Err(ProtocolViolation::NonMonotonicCost {
                            last: last.cumulative_cost,
                            got: point.cumulative_cost,
                        });
                    }
                }
                self.cost_ledger.push(point);
            }
            RuntimeEvent::InputRequest(request) => {
                if self.active_request.is_none() {
                    self.active_request = Some(request);
                } else {
                    self.queued_requests.push_back(request);
                }
            }
            RuntimeEvent::Error { message } => {
                self.error = Some(message);
                self.finish(SessionStatus::Errored);
            }
            RuntimeEvent::TerminalNotice { .. } => self.finish(SessionStatus::Completed),
        }
        Ok(())
    }

    /// Resolve the active request if `request_id` names it, promoting the
    /// next queued one. Returns the resolved request.
    pub(crate) fn resolve(&mut self, request_id: &str) -> Result<InputRequest, ProtocolViolation> {
        let Some(active) = self.active_request.as_ref() else {
            return Err(ProtocolViolation::NoOutstandingRequest {
                request_id: request_id.to_string(),
            });
        };
        if active.request_id != request_id {
            return Err(ProtocolViolation::RequestMismatch {
                expected: active.request_id.clone(),
                got: request_id.to_string(),
            });
        }
        let resolved = self.active_request.take();
        self.active_request = self.queued_requests.pop_front();
        resolved.ok_or_else(|| ProtocolViolation::NoOutstandingRequest {
            request_id: request_id.to_string(),
        })
    }

    pub(crate) fn finish(&mut self, status: SessionStatus) {
        if self.status.is_terminal() {
            return;
        }
        self.status = status;
        self.finished_at = Some(Utc::now());
    }

    pub(crate) fn record(&mut self, violation: ProtocolViolation) {
        self.violations.push(violation);
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            id: self.id,
            status: self.status,
            timeline: self.timeline.clone(),
            cost_ledger: self.cost_ledger.clone(),
            total_cost: self.total_cost(),
            active_request: self.active_request.clone(),
            queued_requests: self.queued_requests.iter().cloned().collect(),
            error: self.error.clone(),
            violations: self.violations.clone(),
            started_at: self.started_at,
            finished_at: self.finished_at,
        }
    }
}

/// Immutable copy of a session handed to readers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub id: Uuid,
    pub status: SessionStatus,
    pub timeline: Vec<TimelineMessage>,
    pub cost_ledger: Vec<CostPoint>,
    pub total_cost: f64,
    pub active_request: Option<InputRequest>,
    pub queued_requests: Vec<InputRequest>,
    pub error: Option<String>,
    pub violations: Vec<ProtocolViolation>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}
