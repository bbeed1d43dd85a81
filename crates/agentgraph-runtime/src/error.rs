use serde::Serialize;
use thiserror::Error;

use crate::session::SessionStatus;

/// A breach of the runtime protocol. Logged and recorded on the session,
/// never fatal.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProtocolViolation {
    #[error("response for {request_id} but no input request is outstanding")]
    NoOutstandingRequest { request_id: String },

    #[error("response for {got} but the active request is {expected}")]
    RequestMismatch { expected: String, got: String },

    #[error("{event} event after the session {status}")]
    AfterTerminal { event: String, status: SessionStatus },

    #[error("cumulative cost fell from {last} to {got}")]
    NonMonotonicCost { last: f64, got: f64 },

    #[error("response for {request_id} could not be delivered, the receiver is gone")]
    ResponseChannelClosed { request_id: String },

    #[error("response for {request_id} not delivered, the previous one is still unread")]
    ResponseSlotFull { request_id: String },
}

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Session runner stopped")]
    RunnerStopped,
}

pub type Result<T> = std::result::Result<T, RuntimeError>;
