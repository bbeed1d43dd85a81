//! Consumes the event stream of a running multi-agent flow and maintains
//! session state: the message timeline, cost ledger, pending user-input
//! requests and step-by-step gating.

pub mod error;
pub mod event;
pub mod processor;
pub mod runner;
pub mod session;
pub mod source;
pub mod step;

pub use error::{ProtocolViolation, Result, RuntimeError};
pub use event::{
    ContentPart, CostPoint, EventKind, EventRecord, InputRequest, InputResponse, MessageContent,
    MessageRole, RuntimeEvent, TimelineMessage,
};
pub use processor::{Disposition, EventProcessor, ProcessorStats};
pub use runner::{RunReport, RunnerState, SessionControl, SessionHandle, SessionRunner};
pub use session::{Session, SessionSnapshot, SessionStatus};
pub use source::{ChannelSource, EventSource, JsonLinesSource};
pub use step::{Breakpoint, StepMode};
