//! Bidirectional mapping between the generic node/edge flow graph and the
//! agentgraph domain model.
//!
//! Import is total: malformed or legacy input yields a best-effort flow plus
//! a list of validation issues. Export is the right inverse of import for
//! every authoritative field.

pub mod builder;
pub mod classify;
pub mod error;
pub mod export;
mod fields;
pub mod import;
pub mod order;
pub mod validate;

pub use builder::{build_agent, build_chat, build_flow, build_model, build_tool};
pub use classify::classify_chat;
pub use error::{MapperError, Result};
pub use export::{export_flow, ExportOptions, SCHEMA_VERSION};
pub use import::{import_flow, import_flow_str, ImportOutcome};
pub use order::{execution_order, ExecutionPlan};
pub use validate::validate_flow;
