pub mod config;
pub mod error;
pub mod graph;
pub mod issue;
pub mod model;
pub mod secret;
pub mod types;

pub use config::AppConfig;
pub use error::{AgentGraphError, Result};
pub use issue::{IssueKind, ValidationIssue};
pub use model::*;
pub use types::*;
