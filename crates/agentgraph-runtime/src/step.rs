//! Step-by-step gating. Decides when an event is applied, never how.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use agentgraph_core::config::{RuntimeConfig, StepModeSetting};
use serde::Serialize;

use crate::event::{EventKind, EventRecord};

/// Where a session stops.
///
/// Written as `KIND` or `event:KIND` for a kind, `agent:NAME` for anything an
/// agent sends, and `NAME:KIND` for one kind from one agent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(tag = "on", rename_all = "snake_case")]
pub enum Breakpoint {
    Event { kind: EventKind },
    Agent { name: String },
    AgentEvent { name: String, kind: EventKind },
}

impl Breakpoint {
    pub fn matches(&self, record: &EventRecord) -> bool {
        match self {
            Self::Event { kind } => record.kind() == *kind,
            Self::Agent { name } => record.agent() == Some(name.as_str()),
            Self::AgentEvent { name, kind } => {
                record.kind() == *kind && record.agent() == Some(name.as_str())
            }
        }
    }
}

impl From<EventKind> for Breakpoint {
    fn from(kind: EventKind) -> Self {
        Self::Event { kind }
    }
}

impl fmt::Display for Breakpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Event { kind } => write!(f, "event:{}", kind),
            Self::Agent { name } => write!(f, "agent:{}", name),
            Self::AgentEvent { name, kind } => write!(f, "{}:{}", name, kind),
        }
    }
}

impl FromStr for Breakpoint {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || format!("invalid breakpoint: {}", s);
        match s.split_once(':') {
            None => Ok(Self::Event { kind: s.parse()? }),
            Some(("event", kind)) => Ok(Self::Event { kind: kind.parse()? }),
            Some(("agent", name)) if !name.is_empty() && !name.contains(':') => Ok(Self::Agent {
                name: name.to_string(),
            }),
            Some((name, kind)) if !name.is_empty() && name != "agent" && !kind.contains(':') => {
                Ok(Self::AgentEvent {
                    name: name.to_string(),
                    kind: kind.parse()?,
                })
            }
            Some(_) => Err(invalid()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", content = "breakpoints", rename_all = "snake_case")]
pub enum StepMode {
    /// Apply events as they arrive.
    #[default]
    Run,
    /// Hold every event until continued.
    Step,
    /// Hold only events matching a breakpoint, plus anything behind them.
    Breakpoints(BTreeSet<Breakpoint>),
}

impl StepMode {
    pub fn breakpoints<B: Into<Breakpoint>>(points: impl IntoIterator<Item = B>) -> Self {
        Self::Breakpoints(points.into_iter().map(Into::into).collect())
    }

    /// Whether `record` stops here when nothing is held yet.
    pub fn pauses_on(&self, record: &EventRecord) -> bool {
        match self {
            Self::Run => false,
            Self::Step => true,
            Self::Breakpoints(points) => points.iter().any(|bp| bp.matches(record)),
        }
    }

    pub fn from_config(config: &RuntimeConfig) -> Result<Self, String> {
        Ok(match config.step_mode {
            StepModeSetting::Run => Self::Run,
            StepModeSetting::Step => Self::Step,
            StepModeSetting::Breakpoints => {
                let points = config
                    .breakpoints
                    .iter()
                    .map(|raw| raw.parse())
                    .collect::<Result<BTreeSet<Breakpoint>, String>>()?;
                Self::Breakpoints(points)
            }
        })
    }
}
