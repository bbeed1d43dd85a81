use std::fmt;

use serde::{Deserialize, Serialize};

/// Category of a non-fatal problem found while importing or validating a flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// A reference (chat endpoint, prerequisite, model, tool, hand-off) names nothing.
    DanglingReference,
    /// A cycle in the prerequisite graph or the agent hierarchy.
    Cycle,
    /// A present but malformed field was replaced by its default.
    Defaulted,
    Duplicate,
    /// `parentId` points at an agent that cannot own children.
    InvalidParent,
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::DanglingReference => "dangling-reference",
            Self::Cycle => "cycle",
            Self::Defaulted => "defaulted",
            Self::Duplicate => "duplicate",
            Self::InvalidParent => "invalid-parent",
        };
        f.write_str(s)
    }
}

/// A non-fatal structural problem. Always collected and returned, never thrown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub kind: IssueKind,
    /// Id of the entity the issue is about.
    pub subject: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(kind: IssueKind, subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            subject: subject.into(),
            message: message.into(),
        }
    }

    pub fn dangling(subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(IssueKind::DanglingReference, subject, message)
    }

    pub fn cycle(subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(IssueKind::Cycle, subject, message)
    }

    pub fn defaulted(subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(IssueKind::Defaulted, subject, message)
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.kind, self.subject, self.message)
    }
}
