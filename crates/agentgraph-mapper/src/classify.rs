//! Chat role classification.
//!
//! The role of a chat is never read from stored data. It is derived on every
//! import from its two endpoints by an ordered decision table.

use agentgraph_core::{Agent, AgentRole, ChatRole};

/// The parts of an agent that classification looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoint<'a> {
    pub id: &'a str,
    pub role: AgentRole,
    pub parent_id: Option<&'a str>,
}

impl<'a> From<&'a Agent> for Endpoint<'a> {
    fn from(agent: &'a Agent) -> Self {
        Self {
            id: &agent.id,
            role: agent.role,
            parent_id: agent.parent_id.as_deref(),
        }
    }
}

/// Classify a chat from `source` to `target`. First matching row wins:
///
/// | # | condition                                     | role           |
/// |---|-----------------------------------------------|----------------|
/// | 1 | target is a group manager                     | `to_manager`   |
/// | 2 | source is a group manager, target its member  | `from_manager` |
/// | 2 | source is a group manager, otherwise          | `to_manager`   |
/// | 3 | target has no parent, or its parent is source | `nested`       |
/// | 4 | both endpoints share a parent                 | `chat`         |
/// | 5 | otherwise                                     | `handoff`      |
pub fn classify_chat(source: Endpoint<'_>, target: Endpoint<'_>) -> ChatRole {
    if target.role.is_coordinator() {
        return ChatRole::ToManager;
    }
    if source.role.is_coordinator() {
        return if target.parent_id == Some(source.id) {
            ChatRole::FromManager
        } else {
            ChatRole::ToManager
        };
    }
    match (source.parent_id, target.parent_id) {
        (_, None) => ChatRole::Nested,
        (_, Some(tp)) if tp == source.id => ChatRole::Nested,
        (Some(sp), Some(tp)) if sp == tp => ChatRole::Chat,
        _ => ChatRole::Handoff,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ep<'a>(id: &'a str, role: AgentRole, parent: Option<&'a str>) -> Endpoint<'a> {
        Endpoint {
            id,
            role,
            parent_id: parent,
        }
    }

    #[test]
    fn coordinator_and_nested_and_direct() {
        let a = ep("A", AgentRole::GroupManager, None);
        let b = ep("B", AgentRole::Assistant, None);
        let c = ep("C", AgentRole::Assistant, Some("B"));
        let d = ep("D", AgentRole::Assistant, Some("B"));

        assert_eq!(classify_chat(a, b), ChatRole::ToManager);
        assert_eq!(classify_chat(b, c), ChatRole::Nested);
        assert_eq!(classify_chat(c, d), ChatRole::Chat);
    }

    #[test]
    fn manager_to_member() {
        let m = ep("M", AgentRole::GroupManager, None);
        let x = ep("X", AgentRole::Assistant, Some("M"));
        let u = ep("U", AgentRole::UserProxy, None);
        assert_eq!(classify_chat(m, x), ChatRole::FromManager);
        assert_eq!(classify_chat(u, m), ChatRole::ToManager);
        assert_eq!(classify_chat(x, m), ChatRole::ToManager);
    }

    #[test]
    fn cross_group_is_handoff() {
        let x = ep("X", AgentRole::Assistant, Some("M1"));
        let y = ep("Y", AgentRole::Assistant, Some("M2"));
        let u = ep("U", AgentRole::UserProxy, None);
        assert_eq!(classify_chat(x, y), ChatRole::Handoff);
        assert_eq!(classify_chat(u, y), ChatRole::Handoff);
    }

    #[test]
    fn deterministic() {
        let x = ep("X", AgentRole::Assistant, Some("M"));
        let y = ep("Y", AgentRole::Captain, Some("M"));
        let first = classify_chat(x, y);
        for _ in 0..10 {
            assert_eq!(classify_chat(x, y), first);
        }
    }
}
