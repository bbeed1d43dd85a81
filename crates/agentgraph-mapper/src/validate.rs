//! Structural checks over an already built flow.

use std::collections::{HashMap, HashSet};

use agentgraph_core::graph::find_back_edges;
use agentgraph_core::{Flow, IssueKind, ValidationIssue};

/// Check a flow for structural problems. Never fails; the caller decides
/// which issues are fatal.
pub fn validate_flow(flow: &Flow) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    check_duplicates(flow, &mut issues);
    check_endpoints(flow, &mut issues);
    check_parents(flow, &mut issues);
    check_prerequisites(flow, &mut issues);
    check_references(flow, &mut issues);
    tracing::debug!(flow = %flow.id, issues = issues.len(), "flow validated");
    issues
}

fn check_duplicates(flow: &Flow, issues: &mut Vec<ValidationIssue>) {
    let mut seen = HashSet::new();
    let ids = flow
        .agents
        .iter()
        .map(|a| a.id.as_str())
        .chain(flow.models.iter().map(|m| m.id.as_str()))
        .chain(flow.tools.iter().map(|t| t.id.as_str()));
    for id in ids {
        if !seen.insert(id) {
            issues.push(ValidationIssue::new(IssueKind::Duplicate, id, "node id used more than once"));
        }
    }
    let mut seen = HashSet::new();
    for chat in &flow.chats {
        if !seen.insert(chat.id.as_str()) {
            issues.push(ValidationIssue::new(
                IssueKind::Duplicate,
                &chat.id,
                "chat id used more than once",
            ));
        }
    }
}

fn check_endpoints(flow: &Flow, issues: &mut Vec<ValidationIssue>) {
    let agents = flow.agent_index();
    for chat in &flow.chats {
        for endpoint in [&chat.source_agent_id, &chat.target_agent_id] {
            if !agents.contains_key(endpoint.as_str()) {
                issues.push(ValidationIssue::dangling(
                    &chat.id,
                    format!("endpoint `{}` is not an agent", endpoint),
                ));
            }
        }
    }
}

fn check_parents(flow: &Flow, issues: &mut Vec<ValidationIssue>) {
    let agents = flow.agent_index();
    for agent in &flow.agents {
        let Some(parent) = agent.parent_id.as_deref() else {
            continue;
        };
        match agents.get(parent) {
            None => issues.push(ValidationIssue::dangling(
                &agent.id,
                format!("parent `{}` does not exist", parent),
            )),
            Some(p) if !p.role.can_own_children() => issues.push(ValidationIssue::new(
                IssueKind::InvalidParent,
                &agent.id,
                format!("parent `{}` is a {} and cannot own agents", parent, p.role),
            )),
            Some(_) => {}
        }
    }

    let ids: Vec<&str> = flow.agents.iter().map(|a| a.id.as_str()).collect();
    let edges: HashMap<&str, Vec<&str>> = flow
        .agents
        .iter()
        .filter_map(|a| a.parent_id.as_deref().map(|p| (a.id.as_str(), vec![p])))
        .collect();
    for back in find_back_edges(&ids, &edges) {
        issues.push(ValidationIssue::cycle(
            &back.from,
            format!("parent chain {} is cyclic", back.cycle.join(" -> ")),
        ));
    }
}

fn check_prerequisites(flow: &Flow, issues: &mut Vec<ValidationIssue>) {
    let chats: HashSet<&str> = flow.chats.iter().map(|c| c.id.as_str()).collect();
    let mut edges: HashMap<&str, Vec<&str>> = HashMap::new();
    for chat in &flow.chats {
        for prereq in &chat.prerequisites {
            if chats.contains(prereq.as_str()) {
                edges.entry(prereq.as_str()).or_default().push(chat.id.as_str());
            } else {
                issues.push(ValidationIssue::dangling(
                    &chat.id,
                    format!("prerequisite `{}` does not exist", prereq),
                ));
            }
        }
    }
    let ids: Vec<&str> = flow.chats.iter().map(|c| c.id.as_str()).collect();
    for back in find_back_edges(&ids, &edges) {
        issues.push(ValidationIssue::cycle(
            &back.to,
            format!("prerequisite cycle {}", back.cycle.join(" -> ")),
        ));
    }
}

fn check_references(flow: &Flow, issues: &mut Vec<ValidationIssue>) {
    let models: HashSet<&str> = flow.models.iter().map(|m| m.id.as_str()).collect();
    let tools: HashSet<&str> = flow.tools.iter().map(|t| t.id.as_str()).collect();
    let agents = flow.agent_index();
    let chats: HashSet<&str> = flow.chats.iter().map(|c| c.id.as_str()).collect();

    for agent in &flow.agents {
        let config = &agent.config;
        for model in config.model_ids.iter().filter(|m| !models.contains(m.as_str())) {
            issues.push(ValidationIssue::dangling(
                &agent.id,
                format!("model `{}` does not exist", model),
            ));
        }
        for binding in &config.tools {
            if !tools.contains(binding.id.as_str()) {
                issues.push(ValidationIssue::dangling(
                    &agent.id,
                    format!("tool `{}` does not exist", binding.id),
                ));
            }
            if !agents.contains_key(binding.executor_id.as_str()) {
                issues.push(ValidationIssue::dangling(
                    &agent.id,
                    format!("tool executor `{}` is not an agent", binding.executor_id),
                ));
            }
        }
        for handoff in config.handoffs.iter().filter(|h| !chats.contains(h.as_str())) {
            issues.push(ValidationIssue::dangling(
                &agent.id,
                format!("hand-off `{}` names no chat", handoff),
            ));
        }
    }
}
