//! Graph importer: untrusted JSON in, best-effort flow plus issues out.

use std::collections::{BTreeSet, HashMap, HashSet};

use agentgraph_core::graph::find_back_edges;
use agentgraph_core::{
    Agent, AgentRole, Chat, ChatRole, Flow, HandoffCondition, IssueKind, Passthrough,
    ValidationIssue,
};
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::builder::{
    build_agent_reporting, build_chat_reporting, build_flow, build_model_reporting,
    build_tool_reporting, flatten_legacy, EDGE_KEYS, NODE_KEYS,
};
use crate::classify::{classify_chat, Endpoint};
use crate::error::{MapperError, Result};
use crate::fields::{id_of, object};

/// Result of an import: the reconstructed flow and every non-fatal problem met.
#[derive(Debug, Clone)]
pub struct ImportOutcome {
    pub flow: Flow,
    pub issues: Vec<ValidationIssue>,
}

impl ImportOutcome {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn issues_of(&self, kind: IssueKind) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(move |i| i.kind == kind)
    }
}

/// Parse and import raw text. Text that is not JSON is fatal input.
pub fn import_flow_str(text: &str) -> Result<ImportOutcome> {
    let raw: Value = serde_json::from_str(text)
        .map_err(|e| MapperError::FatalInput(format!("not valid JSON: {}", e)))?;
    import_flow(&raw)
}

/// Import a flow document.
///
/// Accepts top-level `nodes`/`edges`, the same inside a legacy `data`
/// envelope, and legacy `agents`/`chats`/`models`/`tools` collections. Only a
/// non-object document is rejected.
pub fn import_flow(raw: &Value) -> Result<ImportOutcome> {
    let Value::Object(top) = raw else {
        return Err(MapperError::FatalInput(format!(
            "expected a JSON object, got {}",
            json_kind(raw)
        )));
    };

    // Envelope fields first so top-level fields win.
    let mut doc = object(top.get("data"));
    for (key, value) in top {
        if key != "data" {
            doc.insert(key.clone(), value.clone());
        }
    }

    let mut issues = Vec::new();
    let mut flow = build_flow(&doc, &mut issues);

    let nodes = array(&doc, "nodes", &flow.id, &mut issues);
    let edges = array(&doc, "edges", &flow.id, &mut issues);
    let mut legacy_agents = Legacy::agents(doc.get("agents"), &mut issues);
    let mut legacy_chats = Legacy::plain(doc.get("chats"), &mut issues);
    let mut legacy_models = Legacy::plain(doc.get("models"), &mut issues);
    let mut legacy_tools = Legacy::plain(doc.get("tools"), &mut issues);

    let mut seen = HashSet::new();
    for node in &nodes {
        let kind = node.get("type").and_then(Value::as_str).unwrap_or_default();
        if !matches!(kind, "agent" | "model" | "tool") {
            flow.other_nodes.push(node.clone());
            continue;
        }
        let Some(id) = id_of(node) else {
            issues.push(ValidationIssue::defaulted(
                &flow.id,
                format!("{} node without an id skipped", kind),
            ));
            continue;
        };
        if !seen.insert(id.clone()) {
            issues.push(duplicate(&id, kind));
            continue;
        }
        match kind {
            "agent" => {
                let legacy = legacy_agents.take(&id);
                let fallback = legacy.as_ref().and_then(|l| l.fallback);
                let merged = merge_legacy(node, legacy.as_ref(), NODE_KEYS);
                flow.agents.push(build_agent_reporting(&merged, fallback, &mut issues));
            }
            "model" => {
                let merged = merge_legacy(node, legacy_models.take(&id).as_ref(), NODE_KEYS);
                flow.models.push(build_model_reporting(&merged, &mut issues));
            }
            _ => {
                let merged = merge_legacy(node, legacy_tools.take(&id).as_ref(), NODE_KEYS);
                flow.tools.push(build_tool_reporting(&merged, &mut issues));
            }
        }
    }

    // Legacy records with no node counterpart.
    for record in legacy_agents.rest() {
        if seen.insert(record.id.clone()) {
            let node = node_from_legacy(&record, "agent");
            flow.agents.push(build_agent_reporting(&node, record.fallback, &mut issues));
        } else {
            issues.push(duplicate(&record.id, "agent"));
        }
    }
    for record in legacy_models.rest() {
        if seen.insert(record.id.clone()) {
            let node = node_from_legacy(&record, "model");
            flow.models.push(build_model_reporting(&node, &mut issues));
        } else {
            issues.push(duplicate(&record.id, "model"));
        }
    }
    for record in legacy_tools.rest() {
        if seen.insert(record.id.clone()) {
            let node = node_from_legacy(&record, "tool");
            flow.tools.push(build_tool_reporting(&node, &mut issues));
        } else {
            issues.push(duplicate(&record.id, "tool"));
        }
    }

    repair_parents(&mut flow.agents, &mut issues);

    let mut raw_chats: Vec<Value> = Vec::with_capacity(edges.len());
    for edge in &edges {
        let merged = match id_of(edge) {
            Some(id) => merge_legacy(edge, legacy_chats.take(&id).as_ref(), EDGE_KEYS),
            None => edge.clone(),
        };
        raw_chats.push(merged);
    }
    raw_chats.extend(legacy_chats.rest().map(|r| edge_from_legacy(&r)));

    let mut chat_ids = HashSet::new();
    for raw_chat in &raw_chats {
        let Some(chat) = import_chat(raw_chat, &flow, &mut issues) else {
            continue;
        };
        if !chat_ids.insert(chat.id.clone()) {
            issues.push(duplicate(&chat.id, "chat"));
            continue;
        }
        flow.chats.push(chat);
    }

    resolve_prerequisites(&mut flow.chats, &mut issues);
    resolve_handoffs(&mut flow, &mut issues);
    report_prerequisite_cycles(&flow.chats, &mut issues);

    info!(
        flow = %flow.id,
        agents = flow.agents.len(),
        chats = flow.chats.len(),
        issues = issues.len(),
        "flow imported"
    );
    Ok(ImportOutcome { flow, issues })
}

fn import_chat(raw: &Value, flow: &Flow, issues: &mut Vec<ValidationIssue>) -> Option<Chat> {
    if id_of(raw).is_none() {
        issues.push(ValidationIssue::defaulted(&flow.id, "edge without an id skipped"));
        return None;
    }
    let mut chat = build_chat_reporting(raw, issues);

    let (Some(source), Some(target)) = (
        flow.agent(&chat.source_agent_id),
        flow.agent(&chat.target_agent_id),
    ) else {
        let missing = if flow.agent(&chat.source_agent_id).is_none() {
            &chat.source_agent_id
        } else {
            &chat.target_agent_id
        };
        issues.push(ValidationIssue::dangling(
            &chat.id,
            format!("endpoint `{}` is not an agent; chat dropped", missing),
        ));
        return None;
    };

    chat.role = classify_chat(Endpoint::from(source), Endpoint::from(target));
    if let Some(hint) = raw.get("type").and_then(Value::as_str) {
        if hint != chat.role.as_str() {
            debug!(chat = %chat.id, hint, role = %chat.role, "edge type hint ignored");
        }
    }

    if chat.role == ChatRole::Handoff && chat.condition.is_none() {
        chat.condition = Some(HandoffCondition::Always);
        issues.push(ValidationIssue::defaulted(
            &chat.id,
            "hand-off without a condition; assuming always",
        ));
    }
    Some(chat)
}

/// Clear parents that name nothing and break parent cycles. A parent that
/// exists but cannot own children is reported and kept.
fn repair_parents(agents: &mut [Agent], issues: &mut Vec<ValidationIssue>) {
    let roles: HashMap<String, AgentRole> =
        agents.iter().map(|a| (a.id.clone(), a.role)).collect();

    for agent in agents.iter_mut() {
        let Some(parent) = agent.parent_id.as_deref() else {
            continue;
        };
        match roles.get(parent) {
            None => {
                issues.push(ValidationIssue::dangling(
                    &agent.id,
                    format!("parent `{}` does not exist; cleared", parent),
                ));
                agent.parent_id = None;
            }
            Some(role) if !role.can_own_children() => {
                issues.push(ValidationIssue::new(
                    IssueKind::InvalidParent,
                    &agent.id,
                    format!("parent `{}` is a {} and cannot own agents", parent, role),
                ));
            }
            Some(_) => {}
        }
    }

    let broken: Vec<(String, Vec<String>)> = {
        let ids: Vec<&str> = agents.iter().map(|a| a.id.as_str()).collect();
        let edges: HashMap<&str, Vec<&str>> = agents
            .iter()
            .filter_map(|a| a.parent_id.as_deref().map(|p| (a.id.as_str(), vec![p])))
            .collect();
        find_back_edges(&ids, &edges)
            .into_iter()
            .map(|back| (back.from, back.cycle))
            .collect()
    };
    for (agent_id, cycle) in broken {
        if let Some(agent) = agents.iter_mut().find(|a| a.id == agent_id) {
            agent.parent_id = None;
        }
        issues.push(ValidationIssue::cycle(
            &agent_id,
            format!("parent chain {} is cyclic; parent cleared", cycle.join(" -> ")),
        ));
    }
}

fn resolve_prerequisites(chats: &mut [Chat], issues: &mut Vec<ValidationIssue>) {
    let known: HashSet<String> = chats.iter().map(|c| c.id.clone()).collect();
    for chat in chats.iter_mut() {
        let (kept, dropped): (BTreeSet<String>, BTreeSet<String>) = std::mem::take(&mut chat.prerequisites)
            .into_iter()
            .partition(|p| known.contains(p));
        for missing in dropped {
            issues.push(ValidationIssue::dangling(
                &chat.id,
                format!("prerequisite `{}` does not exist; dropped", missing),
            ));
        }
        chat.prerequisites = kept;
    }
}

fn resolve_handoffs(flow: &mut Flow, issues: &mut Vec<ValidationIssue>) {
    let known: HashSet<&str> = flow.chats.iter().map(|c| c.id.as_str()).collect();
    for agent in flow.agents.iter_mut() {
        agent.config.handoffs.retain(|h| {
            let ok = known.contains(h.as_str());
            if !ok {
                issues.push(ValidationIssue::dangling(
                    &agent.id,
                    format!("hand-off `{}` names no chat; dropped", h),
                ));
            }
            ok
        });
    }
}

/// Report each prerequisite back edge. Cyclic prerequisites stay in the
/// model; only ordering skips them.
fn report_prerequisite_cycles(chats: &[Chat], issues: &mut Vec<ValidationIssue>) {
    let ids: Vec<&str> = chats.iter().map(|c| c.id.as_str()).collect();
    let mut edges: HashMap<&str, Vec<&str>> = HashMap::new();
    for chat in chats {
        for prereq in &chat.prerequisites {
            edges.entry(prereq.as_str()).or_default().push(chat.id.as_str());
        }
    }
    for back in find_back_edges(&ids, &edges) {
        issues.push(ValidationIssue::cycle(
            &back.to,
            format!("prerequisite cycle {}", back.cycle.join(" -> ")),
        ));
    }
}

struct LegacyRecord {
    id: String,
    raw: Value,
    fallback: Option<AgentRole>,
}

/// Legacy top-level records, consumed as nodes claim them.
struct Legacy {
    records: Vec<Option<LegacyRecord>>,
}

impl Legacy {
    fn plain(value: Option<&Value>, issues: &mut Vec<ValidationIssue>) -> Self {
        let mut records = Vec::new();
        if let Some(Value::Array(items)) = value {
            collect_records(items, None, &mut records, issues);
        }
        Self { records }
    }

    /// `agents` is either a flat array or an object of role-grouped arrays
    /// such as `userProxyAgents`; the group key supplies the fallback role.
    fn agents(value: Option<&Value>, issues: &mut Vec<ValidationIssue>) -> Self {
        let mut records = Vec::new();
        match value {
            Some(Value::Array(items)) => collect_records(items, None, &mut records, issues),
            Some(Value::Object(groups)) => {
                for (key, group) in groups {
                    let Value::Array(items) = group else {
                        continue;
                    };
                    let fallback = role_for_group(key);
                    if fallback.is_none() {
                        debug!(group = %key, "unrecognised agent group");
                    }
                    collect_records(items, fallback, &mut records, issues);
                }
            }
            _ => {}
        }
        Self { records }
    }

    fn take(&mut self, id: &str) -> Option<LegacyRecord> {
        self.records
            .iter_mut()
            .find(|slot| slot.as_ref().is_some_and(|r| r.id == id))?
            .take()
    }

    fn rest(self) -> impl Iterator<Item = LegacyRecord> {
        self.records.into_iter().flatten()
    }
}

fn collect_records(
    items: &[Value],
    fallback: Option<AgentRole>,
    out: &mut Vec<Option<LegacyRecord>>,
    issues: &mut Vec<ValidationIssue>,
) {
    for item in items {
        match id_of(item) {
            Some(id) => out.push(Some(LegacyRecord {
                id,
                raw: item.clone(),
                fallback,
            })),
            None => issues.push(ValidationIssue::defaulted(
                "legacy",
                "legacy record without an id skipped",
            )),
        }
    }
}

/// `userProxyAgents` -> `user_proxy`, `docAgents` -> `doc_agent`.
fn role_for_group(key: &str) -> Option<AgentRole> {
    let stem = key
        .strip_suffix("Agents")
        .or_else(|| key.strip_suffix('s'))
        .unwrap_or(key);
    let mut snake = String::with_capacity(stem.len() + 6);
    for c in stem.chars() {
        if c.is_ascii_uppercase() {
            snake.push('_');
            snake.push(c.to_ascii_lowercase());
        } else {
            snake.push(c);
        }
    }
    snake
        .parse()
        .or_else(|_| format!("{}_agent", snake).parse())
        .ok()
}

/// Field spellings that name the same thing; a node's spelling shadows all of
/// the legacy record's.
const ALIASES: &[&[&str]] = &[&["name", "label"]];

/// Overlay a node's `data` on its legacy record; node fields win.
fn merge_legacy(node: &Value, legacy: Option<&LegacyRecord>, keep: &[&str]) -> Value {
    let Some(legacy) = legacy else {
        return node.clone();
    };
    let mut data = flatten_legacy(&legacy.raw, keep);
    for (key, value) in object(node.get("data")) {
        if let Some(group) = ALIASES.iter().find(|g| g.contains(&key.as_str())) {
            for alias in group.iter() {
                data.remove(*alias);
            }
        }
        data.insert(key, value);
    }
    let mut merged = node.clone();
    if let Value::Object(map) = &mut merged {
        map.insert("data".to_string(), Value::Object(data));
    }
    merged
}

fn node_from_legacy(record: &LegacyRecord, kind: &str) -> Value {
    json!({
        "id": record.id,
        "type": kind,
        "data": Value::Object(flatten_legacy(&record.raw, NODE_KEYS)),
    })
}

fn edge_from_legacy(record: &LegacyRecord) -> Value {
    let mut edge = Passthrough::new();
    edge.insert("id".to_string(), Value::String(record.id.clone()));
    for key in ["source", "target"] {
        if let Some(v) = record.raw.get(key) {
            edge.insert(key.to_string(), v.clone());
        }
    }
    edge.insert(
        "data".to_string(),
        Value::Object(flatten_legacy(&record.raw, EDGE_KEYS)),
    );
    Value::Object(edge)
}

fn array(doc: &Passthrough, key: &str, subject: &str, issues: &mut Vec<ValidationIssue>) -> Vec<Value> {
    match doc.get(key) {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.clone(),
        Some(_) => {
            issues.push(ValidationIssue::defaulted(
                subject,
                format!("`{}` is not an array; ignored", key),
            ));
            Vec::new()
        }
    }
}

fn duplicate(id: &str, kind: &str) -> ValidationIssue {
    ValidationIssue::new(
        IssueKind::Duplicate,
        id,
        format!("duplicate {} id; later record skipped", kind),
    )
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentgraph_core::{HumanInputMode, MessageBody};

    fn agent_node(id: &str, role: &str, parent: Option<&str>) -> Value {
        json!({"id": id, "type": "agent", "position": {"x": 0, "y": 0},
            "data": {"label": id, "agentType": role, "parentId": parent}})
    }

    fn edge(id: &str, source: &str, target: &str) -> Value {
        json!({"id": id, "type": "chat", "source": source, "target": target, "data": {}})
    }

    #[test]
    fn rejects_non_object() {
        assert!(matches!(import_flow(&json!([1, 2])), Err(MapperError::FatalInput(_))));
        assert!(matches!(import_flow_str("{nope"), Err(MapperError::FatalInput(_))));
    }

    #[test]
    fn empty_object_imports() {
        let outcome = import_flow(&json!({})).unwrap();
        assert!(outcome.flow.agents.is_empty());
        assert!(outcome.is_clean());
    }

    #[test]
    fn classification_through_import() {
        let raw = json!({
            "nodes": [
                agent_node("A", "group_manager", None),
                agent_node("B", "assistant", None),
                agent_node("M", "group_manager", None),
                agent_node("X", "assistant", Some("M")),
                agent_node("Y", "assistant", Some("M")),
            ],
            "edges": [edge("e1", "A", "B"), edge("e2", "M", "X"), edge("e3", "X", "Y"), edge("e4", "B", "X")]
        });
        let outcome = import_flow(&raw).unwrap();
        let role = |id: &str| outcome.flow.chat(id).unwrap().role;
        assert_eq!(role("e1"), ChatRole::ToManager);
        assert_eq!(role("e2"), ChatRole::FromManager);
        assert_eq!(role("e3"), ChatRole::Chat);
        assert_eq!(role("e4"), ChatRole::Handoff);
        assert_eq!(
            outcome.flow.chat("e4").unwrap().condition,
            Some(HandoffCondition::Always)
        );
        assert_eq!(outcome.issues_of(IssueKind::Defaulted).count(), 1);
    }

    #[test]
    fn dangling_endpoint_and_prerequisite() {
        let mut e2 = edge("e2", "a", "b");
        e2["data"]["prerequisites"] = json!(["e1", "ghost"]);
        let raw = json!({
            "nodes": [agent_node("a", "user_proxy", None), agent_node("b", "assistant", None)],
            "edges": [edge("e1", "a", "b"), e2, edge("e3", "a", "nobody")]
        });
        let outcome = import_flow(&raw).unwrap();
        assert_eq!(outcome.flow.chats.len(), 2);
        let prereqs = &outcome.flow.chat("e2").unwrap().prerequisites;
        assert_eq!(prereqs.iter().collect::<Vec<_>>(), vec!["e1"]);
        assert_eq!(outcome.issues_of(IssueKind::DanglingReference).count(), 2);
    }

    #[test]
    fn prerequisite_cycle_reported_and_kept() {
        let mut e1 = edge("e1", "a", "b");
        e1["data"]["prerequisites"] = json!(["e2"]);
        let mut e2 = edge("e2", "b", "a");
        e2["data"]["prerequisites"] = json!(["e1"]);
        let raw = json!({
            "nodes": [agent_node("a", "user_proxy", None), agent_node("b", "assistant", None)],
            "edges": [e1, e2]
        });
        let outcome = import_flow(&raw).unwrap();
        assert_eq!(outcome.issues_of(IssueKind::Cycle).count(), 1);
        assert!(outcome.flow.chat("e1").unwrap().prerequisites.contains("e2"));
        assert!(outcome.flow.chat("e2").unwrap().prerequisites.contains("e1"));
    }

    #[test]
    fn parent_repairs() {
        let raw = json!({
            "nodes": [
                agent_node("m1", "group_manager", Some("m2")),
                agent_node("m2", "group_manager", Some("m1")),
                agent_node("x", "assistant", Some("missing")),
                agent_node("y", "assistant", Some("x")),
            ]
        });
        let outcome = import_flow(&raw).unwrap();
        let flow = &outcome.flow;
        assert!(flow.agent("x").unwrap().parent_id.is_none());
        assert_eq!(flow.agent("y").unwrap().parent_id.as_deref(), Some("x"));
        assert_eq!(outcome.issues_of(IssueKind::InvalidParent).count(), 1);
        assert_eq!(outcome.issues_of(IssueKind::Cycle).count(), 1);
        let cleared = ["m1", "m2"]
            .iter()
            .filter(|id| flow.agent(id).unwrap().parent_id.is_none())
            .count();
        assert_eq!(cleared, 1);
    }

    #[test]
    fn legacy_envelope_and_grouped_agents() {
        let raw = json!({
            "id": "f1",
            "name": "legacy",
            "type": "flow",
            "storageId": "s1",
            "data": {
                "viewport": {"zoom": 1},
                "nodes": [{"id": "u1", "type": "agent", "position": {"x": 5, "y": 5}, "data": {"label": "User"}}],
                "edges": [{"id": "c1", "source": "u1", "target": "a1", "data": {"label": "first"}}],
                "agents": {
                    "userProxyAgents": [{"id": "u1", "name": "old name", "data": {"humanInputMode": "TERMINATE"}}],
                    "assistantAgents": [{"id": "a1", "name": "helper", "data": {"systemMessage": "be nice"}}]
                },
                "chats": [{"id": "c1", "source": "u1", "target": "a1", "data": {"order": 3}}],
                "models": [{"id": "m1", "name": "gpt", "data": {"apiKey": "sk-1"}}]
            }
        });
        let outcome = import_flow(&raw).unwrap();
        let flow = &outcome.flow;
        assert_eq!(flow.name, "legacy");
        assert_eq!(flow.extras["viewport"]["zoom"], 1);
        assert_eq!(flow.extras["storageId"], "s1");

        let u1 = flow.agent("u1").unwrap();
        assert_eq!(u1.role, AgentRole::UserProxy);
        assert_eq!(u1.name, "User");
        assert_eq!(u1.config.human_input_mode, HumanInputMode::Terminate);
        assert_eq!(u1.view["position"]["x"], 5);

        let a1 = flow.agent("a1").unwrap();
        assert_eq!(a1.role, AgentRole::Assistant);
        assert_eq!(a1.config.system_message.as_deref(), Some("be nice"));

        let c1 = flow.chat("c1").unwrap();
        assert_eq!(c1.name, "first");
        assert_eq!(c1.order, 3);
        assert_eq!(c1.role, ChatRole::Nested);
        assert!(c1.extras.is_empty());

        assert_eq!(flow.models[0].api_key.as_deref(), Some("sk-1"));
    }

    #[test]
    fn other_nodes_are_opaque() {
        let raw = json!({"nodes": [{"id": "n1", "type": "note", "data": {"text": "hello"}}]});
        let outcome = import_flow(&raw).unwrap();
        assert_eq!(outcome.flow.other_nodes.len(), 1);
        assert_eq!(outcome.flow.other_nodes[0]["data"]["text"], "hello");
    }

    #[test]
    fn duplicate_ids_reported() {
        let raw = json!({"nodes": [agent_node("a", "assistant", None), agent_node("a", "captain", None)]});
        let outcome = import_flow(&raw).unwrap();
        assert_eq!(outcome.flow.agents.len(), 1);
        assert_eq!(outcome.flow.agents[0].role, AgentRole::Assistant);
        assert_eq!(outcome.issues_of(IssueKind::Duplicate).count(), 1);
    }

    #[test]
    fn dangling_handoff_dropped() {
        let mut a = agent_node("a", "assistant", None);
        a["data"]["handoffs"] = json!(["e1", "gone"]);
        let raw = json!({"nodes": [a, agent_node("b", "assistant", None)], "edges": [edge("e1", "a", "b")]});
        let outcome = import_flow(&raw).unwrap();
        assert_eq!(outcome.flow.agent("a").unwrap().config.handoffs, vec!["e1"]);
    }

    #[test]
    fn legacy_chat_without_edge() {
        let raw = json!({
            "agents": [
                {"id": "u", "agentType": "user_proxy"},
                {"id": "a", "agentType": "assistant"}
            ],
            "chats": [{"id": "c", "source": "u", "target": "a",
                "data": {"message": {"type": "string", "content": "hi"}}}]
        });
        let outcome = import_flow(&raw).unwrap();
        let chat = outcome.flow.chat("c").unwrap();
        assert_eq!(chat.message.body, MessageBody::Literal("hi".into()));
        assert!(chat.extras.is_empty());
    }

    #[test]
    fn group_key_roles() {
        assert_eq!(role_for_group("userProxyAgents"), Some(AgentRole::UserProxy));
        assert_eq!(role_for_group("ragUserProxyAgents"), Some(AgentRole::RagUserProxy));
        assert_eq!(role_for_group("groupManagerAgents"), Some(AgentRole::GroupManager));
        assert_eq!(role_for_group("docAgents"), Some(AgentRole::DocAgent));
        assert_eq!(role_for_group("captainAgents"), Some(AgentRole::Captain));
        assert_eq!(role_for_group("robots"), None);
    }
}
